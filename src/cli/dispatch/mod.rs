//! Command-line argument dispatch.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{security, smtp};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches.get_one::<String>("redis-url").cloned();
    let frontend_base_url = matches.get_one::<String>("frontend-base-url").cloned();

    let security_opts = security::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        frontend_base_url,
        jwt_secret: security_opts.jwt_secret,
        admin_role_id: security_opts.admin_role_id,
        hash: security_opts.hash,
        smtp: smtp_opts.smtp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::hash::HashParams;

    const ADMIN_ROLE: &str = "0a0e6a5e-8f2e-4f84-9ad5-1f3c9a1f1a10";

    #[test]
    fn builds_a_server_action_from_flags() -> Result<()> {
        temp_env::with_vars(
            [
                ("RUXSAT_REDIS_URL", None::<&str>),
                ("RUXSAT_SMTP_HOST", None),
                ("RUXSAT_SMTP_USERNAME", None),
                ("RUXSAT_SMTP_PASSWORD", None),
                ("RUXSAT_SMTP_FROM", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "ruxsat",
                    "--dsn",
                    "postgres://user@localhost:5432/ruxsat",
                    "--jwt-secret",
                    "0123456789abcdef0123456789abcdef",
                    "--admin-role-id",
                    ADMIN_ROLE,
                ]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/ruxsat");
                assert_eq!(args.admin_role_id.to_string(), ADMIN_ROLE);
                assert!(args.redis_url.is_none());
                assert!(args.smtp.is_none());
                assert_eq!(args.hash, HashParams::new(65536, 3, 2, 16, 32));
                Ok(())
            },
        )
    }

    #[test]
    fn partial_smtp_configuration_is_rejected() {
        temp_env::with_vars(
            [
                ("RUXSAT_SMTP_HOST", Some("smtp.example.com")),
                ("RUXSAT_SMTP_USERNAME", None),
                ("RUXSAT_SMTP_PASSWORD", None),
                ("RUXSAT_SMTP_FROM", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "ruxsat",
                    "--dsn",
                    "postgres://user@localhost:5432/ruxsat",
                    "--jwt-secret",
                    "0123456789abcdef0123456789abcdef",
                    "--admin-role-id",
                    ADMIN_ROLE,
                ]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("must be set together"));
                }
            },
        );
    }
}
