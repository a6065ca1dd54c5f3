//! SMTP delivery arguments. All four must be set together; with none set the
//! server logs reset emails instead of sending them.

use anyhow::{Result, anyhow};
use clap::{Arg, Command};
use secrecy::SecretString;

use crate::auth::SmtpConfig;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

pub struct Options {
    pub smtp: Option<SmtpConfig>,
}

impl Options {
    /// # Errors
    ///
    /// Returns an error when only some of the SMTP arguments are provided.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let host = matches.get_one::<String>(ARG_SMTP_HOST).cloned();
        let username = matches.get_one::<String>(ARG_SMTP_USERNAME).cloned();
        let password = matches.get_one::<String>(ARG_SMTP_PASSWORD).cloned();
        let from = matches.get_one::<String>(ARG_SMTP_FROM).cloned();

        let smtp = match (host, username, password, from) {
            (Some(host), Some(username), Some(password), Some(from)) => Some(SmtpConfig {
                host,
                username,
                password: SecretString::from(password),
                from,
            }),
            (None, None, None, None) => None,
            _ => {
                return Err(anyhow!(
                    "--{ARG_SMTP_HOST}, --{ARG_SMTP_USERNAME}, --{ARG_SMTP_PASSWORD} and --{ARG_SMTP_FROM} must be set together"
                ));
            }
        };

        Ok(Self { smtp })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host for outbound email")
                .env("RUXSAT_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("RUXSAT_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("RUXSAT_SMTP_PASSWORD"),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("From address for outbound email")
                .env("RUXSAT_SMTP_FROM"),
        )
}
