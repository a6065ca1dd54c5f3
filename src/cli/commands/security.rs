//! Token-signing and password-hashing arguments.

use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;
use uuid::Uuid;

use crate::security::hash::HashParams;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_ADMIN_ROLE_ID: &str = "admin-role-id";

pub struct Options {
    pub jwt_secret: SecretString,
    pub admin_role_id: Uuid,
    pub hash: HashParams,
}

impl Options {
    /// # Errors
    ///
    /// Returns an error if a required argument is missing from the matches.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .with_context(|| format!("missing required argument: --{ARG_JWT_SECRET}"))?;
        let admin_role_id = matches
            .get_one::<Uuid>(ARG_ADMIN_ROLE_ID)
            .copied()
            .with_context(|| format!("missing required argument: --{ARG_ADMIN_ROLE_ID}"))?;

        let get = |name: &str| matches.get_one::<u32>(name).copied().unwrap_or_default();
        let hash = HashParams::new(
            get("hash-memory-kib"),
            get("hash-iterations"),
            get("hash-parallelism"),
            matches
                .get_one::<usize>("hash-salt-length")
                .copied()
                .unwrap_or_default(),
            matches
                .get_one::<usize>("hash-key-length")
                .copied()
                .unwrap_or_default(),
        );

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            admin_role_id,
            hash,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Symmetric secret used to sign session tokens (min 32 chars)")
                .env("RUXSAT_JWT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_ROLE_ID)
                .long(ARG_ADMIN_ROLE_ID)
                .help("Role id whose members bypass per-route permission checks")
                .env("RUXSAT_ADMIN_ROLE_ID")
                .required(true)
                .value_parser(clap::value_parser!(Uuid)),
        )
        .arg(
            Arg::new("hash-memory-kib")
                .long("hash-memory-kib")
                .help("Argon2id memory cost in KiB")
                .env("RUXSAT_HASH_MEMORY_KIB")
                .default_value("65536")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("hash-iterations")
                .long("hash-iterations")
                .help("Argon2id iteration count")
                .env("RUXSAT_HASH_ITERATIONS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("hash-parallelism")
                .long("hash-parallelism")
                .help("Argon2id lanes")
                .env("RUXSAT_HASH_PARALLELISM")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("hash-salt-length")
                .long("hash-salt-length")
                .help("Salt length in bytes for new password hashes")
                .env("RUXSAT_HASH_SALT_LENGTH")
                .default_value("16")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("hash-key-length")
                .long("hash-key-length")
                .help("Derived key length in bytes for new password hashes")
                .env("RUXSAT_HASH_KEY_LENGTH")
                .default_value("32")
                .value_parser(clap::value_parser!(usize)),
        )
}
