use crate::api::{self, ServerConfig};
use crate::auth::SmtpConfig;
use crate::security::hash::HashParams;
use anyhow::Result;
use secrecy::SecretString;
use uuid::Uuid;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: Option<String>,
    pub frontend_base_url: Option<String>,
    pub jwt_secret: SecretString,
    pub admin_role_id: Uuid,
    pub hash: HashParams,
    pub smtp: Option<SmtpConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if any backing service cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    api::serve(ServerConfig {
        port: args.port,
        dsn: args.dsn,
        redis_url: args.redis_url,
        jwt_secret: args.jwt_secret,
        admin_role_id: args.admin_role_id,
        hash: args.hash,
        smtp: args.smtp,
        frontend_base_url: args.frontend_base_url,
    })
    .await
}
