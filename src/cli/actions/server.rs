use crate::{
    cli::telemetry,
    keyturn,
    session::{HashCost, SessionConfig},
};
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_ttl: Duration,
    pub jwt_secret: SecretString,
    pub webhook_url: Url,
    pub hash_cost: HashCost,
    pub notify_timeout: Duration,
    pub notify_queue: usize,
    pub notify_workers: usize,
}

impl Args {
    /// The engine settings carried by these arguments.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(
            self.access_token_ttl,
            self.jwt_secret.clone(),
            self.webhook_url.clone(),
        )
        .with_hash_cost(self.hash_cost)
        .with_notify_timeout(self.notify_timeout)
        .with_notify_queue(self.notify_queue)
        .with_notify_workers(self.notify_workers)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.session_config();

    debug!("Session config: {:?}", config);

    let result = keyturn::new(args.port, args.dsn, config).await;

    telemetry::shutdown_tracer();

    result
}
