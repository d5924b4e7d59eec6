//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::session;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        access_token_ttl: session_opts.access_token_ttl,
        jwt_secret: session_opts.jwt_secret,
        webhook_url: session_opts.webhook_url,
        hash_cost: session_opts.hash_cost,
        notify_timeout: session_opts.notify_timeout,
        notify_queue: session_opts.notify_queue,
        notify_workers: session_opts.notify_workers,
    }))
}
