//! # Keyturn
//!
//! `keyturn` issues and rotates session credentials for authenticated
//! clients.
//!
//! ## Credentials
//!
//! A session is a pair: a short-lived HS512 access token naming the session
//! id, and a long-lived random refresh token stored only as an Argon2id hash.
//! A refresh token can be exchanged exactly once for a new pair.
//!
//! ## Hijack Detection
//!
//! Each session is bound to the client's `User-Agent` and IP address.
//! Rotating from a different user agent revokes every session of the subject.
//! Rotating from a different IP address succeeds but posts an alert to the
//! configured webhook.
//!
//! ## Layout
//!
//! - [`session`]: the session engine and its storage, hashing, signing and
//!   notification collaborators.
//! - [`keyturn`]: the HTTP surface and bearer gate.
//! - [`cli`]: argument parsing, telemetry and start-up.

pub mod cli;
pub mod keyturn;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
