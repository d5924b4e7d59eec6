//! Session credentials: issue, one-time rotation, revocation and lookup.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod notifier;
pub mod record;
pub mod secret;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::{AccessClaims, Hs512TokenCodec, TokenCodec};
pub use config::{HashCost, SessionConfig};
pub use engine::{IssuedSession, SessionEngine};
pub use error::{CodecError, HashError, NotificationError, SessionError, StoreError};
pub use hasher::{Argon2SecretHasher, SecretHasher};
pub use memory::InMemorySessionStore;
pub use notifier::{AnomalyNotifier, NotificationDispatcher, OriginAlert, WebhookNotifier};
pub use record::{NewSession, SessionRecord};
pub use store::{PgSessionStore, SessionStore};
