pub mod client;
pub mod deauthorize;
pub mod error;
pub mod gate;
pub mod health;
pub mod me;
pub mod tokens;
pub mod types;

pub use self::client::ClientContext;
pub use self::error::ApiError;
pub use self::gate::{require_session, AuthenticatedSession};
pub use self::health::health;
