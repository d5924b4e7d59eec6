//! Raw session secret generation.

use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};

use super::error::SessionError;

const SESSION_SECRET_BYTES: usize = 32;

/// Create a new raw session secret.
///
/// The raw value is returned to the client exactly once; only its hash is stored.
///
/// # Errors
/// Returns `SessionError::Randomness` if the OS random source fails.
pub fn generate_session_secret() -> Result<String, SessionError> {
    let mut bytes = [0u8; SESSION_SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(SessionError::Randomness)?;
    Ok(Base64::encode_string(&bytes))
}
