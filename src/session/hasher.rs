//! One-way hashing of session secrets at rest.

use argon2::{
    password_hash::{self, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use rand::rngs::OsRng;

use super::{config::HashCost, error::HashError};

/// Salted one-way hash and constant-time compare for session secrets.
pub trait SecretHasher: Send + Sync {
    /// Hash a raw secret into a self-describing string (salt and cost included).
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// Compare a presented secret against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for unusable hashes.
    fn verify(&self, secret: &str, stored_hash: &str) -> Result<bool, HashError>;
}

/// Argon2id hasher producing PHC strings.
#[derive(Clone, Debug)]
pub struct Argon2SecretHasher {
    params: Params,
}

impl Argon2SecretHasher {
    /// # Errors
    /// Returns an error if the cost parameters are outside Argon2's limits.
    pub fn new(cost: HashCost) -> Result<Self, HashError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| HashError::Argon2(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashError::Argon2(err.to_string()))
    }

    fn verify(&self, secret: &str, stored_hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|_| HashError::MalformedHash)?;
        // Cost comes from the stored hash, not from `self.params`.
        match self.argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(HashError::Argon2(err.to_string())),
        }
    }
}
