//! Process-wide session configuration.
//!
//! Built once at start-up and handed by reference to every component that
//! needs it. Nothing reads the environment after this value exists.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_HASH_ITERATIONS: u32 = 2;
const DEFAULT_HASH_PARALLELISM: u32 = 1;
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_NOTIFY_QUEUE: usize = 256;
const DEFAULT_NOTIFY_WORKERS: usize = 4;

/// Argon2id cost parameters for session secret hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    access_token_ttl: Duration,
    signing_secret: SecretString,
    webhook_url: Url,
    hash_cost: HashCost,
    notify_timeout: Duration,
    notify_queue: usize,
    notify_workers: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn new(access_token_ttl: Duration, signing_secret: SecretString, webhook_url: Url) -> Self {
        Self {
            access_token_ttl,
            signing_secret,
            webhook_url,
            hash_cost: HashCost::default(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            notify_queue: DEFAULT_NOTIFY_QUEUE,
            notify_workers: DEFAULT_NOTIFY_WORKERS,
        }
    }

    #[must_use]
    pub fn with_hash_cost(mut self, hash_cost: HashCost) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    #[must_use]
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_notify_queue(mut self, capacity: usize) -> Self {
        self.notify_queue = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_notify_workers(mut self, workers: usize) -> Self {
        self.notify_workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }

    #[must_use]
    pub fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }

    #[must_use]
    pub fn notify_timeout(&self) -> Duration {
        self.notify_timeout
    }

    #[must_use]
    pub fn notify_queue(&self) -> usize {
        self.notify_queue
    }

    #[must_use]
    pub fn notify_workers(&self) -> usize {
        self.notify_workers
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("signing_secret", &"***")
            .field("webhook_url", &self.webhook_url.as_str())
            .field("hash_cost", &self.hash_cost)
            .field("notify_timeout", &self.notify_timeout)
            .field("notify_queue", &self.notify_queue)
            .field("notify_workers", &self.notify_workers)
            .finish()
    }
}
