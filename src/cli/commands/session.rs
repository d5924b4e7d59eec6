//! Session engine settings: token lifetime, signing secret, webhook target,
//! hashing cost and alert delivery limits.

use anyhow::{Context, Result};
use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

use crate::session::HashCost;

pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_WEBHOOK_URL: &str = "webhook-url";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_PARALLELISM: &str = "hash-parallelism";
pub const ARG_NOTIFY_TIMEOUT: &str = "notify-timeout";
pub const ARG_NOTIFY_QUEUE: &str = "notify-queue";
pub const ARG_NOTIFY_WORKERS: &str = "notify-workers";

#[derive(Debug)]
pub struct Options {
    pub access_token_ttl: Duration,
    pub jwt_secret: SecretString,
    pub webhook_url: Url,
    pub hash_cost: HashCost,
    pub notify_timeout: Duration,
    pub notify_queue: usize,
    pub notify_workers: usize,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let defaults = HashCost::default();
        Ok(Self {
            access_token_ttl: matches
                .get_one::<Duration>(ARG_ACCESS_TOKEN_TTL)
                .copied()
                .context("missing required argument: --access-token-ttl")?,
            jwt_secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .cloned()
                .map(SecretString::from)
                .context("missing required argument: --jwt-secret")?,
            webhook_url: matches
                .get_one::<Url>(ARG_WEBHOOK_URL)
                .cloned()
                .context("missing required argument: --webhook-url")?,
            hash_cost: HashCost {
                memory_kib: matches
                    .get_one::<u32>(ARG_HASH_MEMORY_KIB)
                    .copied()
                    .unwrap_or(defaults.memory_kib),
                iterations: matches
                    .get_one::<u32>(ARG_HASH_ITERATIONS)
                    .copied()
                    .unwrap_or(defaults.iterations),
                parallelism: matches
                    .get_one::<u32>(ARG_HASH_PARALLELISM)
                    .copied()
                    .unwrap_or(defaults.parallelism),
            },
            notify_timeout: matches
                .get_one::<Duration>(ARG_NOTIFY_TIMEOUT)
                .copied()
                .unwrap_or(Duration::from_secs(10)),
            notify_queue: matches
                .get_one::<usize>(ARG_NOTIFY_QUEUE)
                .copied()
                .unwrap_or(256),
            notify_workers: matches
                .get_one::<usize>(ARG_NOTIFY_WORKERS)
                .copied()
                .unwrap_or(4),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_credential_args(command);
    let command = with_hash_args(command);
    with_notify_args(command)
}

fn with_credential_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime, e.g. 15m, 1h30m, 90s")
                .env("KEYTURN_ACCESS_TOKEN_TTL")
                .required(true)
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Shared secret used to sign access tokens (HS512)")
                .env("KEYTURN_JWT_SECRET")
                .hide_env_values(true)
                .required(true)
                .value_parser(validator_non_blank()),
        )
        .arg(
            Arg::new(ARG_WEBHOOK_URL)
                .long(ARG_WEBHOOK_URL)
                .help("Webhook notified when a session rotates from a new IP address")
                .env("KEYTURN_WEBHOOK_URL")
                .required(true)
                .value_parser(validator_http_url()),
        )
}

fn with_hash_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long(ARG_HASH_MEMORY_KIB)
                .help("Argon2id memory cost in KiB for refresh token hashes")
                .env("KEYTURN_HASH_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32).range(8..)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("Argon2id iteration count")
                .env("KEYTURN_HASH_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_HASH_PARALLELISM)
                .long(ARG_HASH_PARALLELISM)
                .help("Argon2id lanes")
                .env("KEYTURN_HASH_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}

fn with_notify_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NOTIFY_TIMEOUT)
                .long(ARG_NOTIFY_TIMEOUT)
                .help("Timeout for one webhook delivery")
                .env("KEYTURN_NOTIFY_TIMEOUT")
                .default_value("10s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_NOTIFY_QUEUE)
                .long(ARG_NOTIFY_QUEUE)
                .help("Pending webhook alerts kept before new ones are dropped")
                .env("KEYTURN_NOTIFY_QUEUE")
                .default_value("256")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_NOTIFY_WORKERS)
                .long(ARG_NOTIFY_WORKERS)
                .help("Concurrent webhook deliveries")
                .env("KEYTURN_NOTIFY_WORKERS")
                .default_value("4")
                .value_parser(clap::value_parser!(usize)),
        )
}

/// Positive duration in Go notation (`300ms`, `1.5h`, `2h45m`).
#[must_use]
pub fn validator_duration() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<Duration, String> {
        let duration = parse_duration(value)?;
        if duration.is_zero() {
            return Err("duration must be greater than zero".to_string());
        }
        Ok(duration)
    })
}

#[must_use]
pub fn validator_non_blank() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        if value.trim().is_empty() {
            Err("value must not be blank".to_string())
        } else {
            Ok(value.to_string())
        }
    })
}

#[must_use]
pub fn validator_http_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<Url, String> {
        let url = Url::parse(value).map_err(|err| format!("invalid URL: {err}"))?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err("URL must be absolute http or https".to_string()),
        }
    })
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Parse a sequence of decimal numbers, each with a unit suffix
/// (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`). A bare `0` is also accepted.
///
/// # Errors
/// Returns a message describing the first malformed component.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let value = input.trim();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }
    if value == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = value;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            "" => return Err(format!("missing unit in duration {input:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {input:?}")),
        };

        total = total
            .checked_add(scaled(number, scale).ok_or_else(|| format!("invalid duration {input:?}"))?)
            .ok_or_else(|| format!("duration {input:?} is too large"))?;
        rest = tail;
    }

    let seconds =
        u64::try_from(total / NANOS_PER_SECOND).map_err(|_| format!("duration {input:?} is too large"))?;
    let nanos = u32::try_from(total % NANOS_PER_SECOND).map_err(|_| format!("invalid duration {input:?}"))?;
    Ok(Duration::new(seconds, nanos))
}

/// `number` (digits with at most one `.`) times `scale` nanoseconds.
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;

    let digits = &fraction[..fraction.len().min(18)];
    if !digits.is_empty() {
        let numerator: u128 = digits.parse().ok()?;
        let denominator = 10u128.pow(u32::try_from(digits.len()).ok()?);
        value = value.checked_add(numerator * scale / denominator)?;
    }
    Some(value)
}
