//! Typed configuration from environment variables.
//!
//! Loaded once at startup, fails fast if required vars are missing or
//! malformed. The resulting values are immutable and passed explicitly to
//! each component. Sensitive values are wrapped in `secrecy::SecretString`
//! to prevent log leaks.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

/// Full daemon configuration: store, transport, and delivery policy.
#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub smtp: SmtpConfig,
    pub mailer: MailerConfig,
}

/// SMTP relay settings for the production transport.
#[derive(Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Delivery policy knobs consumed by the worker, dispatcher, and scheduler.
///
/// A plain cloneable value so the library is usable without the env layer;
/// `Default` gives the production defaults.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Global kill switch. When off, tasks stay queued untouched.
    pub enabled: bool,
    /// Sender address. Delivery is parked while unset.
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    /// Escalation recipient. No escalations are sent while unset.
    pub support_address: Option<String>,
    /// Attempt budget per task. Always at least one.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_multiplier: f64,
    pub scheduler_enabled: bool,
    pub scheduler_period: Duration,
    /// Size of the async delivery pool.
    pub worker_count: usize,
    /// Capacity of the channel feeding the pool. A full channel rejects the
    /// submission and leaves the task for the scheduler sweep.
    pub queue_capacity: usize,
    /// Upper bound on a single SMTP connect/send.
    pub send_timeout: Duration,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            from_address: None,
            from_name: None,
            support_address: None,
            max_attempts: 3,
            backoff_base: Duration::from_millis(2000),
            backoff_multiplier: 2.0,
            scheduler_enabled: true,
            scheduler_period: Duration::from_millis(15_000),
            worker_count: 4,
            queue_capacity: 64,
            send_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            smtp: SmtpConfig {
                host: required_var("SMTP_HOST")?,
                port: parsed_var("SMTP_PORT", 587)?,
                username: required_var("SMTP_USERNAME")?,
                password: SecretString::from(required_var("SMTP_PASSWORD")?),
            },
            mailer: MailerConfig::from_env()?,
        })
    }
}

impl MailerConfig {
    /// Load the delivery policy subset from environment variables. Every key
    /// has a default; only malformed values fail.
    pub fn from_env() -> Result<Self> {
        let max_attempts: u32 = parsed_var("MAILER_MAX_ATTEMPTS", 3)?;
        if max_attempts < 1 {
            return Err(Error::Config(
                "MAILER_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            enabled: parsed_var("MAILER_ENABLED", true)?,
            from_address: optional_var("MAILER_FROM_ADDRESS"),
            from_name: optional_var("MAILER_FROM_NAME"),
            support_address: optional_var("MAILER_SUPPORT_ADDRESS"),
            max_attempts,
            backoff_base: Duration::from_millis(parsed_var("MAILER_BACKOFF_BASE_MS", 2000u64)?),
            backoff_multiplier: parsed_var("MAILER_BACKOFF_MULTIPLIER", 2.0f64)?,
            scheduler_enabled: parsed_var("MAILER_SCHEDULER_ENABLED", true)?,
            scheduler_period: Duration::from_millis(parsed_var(
                "MAILER_SCHEDULER_PERIOD_MS",
                15_000u64,
            )?),
            worker_count: parsed_var("MAILER_WORKER_COUNT", 4usize)?,
            queue_capacity: parsed_var("MAILER_QUEUE_CAPACITY", 64usize)?,
            send_timeout: Duration::from_millis(parsed_var("MAILER_SEND_TIMEOUT_MS", 30_000u64)?),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}
