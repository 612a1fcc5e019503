//! Handler configuration

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Default provider endpoint
pub const DEFAULT_API_URL: &str = "https://api.isightpartners.com";

/// Default key prefix for archived feeds
pub const DEFAULT_ARCHIVE_PREFIX: &str = "iSIGHT";

const SECONDS_PER_DAY: i64 = 86_400;

/// Configuration errors, fatal before anything is mutated
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    #[error("DAYS_REQUESTED must be a positive integer, got {0}")]
    InvalidWindow(String),

    #[error("secret parameter {0} could not be resolved")]
    MissingSecret(String),

    #[error("invalid provider URL {url}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Log verbosity accepted in `LOG_LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parse a level name, falling back to `Error` for anything unrecognised
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Error,
        }
    }

    /// Equivalent tracing filter. `Critical` has no tracing counterpart and
    /// maps onto `ERROR`.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Number of trailing days requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedWindow(NonZeroU32);

impl FeedWindow {
    pub fn new(days: i64) -> Result<Self, ConfigError> {
        u32::try_from(days)
            .ok()
            .and_then(NonZeroU32::new)
            .map(FeedWindow)
            .ok_or_else(|| ConfigError::InvalidWindow(days.to_string()))
    }

    /// Parse the raw `DAYS_REQUESTED` value
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let days = value
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidWindow(value.to_string()))?;
        Self::new(days)
    }

    pub fn days(&self) -> u32 {
        self.0.get()
    }

    /// `(start, end)` in Unix seconds for a window ending at `now`
    pub fn range(&self, now: DateTime<Utc>) -> (i64, i64) {
        let end = now.timestamp();
        (end - i64::from(self.days()) * SECONDS_PER_DAY, end)
    }
}

impl std::fmt::Display for FeedWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw settings as read from the environment. Nothing here is checked until
/// an invocation needs it, so a bad value fails that invocation instead of
/// the process.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// `DAYS_REQUESTED`, unparsed
    pub days_requested: Option<String>,
    /// Name of the secret holding the provider public key
    pub public_key_param: Option<String>,
    /// Name of the secret holding the provider private key
    pub private_key_param: Option<String>,
    pub output_bucket: Option<String>,
    pub archive_prefix: String,
}

/// Validated view of [`HandlerConfig`] for one invocation
#[derive(Debug, Clone)]
pub struct SyncSettings<'a> {
    pub window: FeedWindow,
    pub public_key_param: &'a str,
    pub private_key_param: &'a str,
    pub output_bucket: &'a str,
    pub archive_prefix: &'a str,
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<SyncSettings<'_>, ConfigError> {
        let window = FeedWindow::parse(required(&self.days_requested, "DAYS_REQUESTED")?)?;

        Ok(SyncSettings {
            window,
            public_key_param: required(&self.public_key_param, "PUBLIC_KEY")?,
            private_key_param: required(&self.private_key_param, "PRIVATE_KEY")?,
            output_bucket: required(&self.output_bucket, "OUTPUT_BUCKET")?,
            archive_prefix: &self.archive_prefix,
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingSetting(name))
}

/// Validate the provider base URL
pub fn parse_api_url(value: &str) -> Result<url::Url, ConfigError> {
    url::Url::parse(value).map_err(|source| ConfigError::InvalidApiUrl {
        url: value.to_string(),
        source,
    })
}
