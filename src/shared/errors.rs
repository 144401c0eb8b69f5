//! Error handling for the application

use thiserror::Error;

use crate::application::MonitorState;
use crate::domain::alert::AlertSide;

/// Market data errors, recovered by skipping the tick
#[derive(Error, Debug)]
pub enum FetchError {
    /// Built through `From`, which strips the request URL (it can carry API keys)
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("{vendor} returned status {status}: {body}")]
    Status {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    #[error("{vendor} API error: {message}")]
    Api {
        vendor: &'static str,
        message: String,
    },

    #[error("Invalid {vendor} payload: {source}")]
    Parse {
        vendor: &'static str,
        #[source]
        source: ParseFailure,
    },

    #[error("{vendor} returned an empty series for {symbol}")]
    EmptySeries {
        vendor: &'static str,
        symbol: String,
    },
}

/// Details of a payload that could not be turned into prices
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("malformed number {0:?}")]
    Number(String),

    #[error("missing field {0}")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.without_url())
    }
}

impl FetchError {
    pub fn parse(vendor: &'static str, source: ParseFailure) -> Self {
        FetchError::Parse { vendor, source }
    }
}

/// Band math errors; these indicate corrupted upstream data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Band period must be at least 2, got {0}")]
    InvalidPeriod(usize),

    #[error("Band multiplier must be positive and finite, got {0}")]
    InvalidMultiplier(f64),

    #[error("{0} band is zero, distance is undefined")]
    ZeroBand(AlertSide),

    #[error("Non-finite {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// What a single notification channel reports back on failure
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Mail submission failed: {0}")]
    Mail(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        // the Bot API URL embeds the token
        NotifyError::Http(e.without_url())
    }
}

/// Per-channel delivery failure collected by the fanout
#[derive(Error, Debug)]
#[error("channel {channel} failed: {source}")]
pub struct DispatchError {
    pub channel: String,
    #[source]
    pub source: NotifyError,
}

/// Alert history load/save errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("History file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("History (de)serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A failed tick. Carries the stage so the log shows where it broke.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("[{stage}] fetch failed for {symbol}: {source}")]
    Fetch {
        stage: MonitorState,
        symbol: String,
        #[source]
        source: FetchError,
    },

    #[error("[{stage}] not enough history for {symbol}: need {required} closes, got {available}")]
    InsufficientData {
        stage: MonitorState,
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("[{stage}] domain error for {symbol}: {source}")]
    Domain {
        stage: MonitorState,
        symbol: String,
        #[source]
        source: DomainError,
    },
}

impl MonitorError {
    /// Only domain errors are unexpected in a long-running poller
    pub fn is_noteworthy(&self) -> bool {
        matches!(self, MonitorError::Domain { .. })
    }
}
