//! Error kinds shared by the conversion pipeline

use crate::core::currency::{Currency, RateDate};
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine project directories")]
    NoProjectDirs,

    #[error("Failed to read config file: {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("API key is missing from config file: {0}")]
    MissingApiKey(PathBuf),
}

/// Rejected user input. The current operation is abandoned, the session is not.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid amount '{0}'. Please enter a numeric value.")]
    InvalidAmount(String),

    #[error(
        "Invalid currency code '{0}'. Supported codes: USD, EUR, GBP, JPY, AUD, CAD, CHF, CNY, SEK, NZD."
    )]
    UnsupportedCurrency(String),

    #[error("Invalid date '{0}'. Please enter the date in DD-MM-YYYY format.")]
    InvalidDate(String),

    #[error("Historical data is only available from 1999 onwards, got {0}.")]
    DateTooEarly(NaiveDate),

    #[error("Date {0} is in the future.")]
    DateInFuture(NaiveDate),

    #[error("Start date {start} is after end date {end}.")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Rate cache I/O error at {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed rate cache at {path}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode rate cache")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(StatusCode),

    #[error("Failed to parse rates response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Provider returned an invalid {code} rate: {rate}")]
    InvalidRate { code: String, rate: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether the provider asked us to slow down.
    pub fn is_throttled(&self) -> bool {
        matches!(self, FetchError::Status(status) if *status == StatusCode::TOO_MANY_REQUESTS)
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unable to fetch {base} rates for {date}")]
    Fetch {
        base: Currency,
        date: RateDate,
        source: FetchError,
    },

    #[error("Unable to convert from {from} to {to}: no rate available for {date}")]
    MissingRate {
        from: Currency,
        to: Currency,
        date: RateDate,
    },
}
