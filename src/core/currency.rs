//! Currency and exchange rate abstractions

use crate::core::error::{FetchError, ValidationError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Currencies the converter accepts as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Aud,
    Cad,
    Chf,
    Cny,
    Sek,
    Nzd,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Cny,
        Currency::Sek,
        Currency::Nzd,
    ];

    /// ISO 4217 code, as used by the rate provider.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Sek => "SEK",
            Currency::Nzd => "NZD",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(ValidationError::UnsupportedCurrency(code))
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

/// The day a rate map is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum RateDate {
    Latest,
    On(NaiveDate),
}

impl Display for RateDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateDate::Latest => f.write_str("latest"),
            RateDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for RateDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "latest" {
            return Ok(RateDate::Latest);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(RateDate::On)
    }
}

impl From<Option<NaiveDate>> for RateDate {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(RateDate::Latest, RateDate::On)
    }
}

impl From<NaiveDate> for RateDate {
    fn from(value: NaiveDate) -> Self {
        RateDate::On(value)
    }
}

/// Units of each currency equal to one unit of the base currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateMap(BTreeMap<String, f64>);

impl RateMap {
    pub fn get(&self, code: &str) -> Option<f64> {
        self.0.get(code).copied()
    }

    pub fn rate_for(&self, currency: Currency) -> Option<f64> {
        self.get(currency.code())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First rate that is not a finite positive number, if any.
    pub fn first_invalid(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .find(|(_, rate)| !(rate.is_finite() && **rate > 0.0))
            .map(|(code, rate)| (code.as_str(), *rate))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RateMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        RateMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Resolves the rate map for a base currency on a given day.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: Currency, date: RateDate) -> Result<RateMap, FetchError>;
}
