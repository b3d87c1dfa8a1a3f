//! Input validation for amounts, currency codes and dates

use crate::core::currency::Currency;
use crate::core::error::ValidationError;
use chrono::{Datelike, NaiveDate};

/// First year the rate provider has historical data for.
pub const EARLIEST_YEAR: i32 = 1999;

const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];

pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| ValidationError::InvalidAmount(trimmed.to_string()))
}

pub fn parse_currency(input: &str) -> Result<Currency, ValidationError> {
    input.parse()
}

/// Parses `DD-MM-YYYY`, falling back to ISO `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ValidationError::InvalidDate(trimmed.to_string()))
}

/// Checks a date falls between 1999-01-01 and `today`, inclusive.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if date.year() < EARLIEST_YEAR {
        return Err(ValidationError::DateTooEarly(date));
    }
    if date > today {
        return Err(ValidationError::DateInFuture(date));
    }
    Ok(date)
}

/// Parses and validates a date, treating empty input as `today`.
pub fn parse_historical_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if input.trim().is_empty() {
        return Ok(today);
    }
    validate_date(parse_date(input)?, today)
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvalidRange { start, end });
    }
    Ok(())
}
