//! Amount conversion on top of a [`RateSource`]

use crate::core::currency::{Currency, RateDate, RateSource};
use crate::core::error::ConversionError;
use chrono::NaiveDate;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub amount: f64,
    pub from: Currency,
    pub to: Currency,
    pub date: RateDate,
    pub rate: f64,
    pub converted: f64,
}

/// Converts `amount` of `from` into `to` using the rates published for `date`.
///
/// Fetch failures and a missing target rate are logged and returned as
/// [`ConversionError`]; nothing past this boundary sees a raw fetch error.
#[instrument(name = "Convert", skip(source), fields(from = %from, to = %to, date = %date))]
pub async fn convert(
    source: &dyn RateSource,
    amount: f64,
    from: Currency,
    to: Currency,
    date: RateDate,
) -> Result<ConversionResult, ConversionError> {
    let result = match source.fetch_rates(from, date).await {
        Ok(rates) => rates
            .rate_for(to)
            .map(|rate| ConversionResult {
                amount,
                from,
                to,
                date,
                rate,
                converted: amount * rate,
            })
            .ok_or(ConversionError::MissingRate { from, to, date }),
        Err(cause) => Err(ConversionError::Fetch {
            base: from,
            date,
            source: cause,
        }),
    };

    match &result {
        Ok(conversion) => debug!(rate = conversion.rate, "Converted {amount} {from} to {to}"),
        Err(e) => error!(error = %e, cause = ?std::error::Error::source(e), "Unable to convert"),
    }
    result
}

/// A conversion on a chosen day next to the same conversion at the latest rate.
#[derive(Debug)]
pub struct Comparison {
    pub historical: Result<ConversionResult, ConversionError>,
    pub latest: Result<ConversionResult, ConversionError>,
}

impl Comparison {
    /// Difference between the latest and historical converted amounts.
    pub fn change(&self) -> Option<f64> {
        match (&self.historical, &self.latest) {
            (Ok(then), Ok(now)) => Some(now.converted - then.converted),
            _ => None,
        }
    }
}

pub async fn compare(
    source: &dyn RateSource,
    amount: f64,
    from: Currency,
    to: Currency,
    date: NaiveDate,
) -> Comparison {
    let historical = convert(source, amount, from, to, RateDate::On(date)).await;
    let latest = convert(source, amount, from, to, RateDate::Latest).await;
    Comparison { historical, latest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::StubRates;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_convert_multiplies_by_target_rate() {
        let source = StubRates::new().with(Currency::Usd, RateDate::Latest, &[("EUR", 0.92)]);

        let result = convert(&source, 100.0, Currency::Usd, Currency::Eur, RateDate::Latest)
            .await
            .unwrap();

        assert!((result.converted - 92.0).abs() < 1e-9);
        assert_eq!(result.rate, 0.92);
        assert_eq!(result.date, RateDate::Latest);
        assert_eq!(source.requested(), vec![(Currency::Usd, RateDate::Latest)]);
    }

    #[tokio::test]
    async fn test_convert_fails_when_target_missing() {
        let source = StubRates::new().with(Currency::Usd, RateDate::On(day(2)), &[("GBP", 0.79)]);

        let err = convert(&source, 1.0, Currency::Usd, Currency::Eur, RateDate::On(day(2)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::MissingRate {
                from: Currency::Usd,
                to: Currency::Eur,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_convert_wraps_fetch_failures() {
        let source = StubRates::new();

        let err = convert(&source, 1.0, Currency::Gbp, Currency::Eur, RateDate::Latest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Fetch {
                base: Currency::Gbp,
                date: RateDate::Latest,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Unable to fetch GBP rates for latest");
    }

    #[tokio::test]
    async fn test_compare_reports_change_between_dates() {
        let source = StubRates::new()
            .with(Currency::Usd, RateDate::On(day(5)), &[("EUR", 0.90)])
            .with(Currency::Usd, RateDate::Latest, &[("EUR", 0.95)]);

        let comparison = compare(&source, 200.0, Currency::Usd, Currency::Eur, day(5)).await;

        assert!((comparison.historical.as_ref().unwrap().converted - 180.0).abs() < 1e-9);
        assert!((comparison.latest.as_ref().unwrap().converted - 190.0).abs() < 1e-9);
        assert!((comparison.change().unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_compare_has_no_change_when_one_side_fails() {
        let source = StubRates::new().with(Currency::Usd, RateDate::Latest, &[("EUR", 0.95)]);

        let comparison = compare(&source, 200.0, Currency::Usd, Currency::Eur, day(5)).await;

        assert!(comparison.historical.is_err());
        assert!(comparison.latest.is_ok());
        assert!(comparison.change().is_none());
    }
}
