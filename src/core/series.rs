//! Day-by-day exchange rate series

use crate::core::currency::{Currency, RateDate, RateSource};
use crate::core::error::ValidationError;
use crate::core::validate::validate_range;
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Rates of `to` per unit of `from`, ordered by date. Dates that failed to
/// resolve are left out and counted in `skipped`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub from: Currency,
    pub to: Currency,
    pub points: Vec<SeriesPoint>,
    pub skipped: usize,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lowest and highest rate in the series.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.rate, p.rate)),
            Some((lo, hi)) => Some((lo.min(p.rate), hi.max(p.rate))),
        })
    }
}

pub async fn build_series(
    source: &dyn RateSource,
    from: Currency,
    to: Currency,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Series, ValidationError> {
    build_series_with_progress(source, from, to, start, end, &|| ()).await
}

/// Same as [`build_series`], calling `on_day` after each date is looked up.
pub async fn build_series_with_progress(
    source: &dyn RateSource,
    from: Currency,
    to: Currency,
    start: NaiveDate,
    end: NaiveDate,
    on_day: &(dyn Fn() + Sync),
) -> Result<Series, ValidationError> {
    validate_range(start, end)?;

    let mut points = Vec::new();
    let mut skipped = 0;
    for date in start.iter_days().take_while(|d| *d <= end) {
        match source.fetch_rates(from, RateDate::On(date)).await {
            Ok(rates) => match rates.rate_for(to) {
                Some(rate) => points.push(SeriesPoint { date, rate }),
                None => {
                    debug!("No {to} rate in {from} rates for {date}, skipping");
                    skipped += 1;
                }
            },
            Err(e) => {
                debug!(error = %e, "No {from} rates for {date}, skipping");
                skipped += 1;
            }
        }
        on_day();
    }

    info!(
        points = points.len(),
        skipped, "Built {from}/{to} series from {start} to {end}"
    );
    Ok(Series {
        from,
        to,
        points,
        skipped,
    })
}

/// Number of calendar days in `start..=end`.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> u64 {
    u64::try_from((end - start).num_days() + 1).unwrap_or(0)
}
