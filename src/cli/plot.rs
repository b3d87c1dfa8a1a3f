use super::prompt::Prompt;
use super::ui;
use crate::core::series::{Series, build_series_with_progress, days_in_range};
use crate::core::validate;
use crate::core::{Currency, RateSource};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Something that can show a rate series to the user.
pub trait ChartSurface: Send + Sync {
    /// Draws the series and returns a human readable location of the result.
    fn render(&self, series: &Series) -> Result<String>;
}

/// Writes charts as PNG images.
pub struct PngChart {
    path: PathBuf,
    size: (u32, u32),
}

impl PngChart {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: (1000, 500),
        }
    }
}

impl ChartSurface for PngChart {
    fn render(&self, series: &Series) -> Result<String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        draw_series(&self.path, self.size, series)?;
        Ok(self.path.display().to_string())
    }
}

pub fn chart_title(series: &Series) -> String {
    format!("Exchange Rate from {} to {}", series.from, series.to)
}

/// Rate axis bounds with 10% padding, widened when every rate is the same.
fn value_range(series: &Series) -> Option<(f64, f64)> {
    let (min, max) = series.bounds()?;
    let padding = if max > min {
        (max - min) * 0.1
    } else {
        (min.abs() * 0.01).max(0.0001)
    };
    Some((min - padding, max + padding))
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn draw_series(path: &Path, size: (u32, u32), series: &Series) -> Result<()> {
    let (first, last) = match (series.points.first(), series.points.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(anyhow!("No data points to draw")),
    };
    let (min_value, max_value) =
        value_range(series).ok_or_else(|| anyhow!("No data points to draw"))?;
    let last = if first == last {
        last.checked_add_days(Days::new(1)).unwrap_or(last)
    } else {
        last
    };

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to fill background: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(series), ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(at_midnight(first)..at_midnight(last), min_value..max_value)
        .map_err(|e| anyhow!("Failed to build chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(format!("Exchange Rate ({})", series.to))
        .x_label_formatter(&|x| x.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(|e| anyhow!("Failed to configure mesh: {e}"))?;

    chart
        .draw_series(LineSeries::new(
            series.points.iter().map(|p| (at_midnight(p.date), p.rate)),
            &BLUE,
        ))
        .map_err(|e| anyhow!("Failed to draw rate line: {e}"))?;
    chart
        .draw_series(
            series
                .points
                .iter()
                .map(|p| Circle::new((at_midnight(p.date), p.rate), 3, BLUE.filled())),
        )
        .map_err(|e| anyhow!("Failed to draw rate markers: {e}"))?;

    root.present()
        .map_err(|e| anyhow!("Failed to present chart: {e}"))?;
    Ok(())
}

/// Asks for the start and end of the plotted range.
pub async fn collect_range(prompt: &dyn Prompt, today: NaiveDate) -> Result<DateRange> {
    let start = prompt
        .ask("Enter the start date for the graph (DD-MM-YYYY): ")
        .await?;
    let end = prompt
        .ask("Enter the end date for the graph (DD-MM-YYYY): ")
        .await?;

    let start = validate::validate_date(validate::parse_date(&start)?, today)?;
    let end = validate::validate_date(validate::parse_date(&end)?, today)?;
    validate::validate_range(start, end)?;
    Ok(DateRange { start, end })
}

/// Builds the series for `range`, prints a summary and hands it to `chart`.
pub async fn run(
    source: &dyn RateSource,
    chart: &dyn ChartSurface,
    from: Currency,
    to: Currency,
    range: DateRange,
) -> Result<Series> {
    let pb = ui::new_progress_bar(days_in_range(range.start, range.end), true);
    pb.set_message(format!("Fetching {from}/{to} rates"));
    let series =
        build_series_with_progress(source, from, to, range.start, range.end, &|| pb.inc(1)).await;
    pb.finish_and_clear();
    let series = series?;

    if series.skipped > 0 {
        let total = series.skipped + series.points.len();
        warn!(skipped = series.skipped, total, "Some dates had no rates");
        println!(
            "{}",
            ui::style_text(
                &format!("{} of {total} days had no rate and were skipped", series.skipped),
                ui::StyleType::Subtle
            )
        );
    }

    if series.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No exchange rates available for the selected range",
                ui::StyleType::Error
            )
        );
        return Ok(series);
    }

    display_summary(&series);

    match chart.render(&series) {
        Ok(location) => println!(
            "{} {}",
            ui::style_text("Chart saved to", ui::StyleType::TotalLabel),
            ui::style_text(&location, ui::StyleType::TotalValue)
        ),
        Err(e) => {
            error!(error = %e, "Failed to render chart");
            println!(
                "{}",
                ui::style_text(&format!("Unable to draw chart: {e}"), ui::StyleType::Error)
            );
        }
    }
    Ok(series)
}

fn display_summary(series: &Series) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Days"),
        ui::header_cell("Low"),
        ui::header_cell("High"),
        ui::header_cell("Change"),
    ]);

    if let (Some(first), Some(last), Some((low, high))) =
        (series.points.first(), series.points.last(), series.bounds())
    {
        table.add_row(vec![
            comfy_table::Cell::new(format!("{} ({:.4})", first.date, first.rate)),
            comfy_table::Cell::new(format!("{} ({:.4})", last.date, last.rate)),
            ui::number_cell(series.points.len() as f64, 0),
            ui::number_cell(low, 4),
            ui::number_cell(high, 4),
            ui::change_cell(last.rate - first.rate, series.to.code()),
        ]);
    }

    println!(
        "\n{}",
        ui::style_text(&chart_title(series), ui::StyleType::Title)
    );
    println!("{table}");
}
