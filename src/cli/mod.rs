pub mod convert;
pub mod plot;
pub mod prompt;
pub mod setup;
pub mod ui;

use crate::core::{RateSource, ValidationError};
use anyhow::Result;
use chrono::NaiveDate;
use plot::ChartSurface;
use prompt::Prompt;

/// Runs one pass of the interactive flow: convert an amount, then plot a range.
///
/// Invalid input ends the flow with a message and `Ok(())`; only prompt I/O
/// failures are returned as errors.
pub async fn run_session(
    source: &dyn RateSource,
    prompt: &dyn Prompt,
    chart: &dyn ChartSurface,
    today: NaiveDate,
) -> Result<()> {
    println!(
        "{}",
        ui::style_text("Welcome to the Currency Converter!", ui::StyleType::Title)
    );

    let Some(request) = report_invalid(convert::collect_request(prompt, today).await)? else {
        return Ok(());
    };
    convert::run(source, &request).await;

    ui::print_separator();

    let Some(range) = report_invalid(plot::collect_range(prompt, today).await)? else {
        return Ok(());
    };
    report_invalid(plot::run(source, chart, request.from, request.to, range).await)?;
    Ok(())
}

/// Prints validation failures and turns them into `None`.
fn report_invalid<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match e.downcast_ref::<ValidationError>() {
            Some(invalid) => {
                println!(
                    "{}",
                    ui::style_text(&invalid.to_string(), ui::StyleType::Error)
                );
                Ok(None)
            }
            None => Err(e),
        },
    }
}
