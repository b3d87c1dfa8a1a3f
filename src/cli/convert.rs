use super::prompt::Prompt;
use super::ui;
use crate::core::convert::{Comparison, ConversionResult, compare};
use crate::core::error::ConversionError;
use crate::core::validate;
use crate::core::{Currency, RateSource};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    pub from: Currency,
    pub to: Currency,
    pub date: NaiveDate,
}

/// Asks for amount, currencies and date, stopping at the first invalid answer.
///
/// Invalid answers surface as a [`crate::core::ValidationError`] inside the
/// returned error.
pub async fn collect_request(prompt: &dyn Prompt, today: NaiveDate) -> Result<ConversionRequest> {
    let amount = validate::parse_amount(&prompt.ask("Enter the amount: ").await?)?;
    let from = validate::parse_currency(&prompt.ask("Enter the from currency (e.g., USD): ").await?)?;
    let to = validate::parse_currency(&prompt.ask("Enter the to currency (e.g., EUR): ").await?)?;
    let date = validate::parse_historical_date(
        &prompt
            .ask("Enter the date for historical exchange rates (DD-MM-YYYY) to see past values, or press Enter for today's date: ")
            .await?,
        today,
    )?;

    Ok(ConversionRequest {
        amount,
        from,
        to,
        date,
    })
}

/// Converts on the requested date and today, then prints both and the change.
pub async fn run(source: &dyn RateSource, request: &ConversionRequest) -> Comparison {
    let comparison = compare(
        source,
        request.amount,
        request.from,
        request.to,
        request.date,
    )
    .await;
    display_comparison(request, &comparison);
    comparison
}

fn display_comparison(request: &ConversionRequest, comparison: &Comparison) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("When"),
        ui::header_cell(&format!("{} {}", request.amount, request.from)),
        ui::header_cell("Rate"),
    ]);

    let rows = [
        (request.date.to_string(), &comparison.historical),
        ("Today".to_string(), &comparison.latest),
    ];
    for (label, result) in rows {
        table.add_row(result_row(label, request.to, result));
    }

    println!("{table}");

    for result in [&comparison.historical, &comparison.latest] {
        if let Err(e) = result {
            println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
        }
    }

    if let Some(change) = comparison.change() {
        let mut summary = ui::new_styled_table();
        summary.add_row(vec![
            Cell::new(ui::style_text(
                &format!("Change from {} to today", request.date),
                ui::StyleType::TotalLabel,
            )),
            ui::change_cell(change, request.to.code()),
        ]);
        println!("{summary}");
    }
}

fn result_row(
    label: String,
    to: Currency,
    result: &Result<ConversionResult, ConversionError>,
) -> Vec<Cell> {
    match result {
        Ok(conversion) => vec![
            Cell::new(label),
            Cell::new(format!("{:.2} {}", conversion.converted, to))
                .set_alignment(comfy_table::CellAlignment::Right),
            ui::number_cell(conversion.rate, 4),
        ],
        Err(_) => vec![Cell::new(label), ui::na_cell(true), ui::na_cell(true)],
    }
}
