use super::ui;
use crate::app::ExpenseTracker;
use crate::core::RateStatus;
use crate::core::currency::{SUPPORTED_CURRENCIES, currency_info, currency_symbol, format_currency};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, CellAlignment};

/// Refreshes rates behind a spinner.
pub async fn refresh(
    tracker: &mut ExpenseTracker,
    now: DateTime<Utc>,
    force: bool,
) -> Option<RateStatus> {
    let pb = ui::new_spinner("Updating exchange rates...");
    let status = if force {
        Some(tracker.refresh_rates(now).await)
    } else {
        tracker.init_rates(now).await
    };
    pb.finish_and_clear();
    status
}

pub fn display_rates(tracker: &ExpenseTracker) -> String {
    let rates = tracker.rates();
    let base = &rates.base;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Name"),
        ui::header_cell(&format!("Per 1 {base}")),
        ui::header_cell(&format!("In {base}")),
    ]);
    for code in SUPPORTED_CURRENCIES.iter().filter(|c| **c != base.as_str()) {
        let rate = rates.rates.get(*code).copied();
        table.add_row(vec![
            Cell::new(format!("{} {}", code, currency_symbol(code))),
            Cell::new(currency_info(code).map_or("Unknown", |i| i.name)),
            ui::format_optional_cell(rate, |r| format!("{r:.4}")),
            ui::format_optional_cell(rate, |r| format!("{:.4}", 1.0 / r)),
        ]);
    }

    let updated = match tracker.currency().last_update() {
        Some(at) => format!("Last updated {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Approximate rates, not fetched".to_string(),
    };
    format!(
        "{}\n\n{table}\n{}",
        ui::style_text(&format!("Exchange rates ({base})"), ui::StyleType::Title),
        ui::style_text(&updated, ui::StyleType::Subtle)
    )
}

pub fn display_conversion(tracker: &ExpenseTracker, amount: f64, from: &str, to: &str) -> String {
    let converted = tracker.convert(amount, from, to);
    let rate = tracker.currency().exchange_rate(from, to);
    format!(
        "{} = {}\n{}",
        format_currency(amount, from),
        ui::style_text(&format_currency(converted, to), ui::StyleType::TotalValue),
        ui::style_text(&format!("1 {from} = {rate:.4} {to}"), ui::StyleType::Subtle)
    )
}

/// Shows or changes the base currency.
pub async fn base_currency(
    tracker: &mut ExpenseTracker,
    code: Option<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(code) = code else {
        let current = tracker.base_currency().to_string();
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Code"),
            ui::header_cell("Symbol"),
            ui::header_cell("Name"),
            ui::header_cell("Country"),
        ]);
        for code in SUPPORTED_CURRENCIES {
            let info = currency_info(code);
            let marker = if code == current { " *" } else { "" };
            table.add_row(vec![
                Cell::new(format!("{code}{marker}")),
                Cell::new(currency_symbol(code)).set_alignment(CellAlignment::Center),
                Cell::new(info.map_or("Unknown", |i| i.name)),
                Cell::new(info.map_or("Unknown", |i| i.country)),
            ]);
        }
        println!(
            "Base currency: {}\n\n{table}",
            ui::style_text(&current, ui::StyleType::TotalLabel)
        );
        return Ok(());
    };

    let pb = ui::new_spinner("Updating exchange rates...");
    let result = tracker.update_base_currency(&code, now).await;
    pb.finish_and_clear();
    ui::print_notifications(tracker.drain_notifications());
    result?;
    println!("Base currency: {}", tracker.base_currency());
    Ok(())
}
