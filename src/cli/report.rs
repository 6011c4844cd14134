use super::ui;
use crate::app::ExpenseTracker;
use crate::core::report::{ReportData, ReportPeriod};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::{Cell, CellAlignment};
use std::path::{Path, PathBuf};

impl ReportData {
    pub fn display_as_table(&self) -> String {
        let currency = &self.currency;
        let summary = self.summary();

        let mut output = format!(
            "{} ({} to {})\n\n",
            ui::style_text(
                &format!("Expense Report: {}", self.period),
                ui::StyleType::Title
            ),
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        );

        let mut totals = ui::new_styled_table();
        totals.set_header(vec![
            ui::header_cell("Total"),
            ui::header_cell("Expenses"),
            ui::header_cell("Daily Average"),
            ui::header_cell("Per Expense"),
            ui::header_cell("Top Category"),
        ]);
        totals.add_row(vec![
            ui::money_cell(summary.total_amount, currency),
            Cell::new(summary.expense_count).set_alignment(CellAlignment::Right),
            ui::money_cell(summary.daily_average, currency),
            ui::money_cell(summary.average_per_expense, currency),
            summary.top_category.as_ref().map_or(Cell::new("N/A"), |(c, _)| {
                Cell::new(format!("{} {}", c.icon(), c.name()))
            }),
        ]);
        output.push_str(&totals.to_string());

        if !self.category_breakdown.is_empty() {
            let mut breakdown = ui::new_styled_table();
            breakdown.set_header(vec![
                ui::header_cell("Category"),
                ui::header_cell(&format!("Amount ({currency})")),
                ui::header_cell("Share"),
                ui::header_cell("Count"),
            ]);
            for (category, data) in self.categories_by_total() {
                breakdown.add_row(vec![
                    Cell::new(format!("{} {}", category.icon(), category.name())),
                    ui::money_cell(data.total, currency),
                    Cell::new(format!("{:.1}%", data.percentage))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(data.count).set_alignment(CellAlignment::Right),
                ]);
            }
            output.push('\n');
            output.push_str(&breakdown.to_string());
        }

        let mut monthly = ui::new_styled_table();
        monthly.set_header(vec![
            ui::header_cell("Month"),
            ui::header_cell(&format!("Spent ({currency})")),
        ]);
        for (month, total) in &self.monthly_comparison {
            monthly.add_row(vec![Cell::new(month), ui::money_cell(*total, currency)]);
        }
        output.push('\n');
        output.push_str(&monthly.to_string());

        output
    }
}

/// Where to write a report: directories get the default file name.
fn output_file(output: &Path, report: &ReportData) -> PathBuf {
    if output.is_dir() {
        output.join(report.csv_file_name())
    } else {
        output.to_path_buf()
    }
}

pub fn run(
    tracker: &mut ExpenseTracker,
    period: ReportPeriod,
    output: Option<&Path>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let report = tracker.report(period, today);
    println!("{}", report.display_as_table());

    if let Some(output) = output {
        let path = output_file(output, &report);
        let (_, csv) = tracker.export_report(period, today, now)?;
        std::fs::write(&path, csv)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Saved {}", path.display());
    }
    ui::print_notifications(tracker.drain_notifications());
    Ok(())
}
