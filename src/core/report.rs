//! Spending reports over a period, with CSV export.

use crate::core::currency::{RateTable, format_currency};
use crate::core::expense::{
    Expense, ExpenseCategory, category_stats, days_in_month, expenses_in_range,
};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Months included in the month-over-month comparison, current month last.
pub const MONTHLY_COMPARISON_MONTHS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ReportPeriod::Week => "week",
                ReportPeriod::Month => "month",
                ReportPeriod::Quarter => "quarter",
                ReportPeriod::Year => "year",
            }
        )
    }
}

impl FromStr for ReportPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            "quarter" => Ok(ReportPeriod::Quarter),
            "year" => Ok(ReportPeriod::Year),
            _ => Err(anyhow!("Invalid report period: {}", s)),
        }
    }
}

impl ReportPeriod {
    /// First day covered by the report when generated on `today`.
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let first_of_month = today.with_day(1).unwrap_or(today);
        match self {
            ReportPeriod::Week => today - Days::new(7),
            ReportPeriod::Month => first_of_month,
            ReportPeriod::Quarter => {
                let quarter_month = (today.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(today.year(), quarter_month, 1).unwrap_or(first_of_month)
            }
            ReportPeriod::Year => {
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(first_of_month)
            }
        }
    }

    /// Divisor for the daily average.
    pub fn period_days(&self, today: NaiveDate) -> u32 {
        match self {
            ReportPeriod::Week => 7,
            ReportPeriod::Month => days_in_month(today.year(), today.month()),
            ReportPeriod::Quarter => 90,
            ReportPeriod::Year => 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub total: f64,
    pub count: usize,
    /// Share of the report total, 0..=100.
    pub percentage: f64,
}

#[derive(Debug, Clone)]
pub struct ReportLine {
    pub expense: Expense,
    pub converted_amount: f64,
}

#[derive(Debug, Clone)]
pub struct ReportData {
    pub period: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: String,
    pub lines: Vec<ReportLine>,
    pub total_amount: f64,
    pub category_breakdown: BTreeMap<ExpenseCategory, CategoryBreakdown>,
    /// Every day of the range, zero-filled.
    pub daily_trends: BTreeMap<NaiveDate, f64>,
    /// `YYYY-MM` keys for the last six months, over all expenses.
    pub monthly_comparison: BTreeMap<String, f64>,
    period_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub total_amount: f64,
    pub expense_count: usize,
    pub daily_average: f64,
    pub average_per_expense: f64,
    pub top_category: Option<(ExpenseCategory, CategoryBreakdown)>,
}

impl ReportData {
    pub fn generate(
        expenses: &[Expense],
        rates: &RateTable,
        period: ReportPeriod,
        today: NaiveDate,
    ) -> Self {
        let start_date = period.start_date(today);
        let end_date = today;

        let in_range = expenses_in_range(expenses, start_date, end_date);
        let lines: Vec<ReportLine> = in_range
            .iter()
            .map(|e| ReportLine {
                expense: (*e).clone(),
                converted_amount: e.converted(rates),
            })
            .collect();
        let total_amount: f64 = lines.iter().map(|l| l.converted_amount).sum();

        let category_breakdown = category_stats(in_range.iter().copied(), rates)
            .into_iter()
            .map(|(category, stats)| {
                let percentage = if total_amount > 0.0 {
                    stats.total / total_amount * 100.0
                } else {
                    0.0
                };
                (
                    category,
                    CategoryBreakdown {
                        total: stats.total,
                        count: stats.count,
                        percentage,
                    },
                )
            })
            .collect();

        let mut daily_trends: BTreeMap<NaiveDate, f64> = start_date
            .iter_days()
            .take_while(|d| *d <= end_date)
            .map(|d| (d, 0.0))
            .collect();
        for line in &lines {
            *daily_trends.entry(line.expense.date).or_insert(0.0) += line.converted_amount;
        }

        ReportData {
            period,
            start_date,
            end_date,
            currency: rates.base.clone(),
            lines,
            total_amount,
            category_breakdown,
            daily_trends,
            monthly_comparison: monthly_comparison(expenses, rates, today),
            period_days: period.period_days(today),
        }
    }

    /// Categories ordered by descending total.
    pub fn categories_by_total(&self) -> Vec<(ExpenseCategory, &CategoryBreakdown)> {
        let mut categories: Vec<_> = self
            .category_breakdown
            .iter()
            .map(|(c, b)| (*c, b))
            .collect();
        categories.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
        categories
    }

    pub fn summary(&self) -> ReportSummary {
        let expense_count = self.lines.len();
        ReportSummary {
            total_amount: self.total_amount,
            expense_count,
            daily_average: self.total_amount / self.period_days as f64,
            average_per_expense: if expense_count > 0 {
                self.total_amount / expense_count as f64
            } else {
                0.0
            },
            top_category: self
                .categories_by_total()
                .first()
                .map(|(c, b)| (*c, (*b).clone())),
        }
    }

    pub fn csv_file_name(&self) -> String {
        format!(
            "expense-report-{}-{}.csv",
            self.period,
            self.start_date.format("%Y-%m-%d")
        )
    }

    /// Renders the report as a sectioned CSV document.
    pub fn to_csv(&self, generated_at: DateTime<Utc>) -> Result<String> {
        let summary = self.summary();
        let money = |amount: f64| format_currency(amount, &self.currency);

        let header = csv_section(&[
            vec!["Expense Report".to_string()],
            vec![format!("Period: {}", self.period)],
            vec![format!(
                "Date Range: {} to {}",
                self.start_date.format("%Y-%m-%d"),
                self.end_date.format("%Y-%m-%d")
            )],
            vec![format!(
                "Generated: {}",
                generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            )],
        ])?;

        let totals = csv_section(&[
            vec!["SUMMARY".to_string()],
            vec![format!("Total Amount: {}", money(summary.total_amount))],
            vec![format!("Total Expenses: {}", summary.expense_count)],
            vec![format!("Daily Average: {}", money(summary.daily_average))],
            vec![format!(
                "Average per Expense: {}",
                money(summary.average_per_expense)
            )],
        ])?;

        let mut breakdown_rows = vec![
            vec!["CATEGORY BREAKDOWN".to_string()],
            vec![
                "Category".to_string(),
                "Amount".to_string(),
                "Percentage".to_string(),
                "Count".to_string(),
            ],
        ];
        breakdown_rows.extend(self.category_breakdown.iter().map(|(category, data)| {
            vec![
                category.name().to_string(),
                format!("{:.2}", data.total),
                format!("{:.1}%", data.percentage),
                data.count.to_string(),
            ]
        }));
        let breakdown = csv_section(&breakdown_rows)?;

        let mut detail_rows = vec![
            vec!["DETAILED EXPENSES".to_string()],
            [
                "Date",
                "Item",
                "Category",
                "Original Amount",
                "Currency",
                "Converted Amount",
                "Notes",
            ]
            .map(String::from)
            .to_vec(),
        ];
        detail_rows.extend(self.lines.iter().map(|line| {
            let e = &line.expense;
            vec![
                e.date.format("%Y-%m-%d").to_string(),
                e.item.clone(),
                e.category.name().to_string(),
                e.amount.to_string(),
                e.currency.clone(),
                format!("{:.2}", line.converted_amount),
                e.notes.clone(),
            ]
        }));
        let details = csv_section(&detail_rows)?;

        Ok([header, totals, breakdown, details].join("\n"))
    }
}

fn csv_section(rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .quote_style(csv::QuoteStyle::NonNumeric)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .context("Failed to write report row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush report CSV: {}", e))?;
    String::from_utf8(bytes).context("Report CSV is not valid UTF-8")
}

/// Totals for the last [`MONTHLY_COMPARISON_MONTHS`] calendar months.
pub fn monthly_comparison(
    expenses: &[Expense],
    rates: &RateTable,
    today: NaiveDate,
) -> BTreeMap<String, f64> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let mut totals: BTreeMap<String, f64> = (0..MONTHLY_COMPARISON_MONTHS)
        .filter_map(|i| first_of_month.checked_sub_months(Months::new(i)))
        .map(|d| (d.format("%Y-%m").to_string(), 0.0))
        .collect();

    for expense in expenses {
        let key = expense.date.format("%Y-%m").to_string();
        if let Some(total) = totals.get_mut(&key) {
            *total += expense.converted(rates);
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expense::tests::{date, expense, usd_rates};

    fn sample() -> Vec<Expense> {
        let mut lunch = expense("2024-02-10", "Lunch", 17.0, "EUR", ExpenseCategory::Food);
        lunch.notes = "team, offsite".to_string();
        vec![
            lunch,
            expense("2024-02-12", "Train", 30.0, "USD", ExpenseCategory::Transport),
            expense("2024-02-13", "Groceries", 50.0, "USD", ExpenseCategory::Food),
            expense("2024-01-20", "Shoes", 80.0, "USD", ExpenseCategory::Shopping),
            expense("2023-08-01", "Old", 999.0, "USD", ExpenseCategory::Other),
        ]
    }

    #[test]
    fn test_period_start_dates() {
        let today = date("2024-05-20");
        assert_eq!(ReportPeriod::Week.start_date(today), date("2024-05-13"));
        assert_eq!(ReportPeriod::Month.start_date(today), date("2024-05-01"));
        assert_eq!(ReportPeriod::Quarter.start_date(today), date("2024-04-01"));
        assert_eq!(ReportPeriod::Year.start_date(today), date("2024-01-01"));
        assert_eq!(
            ReportPeriod::Quarter.start_date(date("2024-12-31")),
            date("2024-10-01")
        );
        assert_eq!(ReportPeriod::Month.period_days(date("2024-02-10")), 29);
    }

    #[test]
    fn test_month_report() {
        let report = ReportData::generate(
            &sample(),
            &usd_rates(),
            ReportPeriod::Month,
            date("2024-02-14"),
        );

        assert_eq!(report.lines.len(), 3);
        assert_eq!(report.total_amount, 100.0);
        let food = &report.category_breakdown[&ExpenseCategory::Food];
        assert_eq!(food.total, 70.0);
        assert_eq!(food.count, 2);
        assert!((food.percentage - 70.0).abs() < 1e-9);

        assert_eq!(report.daily_trends.len(), 14);
        assert_eq!(report.daily_trends[&date("2024-02-01")], 0.0);
        assert_eq!(report.daily_trends[&date("2024-02-10")], 20.0);

        let summary = report.summary();
        assert_eq!(summary.expense_count, 3);
        assert!((summary.daily_average - 100.0 / 29.0).abs() < 1e-9);
        assert!((summary.average_per_expense - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.top_category.unwrap().0, ExpenseCategory::Food);
    }

    #[test]
    fn test_monthly_comparison_covers_last_six_months() {
        let totals = monthly_comparison(&sample(), &usd_rates(), date("2024-02-14"));
        let keys: Vec<&str> = totals.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["2023-09", "2023-10", "2023-11", "2023-12", "2024-01", "2024-02"]
        );
        assert_eq!(totals["2024-01"], 80.0);
        assert_eq!(totals["2024-02"], 100.0);
    }

    #[test]
    fn test_empty_report() {
        let report =
            ReportData::generate(&[], &usd_rates(), ReportPeriod::Week, date("2024-02-14"));
        let summary = report.summary();
        assert_eq!(summary.total_amount, 0.0);
        assert_eq!(summary.average_per_expense, 0.0);
        assert!(summary.top_category.is_none());
        assert_eq!(report.daily_trends.len(), 8);
    }

    #[test]
    fn test_csv_export_layout() {
        let report = ReportData::generate(
            &sample(),
            &usd_rates(),
            ReportPeriod::Month,
            date("2024-02-14"),
        );
        assert_eq!(report.csv_file_name(), "expense-report-month-2024-02-01.csv");

        let generated = DateTime::parse_from_rfc3339("2024-02-14T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let csv_text = report.to_csv(generated).unwrap();
        assert!(csv_text.contains("Period: month"));
        assert!(csv_text.contains("Date Range: 2024-02-01 to 2024-02-14"));
        assert!(csv_text.contains("Total Amount: $100.00"));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        let header_index = records
            .iter()
            .position(|r| r.get(0) == Some("Date") && r.len() == 7)
            .unwrap();
        assert_eq!(
            records[header_index].iter().collect::<Vec<_>>(),
            vec![
                "Date",
                "Item",
                "Category",
                "Original Amount",
                "Currency",
                "Converted Amount",
                "Notes"
            ]
        );
        let lunch = &records[header_index + 1];
        assert_eq!(
            lunch.iter().collect::<Vec<_>>(),
            vec![
                "2024-02-10",
                "Lunch",
                "Food & Dining",
                "17",
                "EUR",
                "20.00",
                "team, offsite"
            ]
        );
        assert_eq!(records.len(), header_index + 4);

        let food_row = records
            .iter()
            .find(|r| r.get(0) == Some("Food & Dining") && r.len() == 4)
            .unwrap();
        assert_eq!(food_row.get(1), Some("70.00"));
        assert_eq!(food_row.get(2), Some("70.0%"));
        assert_eq!(food_row.get(3), Some("2"));
    }
}
