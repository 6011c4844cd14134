//! Expense records, filtering and the dashboard view model.

use crate::core::currency::{RateTable, is_supported};
use crate::core::error::ValidationError;
use crate::core::settings::Settings;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Number of entries shown in the "recent expenses" list.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Health,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Food,
        ExpenseCategory::Transport,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Shopping,
        ExpenseCategory::Bills,
        ExpenseCategory::Health,
        ExpenseCategory::Other,
    ];

    /// Returns display name and emoji for the category
    pub fn display_info(&self) -> (&'static str, &'static str) {
        match self {
            ExpenseCategory::Food => ("Food & Dining", "🍽️"),
            ExpenseCategory::Transport => ("Transport", "🚗"),
            ExpenseCategory::Entertainment => ("Entertainment", "🎬"),
            ExpenseCategory::Shopping => ("Shopping", "🛒"),
            ExpenseCategory::Bills => ("Bills & Utilities", "📄"),
            ExpenseCategory::Health => ("Healthcare", "🏥"),
            ExpenseCategory::Other => ("Other", "📋"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.display_info().0
    }

    pub fn icon(&self) -> &'static str {
        self.display_info().1
    }
}

impl Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self {
            ExpenseCategory::Food => "food",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Bills => "bills",
            ExpenseCategory::Health => "health",
            ExpenseCategory::Other => "other",
        };
        write!(f, "{key}")
    }
}

impl FromStr for ExpenseCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Invalid expense category: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub date: NaiveDate,
    pub item: String,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl Expense {
    /// Amount expressed in the table's base currency.
    pub fn converted(&self, rates: &RateTable) -> f64 {
        rates.convert(self.amount, &self.currency, &rates.base)
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    pub date: NaiveDate,
    pub item: String,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub notes: String,
}

impl ExpenseDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.item.trim().is_empty() {
            return Err(ValidationError::MissingItem);
        }
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(ValidationError::InvalidAmount);
        }
        if !is_supported(&self.currency) {
            return Err(ValidationError::UnsupportedCurrency(self.currency.clone()));
        }
        Ok(())
    }

    pub fn into_expense(self, id: Option<String>, timestamp: DateTime<Utc>) -> Expense {
        Expense {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            date: self.date,
            item: self.item.trim().to_string(),
            amount: self.amount,
            currency: self.currency,
            category: self.category,
            notes: self.notes.trim().to_string(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Case-insensitive substring matched against item and notes.
    pub search: String,
    pub category: Option<ExpenseCategory>,
    pub date: Option<NaiveDate>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        let term = self.search.trim().to_lowercase();
        if !term.is_empty()
            && !expense.item.to_lowercase().contains(&term)
            && !expense.notes.to_lowercase().contains(&term)
        {
            return false;
        }
        self.category.is_none_or(|c| expense.category == c)
            && self.date.is_none_or(|d| expense.date == d)
    }

    pub fn apply<'a>(&self, expenses: &'a [Expense]) -> Vec<&'a Expense> {
        expenses.iter().filter(|e| self.matches(e)).collect()
    }
}

pub fn expenses_in_range(expenses: &[Expense], start: NaiveDate, end: NaiveDate) -> Vec<&Expense> {
    expenses
        .iter()
        .filter(|e| e.date >= start && e.date <= end)
        .collect()
}

/// Sum of the expenses in the table's base currency.
pub fn convert_and_sum<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    rates: &RateTable,
) -> f64 {
    expenses.into_iter().map(|e| e.converted(rates)).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub total: f64,
    pub count: usize,
}

pub fn category_stats<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    rates: &RateTable,
) -> BTreeMap<ExpenseCategory, CategoryStats> {
    let mut stats: BTreeMap<ExpenseCategory, CategoryStats> = BTreeMap::new();
    for expense in expenses {
        let entry = stats.entry(expense.category).or_insert(CategoryStats {
            total: 0.0,
            count: 0,
        });
        entry.total += expense.converted(rates);
        entry.count += 1;
    }
    stats
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_sunday() as u64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub today_total: f64,
    pub week_total: f64,
    pub month_total: f64,
    pub daily_average: f64,
    pub month_by_category: BTreeMap<ExpenseCategory, CategoryStats>,
    pub currency: String,
}

pub fn dashboard(expenses: &[Expense], rates: &RateTable, today: NaiveDate) -> Dashboard {
    let today_expenses = expenses.iter().filter(|e| e.date == today);
    let week_expenses = expenses_in_range(expenses, week_start(today), today);
    let month_expenses: Vec<&Expense> = expenses
        .iter()
        .filter(|e| e.date.year() == today.year() && e.date.month() == today.month())
        .collect();

    let month_total = convert_and_sum(month_expenses.iter().copied(), rates);
    Dashboard {
        today_total: convert_and_sum(today_expenses, rates),
        week_total: convert_and_sum(week_expenses, rates),
        month_total,
        daily_average: month_total / days_in_month(today.year(), today.month()) as f64,
        month_by_category: category_stats(month_expenses, rates),
        currency: rates.base.clone(),
    }
}

/// Short relative date label used in expense lists.
pub fn display_date(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else if date.year() == today.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseExport {
    pub expenses: Vec<Expense>,
    pub settings: Settings,
    pub export_date: DateTime<Utc>,
}

pub fn export_expenses(
    expenses: &[Expense],
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<String> {
    let export = ExpenseExport {
        expenses: expenses.to_vec(),
        settings: settings.clone(),
        export_date: now,
    };
    serde_json::to_string_pretty(&export).context("Failed to serialize expenses for export")
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("expense-tracker-{}.json", today.format("%Y-%m-%d"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub(crate) fn expense(
        on: &str,
        item: &str,
        amount: f64,
        currency: &str,
        category: ExpenseCategory,
    ) -> Expense {
        ExpenseDraft {
            date: date(on),
            item: item.to_string(),
            amount,
            currency: currency.to_string(),
            category,
            notes: String::new(),
        }
        .into_expense(None, Utc::now())
    }

    pub(crate) fn usd_rates() -> RateTable {
        RateTable::new("USD", HashMap::from([("EUR".to_string(), 0.85)]))
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = ExpenseDraft {
            date: date("2024-02-01"),
            item: "Coffee".to_string(),
            amount: 3.5,
            currency: "EUR".to_string(),
            category: ExpenseCategory::Food,
            notes: String::new(),
        };
        assert!(draft.validate().is_ok());

        draft.amount = 0.0;
        assert_eq!(draft.validate(), Err(ValidationError::InvalidAmount));

        draft.amount = 3.5;
        draft.item = " ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::MissingItem));

        draft.item = "Coffee".to_string();
        draft.currency = "BTC".to_string();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::UnsupportedCurrency("BTC".to_string()))
        );
    }

    #[test]
    fn test_filter() {
        let mut lunch = expense("2024-02-10", "Lunch", 12.0, "USD", ExpenseCategory::Food);
        lunch.notes = "with the team".to_string();
        let taxi = expense("2024-02-11", "Taxi", 20.0, "USD", ExpenseCategory::Transport);
        let expenses = vec![lunch, taxi];

        let by_notes = ExpenseFilter {
            search: "TEAM".to_string(),
            ..Default::default()
        };
        assert_eq!(by_notes.apply(&expenses)[0].item, "Lunch");

        let by_category = ExpenseFilter {
            category: Some(ExpenseCategory::Transport),
            ..Default::default()
        };
        assert_eq!(by_category.apply(&expenses)[0].item, "Taxi");

        let by_date = ExpenseFilter {
            date: Some(date("2024-02-12")),
            ..Default::default()
        };
        assert!(by_date.apply(&expenses).is_empty());
    }

    #[test]
    fn test_dashboard_totals_in_base_currency() {
        let rates = usd_rates();
        // Wednesday 2024-02-14; week starts Sunday 2024-02-11
        let today = date("2024-02-14");
        let expenses = vec![
            expense("2024-02-14", "Lunch", 17.0, "EUR", ExpenseCategory::Food),
            expense("2024-02-12", "Bus", 5.0, "USD", ExpenseCategory::Transport),
            expense("2024-02-03", "Cinema", 29.0, "USD", ExpenseCategory::Entertainment),
            expense("2024-01-31", "Rent", 1000.0, "USD", ExpenseCategory::Bills),
        ];

        let summary = dashboard(&expenses, &rates, today);
        assert_eq!(summary.today_total, 20.0);
        assert_eq!(summary.week_total, 25.0);
        assert_eq!(summary.month_total, 54.0);
        assert!((summary.daily_average - 54.0 / 29.0).abs() < 1e-9);
        assert_eq!(summary.month_by_category.len(), 3);
        assert_eq!(summary.month_by_category[&ExpenseCategory::Food].count, 1);
        assert_eq!(summary.currency, "USD");
    }

    #[test]
    fn test_week_start_and_days_in_month() {
        assert_eq!(week_start(date("2024-02-14")), date("2024-02-11"));
        assert_eq!(week_start(date("2024-02-11")), date("2024-02-11"));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_display_date() {
        let today = date("2024-02-14");
        assert_eq!(display_date(today, today), "Today");
        assert_eq!(display_date(date("2024-02-13"), today), "Yesterday");
        assert_eq!(display_date(date("2024-01-05"), today), "Jan 5");
        assert_eq!(display_date(date("2023-12-25"), today), "Dec 25, 2023");
    }

    #[test]
    fn test_category_parse_and_names() {
        assert_eq!(
            "bills".parse::<ExpenseCategory>().unwrap(),
            ExpenseCategory::Bills
        );
        assert_eq!(ExpenseCategory::Bills.name(), "Bills & Utilities");
        assert!("rent".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_expense_json_shape() {
        let json = r#"{"id":"1700000000000","date":"2024-02-10","item":"Noodles",
            "amount":120,"currency":"THB","category":"food","notes":"",
            "timestamp":"2024-02-10T12:00:00.000Z"}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.amount, 120.0);
        assert_eq!(expense.category, ExpenseCategory::Food);
    }
}
