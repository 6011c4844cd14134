use super::ui;
use crate::app::ExpenseTracker;
use crate::core::expense::{Expense, ExpenseCategory, ExpenseDraft, ExpenseFilter, display_date};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use comfy_table::{Cell, CellAlignment, Color};

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseAction {
    /// List expenses, newest first
    List {
        /// Only expenses whose item or notes contain this text
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<ExpenseCategory>,
        /// Only expenses on this day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Record an expense for today
    Quick {
        item: String,
        amount: f64,
        /// Defaults to the base currency
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,
    },
    /// Record an expense with a date and notes
    Add {
        item: String,
        amount: f64,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,
        /// Defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Change fields of an existing expense
    Edit {
        id: String,
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        category: Option<ExpenseCategory>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Delete an expense
    Delete { id: String },
}

pub async fn run(
    tracker: &mut ExpenseTracker,
    action: ExpenseAction,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = dispatch(tracker, action, today, now).await;
    ui::print_notifications(tracker.drain_notifications());
    result
}

fn resolve_id(tracker: &ExpenseTracker, prefix: &str) -> Result<String> {
    let matches: Vec<&Expense> = tracker
        .expenses()
        .iter()
        .filter(|e| e.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [expense] => Ok(expense.id.clone()),
        [] => bail!("No expense with id {prefix}"),
        _ => bail!("Expense id {prefix} is ambiguous"),
    }
}

async fn dispatch(
    tracker: &mut ExpenseTracker,
    action: ExpenseAction,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        ExpenseAction::List {
            search,
            category,
            date,
        } => {
            let filter = ExpenseFilter {
                search,
                category,
                date,
            };
            let expenses = tracker.filtered(&filter);
            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!("{}", display_expenses(tracker, &expenses, today));
            }
        }
        ExpenseAction::Quick {
            item,
            amount,
            currency,
            category,
        } => {
            let currency = currency.unwrap_or_else(|| tracker.base_currency().to_string());
            tracker
                .quick_add(&item, amount, &currency.to_uppercase(), category, today, now)
                .await?;
        }
        ExpenseAction::Add {
            item,
            amount,
            currency,
            category,
            date,
            notes,
        } => {
            let currency = currency.unwrap_or_else(|| tracker.base_currency().to_string());
            let draft = ExpenseDraft {
                date: date.unwrap_or(today),
                item,
                amount,
                currency: currency.to_uppercase(),
                category,
                notes,
            };
            tracker.add_expense(draft, now).await?;
        }
        ExpenseAction::Edit {
            id,
            item,
            amount,
            currency,
            category,
            date,
            notes,
        } => {
            let id = resolve_id(tracker, &id)?;
            let existing = tracker
                .get(&id)
                .with_context(|| format!("No expense with id {id}"))?;
            let draft = ExpenseDraft {
                date: date.unwrap_or(existing.date),
                item: item.unwrap_or_else(|| existing.item.clone()),
                amount: amount.unwrap_or(existing.amount),
                currency: currency
                    .map(|c| c.to_uppercase())
                    .unwrap_or_else(|| existing.currency.clone()),
                category: category.unwrap_or(existing.category),
                notes: notes.unwrap_or_else(|| existing.notes.clone()),
            };
            tracker.update_expense(&id, draft).await?;
        }
        ExpenseAction::Delete { id } => {
            let id = resolve_id(tracker, &id)?;
            tracker.delete_expense(&id).await;
        }
    }
    Ok(())
}

pub fn display_expenses(
    tracker: &ExpenseTracker,
    expenses: &[&Expense],
    today: NaiveDate,
) -> String {
    let base = tracker.base_currency();
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Date"),
        ui::header_cell("Item"),
        ui::header_cell("Category"),
        ui::header_cell(&format!("Amount ({base})")),
        ui::header_cell("Notes"),
    ]);

    for expense in expenses {
        let short_id: String = expense.id.chars().take(8).collect();
        table.add_row(vec![
            Cell::new(short_id).fg(Color::DarkGrey),
            Cell::new(display_date(expense.date, today)),
            Cell::new(&expense.item),
            Cell::new(format!(
                "{} {}",
                expense.category.icon(),
                expense.category.name()
            )),
            Cell::new(tracker.format_amount(expense)).set_alignment(CellAlignment::Right),
            Cell::new(&expense.notes).fg(Color::DarkGrey),
        ]);
    }
    table.to_string()
}

/// Today, week and month totals, this month's categories and the most
/// recent expenses.
pub fn display_dashboard(tracker: &ExpenseTracker, today: NaiveDate) {
    let dashboard = tracker.dashboard(today);
    let currency = &dashboard.currency;

    let mut totals = ui::new_styled_table();
    totals.set_header(vec![
        ui::header_cell("Today"),
        ui::header_cell("This Week"),
        ui::header_cell("This Month"),
        ui::header_cell("Daily Average"),
    ]);
    totals.add_row(vec![
        ui::money_cell(dashboard.today_total, currency),
        ui::money_cell(dashboard.week_total, currency),
        ui::money_cell(dashboard.month_total, currency),
        ui::money_cell(dashboard.daily_average, currency),
    ]);
    println!(
        "{}\n\n{totals}",
        ui::style_text(
            &format!("Dashboard ({})", today.format("%B %Y")),
            ui::StyleType::Title
        )
    );

    if !dashboard.month_by_category.is_empty() {
        let mut categories = ui::new_styled_table();
        categories.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Expenses"),
            ui::header_cell(&format!("Total ({currency})")),
        ]);
        let mut rows: Vec<_> = dashboard.month_by_category.iter().collect();
        rows.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
        for (category, stats) in rows {
            categories.add_row(vec![
                Cell::new(format!("{} {}", category.icon(), category.name())),
                Cell::new(stats.count).set_alignment(CellAlignment::Right),
                ui::money_cell(stats.total, currency),
            ]);
        }
        println!("{categories}");
    }

    let recent: Vec<&Expense> = tracker.recent().iter().collect();
    if recent.is_empty() {
        println!("No expenses yet.");
    } else {
        ui::print_separator();
        println!("{}", ui::style_text("Recent Expenses", ui::StyleType::Title));
        println!("{}", display_expenses(tracker, &recent, today));
    }
}
