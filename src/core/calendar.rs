//! Month grid layout plus the todo and spending overlays drawn on it.

use crate::core::currency::RateTable;
use crate::core::expense::{Expense, convert_and_sum};
use crate::core::todo::{Priority, Todo};
use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};

/// 6 rows of 7 days, so the grid height never changes between months.
pub const GRID_CELLS: usize = 42;
/// Dots drawn per day before collapsing the rest into a `+N` marker.
pub const MAX_VISIBLE_DOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    /// True for the trailing/leading days of the neighbouring months.
    pub other_month: bool,
    pub is_today: bool,
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    /// Lays out `month` of `year` starting on the Sunday on or before the
    /// first of the month.
    pub fn new(year: i32, month: u32, today: NaiveDate) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Invalid calendar month: {year}-{month}"))?;
        let start = first - Days::new(first.weekday().num_days_from_sunday() as u64);

        let cells = start
            .iter_days()
            .take(GRID_CELLS)
            .map(|date| CalendarCell {
                date,
                day: date.day(),
                other_month: date.month() != month || date.year() != year,
                is_today: date == today,
            })
            .collect();

        Ok(MonthGrid { year, month, cells })
    }

    /// "February 2024"
    pub fn title(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }

    /// The grid split into weeks, Sunday first.
    pub fn rows(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn current_month_cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.cells.iter().filter(|c| !c.other_month)
    }
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDot {
    pub title: String,
    pub priority: Priority,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct TodoDay {
    pub cell: CalendarCell,
    pub dots: Vec<TodoDot>,
    /// Todos on this day beyond [`MAX_VISIBLE_DOTS`].
    pub more: usize,
}

/// Attaches todo indicators to every cell of the grid.
pub fn todo_overlay(grid: &MonthGrid, todos: &[&Todo]) -> Vec<TodoDay> {
    grid.cells
        .iter()
        .map(|cell| {
            let on_day: Vec<&&Todo> = todos.iter().filter(|t| t.date == cell.date).collect();
            let dots = on_day
                .iter()
                .take(MAX_VISIBLE_DOTS)
                .map(|t| TodoDot {
                    title: t.title.clone(),
                    priority: t.priority,
                    completed: t.completed,
                })
                .collect();
            TodoDay {
                cell: cell.clone(),
                dots,
                more: on_day.len().saturating_sub(MAX_VISIBLE_DOTS),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendingLevel {
    None,
    Low,
    Medium,
    High,
}

impl SpendingLevel {
    pub fn from_amount(amount: f64) -> Self {
        if amount == 0.0 {
            SpendingLevel::None
        } else if amount < 50.0 {
            SpendingLevel::Low
        } else if amount < 200.0 {
            SpendingLevel::Medium
        } else {
            SpendingLevel::High
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpendingDay {
    pub cell: CalendarCell,
    pub total: f64,
    pub count: usize,
    pub level: SpendingLevel,
}

/// Per-day spending for the days of the grid's own month, in base currency.
pub fn spending_overlay(
    grid: &MonthGrid,
    expenses: &[Expense],
    rates: &RateTable,
) -> Vec<SpendingDay> {
    grid.current_month_cells()
        .map(|cell| {
            let on_day: Vec<&Expense> = expenses.iter().filter(|e| e.date == cell.date).collect();
            let total = convert_and_sum(on_day.iter().copied(), rates);
            SpendingDay {
                cell: cell.clone(),
                total,
                count: on_day.len(),
                level: SpendingLevel::from_amount(total),
            }
        })
        .collect()
}
