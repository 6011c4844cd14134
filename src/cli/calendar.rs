use super::ui;
use crate::core::calendar::{
    CalendarCell, MonthGrid, SpendingDay, SpendingLevel, TodoDay, next_month, previous_month,
};
use crate::core::currency::format_currency;
use crate::core::todo::Priority;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::Args;
use comfy_table::{Attribute, Cell, Color};

#[derive(Args, Debug, Clone, Default)]
pub struct CalendarArgs {
    /// Month to show (YYYY-MM), defaults to the current month
    #[arg(short, long)]
    pub month: Option<String>,
    /// Show the month before the selected one
    #[arg(long, conflicts_with = "next")]
    pub prev: bool,
    /// Show the month after the selected one
    #[arg(long)]
    pub next: bool,
    /// Show daily spending instead of todos
    #[arg(short, long)]
    pub spending: bool,
}

impl CalendarArgs {
    /// The year and month to display.
    pub fn resolve(&self, today: NaiveDate) -> Result<(i32, u32)> {
        let (year, month) = match &self.month {
            Some(raw) => parse_month(raw)?,
            None => (today.year(), today.month()),
        };
        Ok(if self.prev {
            previous_month(year, month)
        } else if self.next {
            next_month(year, month)
        } else {
            (year, month)
        })
    }
}

fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month {raw}, expected YYYY-MM"))?;
    Ok((first.year(), first.month()))
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn day_cell(cell: &CalendarCell, body: &str) -> Cell {
    let text = if body.is_empty() {
        cell.day.to_string()
    } else {
        format!("{}\n{}", cell.day, body)
    };
    let mut styled = Cell::new(text);
    if cell.other_month {
        styled = styled.fg(Color::DarkGrey);
    }
    if cell.is_today {
        styled = styled.add_attribute(Attribute::Bold).fg(Color::Cyan);
    }
    styled
}

fn render(grid: &MonthGrid, cell: impl Fn(&CalendarCell) -> Cell) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(WEEKDAYS.iter().map(|d| ui::header_cell(d)).collect::<Vec<_>>());
    for row in grid.rows() {
        table.add_row(row.iter().map(&cell).collect::<Vec<_>>());
    }
    format!(
        "{}\n\n{table}",
        ui::style_text(&grid.title(), ui::StyleType::Title)
    )
}

fn dot(priority: Priority, completed: bool) -> char {
    if completed {
        return '✓';
    }
    match priority {
        Priority::High => '●',
        Priority::Medium => '◐',
        Priority::Low => '○',
    }
}

pub fn display_todo_month(grid: &MonthGrid, days: &[TodoDay]) -> String {
    let table = render(grid, |cell| {
        let Some(day) = days.iter().find(|d| d.cell.date == cell.date) else {
            return day_cell(cell, "");
        };
        let mut body: String = day.dots.iter().map(|d| dot(d.priority, d.completed)).collect();
        if day.more > 0 {
            body.push_str(&format!(" +{}", day.more));
        }
        day_cell(cell, &body)
    });

    format!(
        "{}\n{}",
        table,
        ui::style_text("● high  ◐ medium  ○ low  ✓ done", ui::StyleType::Subtle)
    )
}

pub fn display_spending_month(grid: &MonthGrid, days: &[SpendingDay], currency: &str) -> String {
    let table = render(grid, |cell| {
        match days.iter().find(|d| d.cell.date == cell.date) {
            Some(day) if day.level != SpendingLevel::None => {
                let color = match day.level {
                    SpendingLevel::Low => Color::Green,
                    SpendingLevel::Medium => Color::Yellow,
                    _ => Color::Red,
                };
                day_cell(cell, &format_currency(day.total, currency)).fg(color)
            }
            _ => day_cell(cell, ""),
        }
    });

    let total: f64 = days.iter().map(|d| d.total).sum();
    format!(
        "{}\n{}",
        table,
        ui::total_line("Month total", total, currency)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_resolve_month() {
        let today = date("2024-02-14");
        let args = CalendarArgs::default();
        assert_eq!(args.resolve(today).unwrap(), (2024, 2));

        let args = CalendarArgs {
            month: Some("2023-12".to_string()),
            next: true,
            ..Default::default()
        };
        assert_eq!(args.resolve(today).unwrap(), (2024, 1));

        let args = CalendarArgs {
            prev: true,
            ..Default::default()
        };
        assert_eq!(args.resolve(date("2024-01-10")).unwrap(), (2023, 12));

        let args = CalendarArgs {
            month: Some("2024-13".to_string()),
            ..Default::default()
        };
        assert!(args.resolve(today).is_err());
    }

    #[test]
    fn test_todo_month_renders_six_weeks() {
        let grid = MonthGrid::new(2024, 2, date("2024-02-14")).unwrap();
        let days = crate::core::calendar::todo_overlay(&grid, &[]);
        let output = display_todo_month(&grid, &days);
        assert!(output.contains("February 2024"));
        assert!(output.contains("Sun"));
        assert!(output.contains("29"));
        assert_eq!(output.matches("Sun").count(), 1);
    }

    #[test]
    fn test_todo_month_marks_busy_days() {
        use crate::core::todo::TodoDraft;
        use chrono::Utc;

        let grid = MonthGrid::new(2024, 2, date("2024-02-01")).unwrap();
        let todos: Vec<_> = (0..4)
            .map(|i| {
                TodoDraft {
                    title: format!("Task {i}"),
                    priority: Priority::High,
                    ..Default::default()
                }
                .into_todo(date("2024-02-14"), Utc::now())
            })
            .collect();
        let refs: Vec<_> = todos.iter().collect();
        let days = crate::core::calendar::todo_overlay(&grid, &refs);

        let output = display_todo_month(&grid, &days);
        assert!(output.contains("●●● +1"));
    }

    #[test]
    fn test_spending_month_shows_daily_totals() {
        let grid = MonthGrid::new(2024, 2, date("2024-02-01")).unwrap();
        let days = vec![SpendingDay {
            cell: grid.current_month_cells().next().unwrap().clone(),
            total: 42.5,
            count: 1,
            level: SpendingLevel::Low,
        }];

        let output = display_spending_month(&grid, &days, "USD");
        assert!(output.contains("February 2024"));
        assert!(output.contains("$42.50"));
    }
}
