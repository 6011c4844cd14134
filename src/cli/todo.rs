use super::ui;
use crate::app::Planner;
use crate::core::todo::{
    Priority, StatusFilter, Todo, TodoCategory, TodoDraft, TodoFilter, by_time_of_day,
    format_time, is_overdue,
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only todos whose title or description contains this text
    #[arg(short, long, default_value = "")]
    pub search: String,
    /// all, completed or pending
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<Priority>,
}

impl From<FilterArgs> for TodoFilter {
    fn from(args: FilterArgs) -> Self {
        TodoFilter {
            search: args.search,
            status: args.status,
            priority: args.priority,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TodoAction {
    /// List todos, optionally for a single day
    List {
        /// Day to show (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Create a todo
    Add {
        title: String,
        /// Due date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Time of day (HH:MM)
        #[arg(short, long)]
        time: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "personal")]
        category: TodoCategory,
        /// Repeat weekly for the next 10 weeks
        #[arg(short, long)]
        recurring: bool,
    },
    /// Change fields of an existing todo
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        time: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<TodoCategory>,
    },
    /// Toggle a todo between complete and incomplete
    Done { id: String },
    /// Move a todo to another day
    Move { id: String, date: NaiveDate },
    /// Delete a todo
    Delete { id: String },
    /// Mark every pending todo on a day complete
    CompleteDay { date: NaiveDate },
    /// Delete every completed todo
    Purge,
    /// Show totals by status, priority and category
    Stats,
    /// Merge todos from an export file
    Import { file: PathBuf },
}

pub async fn run(
    planner: &mut Planner,
    action: TodoAction,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = dispatch(planner, action, today, now).await;
    ui::print_notifications(planner.drain_notifications());
    result
}

/// Expands an id prefix, as shown by `list`, to the full id.
fn resolve_id(planner: &Planner, prefix: &str) -> Result<String> {
    let matches: Vec<&Todo> = planner
        .todos()
        .iter()
        .filter(|t| t.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [todo] => Ok(todo.id.clone()),
        [] => bail!("No todo with id {prefix}"),
        _ => bail!("Todo id {prefix} is ambiguous"),
    }
}

async fn dispatch(
    planner: &mut Planner,
    action: TodoAction,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        TodoAction::List { date, filter } => {
            planner.set_filter(filter.into());
            let todos = match date {
                Some(date) => planner.todos_for_date(date),
                None => {
                    let mut todos = planner.filtered();
                    todos.sort_by(|a, b| {
                        a.date.cmp(&b.date).then_with(|| by_time_of_day(a, b))
                    });
                    todos
                }
            };
            if todos.is_empty() {
                println!("No todos found.");
            } else {
                println!("{}", display_todos(&todos, today));
            }
        }
        TodoAction::Add {
            title,
            date,
            time,
            description,
            priority,
            category,
            recurring,
        } => {
            let draft = TodoDraft {
                title,
                description,
                date: Some(date.unwrap_or(today)),
                time,
                priority,
                category,
                recurring,
            };
            let id = planner.create_todo(draft, today, now).await?;
            println!("{}", ui::style_text(&id, ui::StyleType::Subtle));
        }
        TodoAction::Edit {
            id,
            title,
            date,
            time,
            description,
            priority,
            category,
        } => {
            let id = resolve_id(planner, &id)?;
            let existing = planner
                .get(&id)
                .with_context(|| format!("No todo with id {id}"))?;
            let draft = TodoDraft {
                title: title.unwrap_or_else(|| existing.title.clone()),
                description: description.unwrap_or_else(|| existing.description.clone()),
                date: Some(date.unwrap_or(existing.date)),
                time: time.or_else(|| existing.time.clone()),
                priority: priority.unwrap_or(existing.priority),
                category: category.unwrap_or(existing.category),
                recurring: existing.recurring,
            };
            planner.update_todo(&id, draft, today, now).await?;
        }
        TodoAction::Done { id } => {
            let id = resolve_id(planner, &id)?;
            planner.toggle_complete(&id, now).await;
        }
        TodoAction::Move { id, date } => {
            let id = resolve_id(planner, &id)?;
            planner.move_to_date(&id, date, now).await;
        }
        TodoAction::Delete { id } => {
            let id = resolve_id(planner, &id)?;
            planner.delete_todo(&id).await;
        }
        TodoAction::CompleteDay { date } => {
            if planner.mark_all_complete(date, now).await == 0 {
                println!("No pending todos on {date}.");
            }
        }
        TodoAction::Purge => {
            planner.delete_all_completed().await;
        }
        TodoAction::Stats => display_stats(planner, today),
        TodoAction::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read import file: {}", file.display()))?;
            planner.import(&raw).await?;
        }
    }
    Ok(())
}

fn priority_cell(priority: Priority) -> Cell {
    let color = match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    };
    Cell::new(priority).fg(color)
}

fn display_todos(todos: &[&Todo], today: NaiveDate) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Date"),
        ui::header_cell("Time"),
        ui::header_cell("Title"),
        ui::header_cell("Priority"),
        ui::header_cell("Category"),
        ui::header_cell("Status"),
    ]);

    for todo in todos {
        let status = if todo.completed {
            Cell::new("done").fg(Color::Green)
        } else if is_overdue(todo, today) {
            Cell::new("overdue").fg(Color::Red)
        } else {
            Cell::new("pending")
        };
        let short_id: String = todo.id.chars().take(8).collect();
        let title = if todo.recurring || todo.parent_id.is_some() {
            format!("{} ↻", todo.title)
        } else {
            todo.title.clone()
        };

        table.add_row(vec![
            Cell::new(short_id).fg(Color::DarkGrey),
            Cell::new(todo.date),
            Cell::new(todo.time.as_deref().map(format_time).unwrap_or_default()),
            Cell::new(title),
            priority_cell(todo.priority),
            Cell::new(todo.category.display_name()),
            status,
        ]);
    }
    table.to_string()
}

fn display_stats(planner: &Planner, today: NaiveDate) {
    let stats = planner.stats(today);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Status"), ui::header_cell("Count")]);
    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total)]);
    table.add_row(vec![Cell::new("Completed"), Cell::new(stats.completed)]);
    table.add_row(vec![Cell::new("Pending"), Cell::new(stats.pending)]);
    table.add_row(vec![
        Cell::new("Overdue"),
        Cell::new(stats.overdue).fg(if stats.overdue > 0 {
            Color::Red
        } else {
            Color::Reset
        }),
    ]);
    println!("{table}");

    let mut by_priority = ui::new_styled_table();
    by_priority.set_header(vec![ui::header_cell("Priority"), ui::header_cell("Count")]);
    for (priority, count) in stats.by_priority.iter().rev() {
        by_priority.add_row(vec![priority_cell(*priority), Cell::new(count)]);
    }
    println!("{by_priority}");

    let mut by_category = ui::new_styled_table();
    by_category.set_header(vec![ui::header_cell("Category"), ui::header_cell("Count")]);
    for category in TodoCategory::ALL {
        let count = stats.by_category.get(&category).copied().unwrap_or(0);
        by_category.add_row(vec![Cell::new(category.display_name()), Cell::new(count)]);
    }
    println!("{by_category}");
}
