//! Todo records and the pure operations over them: validation, recurrence,
//! filtering, statistics and import/export.

use crate::core::error::{ImportError, ValidationError};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Number of follow-on todos created for a recurring todo.
pub const RECURRING_COUNT: u64 = 10;
/// Days between two occurrences of a recurring todo.
pub const RECURRING_INTERVAL_DAYS: u64 = 7;
pub const EXPORT_VERSION: &str = "1.0";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Priority::Low => "low",
                Priority::Medium => "medium",
                Priority::High => "high",
            }
        )
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(anyhow!("Invalid priority: {}", s)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TodoCategory {
    Work,
    #[default]
    Personal,
    Health,
    Shopping,
    Other,
}

impl TodoCategory {
    pub const ALL: [TodoCategory; 5] = [
        TodoCategory::Work,
        TodoCategory::Personal,
        TodoCategory::Health,
        TodoCategory::Shopping,
        TodoCategory::Other,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            TodoCategory::Work => "Work",
            TodoCategory::Personal => "Personal",
            TodoCategory::Health => "Health",
            TodoCategory::Shopping => "Shopping",
            TodoCategory::Other => "Other",
        }
    }
}

impl FromStr for TodoCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoCategory::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Invalid todo category: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    /// Wall-clock time as `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: TodoCategory,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Todo {
    /// The parsed time of day; `None` for untimed todos or unreadable times.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        self.time.as_deref().and_then(parse_time)
    }
}

/// Parses a 24-hour `HH:MM` time. Single-digit hours are accepted.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Orders timed todos first, earliest first.
pub fn by_time_of_day(a: &Todo, b: &Todo) -> std::cmp::Ordering {
    match (a.time_of_day(), b.time_of_day()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// User input for creating or editing a todo, before validation.
#[derive(Debug, Clone, Default)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub priority: Priority,
    pub category: TodoCategory,
    pub recurring: bool,
}

impl TodoDraft {
    /// Checks the draft and returns its date. Past dates are only accepted
    /// when editing an existing todo.
    pub fn validate(&self, today: NaiveDate, editing: bool) -> Result<NaiveDate, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let date = self.date.ok_or(ValidationError::MissingDate)?;
        if date < today && !editing {
            return Err(ValidationError::PastDate);
        }
        if let Some(time) = self.entered_time()
            && parse_time(time).is_none()
        {
            return Err(ValidationError::InvalidTime(time.to_string()));
        }
        Ok(date)
    }

    fn entered_time(&self) -> Option<&str> {
        self.time.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// The entered time as zero-padded `HH:MM`.
    fn normalized_time(&self) -> Option<String> {
        self.entered_time()
            .and_then(parse_time)
            .map(|t| t.format("%H:%M").to_string())
    }

    /// Builds a new, incomplete todo from a validated draft.
    pub fn into_todo(self, date: NaiveDate, now: DateTime<Utc>) -> Todo {
        let time = self.normalized_time();
        Todo {
            id: Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            date,
            time,
            priority: self.priority,
            category: self.category,
            recurring: self.recurring,
            completed: false,
            created_at: now,
            updated_at: now,
            parent_id: None,
        }
    }

    /// Overwrites the editable fields of `todo`, keeping identity,
    /// completion and creation time.
    pub fn apply_to(self, todo: &mut Todo, date: NaiveDate, now: DateTime<Utc>) {
        todo.time = self.normalized_time();
        todo.title = self.title.trim().to_string();
        todo.description = self.description.trim().to_string();
        todo.date = date;
        todo.priority = self.priority;
        todo.category = self.category;
        todo.recurring = self.recurring;
        todo.updated_at = now;
    }
}

/// Weekly follow-ons of `original`. Each copy is non-recurring so the chain
/// stops after one generation.
pub fn generate_recurring(original: &Todo, now: DateTime<Utc>) -> Vec<Todo> {
    (1..=RECURRING_COUNT)
        .filter_map(|week| {
            let date = original
                .date
                .checked_add_days(Days::new(RECURRING_INTERVAL_DAYS * week))?;
            Some(Todo {
                id: Uuid::new_v4().to_string(),
                date,
                recurring: false,
                parent_id: Some(original.id.clone()),
                created_at: now,
                updated_at: now,
                ..original.clone()
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            _ => Err(anyhow!("Invalid status filter: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TodoFilter {
    /// Case-insensitive substring matched against title and description.
    pub search: String,
    pub status: StatusFilter,
    /// `None` matches every priority.
    pub priority: Option<Priority>,
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        let term = self.search.trim().to_lowercase();
        if !term.is_empty()
            && !todo.title.to_lowercase().contains(&term)
            && !todo.description.to_lowercase().contains(&term)
        {
            return false;
        }

        match self.status {
            StatusFilter::Completed if !todo.completed => return false,
            StatusFilter::Pending if todo.completed => return false,
            _ => {}
        }

        self.priority.is_none_or(|p| todo.priority == p)
    }

    pub fn apply<'a>(&self, todos: &'a [Todo]) -> Vec<&'a Todo> {
        todos.iter().filter(|t| self.matches(t)).collect()
    }
}

pub fn is_overdue(todo: &Todo, today: NaiveDate) -> bool {
    !todo.completed && todo.date < today
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_category: BTreeMap<TodoCategory, usize>,
}

pub fn todo_stats(todos: &[Todo], today: NaiveDate) -> TodoStats {
    let mut by_priority: BTreeMap<Priority, usize> =
        [Priority::High, Priority::Medium, Priority::Low]
            .into_iter()
            .map(|p| (p, 0))
            .collect();
    let mut by_category: BTreeMap<TodoCategory, usize> =
        TodoCategory::ALL.into_iter().map(|c| (c, 0)).collect();

    for todo in todos {
        *by_priority.entry(todo.priority).or_insert(0) += 1;
        *by_category.entry(todo.category).or_insert(0) += 1;
    }

    let completed = todos.iter().filter(|t| t.completed).count();
    TodoStats {
        total: todos.len(),
        completed,
        pending: todos.len() - completed,
        overdue: todos.iter().filter(|t| is_overdue(t, today)).count(),
        by_priority,
        by_category,
    }
}

/// Formats `HH:MM` as a 12-hour clock time, e.g. `14:05` -> `2:05 PM`.
pub fn format_time(time: &str) -> String {
    let Some((hours, minutes)) = time.split_once(':') else {
        return time.to_string();
    };
    let Ok(hours) = hours.parse::<u32>() else {
        return time.to_string();
    };
    let hour12 = match hours % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hours >= 12 { "PM" } else { "AM" };
    format!("{hour12}:{minutes} {meridiem}")
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoExport {
    pub todos: Vec<Todo>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

pub fn export_todos(todos: &[Todo], now: DateTime<Utc>) -> Result<String> {
    let export = TodoExport {
        todos: todos.to_vec(),
        export_date: now,
        version: EXPORT_VERSION.to_string(),
    };
    serde_json::to_string_pretty(&export).context("Failed to serialize todos for export")
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("calender-todos-{}.json", today.format("%Y-%m-%d"))
}

/// Parses an export file. Either every todo parses or none is returned.
pub fn parse_import(raw: &str) -> Result<Vec<Todo>, ImportError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let todos = value
        .get("todos")
        .filter(|todos| todos.is_array())
        .ok_or(ImportError::InvalidFormat)?;
    Ok(Vec::<Todo>::deserialize(todos)?)
}

/// Appends the incoming todos whose ids are not already present and
/// returns how many were added.
pub fn merge_imported(existing: &mut Vec<Todo>, incoming: Vec<Todo>) -> usize {
    let known: HashSet<String> = existing.iter().map(|t| t.id.clone()).collect();
    let before = existing.len();
    existing.extend(incoming.into_iter().filter(|t| !known.contains(&t.id)));
    existing.len() - before
}
