//! The calendar planner: owns the todo list, the active filter and the
//! storage it persists to.

use crate::core::calendar::{MonthGrid, TodoDay, todo_overlay};
use crate::core::error::{ImportError, ValidationError};
use crate::core::notification::{Notification, Notifications};
use crate::core::storage::{Storage, TODOS_KEY, read_json, write_json};
use crate::core::todo::{
    Todo, TodoDraft, TodoFilter, TodoStats, by_time_of_day, export_todos, generate_recurring,
    merge_imported, parse_import, todo_stats,
};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct Planner {
    storage: Arc<dyn Storage>,
    todos: Vec<Todo>,
    filter: TodoFilter,
    notifications: Notifications,
}

impl Planner {
    /// Restores the todo list. A missing or unreadable list starts empty.
    pub async fn load(storage: Arc<dyn Storage>) -> Self {
        let todos = match read_json::<Vec<Todo>>(storage.as_ref(), TODOS_KEY).await {
            Ok(todos) => todos.unwrap_or_default(),
            Err(e) => {
                error!("Error loading todos: {e:#}");
                Vec::new()
            }
        };
        debug!("Loaded {} todos", todos.len());

        Planner {
            storage,
            todos,
            filter: TodoFilter::default(),
            notifications: Notifications::default(),
        }
    }

    async fn save(&mut self) {
        if let Err(e) = write_json(self.storage.as_ref(), TODOS_KEY, &self.todos).await {
            error!("Error saving todos: {e:#}");
            self.notifications.push(Notification::error("Error saving todos"));
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TodoFilter) {
        self.filter = filter;
    }

    /// Todos passing the active filter, in insertion order.
    pub fn filtered(&self) -> Vec<&Todo> {
        self.filter.apply(&self.todos)
    }

    /// Filtered todos on `date`, timed ones first in time order.
    pub fn todos_for_date(&self, date: NaiveDate) -> Vec<&Todo> {
        let mut todos: Vec<&Todo> = self
            .filtered()
            .into_iter()
            .filter(|t| t.date == date)
            .collect();
        todos.sort_by(|a, b| by_time_of_day(a, b));
        todos
    }

    /// Validates and stores a new todo, plus its weekly follow-ons when it
    /// recurs. Returns the new todo's id.
    pub async fn create_todo(
        &mut self,
        draft: TodoDraft,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        let date = self.validate(&draft, today, false)?;
        let todo = draft.into_todo(date, now);
        let id = todo.id.clone();

        let follow_ons = if todo.recurring {
            generate_recurring(&todo, now)
        } else {
            Vec::new()
        };
        info!(
            "Created todo {} with {} recurring copies",
            id,
            follow_ons.len()
        );
        self.todos.push(todo);
        self.todos.extend(follow_ons);
        self.save().await;

        self.notifications
            .push(Notification::success("Todo created successfully!"));
        Ok(id)
    }

    /// Replaces the editable fields of an existing todo. Returns `false`
    /// when no todo has `id`.
    pub async fn update_todo(
        &mut self,
        id: &str,
        draft: TodoDraft,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        let date = self.validate(&draft, today, true)?;
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        draft.apply_to(todo, date, now);
        self.save().await;

        self.notifications
            .push(Notification::success("Todo updated successfully!"));
        Ok(true)
    }

    fn validate(
        &mut self,
        draft: &TodoDraft,
        today: NaiveDate,
        editing: bool,
    ) -> Result<NaiveDate, ValidationError> {
        draft.validate(today, editing).inspect_err(|e| {
            self.notifications.push(Notification::error(e.to_string()));
        })
    }

    pub async fn delete_todo(&mut self, id: &str) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            return false;
        }
        self.save().await;
        self.notifications
            .push(Notification::success("Todo deleted successfully!"));
        true
    }

    /// Flips completion and returns the new state.
    pub async fn toggle_complete(&mut self, id: &str, now: DateTime<Utc>) -> Option<bool> {
        let todo = self.todos.iter_mut().find(|t| t.id == id)?;
        todo.completed = !todo.completed;
        todo.updated_at = now;
        let completed = todo.completed;
        self.save().await;

        self.notifications.push(Notification::success(if completed {
            "Todo marked as complete!"
        } else {
            "Todo marked as incomplete!"
        }));
        Some(completed)
    }

    pub async fn move_to_date(&mut self, id: &str, date: NaiveDate, now: DateTime<Utc>) -> bool {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        debug!("Moving todo {} from {} to {}", id, todo.date, date);
        todo.date = date;
        todo.updated_at = now;
        self.save().await;

        self.notifications
            .push(Notification::success("Todo moved successfully!"));
        true
    }

    /// Completes every pending todo on `date` that passes the filter and
    /// returns how many changed.
    pub async fn mark_all_complete(&mut self, date: NaiveDate, now: DateTime<Utc>) -> usize {
        let filter = &self.filter;
        let mut updated = 0;
        for todo in self
            .todos
            .iter_mut()
            .filter(|t| t.date == date && !t.completed && filter.matches(t))
        {
            todo.completed = true;
            todo.updated_at = now;
            updated += 1;
        }

        if updated > 0 {
            self.save().await;
            self.notifications.push(Notification::success(format!(
                "Marked {updated} todos as complete!"
            )));
        }
        updated
    }

    pub async fn delete_all_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        let deleted = before - self.todos.len();

        if deleted == 0 {
            self.notifications
                .push(Notification::info("No completed todos to delete"));
            return 0;
        }
        self.save().await;
        self.notifications.push(Notification::success(format!(
            "Deleted {deleted} completed todos!"
        )));
        deleted
    }

    pub fn stats(&self, today: NaiveDate) -> TodoStats {
        todo_stats(&self.todos, today)
    }

    pub fn export(&mut self, now: DateTime<Utc>) -> Result<String> {
        let json = export_todos(&self.todos, now)?;
        self.notifications
            .push(Notification::success("Todos exported successfully!"));
        Ok(json)
    }

    /// Merges the todos of an export file, skipping ids already present.
    /// Malformed files import nothing.
    pub async fn import(&mut self, raw: &str) -> Result<usize, ImportError> {
        let incoming = match parse_import(raw) {
            Ok(todos) => todos,
            Err(e) => {
                error!("Error importing todos: {e}");
                self.notifications.push(Notification::error(
                    "Error importing todos. Please check the file format.",
                ));
                return Err(e);
            }
        };

        let added = merge_imported(&mut self.todos, incoming);
        self.save().await;
        self.notifications.push(Notification::success(format!(
            "Imported {added} todos successfully!"
        )));
        Ok(added)
    }

    /// Month grid with the filtered todos drawn on it.
    pub fn month_view(
        &self,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> Result<(MonthGrid, Vec<TodoDay>)> {
        let grid = MonthGrid::new(year, month, today)?;
        let overlay = todo_overlay(&grid, &self.filtered());
        Ok((grid, overlay))
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notification::NotificationLevel;
    use crate::core::todo::{Priority, StatusFilter};
    use crate::store::memory::MemoryStorage;
    use anyhow::anyhow;
    use async_trait::async_trait;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(title: &str, on: &str) -> TodoDraft {
        TodoDraft {
            title: title.to_string(),
            date: Some(date(on)),
            ..Default::default()
        }
    }

    async fn planner() -> (Planner, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (Planner::load(storage.clone()).await, storage)
    }

    #[tokio::test]
    async fn test_create_persists_and_notifies() {
        let (mut planner, storage) = planner().await;
        let id = planner
            .create_todo(draft("Dentist", "2024-01-02"), date("2024-01-01"), now())
            .await
            .unwrap();

        assert_eq!(planner.get(&id).unwrap().title, "Dentist");
        let notes = planner.drain_notifications();
        assert_eq!(notes, vec![Notification::success("Todo created successfully!")]);

        let reloaded = Planner::load(storage).await;
        assert_eq!(reloaded.todos().len(), 1);
        assert_eq!(reloaded.todos()[0].id, id);
    }

    #[tokio::test]
    async fn test_create_recurring_spawns_follow_ons() {
        let (mut planner, _) = planner().await;
        let mut weekly = draft("Standup", "2024-01-01");
        weekly.recurring = true;
        let id = planner
            .create_todo(weekly, date("2024-01-01"), now())
            .await
            .unwrap();

        assert_eq!(planner.todos().len(), 11);
        let children: Vec<&Todo> = planner
            .todos()
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(id.as_str()))
            .collect();
        assert_eq!(children.len(), 10);
        assert_eq!(children[0].date, date("2024-01-08"));
        assert_eq!(children[9].date, date("2024-03-11"));
        assert!(children.iter().all(|t| !t.recurring));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_drafts() {
        let (mut planner, storage) = planner().await;

        let err = planner
            .create_todo(draft("  ", "2024-01-02"), date("2024-01-01"), now())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingTitle);

        let err = planner
            .create_todo(draft("Late", "2023-12-31"), date("2024-01-01"), now())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::PastDate);

        let notes = planner.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
        assert_eq!(notes[1].message, "Please select a future date");
        assert!(planner.todos().is_empty());
        assert!(storage.get_item(TODOS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_allows_past_dates() {
        let (mut planner, _) = planner().await;
        let id = planner
            .create_todo(draft("Report", "2024-01-05"), date("2024-01-01"), now())
            .await
            .unwrap();

        let mut edit = draft("Report v2", "2023-12-20");
        edit.priority = Priority::High;
        let updated = planner
            .update_todo(&id, edit, date("2024-01-01"), now())
            .await
            .unwrap();
        assert!(updated);

        let todo = planner.get(&id).unwrap();
        assert_eq!(todo.title, "Report v2");
        assert_eq!(todo.date, date("2023-12-20"));
        assert_eq!(todo.priority, Priority::High);

        let missing = planner
            .update_todo("nope", draft("x", "2024-01-05"), date("2024-01-01"), now())
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn test_toggle_move_delete() {
        let (mut planner, _) = planner().await;
        let id = planner
            .create_todo(draft("Gym", "2024-01-03"), date("2024-01-01"), now())
            .await
            .unwrap();

        assert_eq!(planner.toggle_complete(&id, now()).await, Some(true));
        assert_eq!(planner.toggle_complete(&id, now()).await, Some(false));
        assert_eq!(planner.toggle_complete("nope", now()).await, None);

        assert!(planner.move_to_date(&id, date("2024-01-10"), now()).await);
        assert_eq!(planner.todos_for_date(date("2024-01-10")).len(), 1);
        assert!(planner.todos_for_date(date("2024-01-03")).is_empty());

        assert!(planner.delete_todo(&id).await);
        assert!(!planner.delete_todo(&id).await);
        assert!(planner.todos().is_empty());
    }

    #[tokio::test]
    async fn test_todos_for_date_orders_by_time_and_respects_filter() {
        let (mut planner, _) = planner().await;
        let today = date("2024-01-01");
        let mut late = draft("Dinner", "2024-01-02");
        late.time = Some("19:30".to_string());
        let mut early = draft("Breakfast", "2024-01-02");
        early.time = Some("08:00".to_string());
        planner.create_todo(draft("Anytime", "2024-01-02"), today, now()).await.unwrap();
        planner.create_todo(late, today, now()).await.unwrap();
        planner.create_todo(early, today, now()).await.unwrap();

        let titles: Vec<&str> = planner
            .todos_for_date(date("2024-01-02"))
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Breakfast", "Dinner", "Anytime"]);

        planner.set_filter(TodoFilter {
            search: "din".to_string(),
            ..Default::default()
        });
        assert_eq!(planner.todos_for_date(date("2024-01-02")).len(), 1);
    }

    #[tokio::test]
    async fn test_times_are_validated_and_sorted_as_times() {
        let (mut planner, _) = planner().await;
        let today = date("2024-01-01");
        for (title, time) in [("ten", "10:00"), ("nine", "9:30")] {
            let mut timed = draft(title, "2024-01-02");
            timed.time = Some(time.to_string());
            planner.create_todo(timed, today, now()).await.unwrap();
        }

        let mut junk = draft("junk", "2024-01-02");
        junk.time = Some("banana".to_string());
        let err = planner.create_todo(junk, today, now()).await.unwrap_err();
        assert_eq!(err, ValidationError::InvalidTime("banana".to_string()));

        let day: Vec<(&str, Option<&str>)> = planner
            .todos_for_date(date("2024-01-02"))
            .iter()
            .map(|t| (t.title.as_str(), t.time.as_deref()))
            .collect();
        assert_eq!(day, vec![("nine", Some("09:30")), ("ten", Some("10:00"))]);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let (mut planner, _) = planner().await;
        let today = date("2024-01-01");
        for title in ["a", "b", "c"] {
            planner.create_todo(draft(title, "2024-01-02"), today, now()).await.unwrap();
        }
        planner.create_todo(draft("other day", "2024-01-03"), today, now()).await.unwrap();
        planner.drain_notifications();

        assert_eq!(planner.mark_all_complete(date("2024-01-02"), now()).await, 3);
        assert_eq!(planner.mark_all_complete(date("2024-01-02"), now()).await, 0);
        assert_eq!(
            planner.drain_notifications(),
            vec![Notification::success("Marked 3 todos as complete!")]
        );

        planner.set_filter(TodoFilter {
            status: StatusFilter::Completed,
            ..Default::default()
        });
        assert_eq!(planner.filtered().len(), 3);

        assert_eq!(planner.delete_all_completed().await, 3);
        assert_eq!(planner.delete_all_completed().await, 0);
        assert_eq!(planner.todos().len(), 1);
        let notes = planner.drain_notifications();
        assert_eq!(notes[1], Notification::info("No completed todos to delete"));
    }

    #[tokio::test]
    async fn test_stats() {
        let (mut planner, _) = planner().await;
        let id = planner
            .create_todo(draft("a", "2024-01-02"), date("2024-01-01"), now())
            .await
            .unwrap();
        planner.create_todo(draft("b", "2024-01-02"), date("2024-01-01"), now()).await.unwrap();
        planner.toggle_complete(&id, now()).await;

        let stats = planner.stats(date("2024-01-05"));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.overdue, 1);
    }

    #[tokio::test]
    async fn test_export_then_import_skips_known_ids() {
        let (mut source, _) = planner().await;
        source.create_todo(draft("one", "2024-01-02"), date("2024-01-01"), now()).await.unwrap();
        source.create_todo(draft("two", "2024-01-03"), date("2024-01-01"), now()).await.unwrap();
        let json = source.export(now()).unwrap();

        let (mut target, _) = planner().await;
        assert_eq!(target.import(&json).await.unwrap(), 2);
        assert_eq!(target.import(&json).await.unwrap(), 0);
        assert_eq!(target.todos().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_import_changes_nothing() {
        let (mut planner, _) = planner().await;
        planner.create_todo(draft("keep", "2024-01-02"), date("2024-01-01"), now()).await.unwrap();
        planner.drain_notifications();

        assert!(matches!(
            planner.import(r#"{"todos": {}}"#).await,
            Err(ImportError::InvalidFormat)
        ));
        assert!(planner.import("not json").await.is_err());
        assert!(planner.import(r#"{"todos": [{"id": "x"}]}"#).await.is_err());
        assert_eq!(planner.todos().len(), 1);

        let notes = planner.drain_notifications();
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
    }

    #[tokio::test]
    async fn test_month_view() {
        let (mut planner, _) = planner().await;
        planner.create_todo(draft("a", "2024-02-14"), date("2024-01-01"), now()).await.unwrap();
        let (grid, overlay) = planner.month_view(2024, 2, date("2024-02-14")).unwrap();
        assert_eq!(grid.cells.len(), 42);
        let day = overlay.iter().find(|d| d.cell.is_today).unwrap();
        assert_eq!(day.dots.len(), 1);
    }

    struct BrokenStorage;

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(Some("{corrupt".to_string()))
        }
        async fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        async fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_storage_failures_degrade() {
        let mut planner = Planner::load(Arc::new(BrokenStorage)).await;
        assert!(planner.todos().is_empty());

        planner
            .create_todo(draft("a", "2024-01-02"), date("2024-01-01"), now())
            .await
            .unwrap();
        // The todo stays in memory even though it could not be written
        assert_eq!(planner.todos().len(), 1);
        let notes = planner.drain_notifications();
        assert_eq!(notes[0], Notification::error("Error saving todos"));
    }
}
