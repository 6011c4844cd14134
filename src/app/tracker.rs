//! The expense tracker: owns the expense list, the user's settings and the
//! currency service every amount is converted through.

use crate::core::calendar::{MonthGrid, SpendingDay, spending_overlay};
use crate::core::currency::{ExchangeRateProvider, RateTable, is_supported};
use crate::core::error::ValidationError;
use crate::core::expense::{
    Dashboard, Expense, ExpenseCategory, ExpenseDraft, ExpenseFilter, RECENT_LIMIT, dashboard,
    export_expenses,
};
use crate::core::notification::{Notification, Notifications};
use crate::core::rates::{CurrencyService, RateStatus};
use crate::core::report::{ReportData, ReportPeriod};
use crate::core::settings::{Settings, Theme};
use crate::core::storage::{EXPENSES_KEY, SETTINGS_KEY, Storage, read_json, write_json};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ExpenseTracker {
    storage: Arc<dyn Storage>,
    expenses: Vec<Expense>,
    settings: Settings,
    /// Settings used when none are stored, and again after a reset.
    defaults: Settings,
    currency: CurrencyService,
    notifications: Notifications,
}

impl ExpenseTracker {
    /// Restores expenses, settings and cached rates. Unreadable values fall
    /// back to an empty list and `defaults`.
    pub async fn load(
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ExchangeRateProvider>,
        defaults: Settings,
    ) -> Self {
        let expenses = match read_json::<Vec<Expense>>(storage.as_ref(), EXPENSES_KEY).await {
            Ok(expenses) => expenses.unwrap_or_default(),
            Err(e) => {
                error!("Error loading expenses: {e:#}");
                Vec::new()
            }
        };
        let settings = match read_json::<Settings>(storage.as_ref(), SETTINGS_KEY).await {
            Ok(settings) => settings.unwrap_or_else(|| defaults.clone()),
            Err(e) => {
                error!("Error loading settings: {e:#}");
                defaults.clone()
            }
        };
        debug!(
            "Loaded {} expenses, base currency {}",
            expenses.len(),
            settings.base_currency
        );

        let currency =
            CurrencyService::load(provider, storage.clone(), &settings.base_currency).await;
        ExpenseTracker {
            storage,
            expenses,
            settings,
            defaults,
            currency,
            notifications: Notifications::default(),
        }
    }

    /// Startup refresh, skipped when automatic updates are off.
    pub async fn init_rates(&mut self, now: DateTime<Utc>) -> Option<RateStatus> {
        if !self.settings.auto_update_rates {
            debug!("Automatic rate updates disabled");
            return None;
        }
        let status = self.currency.update_rates(now).await;
        self.notify_rate_status(status);
        Some(status)
    }

    /// Refreshes rates regardless of their age.
    pub async fn refresh_rates(&mut self, now: DateTime<Utc>) -> RateStatus {
        let status = self.currency.force_update(now).await;
        self.notify_rate_status(status);
        status
    }

    fn notify_rate_status(&mut self, status: RateStatus) {
        match status {
            RateStatus::Fresh => {}
            RateStatus::Updated => self
                .notifications
                .push(Notification::success("Exchange rates updated")),
            RateStatus::Fallback => self.notifications.push(Notification::info(
                "Using approximate exchange rates: live rates are unavailable",
            )),
            RateStatus::Unavailable => self.notifications.push(Notification::error(format!(
                "No exchange rates available for {}",
                self.settings.base_currency
            ))),
        }
    }

    async fn save_expenses(&mut self) {
        if let Err(e) = write_json(self.storage.as_ref(), EXPENSES_KEY, &self.expenses).await {
            error!("Error saving expenses: {e:#}");
            self.notifications
                .push(Notification::error("Error saving expenses"));
        }
    }

    async fn save_settings(&mut self) {
        if let Err(e) = write_json(self.storage.as_ref(), SETTINGS_KEY, &self.settings).await {
            error!("Error saving settings: {e:#}");
            self.notifications
                .push(Notification::error("Error saving settings"));
        }
    }

    /// Newest first.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn base_currency(&self) -> &str {
        &self.settings.base_currency
    }

    pub fn currency(&self) -> &CurrencyService {
        &self.currency
    }

    pub fn rates(&self) -> Cow<'_, RateTable> {
        self.currency.rates()
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        self.currency.convert(amount, from, to)
    }

    /// The expense's amount in base currency, annotated with the original
    /// amount when it was recorded in another currency.
    pub fn format_amount(&self, expense: &Expense) -> String {
        self.rates()
            .format_with_rate(expense.amount, &expense.currency, true)
    }

    /// Records an expense dated today with no notes.
    pub async fn quick_add(
        &mut self,
        item: &str,
        amount: f64,
        currency: &str,
        category: ExpenseCategory,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        let draft = ExpenseDraft {
            date: today,
            item: item.to_string(),
            amount,
            currency: currency.to_string(),
            category,
            notes: String::new(),
        };
        self.add_expense(draft, now).await
    }

    pub async fn add_expense(
        &mut self,
        draft: ExpenseDraft,
        now: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        self.validate(&draft)?;
        let expense = draft.into_expense(None, now);
        let id = expense.id.clone();
        info!("Adding expense {} ({} {})", id, expense.amount, expense.currency);
        self.expenses.insert(0, expense);
        self.save_expenses().await;

        self.notifications
            .push(Notification::success("Expense added successfully!"));
        Ok(id)
    }

    /// Replaces an expense in place, keeping its id and timestamp. Returns
    /// `false` when no expense has `id`.
    pub async fn update_expense(
        &mut self,
        id: &str,
        draft: ExpenseDraft,
    ) -> Result<bool, ValidationError> {
        self.validate(&draft)?;
        let Some(index) = self.expenses.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        let timestamp = self.expenses[index].timestamp;
        self.expenses[index] = draft.into_expense(Some(id.to_string()), timestamp);
        self.save_expenses().await;

        self.notifications
            .push(Notification::success("Expense updated successfully!"));
        Ok(true)
    }

    fn validate(&mut self, draft: &ExpenseDraft) -> Result<(), ValidationError> {
        draft.validate().inspect_err(|e| {
            self.notifications.push(Notification::error(e.to_string()));
        })
    }

    pub async fn delete_expense(&mut self, id: &str) -> bool {
        let before = self.expenses.len();
        self.expenses.retain(|e| e.id != id);
        if self.expenses.len() == before {
            return false;
        }
        self.save_expenses().await;
        self.notifications
            .push(Notification::success("Expense deleted successfully!"));
        true
    }

    pub fn filtered(&self, filter: &ExpenseFilter) -> Vec<&Expense> {
        filter.apply(&self.expenses)
    }

    pub fn recent(&self) -> &[Expense] {
        &self.expenses[..self.expenses.len().min(RECENT_LIMIT)]
    }

    pub fn dashboard(&self, today: NaiveDate) -> Dashboard {
        dashboard(&self.expenses, &self.rates(), today)
    }

    pub fn report(&self, period: ReportPeriod, today: NaiveDate) -> ReportData {
        ReportData::generate(&self.expenses, &self.rates(), period, today)
    }

    /// Renders the report as CSV and returns it with its file name.
    pub fn export_report(
        &mut self,
        period: ReportPeriod,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(String, String)> {
        let report = self.report(period, today);
        let csv = report.to_csv(now)?;
        self.notifications
            .push(Notification::success("Report exported successfully!"));
        Ok((report.csv_file_name(), csv))
    }

    /// Month grid with each day's spending in base currency.
    pub fn spending_calendar(
        &self,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> Result<(MonthGrid, Vec<SpendingDay>)> {
        let grid = MonthGrid::new(year, month, today)?;
        let days = spending_overlay(&grid, &self.expenses, &self.rates());
        Ok((grid, days))
    }

    /// Switches the base currency and, when automatic updates are on,
    /// fetches rates for it straight away.
    pub async fn update_base_currency(
        &mut self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateStatus>, ValidationError> {
        let code = code.trim().to_uppercase();
        if !is_supported(&code) {
            let err = ValidationError::UnsupportedCurrency(code);
            self.notifications.push(Notification::error(err.to_string()));
            return Err(err);
        }

        self.settings.base_currency = code.clone();
        self.save_settings().await;
        self.currency.set_base(&code);
        info!("Base currency set to {}", code);

        if self.settings.auto_update_rates {
            Ok(self.init_rates(now).await)
        } else {
            Ok(None)
        }
    }

    pub async fn set_auto_update_rates(&mut self, enabled: bool) {
        self.settings.auto_update_rates = enabled;
        self.save_settings().await;
    }

    pub async fn toggle_theme(&mut self) -> Theme {
        self.settings.theme = self.settings.theme.toggled();
        self.save_settings().await;
        self.settings.theme
    }

    pub fn export(&self, now: DateTime<Utc>) -> Result<String> {
        export_expenses(&self.expenses, &self.settings, now)
    }

    /// Deletes every expense and resets the settings.
    pub async fn clear_data(&mut self) -> Result<()> {
        for key in [EXPENSES_KEY, SETTINGS_KEY] {
            if let Err(e) = self.storage.remove_item(key).await {
                warn!("Failed to remove {}: {e:#}", key);
                self.notifications
                    .push(Notification::error("Error clearing data"));
                return Err(e);
            }
        }
        self.expenses.clear();
        self.settings = self.defaults.clone();
        self.currency.set_base(&self.settings.base_currency);
        info!("Cleared all expense data");
        Ok(())
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
