//! Exchange-rate lifecycle: restore from storage, refresh at most once a
//! day, fall back to the static table when the remote source fails.

use crate::core::currency::{ExchangeRateProvider, RateTable};
use crate::core::storage::{
    EXCHANGE_RATES_KEY, RATES_LAST_UPDATE_KEY, Storage, read_json, write_json,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cached rates younger than this are not refreshed.
pub const RATES_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStatus {
    /// Cached rates are recent enough; nothing was fetched.
    Fresh,
    /// A new table was fetched and stored.
    Updated,
    /// The fetch failed and the static table for the base was substituted.
    Fallback,
    /// The fetch failed and no static table exists for the base.
    Unavailable,
}

pub struct CurrencyService {
    provider: Arc<dyn ExchangeRateProvider>,
    storage: Arc<dyn Storage>,
    table: RateTable,
    last_update: Option<DateTime<Utc>>,
}

impl CurrencyService {
    /// Creates the service for `base`, restoring any cached table kept for
    /// the same base.
    pub async fn load(
        provider: Arc<dyn ExchangeRateProvider>,
        storage: Arc<dyn Storage>,
        base: &str,
    ) -> Self {
        let mut service = CurrencyService {
            provider,
            storage,
            table: RateTable::empty(base),
            last_update: None,
        };

        match service.read_cache().await {
            Ok(Some((table, last_update))) if table.base == base => {
                debug!("Restored {} cached rates for {}", table.rates.len(), base);
                service.table = table;
                service.last_update = Some(last_update);
            }
            Ok(Some((table, _))) => {
                debug!("Ignoring cached rates for {} (base is {})", table.base, base);
            }
            Ok(None) => debug!("No cached exchange rates"),
            Err(e) => warn!("Failed to restore cached exchange rates: {e:#}"),
        }
        service
    }

    async fn read_cache(&self) -> Result<Option<(RateTable, DateTime<Utc>)>> {
        let table: Option<RateTable> = read_json(self.storage.as_ref(), EXCHANGE_RATES_KEY).await?;
        let last_update = self.storage.get_item(RATES_LAST_UPDATE_KEY).await?;
        match (table, last_update) {
            (Some(table), Some(raw)) => {
                let last_update = DateTime::parse_from_rfc3339(raw.trim())
                    .with_context(|| format!("Invalid rates timestamp: {raw}"))?
                    .with_timezone(&Utc);
                Ok(Some((table, last_update)))
            }
            _ => Ok(None),
        }
    }

    async fn write_cache(&self) -> Result<()> {
        write_json(self.storage.as_ref(), EXCHANGE_RATES_KEY, &self.table).await?;
        if let Some(last_update) = self.last_update {
            self.storage
                .set_item(RATES_LAST_UPDATE_KEY, &last_update.to_rfc3339())
                .await?;
        }
        Ok(())
    }

    pub fn base(&self) -> &str {
        &self.table.base
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// The table conversions use; the static fallback while nothing has been
    /// loaded.
    pub fn rates(&self) -> Cow<'_, RateTable> {
        if self.table.is_empty() {
            if let Some(fallback) = RateTable::fallback(&self.table.base) {
                return Cow::Owned(fallback);
            }
        }
        Cow::Borrowed(&self.table)
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from == to {
            return amount;
        }
        self.rates().convert(amount, from, to)
    }

    pub fn exchange_rate(&self, from: &str, to: &str) -> f64 {
        self.rates().exchange_rate(from, to)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.last_update
            .is_some_and(|updated| updated > now - Duration::hours(RATES_MAX_AGE_HOURS))
    }

    /// Refreshes the table unless the last successful update is recent.
    pub async fn update_rates(&mut self, now: DateTime<Utc>) -> RateStatus {
        if self.is_fresh(now) {
            debug!("Exchange rates are fresh, skipping update");
            return RateStatus::Fresh;
        }

        let base = self.table.base.clone();
        match self.provider.fetch_rates(&base).await {
            Ok(mut rates) => {
                rates.insert(base.clone(), 1.0);
                self.table = RateTable::new(&base, rates);
                self.last_update = Some(now);
                if let Err(e) = self.write_cache().await {
                    warn!("Failed to cache exchange rates: {e:#}");
                }
                info!("Exchange rates updated for {}", base);
                RateStatus::Updated
            }
            Err(e) => {
                warn!("Failed to update exchange rates: {e:#}");
                self.use_fallback_rates()
            }
        }
    }

    /// Refreshes regardless of the age of the cached table.
    pub async fn force_update(&mut self, now: DateTime<Utc>) -> RateStatus {
        self.last_update = None;
        self.update_rates(now).await
    }

    fn use_fallback_rates(&mut self) -> RateStatus {
        match RateTable::fallback(&self.table.base) {
            Some(fallback) => {
                self.table = fallback;
                RateStatus::Fallback
            }
            None => RateStatus::Unavailable,
        }
    }

    /// Switches the base currency. Rates for the previous base are dropped
    /// so the next update fetches a matching table.
    pub fn set_base(&mut self, base: &str) {
        if self.table.base == base {
            return;
        }
        debug!("Base currency changed from {} to {}", self.table.base, base);
        self.table = RateTable::empty(base);
        self.last_update = None;
    }
}
