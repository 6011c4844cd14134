//! Key/value persistence abstraction, modelled on browser local storage

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

pub const TODOS_KEY: &str = "calender_todos";
pub const EXPENSES_KEY: &str = "expenses";
pub const SETTINGS_KEY: &str = "settings";
pub const EXCHANGE_RATES_KEY: &str = "exchangeRates";
pub const RATES_LAST_UPDATE_KEY: &str = "ratesLastUpdate";

/// String-valued store. Values written under one key replace the previous
/// value wholesale.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Reads and deserializes the JSON value stored under `key`.
pub async fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    let Some(raw) = storage.get_item(key).await? else {
        debug!("No stored value for {}", key);
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse stored value for {key}"))?;
    Ok(Some(value))
}

pub async fn write_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize value for {key}"))?;
    storage.set_item(key, &raw).await
}
