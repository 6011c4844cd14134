//! Domain logic for the planner and the expense tracker

pub mod calendar;
pub mod config;
pub mod currency;
pub mod error;
pub mod expense;
pub mod log;
pub mod notification;
pub mod rates;
pub mod report;
pub mod settings;
pub mod storage;
pub mod todo;

// Re-export main types for cleaner imports
pub use currency::{ExchangeRateProvider, RateTable};
pub use error::{ImportError, ValidationError};
pub use notification::{Notification, NotificationLevel};
pub use rates::{CurrencyService, RateStatus};
pub use storage::Storage;
