//! Domain errors callers branch on. Plumbing failures use `anyhow`.

use thiserror::Error;

/// Reasons a todo or expense submission is rejected.
///
/// The `Display` text is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a title for your todo")]
    MissingTitle,

    #[error("Please select a date for your todo")]
    MissingDate,

    #[error("Please select a future date")]
    PastDate,

    #[error("Please enter a valid time (HH:MM), not {0}")]
    InvalidTime(String),

    #[error("Please enter what the expense was for")]
    MissingItem,

    #[error("Please enter an amount greater than zero")]
    InvalidAmount,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Errors raised while importing a todo export. Nothing is merged when any
/// of these is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid file format: expected an object with a `todos` array")]
    InvalidFormat,

    #[error("Malformed todo data: {0}")]
    Malformed(#[from] serde_json::Error),
}
