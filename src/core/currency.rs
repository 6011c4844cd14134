//! Currency conversion abstractions and the static currency catalogue

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source of exchange rates keyed to a base currency.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Returns a mapping of currency code to the amount of that currency one
    /// unit of `base` buys.
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>>;
}

/// Approximate rates used when the remote source is unavailable.
const FALLBACK_RATES: &[(&str, &[(&str, f64)])] = &[
    (
        "USD",
        &[
            ("EUR", 0.85),
            ("GBP", 0.73),
            ("THB", 33.5),
            ("JPY", 110.0),
            ("CAD", 1.25),
            ("AUD", 1.35),
            ("CHF", 0.92),
        ],
    ),
    (
        "EUR",
        &[
            ("USD", 1.18),
            ("GBP", 0.86),
            ("THB", 39.4),
            ("JPY", 129.5),
            ("CAD", 1.47),
            ("AUD", 1.59),
            ("CHF", 1.08),
        ],
    ),
    (
        "GBP",
        &[
            ("USD", 1.37),
            ("EUR", 1.16),
            ("THB", 45.9),
            ("JPY", 150.8),
            ("CAD", 1.71),
            ("AUD", 1.85),
            ("CHF", 1.26),
        ],
    ),
    (
        "THB",
        &[
            ("USD", 0.030),
            ("EUR", 0.025),
            ("GBP", 0.022),
            ("JPY", 3.28),
            ("CAD", 0.037),
            ("AUD", 0.040),
            ("CHF", 0.027),
        ],
    ),
    (
        "JPY",
        &[
            ("USD", 0.0091),
            ("EUR", 0.0077),
            ("GBP", 0.0066),
            ("THB", 0.30),
            ("CAD", 0.011),
            ("AUD", 0.012),
            ("CHF", 0.0084),
        ],
    ),
    (
        "CAD",
        &[
            ("USD", 0.80),
            ("EUR", 0.68),
            ("GBP", 0.58),
            ("THB", 26.8),
            ("JPY", 88.0),
            ("AUD", 1.08),
            ("CHF", 0.74),
        ],
    ),
    (
        "AUD",
        &[
            ("USD", 0.74),
            ("EUR", 0.63),
            ("GBP", 0.54),
            ("THB", 24.8),
            ("JPY", 81.5),
            ("CAD", 0.93),
            ("CHF", 0.68),
        ],
    ),
    (
        "CHF",
        &[
            ("USD", 1.09),
            ("EUR", 0.93),
            ("GBP", 0.79),
            ("THB", 36.5),
            ("JPY", 119.6),
            ("CAD", 1.36),
            ("AUD", 1.47),
        ],
    ),
];

/// Codes selectable when recording an expense.
pub const SUPPORTED_CURRENCIES: [&str; 16] = [
    "USD", "EUR", "GBP", "THB", "JPY", "CAD", "AUD", "CHF", "CNY", "INR", "KRW", "MXN", "SGD",
    "HKD", "NOK", "SEK",
];

/// Rounds to two decimal places, halves away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Exchange rates relative to a single base currency.
///
/// `rates[code]` is the amount of `code` one unit of `base` buys. The base's
/// own rate is implicitly 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: String,
    pub rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(base: &str, rates: HashMap<String, f64>) -> Self {
        RateTable {
            base: base.to_string(),
            rates,
        }
    }

    pub fn empty(base: &str) -> Self {
        Self::new(base, HashMap::new())
    }

    /// The hard-coded table for `base`, if one exists.
    pub fn fallback(base: &str) -> Option<Self> {
        FALLBACK_RATES
            .iter()
            .find(|(code, _)| *code == base)
            .map(|(_, row)| {
                let mut rates: HashMap<String, f64> = row
                    .iter()
                    .map(|(code, rate)| (code.to_string(), *rate))
                    .collect();
                rates.insert(base.to_string(), 1.0);
                RateTable::new(base, rates)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    // Missing or zero entries count as 1.
    fn rate_of(&self, code: &str) -> f64 {
        self.rates
            .get(code)
            .copied()
            .filter(|rate| *rate != 0.0 && rate.is_finite())
            .unwrap_or(1.0)
    }

    /// Converts `amount` from one currency to another, rounded to cents.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from == to {
            return amount;
        }

        let converted = if from == self.base {
            amount * self.rate_of(to)
        } else if to == self.base {
            amount / self.rate_of(from)
        } else {
            // Triangulate through the base
            let base_amount = amount / self.rate_of(from);
            base_amount * self.rate_of(to)
        };

        round_cents(converted)
    }

    /// The unrounded effective rate applied by [`RateTable::convert`].
    pub fn exchange_rate(&self, from: &str, to: &str) -> f64 {
        if from == to {
            return 1.0;
        }

        if from == self.base {
            self.rate_of(to)
        } else if to == self.base {
            1.0 / self.rate_of(from)
        } else {
            self.rate_of(to) / self.rate_of(from)
        }
    }

    /// Formats an amount in the base currency, annotated with the original
    /// amount and rate when it was recorded in another currency.
    pub fn format_with_rate(&self, amount: f64, currency: &str, show_original: bool) -> String {
        if currency == self.base || !show_original {
            return format_currency(amount, currency);
        }

        let converted = self.convert(amount, currency, &self.base);
        let rate = self.exchange_rate(currency, &self.base);
        format!(
            "{} ({} @ {:.4})",
            format_currency(converted, &self.base),
            format_currency(amount, currency),
            rate
        )
    }
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" | "MXN" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "THB" => "฿",
        "JPY" | "CNY" => "¥",
        "CAD" => "C$",
        "AUD" => "A$",
        "CHF" => "CHF",
        "INR" => "₹",
        "KRW" => "₩",
        "SGD" => "S$",
        "HKD" => "HK$",
        "NOK" | "SEK" => "kr",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub name: &'static str,
    pub country: &'static str,
}

pub fn currency_info(code: &str) -> Option<CurrencyInfo> {
    let (name, country) = match code {
        "USD" => ("US Dollar", "United States"),
        "EUR" => ("Euro", "European Union"),
        "GBP" => ("British Pound", "United Kingdom"),
        "THB" => ("Thai Baht", "Thailand"),
        "JPY" => ("Japanese Yen", "Japan"),
        "CAD" => ("Canadian Dollar", "Canada"),
        "AUD" => ("Australian Dollar", "Australia"),
        "CHF" => ("Swiss Franc", "Switzerland"),
        "CNY" => ("Chinese Yuan", "China"),
        "INR" => ("Indian Rupee", "India"),
        "KRW" => ("South Korean Won", "South Korea"),
        "MXN" => ("Mexican Peso", "Mexico"),
        "SGD" => ("Singapore Dollar", "Singapore"),
        "HKD" => ("Hong Kong Dollar", "Hong Kong"),
        "NOK" => ("Norwegian Krone", "Norway"),
        "SEK" => ("Swedish Krona", "Sweden"),
        _ => return None,
    };
    Some(CurrencyInfo { name, country })
}

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Renders an amount the way an en-US locale displays money, e.g. `$1,234.50`.
pub fn format_currency(amount: f64, code: &str) -> String {
    let decimals = match code {
        "JPY" | "KRW" => 0,
        _ => 2,
    };
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    let symbol = currency_symbol(code);
    let separator = if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        " "
    } else {
        ""
    };
    let sign = if amount < 0.0 && grouped.chars().any(|c| c != '0' && c.is_ascii_digit()) {
        "-"
    } else {
        ""
    };
    format!("{sign}{symbol}{separator}{grouped}")
}
