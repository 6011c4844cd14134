use crate::core::ExchangeRateProvider;
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 300;

/// Client for the `exchangerate-api.com` v4 latest-rates endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("daybook/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl ExchangeRateProvider for ExchangeRateApiProvider {
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>> {
        let url = format!("{}/v4/latest/{}", self.base_url, base.to_uppercase());
        debug!("Requesting exchange rates from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
            },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Failed to fetch exchange rates for {base}"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to read exchange rate response for {base}"))?;

        let parsed: LatestRatesResponse = serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse exchange rate response for {base}"))?;

        let rates = parsed
            .rates
            .ok_or_else(|| anyhow!("Exchange rate response for {} has no rates", base))?;
        debug!("Fetched {} exchange rates for {}", rates.len(), base);
        Ok(rates)
    }
}
