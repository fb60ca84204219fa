//! Frankfurter API provider.
//!
//! Frankfurter publishes ECB reference rates on working days only, so a
//! range response has gaps for weekends and holidays. A range starting on a
//! non-working day is answered from the previous working day; such leading
//! days are dropped here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxhistory_common::{format_date, Currency, DateRange, ExchangeRate, ProviderId};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::FrankfurterConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::provider::RateProvider;

/// Provider ID constant
pub const FRANKFURTER_ID: &str = "frankfurter";

/// Response of `/latest`.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[allow(dead_code)]
    base: String,
    date: NaiveDate,
    rates: BTreeMap<String, Decimal>,
}

/// Response of `/{start}..{end}`.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[allow(dead_code)]
    base: String,
    #[allow(dead_code)]
    start_date: NaiveDate,
    #[allow(dead_code)]
    end_date: NaiveDate,
    rates: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
}

/// Frankfurter exchange-rate provider.
pub struct FrankfurterProvider {
    id: ProviderId,
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    /// Build the provider and its HTTP client. Fails if the client cannot
    /// be built with the configured timeout.
    pub fn new(config: &FrankfurterConfig) -> HistoryResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HistoryError::provider(FRANKFURTER_ID, e))?;

        Ok(Self {
            id: ProviderId::new(FRANKFURTER_ID),
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn history_url(&self, base: &Currency, range: DateRange) -> String {
        format!(
            "{}/{}..{}?base={}",
            self.base_url,
            format_date(range.start()),
            format_date(range.end()),
            base
        )
    }

    fn latest_url(&self, base: &Currency) -> String {
        format!("{}/latest?base={}", self.base_url, base)
    }

    fn unavailable(&self, message: impl ToString) -> HistoryError {
        HistoryError::provider(self.id.as_str(), message)
    }

    async fn fetch(&self, url: &str) -> HistoryResult<reqwest::Response> {
        debug!(url = %url, "Requesting Frankfurter");

        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))
    }
}

fn to_rate(date: NaiveDate, rates: BTreeMap<String, Decimal>) -> ExchangeRate {
    ExchangeRate::new(date, rates.into_iter().map(|(code, rate)| (Currency::new(code), rate)))
}

fn history_rates(response: HistoryResponse, range: DateRange) -> Vec<ExchangeRate> {
    response
        .rates
        .into_iter()
        .filter(|(date, _)| range.contains(*date))
        .map(|(date, rates)| to_rate(date, rates))
        .collect()
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    #[instrument(skip(self), fields(base = %base, range = %range))]
    async fn get_history(
        &self,
        base: &Currency,
        range: DateRange,
    ) -> HistoryResult<Vec<ExchangeRate>> {
        let response = self.fetch(&self.history_url(base, range)).await?;

        let status = response.status();
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(HistoryError::InvalidRange(format!(
                "Frankfurter rejected {} for {}: {} {}",
                range, base, status, body
            )));
        }
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {}", status)));
        }

        let body: HistoryResponse = response.json().await.map_err(|e| self.unavailable(e))?;
        let rates = history_rates(body, range);

        debug!(days = rates.len(), "Frankfurter history received");
        Ok(rates)
    }

    #[instrument(skip(self), fields(base = %base))]
    async fn get_latest(&self, base: &Currency) -> HistoryResult<ExchangeRate> {
        let response = self.fetch(&self.latest_url(base)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {}", status)));
        }

        let body: LatestResponse = response.json().await.map_err(|e| self.unavailable(e))?;
        Ok(to_rate(body.date, body.rates))
    }
}
