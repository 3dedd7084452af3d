use crate::config::Settings;
use crate::domain::contract::{HistoricalResponse, VaccineCoverageResponse};
use crate::ingest::error::ProviderStatusError;
use crate::ingest::types::CountryMetrics;
use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const MAX_BACKOFF_EXP: u32 = 6;

const HISTORICAL_PATH: &[&str] = &["v3", "covid-19", "historical"];
const VACCINE_COVERAGE_PATH: &[&str] = &["v3", "covid-19", "vaccine", "coverage", "countries"];

#[async_trait::async_trait]
pub trait DataProviderClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fetches cases, recovered and vaccine coverage for the last `last_days`
    /// days. A metric the provider does not have for `country` comes back as
    /// `None`.
    async fn fetch_country_metrics(&self, country: &str, last_days: u32)
        -> Result<CountryMetrics>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonDataProvider {
    http: reqwest::Client,
    base_url: Url,
    retries: u32,
}

impl HttpJsonDataProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_data_provider_base_url()?;

        let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("DATA_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self::new(base_url, Duration::from_secs(timeout_secs), retries)
    }

    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid data provider base url: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "data provider base url cannot carry a path: {base_url}"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            retries: retries.max(1),
        })
    }

    fn endpoint(&self, path: &[&str], country: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("data provider base url cannot be a base"))?
            .pop_if_empty()
            .extend(path)
            .push(country);
        Ok(url)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, last_days: u32) -> Result<T> {
        let res = self
            .http
            .get(url.clone())
            .query(&[("lastdays", last_days.to_string())])
            .send()
            .await
            .context("data provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;

        if !status.is_success() {
            return Err(ProviderStatusError {
                status,
                url: url.to_string(),
                body: text,
            }
            .into());
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("provider response does not match expected shape: {text}"))
    }

    /// Retries transient failures with exponential backoff. A 404 means the
    /// provider has no such series and is returned as `Ok(None)` immediately.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        url: Url,
        last_days: u32,
    ) -> Result<Option<T>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_once::<T>(&url, last_days).await {
                Ok(parsed) => return Ok(Some(parsed)),
                Err(err) => {
                    if let Some(status_err) = err.downcast_ref::<ProviderStatusError>() {
                        if status_err.is_not_found() {
                            tracing::info!(%url, "provider has no series for this country");
                            return Ok(None);
                        }
                    }
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1u64 << (attempt - 1).min(MAX_BACKOFF_EXP));
                    tracing::warn!(attempt, ?backoff, %url, error = %err, "data provider fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DataProviderClient for HttpJsonDataProvider {
    fn provider_name(&self) -> &'static str {
        "disease_sh"
    }

    async fn fetch_country_metrics(
        &self,
        country: &str,
        last_days: u32,
    ) -> Result<CountryMetrics> {
        let country = country.trim();
        anyhow::ensure!(!country.is_empty(), "country must be non-empty");
        anyhow::ensure!(last_days >= 1, "last_days must be >= 1 (got {last_days})");

        let historical_url = self.endpoint(HISTORICAL_PATH, country)?;
        let vaccines_url = self.endpoint(VACCINE_COVERAGE_PATH, country)?;

        let (historical, vaccines) = tokio::join!(
            self.get_optional::<HistoricalResponse>(historical_url, last_days),
            self.get_optional::<VaccineCoverageResponse>(vaccines_url, last_days),
        );
        let historical = historical.context("historical fetch failed")?;
        let vaccines = vaccines.context("vaccine coverage fetch failed")?;

        if historical.is_none() && vaccines.is_none() {
            tracing::warn!(country, "provider returned no series at all for country");
        }

        Ok(CountryMetrics::from_responses(
            country,
            historical.as_ref(),
            vaccines.as_ref(),
        ))
    }
}
