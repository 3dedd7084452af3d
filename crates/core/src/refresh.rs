use crate::config::Settings;
use crate::ingest::provider::DataProviderClient;
use crate::pipeline::{self, CountryView};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Forecast steps appended to each country's timeline.
    pub horizon: usize,

    /// Days of history requested from the provider.
    pub last_days: u32,

    pub interval: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            horizon: pipeline::forecast::DASHBOARD_HORIZON,
            last_days: 90,
            interval: Duration::from_secs(600),
        }
    }
}

impl RefreshOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            horizon: settings.forecast_horizon,
            last_days: settings.history_last_days,
            interval: settings.refresh_interval,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountrySnapshot {
    pub refresh_id: Uuid,
    pub country: String,
    pub provider: &'static str,
    pub generated_at: DateTime<Utc>,
    pub horizon: usize,
    #[serde(flatten)]
    pub view: CountryView,
}

/// Latest published snapshot per configured country.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub countries: BTreeMap<String, Arc<CountrySnapshot>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Dashboard {
    /// Case-insensitive lookup by country name.
    pub fn get(&self, country: &str) -> Option<&Arc<CountrySnapshot>> {
        self.countries.get(country).or_else(|| {
            self.countries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(country))
                .map(|(_, v)| v)
        })
    }
}

pub struct Refresher {
    provider: Arc<dyn DataProviderClient>,
    opts: RefreshOptions,
}

impl Refresher {
    pub fn new(provider: Arc<dyn DataProviderClient>, opts: RefreshOptions) -> Self {
        Self { provider, opts }
    }

    pub fn options(&self) -> &RefreshOptions {
        &self.opts
    }

    /// Fetch, align and forecast one country.
    pub async fn refresh_country(&self, country: &str) -> anyhow::Result<CountrySnapshot> {
        let metrics = self
            .provider
            .fetch_country_metrics(country, self.opts.last_days)
            .await
            .with_context(|| format!("fetch metrics for {country} failed"))?;

        let view = pipeline::run(&metrics, self.opts.horizon);

        Ok(CountrySnapshot {
            refresh_id: Uuid::new_v4(),
            country: metrics.country,
            provider: self.provider.provider_name(),
            generated_at: Utc::now(),
            horizon: self.opts.horizon,
            view,
        })
    }

    /// Refreshes every country. A country that fails keeps its entry from
    /// `previous` (if any). `updated_at` only advances when at least one
    /// country refreshed.
    pub async fn refresh_all(&self, countries: &[String], previous: &Dashboard) -> Dashboard {
        let mut out = Dashboard {
            countries: BTreeMap::new(),
            updated_at: previous.updated_at,
        };

        for country in countries {
            match self.refresh_country(country).await {
                Ok(snapshot) => {
                    tracing::info!(
                        country = %country,
                        refresh_id = %snapshot.refresh_id,
                        aligned_len = snapshot.view.aligned.len(),
                        forecast_len = snapshot.view.forecast.len(),
                        "country refreshed"
                    );
                    out.updated_at = Some(snapshot.generated_at);
                    out.countries.insert(country.clone(), Arc::new(snapshot));
                }
                Err(err) => {
                    tracing::error!(country = %country, error = %format!("{err:#}"), "country refresh failed; keeping previous snapshot");
                    if let Some(prev) = previous.countries.get(country) {
                        out.countries.insert(country.clone(), Arc::clone(prev));
                    }
                }
            }
        }

        out
    }

    /// Refreshes on a fixed interval, publishing each result on `tx`, until
    /// `shutdown` resolves or every receiver is gone. The first refresh runs
    /// immediately.
    pub async fn run<F>(
        &self,
        countries: Vec<String>,
        tx: watch::Sender<Dashboard>,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        anyhow::ensure!(!countries.is_empty(), "no countries configured for refresh");

        let mut ticker = tokio::time::interval(self.opts.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("refresh loop shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let previous = tx.borrow().clone();
                    let next = self.refresh_all(&countries, &previous).await;
                    if tx.send(next).is_err() {
                        tracing::info!("no dashboard subscribers left; stopping refresh loop");
                        return Ok(());
                    }
                }
            }
        }
    }
}
