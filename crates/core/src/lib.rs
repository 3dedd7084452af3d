pub mod domain;
pub mod ingest;
pub mod pipeline;
pub mod refresh;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_DATA_PROVIDER_BASE_URL: &str = "https://disease.sh";
    const DEFAULT_COUNTRIES: &str = "USA";
    const DEFAULT_HISTORY_LAST_DAYS: u32 = 90;
    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_provider_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub dashboard_countries: Vec<String>,
        pub forecast_horizon: usize,
        pub history_last_days: u32,
        pub refresh_interval: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let countries = std::env::var("DASHBOARD_COUNTRIES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRIES.to_string());

            let forecast_horizon = crate::pipeline::forecast::check_horizon(
                env_parse("FORECAST_HORIZON")
                    .unwrap_or(crate::pipeline::forecast::DASHBOARD_HORIZON),
            )
            .context("FORECAST_HORIZON out of range")?;

            Ok(Self {
                data_provider_base_url: std::env::var("DATA_PROVIDER_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| Some(DEFAULT_DATA_PROVIDER_BASE_URL.to_string())),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                dashboard_countries: parse_countries(&countries),
                forecast_horizon,
                history_last_days: env_parse("HISTORY_LAST_DAYS")
                    .unwrap_or(DEFAULT_HISTORY_LAST_DAYS),
                refresh_interval: Duration::from_secs(
                    env_parse::<u64>("REFRESH_INTERVAL_SECS")
                        .filter(|secs| *secs > 0)
                        .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
                ),
            })
        }

        pub fn require_data_provider_base_url(&self) -> anyhow::Result<&str> {
            self.data_provider_base_url
                .as_deref()
                .context("DATA_PROVIDER_BASE_URL is required")
        }
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

    /// Splits a comma separated country list, dropping blanks and duplicates
    /// while keeping the first-seen order.
    pub fn parse_countries(raw: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() || out.iter().any(|c| c.eq_ignore_ascii_case(part)) {
                continue;
            }
            out.push(part.to_string());
        }
        out
    }

}
