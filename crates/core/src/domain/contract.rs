use crate::domain::series::MetricSeries;
use crate::ingest::types::CountryMetrics;
use crate::time::date_key::parse_date_key;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Date-keyed metric map exactly as the provider sends it.
pub type RawSeries = BTreeMap<String, Value>;

/// `GET /v3/covid-19/historical/{country}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResponse {
    pub country: Option<String>,
    #[serde(default)]
    pub timeline: Option<HistoricalTimeline>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalTimeline {
    pub cases: Option<RawSeries>,
    pub deaths: Option<RawSeries>,
    pub recovered: Option<RawSeries>,
}

/// `GET /v3/covid-19/vaccine/coverage/countries/{country}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccineCoverageResponse {
    pub country: Option<String>,
    #[serde(default)]
    pub timeline: Option<RawSeries>,
}

impl CountryMetrics {
    /// Builds the per-metric series for one country.
    ///
    /// A response that is missing entirely, or whose metric map is `null`,
    /// yields an absent series rather than an empty one.
    pub fn from_responses(
        country: &str,
        historical: Option<&HistoricalResponse>,
        vaccines: Option<&VaccineCoverageResponse>,
    ) -> Self {
        let timeline = historical.and_then(|h| h.timeline.as_ref());

        Self {
            country: country.to_string(),
            cases: timeline
                .and_then(|t| t.cases.as_ref())
                .map(|raw| into_metric_series(raw, "cases")),
            recovered: timeline
                .and_then(|t| t.recovered.as_ref())
                .map(|raw| into_metric_series(raw, "recovered")),
            vaccines: vaccines
                .and_then(|v| v.timeline.as_ref())
                .map(|raw| into_metric_series(raw, "vaccines")),
        }
    }
}

/// Converts a raw provider map into a [`MetricSeries`].
///
/// Entries with an unparseable date key, or a value that is not a
/// non-negative integer, are dropped and logged; the rest of the series is kept.
/// When two keys resolve to the same date the first one (in key order) wins.
pub fn into_metric_series(raw: &RawSeries, metric: &'static str) -> MetricSeries {
    let mut out = MetricSeries::new();
    let mut skipped: usize = 0;

    for (key, value) in raw {
        let Some(date) = parse_date_key(key) else {
            skipped += 1;
            tracing::debug!(metric, key = %key, "skipping malformed date key");
            continue;
        };
        let Some(n) = count_value(value) else {
            skipped += 1;
            tracing::debug!(metric, key = %key, value = %value, "skipping non-count value");
            continue;
        };
        if out.contains_key(&date) {
            skipped += 1;
            tracing::debug!(metric, %date, key = %key, "skipping duplicate date");
            continue;
        }
        out.insert(date, n);
    }

    if skipped > 0 {
        tracing::warn!(
            metric,
            skipped,
            kept = out.len(),
            "dropped malformed entries from provider series"
        );
    }

    out
}

fn count_value(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        return Some(f as u64);
    }
    None
}
