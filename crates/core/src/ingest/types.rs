use crate::domain::series::MetricSeries;
use serde::{Deserialize, Serialize};

/// Raw per-metric series for one country, each possibly absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryMetrics {
    pub country: String,
    pub cases: Option<MetricSeries>,
    pub recovered: Option<MetricSeries>,
    pub vaccines: Option<MetricSeries>,
}
