use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse date -> value mapping for one observed quantity.
pub type MetricSeries = BTreeMap<NaiveDate, u64>;

/// One row of the unified, date-ordered, zero-filled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedRecord {
    pub date: NaiveDate,
    pub cases: u64,
    pub recovered: u64,
    pub vaccines: u64,
}

/// Forecaster input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePoint {
    pub date: NaiveDate,
    pub cases: u64,
}

impl From<&AlignedRecord> for CasePoint {
    fn from(r: &AlignedRecord) -> Self {
        Self {
            date: r.date,
            cases: r.cases,
        }
    }
}

/// A projected future case count. Always carries `isForecast: true` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub cases: u64,
    pub is_forecast: bool,
}

impl ForecastRecord {
    pub fn new(date: NaiveDate, cases: u64) -> Self {
        Self {
            date,
            cases,
            is_forecast: true,
        }
    }
}

/// Row of the combined history + forecast timeline used by the trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub is_forecast: bool,
}

impl From<&AlignedRecord> for TimelinePoint {
    fn from(r: &AlignedRecord) -> Self {
        Self {
            date: r.date,
            cases: r.cases,
            is_forecast: false,
        }
    }
}

impl From<&ForecastRecord> for TimelinePoint {
    fn from(r: &ForecastRecord) -> Self {
        Self {
            date: r.date,
            cases: r.cases,
            is_forecast: true,
        }
    }
}
