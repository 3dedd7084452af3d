pub mod align;
pub mod forecast;

use crate::domain::series::{AlignedRecord, CasePoint, ForecastRecord, TimelinePoint};
use crate::ingest::types::CountryMetrics;
use serde::{Deserialize, Serialize};

pub use align::align;
pub use forecast::forecast;

/// Everything the dashboard renders for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryView {
    pub aligned: Vec<AlignedRecord>,
    pub forecast: Vec<ForecastRecord>,
    pub timeline: Vec<TimelinePoint>,
}

/// Align, forecast on the case column, and build the combined timeline.
pub fn run(metrics: &CountryMetrics, horizon: usize) -> CountryView {
    let aligned = align(
        metrics.cases.as_ref(),
        metrics.recovered.as_ref(),
        metrics.vaccines.as_ref(),
    );
    let history: Vec<CasePoint> = aligned.iter().map(CasePoint::from).collect();
    let forecast = forecast(&history, horizon);
    let timeline = combine(&aligned, &forecast);

    tracing::debug!(
        country = %metrics.country,
        aligned_len = aligned.len(),
        forecast_len = forecast.len(),
        "pipeline run complete"
    );

    CountryView {
        aligned,
        forecast,
        timeline,
    }
}

/// Historical `date`/`cases` rows followed by the forecast rows.
pub fn combine(history: &[AlignedRecord], forecast: &[ForecastRecord]) -> Vec<TimelinePoint> {
    let mut out = Vec::with_capacity(history.len() + forecast.len());
    out.extend(history.iter().map(TimelinePoint::from));
    out.extend(forecast.iter().map(TimelinePoint::from));
    out
}
