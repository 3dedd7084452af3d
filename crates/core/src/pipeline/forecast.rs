//! Linear trend extrapolation of daily case counts.
//!
//! Fits `y = m·x + b` by ordinary least squares with the 0-based sequence
//! index as `x`, then projects the line forward one calendar day per step.
//! No weighting, outlier rejection, or seasonality.

use crate::domain::series::{CasePoint, ForecastRecord};
use chrono::{Days, NaiveDate};

/// Below this many observations a linear fit is not attempted.
pub const MIN_HISTORY: usize = 10;

pub const DEFAULT_HORIZON: usize = 7;

/// Horizon used by the dashboard trend chart.
pub const DASHBOARD_HORIZON: usize = 14;

/// Longest horizon `forecast` will extrapolate (ten years of days).
pub const MAX_HORIZON: usize = 3650;

/// Rejects horizons beyond [`MAX_HORIZON`] coming from configuration or flags.
pub fn check_horizon(horizon: usize) -> anyhow::Result<usize> {
    anyhow::ensure!(
        horizon <= MAX_HORIZON,
        "forecast horizon must be 0..={MAX_HORIZON} (got {horizon})"
    );
    Ok(horizon)
}

/// Slope and intercept of a least-squares line over `(i, cases[i])`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Closed-form OLS. `None` when the fit is degenerate (fewer than two
    /// points, zero denominator) or not finite.
    pub fn fit(history: &[CasePoint]) -> Option<Self> {
        if history.len() < 2 {
            return None;
        }

        let n = history.len() as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
        for (i, p) in history.iter().enumerate() {
            let x = i as f64;
            let y = p.cases as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_x2 += x * x;
        }

        let denominator = n * sum_x2 - sum_x * sum_x;
        if denominator == 0.0 || !denominator.is_finite() {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        if !slope.is_finite() || !intercept.is_finite() {
            return None;
        }

        Some(Self { slope, intercept })
    }

    pub fn predict_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Projects `horizon` daily case counts past the last point of `history`.
///
/// Returns an empty vec when `history` has fewer than [`MIN_HISTORY`] points
/// or the fit is degenerate. Projected values are clamped at zero and then
/// rounded to the nearest integer. `horizon` is capped at [`MAX_HORIZON`],
/// and no step is produced past chrono's last representable date.
pub fn forecast(history: &[CasePoint], horizon: usize) -> Vec<ForecastRecord> {
    if history.len() < MIN_HISTORY {
        return Vec::new();
    }
    let Some(last) = history.last() else {
        return Vec::new();
    };
    let Some(fit) = LinearFit::fit(history) else {
        tracing::warn!(points = history.len(), "degenerate linear fit; no forecast");
        return Vec::new();
    };

    if horizon > MAX_HORIZON {
        tracing::warn!(horizon, max = MAX_HORIZON, "forecast horizon capped");
    }
    let days_left = (NaiveDate::MAX - last.date).num_days().max(0) as usize;
    let steps = horizon.min(MAX_HORIZON).min(days_left);

    let n = history.len();
    let mut out = Vec::with_capacity(steps);
    for k in 1..=steps {
        let Some(date) = last.date.checked_add_days(Days::new(k as u64)) else {
            // Past chrono's representable range; nothing further can be dated.
            break;
        };
        let raw = fit.predict_at((n + k - 1) as f64);
        out.push(ForecastRecord::new(date, clamp_round(raw)));
    }

    out
}

fn clamp_round(raw: f64) -> u64 {
    let clamped = raw.max(0.0);
    if clamped >= u64::MAX as f64 {
        return u64::MAX;
    }
    clamped.round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn history_from(start: NaiveDate, cases: &[u64]) -> Vec<CasePoint> {
        cases
            .iter()
            .enumerate()
            .map(|(i, &c)| CasePoint {
                date: start + chrono::Duration::days(i as i64),
                cases: c,
            })
            .collect()
    }

    #[test]
    fn short_history_yields_nothing_for_any_horizon() {
        let h = history_from(d(2021, 1, 1), &[5; 9]);
        for horizon in [0, 1, 7, 14, 365] {
            assert!(forecast(&h, horizon).is_empty());
        }
        assert!(forecast(&[], DEFAULT_HORIZON).is_empty());
    }

    #[test]
    fn returns_exactly_horizon_records() {
        let h = history_from(d(2021, 1, 1), &[3; 10]);
        assert_eq!(forecast(&h, 0).len(), 0);
        assert_eq!(forecast(&h, DEFAULT_HORIZON).len(), 7);
        assert_eq!(forecast(&h, DASHBOARD_HORIZON).len(), 14);
    }

    #[test]
    fn perfectly_linear_history_is_continued_exactly() {
        let cases: Vec<u64> = (0..10).map(|i| 100 + 10 * i).collect();
        let h = history_from(d(2021, 3, 1), &cases);

        let out = forecast(&h, 3);
        let values: Vec<u64> = out.iter().map(|r| r.cases).collect();
        assert_eq!(values, vec![200, 210, 220]);
        assert!(out.iter().all(|r| r.is_forecast));
    }

    #[test]
    fn fit_recovers_slope_and_intercept() {
        let cases: Vec<u64> = (0..10).map(|i| 100 + 10 * i).collect();
        let h = history_from(d(2021, 3, 1), &cases);
        let fit = LinearFit::fit(&h).unwrap();
        assert!((fit.slope - 10.0).abs() < 1e-9);
        assert!((fit.intercept - 100.0).abs() < 1e-9);
    }

    #[test]
    fn dates_roll_over_month_and_year() {
        // Last historical date is 2021-01-30.
        let h = history_from(d(2021, 1, 21), &[1; 10]);
        let dates: Vec<_> = forecast(&h, 3).iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2021, 1, 31), d(2021, 2, 1), d(2021, 2, 2)]);

        // Last historical date is 2020-12-30.
        let h = history_from(d(2020, 12, 21), &[1; 10]);
        let dates: Vec<_> = forecast(&h, 3).iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2020, 12, 31), d(2021, 1, 1), d(2021, 1, 2)]);
    }

    #[test]
    fn leap_day_is_counted() {
        // Last historical date is 2024-02-28.
        let h = history_from(d(2024, 2, 19), &[1; 10]);
        let dates: Vec<_> = forecast(&h, 2).iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 1)]);
    }

    #[test]
    fn steep_decline_is_clamped_at_zero() {
        let cases: Vec<u64> = (0..10).map(|i| 1000 - 100 * i).collect();
        let h = history_from(d(2021, 6, 1), &cases);

        let out = forecast(&h, 5);
        assert_eq!(out.len(), 5);
        // Raw projections are 0, -100, -200, ...
        assert!(out.iter().all(|r| r.cases == 0));
    }

    #[test]
    fn small_negative_projection_rounds_to_zero() {
        assert_eq!(clamp_round(-0.4), 0);
        assert_eq!(clamp_round(-0.6), 0);
        assert_eq!(clamp_round(0.5), 1);
        assert_eq!(clamp_round(2.49), 2);
    }

    #[test]
    fn forecast_dates_strictly_increase() {
        let h = history_from(d(2021, 12, 1), &[4, 8, 1, 9, 3, 7, 2, 8, 5, 6, 11]);
        let out = forecast(&h, DASHBOARD_HORIZON);
        assert!(out.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(out[0].date, d(2021, 12, 12));
    }

    #[test]
    fn uses_input_order_as_x() {
        // A gap in dates does not change the index-based fit.
        let mut h = history_from(d(2021, 1, 1), &[10; 10]);
        h[9].date = d(2021, 2, 1);
        let out = forecast(&h, 1);
        assert_eq!(out[0].date, d(2021, 2, 2));
        assert_eq!(out[0].cases, 10);
    }

    #[test]
    fn is_idempotent() {
        let h = history_from(d(2021, 1, 1), &[5, 9, 14, 13, 20, 22, 30, 29, 35, 41]);
        assert_eq!(forecast(&h, 10), forecast(&h, 10));
    }

    #[test]
    fn huge_horizon_is_capped_without_panicking() {
        let h = history_from(d(2021, 1, 1), &[5; 10]);
        let out = forecast(&h, usize::MAX);
        assert_eq!(out.len(), MAX_HORIZON);
        assert!(out.iter().all(|r| r.cases == 5));
        assert_eq!(out[0].date, d(2021, 1, 11));
    }

    #[test]
    fn stops_at_last_representable_date() {
        let start = NaiveDate::MAX - chrono::Duration::days(11);
        let h = history_from(start, &[5; 10]);
        // Last historical date is two days before NaiveDate::MAX.
        let out = forecast(&h, DEFAULT_HORIZON);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].date, NaiveDate::MAX);
    }

    #[test]
    fn check_horizon_bounds() {
        assert_eq!(check_horizon(0).unwrap(), 0);
        assert_eq!(check_horizon(MAX_HORIZON).unwrap(), MAX_HORIZON);
        assert!(check_horizon(MAX_HORIZON + 1).is_err());
        assert!(check_horizon(usize::MAX).is_err());
    }

    #[test]
    fn fit_needs_two_points() {
        assert_eq!(LinearFit::fit(&[]), None);
        let one = history_from(d(2021, 1, 1), &[42]);
        assert_eq!(LinearFit::fit(&one), None);
    }

    #[test]
    fn fit_on_two_points_is_exact_line() {
        let two = history_from(d(2021, 1, 1), &[10, 30]);
        let fit = LinearFit::fit(&two).unwrap();
        assert!((fit.slope - 20.0).abs() < 1e-9);
        assert!((fit.intercept - 10.0).abs() < 1e-9);
        assert!((fit.predict_at(2.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_counts_stay_finite_and_saturate() {
        let huge = history_from(d(2021, 1, 1), &[u64::MAX; 10]);
        let fit = LinearFit::fit(&huge).unwrap();
        assert!(fit.slope.is_finite() && fit.intercept.is_finite());

        let out = forecast(&huge, 3);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.cases == u64::MAX));
    }
}
