use crate::domain::series::{AlignedRecord, MetricSeries};
use std::collections::BTreeSet;

/// Merges up to three sparse series onto their shared date axis.
///
/// The result has one record per distinct date across the present inputs,
/// in ascending calendar order. A metric that is absent, or has no value on a
/// given date, contributes `0` there. All three absent yields an empty vec.
pub fn align(
    cases: Option<&MetricSeries>,
    recovered: Option<&MetricSeries>,
    vaccines: Option<&MetricSeries>,
) -> Vec<AlignedRecord> {
    let dates: BTreeSet<_> = [cases, recovered, vaccines]
        .into_iter()
        .flatten()
        .flat_map(|series| series.keys().copied())
        .collect();

    dates
        .into_iter()
        .map(|date| AlignedRecord {
            date,
            cases: value_at(cases, &date),
            recovered: value_at(recovered, &date),
            vaccines: value_at(vaccines, &date),
        })
        .collect()
}

fn value_at(series: Option<&MetricSeries>, date: &chrono::NaiveDate) -> u64 {
    match series {
        Some(s) => s.get(date).copied().unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, u64)]) -> MetricSeries {
        points.iter().copied().collect()
    }

    #[test]
    fn all_absent_is_empty() {
        assert!(align(None, None, None).is_empty());
    }

    #[test]
    fn union_of_dates_sorted_without_duplicates() {
        let cases = series(&[(d(2021, 1, 3), 30), (d(2021, 1, 1), 10)]);
        let recovered = series(&[(d(2021, 1, 2), 5), (d(2021, 1, 3), 6)]);
        let vaccines = series(&[(d(2020, 12, 31), 1)]);

        let out = align(Some(&cases), Some(&recovered), Some(&vaccines));
        let dates: Vec<_> = out.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![d(2020, 12, 31), d(2021, 1, 1), d(2021, 1, 2), d(2021, 1, 3)]
        );
        assert!(out.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn zero_fills_missing_dates_and_absent_series() {
        let cases = series(&[(d(2021, 1, 1), 10), (d(2021, 1, 2), 12)]);
        let vaccines = series(&[(d(2021, 1, 3), 400)]);

        let out = align(Some(&cases), None, Some(&vaccines));
        assert_eq!(
            out,
            vec![
                AlignedRecord { date: d(2021, 1, 1), cases: 10, recovered: 0, vaccines: 0 },
                AlignedRecord { date: d(2021, 1, 2), cases: 12, recovered: 0, vaccines: 0 },
                AlignedRecord { date: d(2021, 1, 3), cases: 0, recovered: 0, vaccines: 400 },
            ]
        );
    }

    #[test]
    fn empty_series_contributes_no_dates() {
        let empty = MetricSeries::new();
        let recovered = series(&[(d(2022, 6, 1), 2)]);
        let out = align(Some(&empty), Some(&recovered), Some(&empty));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cases, 0);
        assert_eq!(out[0].recovered, 2);
    }

    #[test]
    fn calendar_order_crosses_year_boundary() {
        let cases = series(&[(d(2021, 1, 1), 1), (d(2020, 12, 31), 2), (d(2020, 2, 29), 3)]);
        let out = align(Some(&cases), None, None);
        let dates: Vec<_> = out.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2020, 2, 29), d(2020, 12, 31), d(2021, 1, 1)]);
    }

    #[test]
    fn is_idempotent() {
        let cases = series(&[(d(2021, 5, 1), 1), (d(2021, 5, 3), 3)]);
        let recovered = series(&[(d(2021, 5, 2), 2)]);
        let a = align(Some(&cases), Some(&recovered), None);
        let b = align(Some(&cases), Some(&recovered), None);
        assert_eq!(a, b);
    }
}
