//! Per-year summary statistics and their wholesale republication.
//!
//! Aggregates are recomputed from scratch on every run and the aggregate
//! collection is dropped and recreated before the new set is written. There
//! is no per-row upsert key to patch against, and stale rows from a prior
//! run (a year that vanished from the source) must not survive a recompute.
//! This is an eventually-consistent replace, not an atomic swap; readers may
//! briefly observe an empty collection mid-publish.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;

use crate::models::{RawRecord, YearAggregate};
use crate::store::{BulkOutcome, DocumentStore, StoreError};

/// Highest overall place counted toward the top-100 average.
const TOP_PLACE_CUTOFF: i64 = 100;

/// Compute one [`YearAggregate`] per distinct year, sorted by year.
///
/// A column with zero eligible records for a year is absent, never zero:
/// a year where nobody recorded a finish time has no winning time.
pub fn compute_year_aggregates(records: &[RawRecord]) -> Vec<YearAggregate> {
    let mut by_year: BTreeMap<i64, Vec<&RawRecord>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year).or_default().push(record);
    }

    by_year
        .into_iter()
        .map(|(year, group)| {
            let total_runners = group.len() as u64;

            let finish_times: Vec<i64> =
                group.iter().filter_map(|r| r.finish_seconds).collect();
            let finishers_count = finish_times.len() as u64;

            let winning_time = finish_times.iter().min().map(|&s| s as f64);

            let top_times: Vec<f64> = group
                .iter()
                .filter(|r| r.overall.is_some_and(|p| p <= TOP_PLACE_CUTOFF))
                .filter_map(|r| r.finish_seconds)
                .map(|s| s as f64)
                .collect();
            let avg_100th_place_time = if top_times.is_empty() {
                None
            } else {
                Some(top_times.iter().sum::<f64>() / top_times.len() as f64)
            };

            YearAggregate {
                year,
                finishers_count,
                total_runners,
                winning_time,
                avg_100th_place_time,
            }
        })
        .collect()
}

/// Publish the full aggregate set, replacing any prior collection.
///
/// Drop if present, recreate, then apply everything as one bulk write.
pub async fn publish_aggregates(
    store: &dyn DocumentStore,
    index: &str,
    aggregates: &[YearAggregate],
) -> Result<BulkOutcome> {
    match store.delete_index(index).await {
        Ok(()) => {}
        Err(err)
            if matches!(
                err.downcast_ref::<StoreError>(),
                Some(StoreError::IndexNotFound(_))
            ) => {}
        Err(err) => return Err(err),
    }
    store.create_index(index).await?;

    let docs: Vec<Value> = aggregates.iter().map(YearAggregate::to_document).collect();
    store.bulk_write(index, &docs).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i64, finish_seconds: Option<i64>, overall: Option<i64>) -> RawRecord {
        RawRecord {
            year,
            race: "NYC Marathon".to_string(),
            name: format!("runner-{}-{:?}", year, overall),
            gender: None,
            age: None,
            state: None,
            country: None,
            overall,
            finish_time: finish_seconds.map(crate::timefmt::hms_of_seconds),
            finish_seconds,
            finish_place: None,
        }
    }

    #[test]
    fn test_single_year_worked_example() {
        let records = vec![
            record(2021, Some(100), Some(1)),
            record(2021, Some(200), Some(2)),
            record(2021, None, None),
            record(2021, Some(300), Some(150)),
        ];
        let aggs = compute_year_aggregates(&records);
        assert_eq!(aggs.len(), 1);
        let a = &aggs[0];
        assert_eq!(a.year, 2021);
        assert_eq!(a.finishers_count, 3);
        assert_eq!(a.total_runners, 4);
        assert_eq!(a.winning_time, Some(100.0));
        assert_eq!(a.avg_100th_place_time, Some(150.0));
    }

    #[test]
    fn test_empty_columns_are_absent_not_zero() {
        let records = vec![record(2019, None, None), record(2019, None, Some(5))];
        let aggs = compute_year_aggregates(&records);
        let a = &aggs[0];
        assert_eq!(a.total_runners, 2);
        assert_eq!(a.finishers_count, 0);
        assert_eq!(a.winning_time, None);
        assert_eq!(a.avg_100th_place_time, None);
    }

    #[test]
    fn test_years_sorted_and_grouped() {
        let records = vec![
            record(2021, Some(100), Some(1)),
            record(2019, Some(400), Some(1)),
            record(2021, Some(200), Some(2)),
        ];
        let aggs = compute_year_aggregates(&records);
        let years: Vec<i64> = aggs.iter().map(|a| a.year).collect();
        assert_eq!(years, vec![2019, 2021]);
        assert_eq!(aggs[1].total_runners, 2);
    }

    #[test]
    fn test_winning_time_bounds_top_average() {
        let records = vec![
            record(2020, Some(90), Some(1)),
            record(2020, Some(110), Some(40)),
            record(2020, Some(500), Some(99)),
        ];
        let a = &compute_year_aggregates(&records)[0];
        let (win, avg) = (a.winning_time.unwrap(), a.avg_100th_place_time.unwrap());
        assert!(win <= avg);
    }

    #[test]
    fn test_placeless_finishers_excluded_from_top_average() {
        let records = vec![
            record(2020, Some(100), None),
            record(2020, Some(200), Some(50)),
        ];
        let a = &compute_year_aggregates(&records)[0];
        assert_eq!(a.avg_100th_place_time, Some(200.0));
        assert_eq!(a.finishers_count, 2);
    }

    #[test]
    fn test_empty_input_yields_no_aggregates() {
        assert!(compute_year_aggregates(&[]).is_empty());
    }
}
