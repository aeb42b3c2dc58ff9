//! Cache-then-fetch behaviour of the data loader against mock ports.

mod common;

use common::*;
use smacross::domain::error::SmacrossError;
use smacross::domain::loader::DataLoader;
use smacross::domain::series::PriceSeries;

fn prefix(series: &PriceSeries, n: usize) -> PriceSeries {
    PriceSeries::new(series.ticker(), series.records()[..n].to_vec())
}

#[test]
fn second_run_makes_no_remote_calls() {
    let full = generate_series("SQQQ", date("2024-01-01"), 40);
    let start = full.first_date().unwrap();
    let end = full.last_date().unwrap();

    let cache = MockCache::new();
    let remote = MockMarketData::new().with_series(full.clone());
    let loader = DataLoader::new(&cache, &remote);

    let first = loader.load("SQQQ", start, end).unwrap();
    assert_eq!(remote.call_count(), 1);
    assert_eq!(cache.write_count(), 1);

    let second = loader.load("SQQQ", start, end).unwrap();
    assert_eq!(remote.call_count(), 1);
    assert_eq!(cache.write_count(), 1);
    assert_eq!(first, second);
    assert_eq!(second, full);
}

#[test]
fn outdated_cache_fetches_only_the_suffix() {
    let full = generate_series("SQQQ", date("2024-01-01"), 61);
    let cached = prefix(&full, 51);
    let last_cached = cached.last_date().unwrap();
    let start = full.first_date().unwrap();
    let end = full.last_date().unwrap();

    let cache = MockCache::new().with_series(cached);
    let remote = MockMarketData::new().with_series(full.clone());

    let loaded = DataLoader::new(&cache, &remote).load("SQQQ", start, end).unwrap();

    let calls = remote.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, last_cached.succ_opt().unwrap());
    assert_eq!(calls[0].2, end);

    assert_eq!(loaded, full);
    assert_eq!(loaded.len(), 61);
    assert!(loaded.dates().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(cache.stored("SQQQ").unwrap(), full);
    assert_eq!(cache.write_count(), 1);
}

#[test]
fn cached_rows_win_over_refetched_duplicates() {
    let full = generate_series("SQQQ", date("2024-01-01"), 10);
    let mut first_rows = full.records()[..5].to_vec();
    first_rows[4].adjusted_close = 999.0;
    let cached = PriceSeries::new("SQQQ", first_rows);

    let merged = cached.merge(full.clone());
    assert_eq!(merged.len(), 10);
    assert_eq!(merged.records()[4].adjusted_close, 999.0);
}

#[test]
fn cache_ending_the_day_before_end_is_current() {
    // Mon 2024-01-08 .. Thu 2024-01-11
    let cached = make_series("SQQQ", date("2024-01-08"), &[10.0, 11.0, 12.0, 13.0]);
    let cache = MockCache::new().with_series(cached.clone());
    let remote = MockMarketData::new();

    let loaded = DataLoader::new(&cache, &remote)
        .load("SQQQ", date("2024-01-08"), date("2024-01-12"))
        .unwrap();

    assert_eq!(remote.call_count(), 0);
    assert_eq!(loaded, cached);
}

#[test]
fn weekend_gap_is_checked_once() {
    // Mon 2024-01-08 .. Fri 2024-01-12, requested through Sun 2024-01-14.
    let cached = make_series("SQQQ", date("2024-01-08"), &[10.0, 11.0, 12.0, 13.0, 14.0]);
    let cache = MockCache::new().with_series(cached.clone());
    let remote = MockMarketData::new().with_series(cached.clone());
    let loader = DataLoader::new(&cache, &remote);

    let loaded = loader.load("SQQQ", date("2024-01-08"), date("2024-01-14")).unwrap();
    {
        let calls = remote.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, date("2024-01-13"));
    }
    assert_eq!(loaded, cached);
    assert_eq!(cache.write_count(), 0);
    assert_eq!(cache.fresh_mark("SQQQ"), Some(date("2024-01-14")));

    let again = loader.load("SQQQ", date("2024-01-08"), date("2024-01-14")).unwrap();
    assert_eq!(remote.call_count(), 1);
    assert_eq!(again, cached);
}

#[test]
fn range_ending_on_weekend_is_fetched_once_from_empty_cache() {
    // Remote data ends Fri 2024-01-12; the range runs through Sun 2024-01-14.
    let remote_series = make_series("SQQQ", date("2024-01-08"), &[10.0, 11.0, 12.0, 13.0, 14.0]);
    let cache = MockCache::new();
    let remote = MockMarketData::new().with_series(remote_series.clone());
    let loader = DataLoader::new(&cache, &remote);

    let first = loader.load("SQQQ", date("2024-01-08"), date("2024-01-14")).unwrap();
    let second = loader.load("SQQQ", date("2024-01-08"), date("2024-01-14")).unwrap();

    assert_eq!(remote.call_count(), 1);
    assert_eq!(cache.write_count(), 1);
    assert_eq!(first, second);
    assert_eq!(second, remote_series);
}

#[test]
fn end_date_in_the_future_is_marked_through_yesterday() {
    let remote_series = make_series("SQQQ", date("2024-01-08"), &[10.0, 11.0, 12.0]);
    let cache = MockCache::new();
    let remote = MockMarketData::new().with_series(remote_series);

    DataLoader::new(&cache, &remote)
        .with_today(date("2024-01-11"))
        .load("SQQQ", date("2024-01-08"), date("2024-12-31"))
        .unwrap();
    assert_eq!(cache.fresh_mark("SQQQ"), Some(date("2024-01-10")));
}

#[test]
fn cache_without_fresh_mark_falls_back_to_last_row() {
    let full = generate_series("SQQQ", date("2024-01-01"), 12);
    let cached = prefix(&full, 10);
    let cache = MockCache::new().with_series(cached.clone());
    let remote = MockMarketData::new().with_series(full.clone());

    let loaded = DataLoader::new(&cache, &remote)
        .load("SQQQ", full.first_date().unwrap(), full.last_date().unwrap())
        .unwrap();

    assert_eq!(remote.calls.borrow()[0].1, cached.last_date().unwrap().succ_opt().unwrap());
    assert_eq!(loaded, full);
    assert_eq!(cache.fresh_mark("SQQQ"), full.last_date());
}

#[test]
fn result_is_restricted_to_requested_range() {
    let full = generate_series("SQQQ", date("2024-01-01"), 30);
    let cache = MockCache::new().with_series(full.clone());
    let remote = MockMarketData::new().with_series(full.clone());

    let start = full.records()[5].date;
    let end = full.records()[9].date;
    let loaded = DataLoader::new(&cache, &remote).load("SQQQ", start, end).unwrap();

    assert_eq!(loaded.len(), 5);
    assert_eq!(loaded.first_date(), Some(start));
    assert_eq!(loaded.last_date(), Some(end));
    assert_eq!(remote.call_count(), 0);
    // The cache keeps the full series.
    assert_eq!(cache.stored("SQQQ").unwrap().len(), 30);
}

#[test]
fn cache_starting_after_start_date_is_not_backfilled() {
    let full = generate_series("SQQQ", date("2024-01-01"), 20);
    let late = PriceSeries::new("SQQQ", full.records()[10..].to_vec());
    let cache = MockCache::new().with_series(late.clone());
    let remote = MockMarketData::new().with_series(full.clone());

    let loaded = DataLoader::new(&cache, &remote)
        .load("SQQQ", full.first_date().unwrap(), full.last_date().unwrap())
        .unwrap();

    assert_eq!(remote.call_count(), 0);
    assert_eq!(loaded, late);
}

#[test]
fn unavailable_remote_on_empty_cache_fails_without_writing() {
    let cache = MockCache::new();
    let remote = MockMarketData::unavailable();

    let err = DataLoader::new(&cache, &remote)
        .load("SQQQ", date("2024-01-01"), date("2024-03-01"))
        .unwrap_err();

    assert!(matches!(err, SmacrossError::DataSourceUnavailable { .. }));
    assert_eq!(cache.write_count(), 0);
    assert!(cache.stored("SQQQ").is_none());
}

#[test]
fn unknown_ticker_is_no_data() {
    let cache = MockCache::new();
    let remote = MockMarketData::new();

    let err = DataLoader::new(&cache, &remote)
        .load("NOPE", date("2024-01-01"), date("2024-03-01"))
        .unwrap_err();

    assert!(err.is_data_source_unavailable());
    assert!(matches!(err, SmacrossError::NoData { .. }));
}

#[test]
fn start_after_end_is_rejected_before_any_io() {
    let cache = MockCache::new();
    let remote = MockMarketData::new();

    let err = DataLoader::new(&cache, &remote)
        .load("SQQQ", date("2024-03-01"), date("2024-01-01"))
        .unwrap_err();

    assert!(matches!(err, SmacrossError::InvalidParameter { .. }));
    assert_eq!(remote.call_count(), 0);
}
