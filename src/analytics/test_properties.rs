//! Property-based tests for aggregation invariants.
//!
//! Arbitrary entry sets and window configurations must keep bucket totals,
//! window ordering, trend shape and kit ratios consistent.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use super::aggregator::{AnalyticsAccumulator, AnalyticsOptions, aggregate};
use super::labels::Locale;
use crate::records::LogEntry;

// ──────────────────── strategies ────────────────────

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 18, 45, 0).unwrap()
}

fn arb_kit() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("Kit Pro".to_string())),
        Just(Some("Kit Basic".to_string())),
        Just(Some("  Kit Pro  ".to_string())),
        Just(Some("Mesh".to_string())),
        Just(Some("   ".to_string())),
    ]
}

fn arb_minutes() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), (0.0f64..240.0).prop_map(Some)]
}

fn arb_entry() -> impl Strategy<Value = LogEntry> {
    // Roughly 500 days back to 2 days ahead of the anchor.
    (-43_200_000i64..172_800, arb_minutes(), arb_kit()).prop_map(|(offset, minutes, kit)| {
        LogEntry {
            timestamp: anchor() + Duration::seconds(offset),
            execution_minutes: minutes,
            aigent_id: None,
            client_address: None,
            bandwidth: None,
            kit_confirmation: kit,
        }
    })
}

fn arb_options() -> impl Strategy<Value = AnalyticsOptions> {
    (
        1u32..60,
        1u32..40,
        1u32..120,
        1u32..400,
        0.0f64..90.0,
        prop_oneof![Just(Locale::Es), Just(Locale::En)],
    )
        .prop_map(|(trend, week, month, year, manual, locale)| AnalyticsOptions {
            manual_flow_minutes: manual,
            trend_days: trend,
            week_window_days: week,
            month_window_days: month,
            year_window_days: year,
            locale,
        })
}

fn arb_zone() -> impl Strategy<Value = FixedOffset> {
    (-12i32..=14).prop_map(|hours| FixedOffset::east_opt(hours * 3600).unwrap())
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn bucket_executions_sum_to_entry_count(
        entries in prop::collection::vec(arb_entry(), 0..80),
        options in arb_options(),
        zone in arb_zone(),
    ) {
        let mut acc = AnalyticsAccumulator::new(anchor(), &zone, &options);
        for entry in &entries {
            acc.push(entry);
        }
        let buckets = acc.buckets();
        let total: u64 = buckets.iter().map(|b| b.executions).sum();
        prop_assert_eq!(total, entries.len() as u64);
        for bucket in buckets {
            prop_assert!(bucket.execution_samples <= bucket.executions);
        }
    }

    #[test]
    fn window_counts_are_monotonic(
        entries in prop::collection::vec(arb_entry(), 0..80),
        options in arb_options(),
    ) {
        let windows = options.windows();
        prop_assert!(windows.trend_days <= windows.week_days);
        prop_assert!(windows.week_days <= windows.month_days);
        prop_assert!(windows.month_days <= windows.year_days);

        let result = aggregate(&entries, anchor(), &Utc, &options);
        let counts = result.metrics.executions;
        prop_assert!(counts.day <= counts.week);
        prop_assert!(counts.week <= counts.month);
        prop_assert!(counts.month <= counts.year);
        prop_assert!(counts.year <= result.totals.entries);
    }

    #[test]
    fn trend_has_requested_length_and_ends_today(
        entries in prop::collection::vec(arb_entry(), 0..40),
        options in arb_options(),
        zone in arb_zone(),
    ) {
        let result = aggregate(&entries, anchor(), &zone, &options);
        prop_assert_eq!(result.trend.len(), options.trend_days as usize);
        for pair in result.trend.windows(2) {
            prop_assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
        }
        let today: NaiveDate = anchor().with_timezone(&zone).date_naive();
        prop_assert_eq!(result.trend.last().map(|p| p.date), Some(today));
    }

    #[test]
    fn kit_ratios_sum_to_labeled_share(
        entries in prop::collection::vec(arb_entry(), 1..80),
        options in arb_options(),
    ) {
        let result = aggregate(&entries, anchor(), &Utc, &options);
        let labeled = entries
            .iter()
            .filter(|e| e.kit_confirmation.as_deref().is_some_and(|k| !k.trim().is_empty()))
            .count();
        let ratio_sum: f64 = result.popular_kits.iter().map(|k| k.ratio).sum();
        let expected = labeled as f64 / entries.len() as f64;
        prop_assert!((ratio_sum - expected).abs() < 1e-9, "{ratio_sum} vs {expected}");
        for pair in result.popular_kits.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn aggregation_is_idempotent(
        entries in prop::collection::vec(arb_entry(), 0..60),
        options in arb_options(),
    ) {
        let first = aggregate(&entries, anchor(), &Utc, &options);
        let second = aggregate(&entries, anchor(), &Utc, &options);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn counts_ignore_input_order(
        entries in prop::collection::vec(arb_entry(), 0..60),
        options in arb_options(),
    ) {
        let forward = aggregate(&entries, anchor(), &Utc, &options);
        let reversed: Vec<LogEntry> = entries.iter().rev().cloned().collect();
        let backward = aggregate(&reversed, anchor(), &Utc, &options);
        prop_assert_eq!(forward.metrics.executions, backward.metrics.executions);
        prop_assert_eq!(forward.totals.entries, backward.totals.entries);
        prop_assert_eq!(forward.totals.execution_samples, backward.totals.execution_samples);
        let counts = |r: &super::aggregator::AnalyticsResult| {
            r.trend.iter().map(|p| p.executions).collect::<Vec<_>>()
        };
        prop_assert_eq!(counts(&forward), counts(&backward));
    }
}
