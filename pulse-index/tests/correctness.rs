//! Correctness tests for pulse-index.
//!
//! Validates that:
//! 1. Short histories score exactly 50 regardless of value
//! 2. Median values score ~50 and z-scores beyond +/-2 clamp
//! 3. Fixed curves hit their documented anchor points
//! 4. Weighted averages handle equal weights, empties and partial tables
//! 5. Snapshots without a previous period only carry level alerts
//! 6. Determinism: same inputs always produce the same outputs
//! 7. Config overrides reshape weighting without losing the stock-out alert

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone, Utc};
use pulse_index::normalize::{
    normalize_out_of_stock_to_index, normalize_percent_to_index, normalize_position_to_index,
    normalize_to_index, normalize_trend_to_index, DEFAULT_TREND_SCALE,
};
use pulse_index::{
    calculate_weighted_index, evaluate_delta_and_alerts, AlertCode, AlertSeverity, AlertThresholds,
    Category, Granularity, IndexConfig, KpiEngine, Metric, Period, SnapshotInput, WeightedInput,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn week_of(y: i32, m: u32, d: u32) -> Period {
    Period::for_granularity(NaiveDate::from_ymd_opt(y, m, d).unwrap(), Granularity::Week)
}

fn healthy_metrics() -> Vec<Metric> {
    vec![
        Metric::new("revenue", 52_000.0).with_history(vec![48_000.0, 50_000.0, 51_000.0, 49_500.0]),
        Metric::new("gross_margin", 21_000.0).with_history(vec![19_000.0, 20_000.0, 20_500.0]),
        Metric::new("average_order_value", 64.0).with_history(vec![60.0, 62.0, 61.0]),
        Metric::new("repeat_purchase_rate", 31.0).with_history(vec![28.0, 29.0, 30.0]),
        Metric::new("margin_percent", 41.0),
        Metric::new("top_product_revenue_share", 27.0),
        Metric::new("return_rate", 3.1).with_history(vec![3.5, 3.4, 3.6]),
        Metric::new("discount_rate", 8.0).with_history(vec![9.0, 8.5, 9.5]),
        Metric::new("search_click_trend", 6.0),
        Metric::new("average_position", 7.5),
        Metric::new("non_brand_share", 52.0),
        Metric::new("impressions", 90_000.0).with_history(vec![80_000.0, 85_000.0]),
        Metric::new("out_of_stock_percent", 1.5),
        Metric::new("stock_days", 42.0),
        Metric::new("fulfillment_days", 1.5),
        Metric::new("order_volume", 810.0).with_history(vec![760.0, 790.0, 800.0]),
    ]
}

fn input(store: &str, metrics: Vec<Metric>) -> SnapshotInput {
    SnapshotInput {
        store_id: store.into(),
        period: week_of(2025, 3, 3),
        granularity: Granularity::Week,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Normalization scenarios
// ---------------------------------------------------------------------------

#[test]
fn insufficient_history_is_exactly_neutral() {
    for value in [-1e9, 0.0, 42.0, 1e12] {
        assert_eq!(normalize_to_index(value, &[], true), 50.0);
        assert_eq!(normalize_to_index(value, &[7.0], false), 50.0);
        assert_eq!(normalize_to_index(value, &[f64::NAN, 3.0, f64::INFINITY], true), 50.0);
    }
}

#[test]
fn median_of_spread_history_scores_midpoint() {
    let history = [10.0, 20.0, 30.0, 40.0, 50.0];
    let index = normalize_to_index(30.0, &history, true);
    assert!(
        (49.0..=51.0).contains(&index),
        "median scored {} instead of ~50",
        index
    );
}

#[test]
fn three_sigma_clamps_to_100() {
    // mean 50, population sd 10, median 50
    let history = [40.0, 60.0, 40.0, 60.0];
    assert_eq!(normalize_to_index(80.0, &history, true), 100.0);
}

#[test]
fn fixed_curve_anchors() {
    assert_eq!(normalize_position_to_index(1.0), 100.0);
    assert_eq!(normalize_position_to_index(50.0), 0.0);
    assert_eq!(normalize_out_of_stock_to_index(0.0), 100.0);
    assert_eq!(normalize_out_of_stock_to_index(20.0), 0.0);
    for pct in [30.0, 35.5, 42.0, 50.0] {
        assert_eq!(normalize_percent_to_index(pct, 30.0, 50.0), 100.0);
    }
    assert_eq!(normalize_trend_to_index(20.0, DEFAULT_TREND_SCALE), 100.0);
    assert_eq!(normalize_trend_to_index(-20.0, DEFAULT_TREND_SCALE), 0.0);
}

// ---------------------------------------------------------------------------
// Weighted aggregation
// ---------------------------------------------------------------------------

#[test]
fn weighted_index_examples() {
    let mut map = BTreeMap::new();
    map.insert("a", WeightedInput::new(80.0, 0.5));
    map.insert("b", WeightedInput::new(40.0, 0.5));
    assert_eq!(calculate_weighted_index(&map), 60.0);

    let empty: BTreeMap<&str, WeightedInput> = BTreeMap::new();
    assert_eq!(calculate_weighted_index(&empty), 50.0);
}

// ---------------------------------------------------------------------------
// Snapshot assembly
// ---------------------------------------------------------------------------

#[test]
fn healthy_store_has_high_indices_and_no_alerts() {
    let engine = KpiEngine::default();
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let snap = engine.compute_snapshot(&input("store-7", healthy_metrics()), None, at);

    for category in &snap.category_indices {
        assert_eq!(category.components.len(), 4, "{}", category.category);
        assert!(
            category.index >= 60.0,
            "{} scored {}",
            category.category,
            category.index
        );
    }
    assert!(snap.overall_index >= 60.0);
    assert!(snap.alerts.is_empty(), "unexpected alerts: {:?}", snap.alerts);
    assert_eq!(snap.overall_delta, 0.0);
}

#[test]
fn first_period_only_has_floor_alerts() {
    let engine = KpiEngine::default();
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let metrics = vec![
        Metric::new("fulfillment_days", 9.0),
        Metric::new("stock_days", 2.0),
        Metric::new("average_position", 45.0),
        Metric::new("search_click_trend", -18.0),
    ];
    let snap = engine.compute_snapshot(&input("store-12", metrics), None, at);

    assert!(snap.deltas.values().all(|d| *d == 0.0));
    assert!(!snap.alerts.is_empty());
    assert!(snap
        .alerts
        .iter()
        .all(|a| a.code == AlertCode::IndexBelowFloor));
}

#[test]
fn degrading_store_raises_drop_and_stock_out_alerts() {
    let engine = KpiEngine::default();
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let previous = engine.compute_snapshot(&input("store-3", healthy_metrics()), None, at);

    let mut worse = healthy_metrics();
    for metric in &mut worse {
        match metric.key.as_str() {
            "out_of_stock_percent" => metric.value = 11.0,
            "stock_days" => metric.value = 5.0,
            "fulfillment_days" => metric.value = 6.0,
            _ => {}
        }
    }
    let mut current_input = input("store-3", worse);
    current_input.period = week_of(2025, 3, 10);
    let current = engine.compute_snapshot(&current_input, Some(&previous), at);

    assert!(current.deltas[&Category::Operational] < -10.0);
    let codes: Vec<AlertCode> = current.alerts.iter().map(|a| a.code).collect();
    assert!(codes.contains(&AlertCode::IndexDrop));
    assert!(codes.contains(&AlertCode::OutOfStock));
}

#[test]
fn backfilled_deltas_match_direct_evaluation() {
    let engine = KpiEngine::default();
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let previous = engine.compute_snapshot(&input("store-3", healthy_metrics()), None, at);
    let mut late = engine.compute_snapshot(&input("store-3", vec![]), None, at);
    let direct = engine.compute_snapshot(&input("store-3", vec![]), Some(&previous), at);

    let report = evaluate_delta_and_alerts(&late, Some(&previous), &AlertThresholds::default());
    let overall_before = late.overall_index;
    late.apply_delta_report(report);

    assert_eq!(late.overall_index, overall_before);
    assert_eq!(late, direct);
}

#[test]
fn config_overrides_change_the_overall_weighting() {
    let raw = "[category_weights]\ncore = 1.0\nproduct_profitability = 0.0\nseo_performance = 0.0\noperational = 0.0\n";
    let engine = KpiEngine::new(IndexConfig::from_toml_str(raw).unwrap());
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let snap = engine.compute_snapshot(&input("store-7", healthy_metrics()), None, at);
    assert_eq!(
        Some(snap.overall_index),
        snap.category_index(Category::Core)
    );
}

#[test]
fn overridden_operational_table_still_raises_stock_out() {
    let raw = r#"
[categories.operational.components.fulfillment_days]
weight = 0.5
strategy = { kind = "fulfillment_time" }

[categories.operational.components.out_of_stock_percent]
weight = 0.5
strategy = { kind = "out_of_stock" }
"#;
    let engine = KpiEngine::new(IndexConfig::from_toml_str(raw).unwrap());
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
    let metrics = vec![
        Metric::new("fulfillment_days", 1.0),
        Metric::new("out_of_stock_percent", 40.0),
    ];
    let snap = engine.compute_snapshot(&input("store-7", metrics), None, at);

    let stock_outs: Vec<_> = snap
        .alerts
        .iter()
        .filter(|a| a.code == AlertCode::OutOfStock)
        .collect();
    assert_eq!(stock_outs.len(), 1);
    assert_eq!(stock_outs[0].severity, AlertSeverity::Critical);
}

#[test]
fn bundled_sample_config_is_valid() {
    let config = IndexConfig::from_toml_str(include_str!("../../fixtures/pulse.toml")).unwrap();
    assert_eq!(config.thresholds.out_of_stock.critical_pct, 8.0);
    let ops = config.categories.table(Category::Operational);
    assert_eq!(ops.components.len(), 4);
    assert!((ops.total_weight() - 1.0).abs() < 1e-9);
    assert_eq!(config.categories.table(Category::Core).components.len(), 4);
}
