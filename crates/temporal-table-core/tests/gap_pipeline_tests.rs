//! Integration test: construct → scan gaps → fill → aggregate, end to end,
//! over a timestamped multi-sensor table.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{DateTime, TimeZone, Utc};
use temporal_table_core::aggregate::Aggregation;
use temporal_table_core::bucketing::{floorer, BucketSpec};
use temporal_table_core::gaps::FillPolicy;
use temporal_table_core::interval::Interval;
use temporal_table_core::schema::Column;
use temporal_table_core::table::error::TableError;
use temporal_table_core::table::TemporalTable;
use temporal_table_core::value::{Datum, IndexDomain, IndexValue, Key, KeyValue};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, minute, 0).unwrap()
}

fn key(s: &str) -> Key {
    Key::new(vec![KeyValue::Utf8(s.to_string())])
}

/// Two sensors sampled every 5 minutes, delivered out of order, with one
/// dropped reading per sensor.
fn raw_columns() -> Vec<Column> {
    vec![
        Column::timestamps(
            "ts",
            [
                ts(10), // west
                ts(0),  // east
                ts(20), // east
                ts(5),  // east
                ts(0),  // west
                ts(20), // west
                ts(15), // east
            ],
        ),
        Column::utf8("sensor", ["west", "east", "east", "east", "west", "west", "east"]),
        Column::f64("reading", [7.1, 1.0, 5.0, 2.0, 7.0, 7.4, 4.0]),
    ]
}

#[test]
fn pipeline_survives_construct_fill_and_aggregate() -> TestResult {
    let table = TemporalTable::new(raw_columns(), "ts", &["sensor"])?;

    // Five-minute cadence inferred from both partitions pooled.
    assert_eq!(table.schema().index_domain(), IndexDomain::Timestamp);
    assert_eq!(
        table.interval(),
        Interval::Regular {
            ticks: 5 * 60 * 1_000_000
        }
    );

    // east is missing 09:10, west is missing 09:05 and 09:15.
    let report = table.scan_gaps()?;
    assert!(!report.is_gap_free());
    assert_eq!(report.total_missing(), 3);
    assert_eq!(
        report.get(&key("east")).unwrap().missing(),
        &[IndexValue::Timestamp(ts(10))]
    );
    assert_eq!(
        report.get(&key("west")).unwrap().missing(),
        &[
            IndexValue::Timestamp(ts(5)),
            IndexValue::Timestamp(ts(15)),
        ]
    );

    let filled = table.fill_gaps(&FillPolicy::constant(Datum::Float64(0.0)))?;
    assert_eq!(filled.num_rows(), 10);
    assert!(filled.scan_gaps()?.is_gap_free());

    // Every partition is now a contiguous 5-minute run from its original
    // min to max.
    for (_, ticks) in [("east", 0..5), ("west", 5..10)] {
        let idx = &filled.index_values()[ticks];
        for pair in idx.windows(2) {
            assert_eq!(pair[1].ticks() - pair[0].ticks(), 5 * 60 * 1_000_000);
        }
    }

    // Aggregate the filled table into 10-minute buckets.
    let tens = floorer(BucketSpec::Minutes(10), IndexDomain::Timestamp)?;
    let agg = filled.aggregate_index(
        tens,
        &[
            Aggregation::sum("reading", "total"),
            Aggregation::count("reading", "n"),
        ],
    )?;

    // Buckets 09:00, 09:10, 09:20 for each sensor.
    assert_eq!(agg.num_rows(), 6);
    let east = agg.partition(&key("east")).unwrap();
    let east_totals: Vec<f64> = agg.column("total").unwrap()[east]
        .iter()
        .map(|d| d.as_f64().unwrap())
        .collect();
    // 09:00 ∪ 09:05 = 3.0, 09:10 (filled 0.0) ∪ 09:15 = 4.0, 09:20 = 5.0.
    assert_eq!(east_totals, vec![3.0, 4.0, 5.0]);

    Ok(())
}

#[test]
fn filter_index_then_rescan_shows_boundary_effects() -> TestResult {
    let table = TemporalTable::new(raw_columns(), "ts", &["sensor"])?;

    // Half-open range keeps 09:00 ≤ ts < 09:20.
    let trimmed = table.filter_index(
        IndexValue::Timestamp(ts(0))..IndexValue::Timestamp(ts(20)),
    );
    assert_eq!(trimmed.num_rows(), 5);
    assert!(trimmed
        .index_values()
        .iter()
        .all(|v| *v < IndexValue::Timestamp(ts(20))));

    // Interval metadata survives the filter; gaps are re-derived on demand.
    // east keeps 09:00, 09:05, 09:15 (09:10 still missing); west keeps
    // 09:00, 09:10 (09:05 missing).
    assert_eq!(trimmed.interval(), table.interval());
    let report = trimmed.scan_gaps()?;
    assert_eq!(report.total_missing(), 2);

    Ok(())
}

#[test]
fn duplicate_observations_fail_construction_with_all_pairs() {
    let cols = vec![
        Column::timestamps("ts", [ts(0), ts(0), ts(5), ts(5), ts(10)]),
        Column::utf8("sensor", ["east", "east", "east", "east", "east"]),
        Column::f64("reading", [1.0, 1.5, 2.0, 2.5, 3.0]),
    ];
    let err = TemporalTable::new(cols, "ts", &["sensor"]).unwrap_err();
    match err {
        TableError::DuplicateKeyIndex { pairs } => {
            assert_eq!(
                pairs,
                vec![
                    (key("east"), IndexValue::Timestamp(ts(0))),
                    (key("east"), IndexValue::Timestamp(ts(5))),
                ]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn interval_metadata_serializes_with_the_schema() -> TestResult {
    let table = TemporalTable::new(raw_columns(), "ts", &["sensor"])?;

    let json = serde_json::to_string(&table.interval())?;
    let back: Interval = serde_json::from_str(&json)?;
    assert_eq!(back, table.interval());

    let schema_json = serde_json::to_string(table.schema())?;
    assert!(schema_json.contains("\"sensor\""));

    Ok(())
}
