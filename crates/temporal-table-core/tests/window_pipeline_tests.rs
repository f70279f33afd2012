//! Integration test: the window families over a multi-key table, sequential
//! and parallel, single- and multi-input.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use temporal_table_core::schema::Column;
use temporal_table_core::table::error::{CallableError, TableError};
use temporal_table_core::table::TemporalTable;
use temporal_table_core::value::{IndexValue, Key, KeyValue};
use temporal_table_core::window::exec::Execution;
use temporal_table_core::window::{Align, Partial, WindowSpec, WindowView};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn key(s: &str) -> Key {
    Key::new(vec![KeyValue::Utf8(s.to_string())])
}

/// Three turbines, eight hourly readings each.
fn turbine_table() -> TemporalTable {
    let mut t = Vec::new();
    let mut turbine = Vec::new();
    let mut output = Vec::new();
    for (k, base) in [("t1", 100.0), ("t2", 200.0), ("t3", 300.0)] {
        for h in 0..8i64 {
            t.push(h);
            turbine.push(k);
            output.push(base + h as f64);
        }
    }
    TemporalTable::new(
        vec![
            Column::i64("hour", t),
            Column::utf8("turbine", turbine),
            Column::f64("output", output),
        ],
        "hour",
        &["turbine"],
    )
    .unwrap()
}

fn mean_output(view: &WindowView<'_>) -> Result<f64, CallableError> {
    let values = view.numeric("output")?;
    if values.is_empty() {
        return Err(CallableError::new("empty window"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[test]
fn sliding_mean_over_every_turbine() -> TestResult {
    let table = turbine_table();
    let out = table.slide(&WindowSpec::new(3), Execution::Sequential, mean_output)?;

    // 8 − 3 + 1 windows per turbine.
    assert_eq!(out.len(), 3 * 6);

    // First turbine, first window: hours 0..3, mean 101.0, right anchor.
    assert_eq!(out[0].key, key("t1"));
    assert_eq!(out[0].anchor, IndexValue::Ordinal(2));
    assert!((out[0].value - 101.0).abs() < 1e-12);

    // Key-major, anchor-ascending throughout.
    for pair in out.windows(2) {
        assert!(pair[0].key <= pair[1].key);
        if pair[0].key == pair[1].key {
            assert!(pair[0].anchor < pair[1].anchor);
        }
    }
    Ok(())
}

#[test]
fn parallel_execution_is_order_identical() -> TestResult {
    let table = turbine_table();
    let spec = WindowSpec::new(4).with_step(2).with_align(Align::Left);

    let seq = table.slide(&spec, Execution::Sequential, mean_output)?;
    let par = table.slide(&spec, Execution::Parallel, mean_output)?;
    assert_eq!(seq, par);

    let tiles_seq = table.tile(&WindowSpec::new(3), Execution::Sequential, mean_output)?;
    let tiles_par = table.tile(&WindowSpec::new(3), Execution::Parallel, mean_output)?;
    assert_eq!(tiles_seq, tiles_par);
    Ok(())
}

#[test]
fn partial_sliding_grows_and_shrinks_at_the_ends() -> TestResult {
    let table = turbine_table();
    let spec = WindowSpec::new(3).with_partial(Partial::Allowed);
    let out = table.slide(&spec, Execution::Sequential, |w: &WindowView<'_>| {
        Ok::<_, CallableError>(w.len())
    })?;

    // N + size − 1 windows per turbine when partials run at both ends.
    assert_eq!(out.len(), 3 * (8 + 3 - 1));

    let t1_sizes: Vec<usize> = out
        .iter()
        .filter(|r| r.key == key("t1"))
        .map(|r| r.value)
        .collect();
    assert_eq!(t1_sizes, vec![1, 2, 3, 3, 3, 3, 3, 3, 2, 1]);
    Ok(())
}

#[test]
fn tiling_remainder_policy() -> TestResult {
    let table = turbine_table();

    let strict = table.tile(&WindowSpec::new(3), Execution::Sequential, |w: &WindowView<'_>| {
        Ok::<_, CallableError>(w.len())
    })?;
    // ⌊8 / 3⌋ full tiles per turbine.
    assert_eq!(strict.len(), 3 * 2);
    assert!(strict.iter().all(|r| r.value == 3));

    let partial = table.tile(
        &WindowSpec::new(3).with_partial(Partial::Allowed),
        Execution::Sequential,
        |w: &WindowView<'_>| Ok::<_, CallableError>(w.len()),
    )?;
    assert_eq!(partial.len(), 3 * 3);
    let per_key: usize = partial
        .iter()
        .filter(|r| r.key == key("t2"))
        .map(|r| r.value)
        .sum();
    assert_eq!(per_key, 8); // tiles cover each row exactly once
    Ok(())
}

#[test]
fn stretching_covers_increasing_prefixes() -> TestResult {
    let table = turbine_table();
    let out = table.stretch(
        &WindowSpec::new(2).with_step(3),
        Execution::Sequential,
        |w: &WindowView<'_>| Ok::<_, CallableError>(w.len()),
    )?;

    let t3_sizes: Vec<usize> = out
        .iter()
        .filter(|r| r.key == key("t3"))
        .map(|r| r.value)
        .collect();
    // Ends at 2, 5, 8: the final window covers the whole partition.
    assert_eq!(t3_sizes, vec![2, 5, 8]);
    Ok(())
}

#[test]
fn slide2_requires_and_uses_alignment() -> TestResult {
    let output = turbine_table();

    // A second table with identical (key, index) structure.
    let mut t = Vec::new();
    let mut turbine = Vec::new();
    let mut wind = Vec::new();
    for k in ["t1", "t2", "t3"] {
        for h in 0..8i64 {
            t.push(h);
            turbine.push(k);
            wind.push(10.0 + h as f64);
        }
    }
    let wind_table = TemporalTable::new(
        vec![
            Column::i64("hour", t),
            Column::utf8("turbine", turbine),
            Column::f64("wind", wind),
        ],
        "hour",
        &["turbine"],
    )?;

    let out = output.slide2(
        &wind_table,
        &WindowSpec::new(2),
        Execution::Parallel,
        |o: &WindowView<'_>, w: &WindowView<'_>| -> Result<f64, CallableError> {
            let o = o.numeric("output")?;
            let w = w.numeric("wind")?;
            Ok(o.iter().zip(&w).map(|(a, b)| a / b).sum::<f64>())
        },
    )?;
    assert_eq!(out.len(), 3 * 7);

    // Dropping one row from the second operand breaks alignment, eagerly.
    let short = wind_table.filter_index(..IndexValue::Ordinal(7));
    let err = output
        .slide2(
            &short,
            &WindowSpec::new(2),
            Execution::Sequential,
            |_: &WindowView<'_>, _: &WindowView<'_>| Ok(0.0f64),
        )
        .unwrap_err();
    assert!(matches!(err, TableError::MisalignedInputs { .. }));
    Ok(())
}

#[test]
fn one_failing_key_aborts_with_context() {
    let table = turbine_table();
    let err = table
        .slide(
            &WindowSpec::new(2),
            Execution::Sequential,
            |w: &WindowView<'_>| -> Result<f64, CallableError> {
                if w.key() == &key("t2") && w.indices()[0] == IndexValue::Ordinal(4) {
                    return Err(CallableError::new("spurious reading"));
                }
                mean_output(w)
            },
        )
        .unwrap_err();

    match err {
        TableError::Reduction { key: k, anchor, source } => {
            assert_eq!(k, key("t2"));
            assert_eq!(anchor, IndexValue::Ordinal(5));
            assert_eq!(source, CallableError::new("spurious reading"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
