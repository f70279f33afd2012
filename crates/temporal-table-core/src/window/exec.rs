//! Execution strategies for the window families.
//!
//! Key partitions are independent — no invariant couples one key's windows
//! to another's — so the engine may fan partitions out over a worker pool.
//! Reductions must be pure (side-effect-free) for parallel dispatch to be
//! sound; this is a documented precondition, not something the engine can
//! check. Result collection preserves key-major, anchor-ascending order
//! regardless of completion order, so both strategies produce identical
//! output.
//!
//! Error policy: fail-fast. The first failing reduction aborts the call
//! with [`TableError::Reduction`] context; work already running for other
//! keys completes and is discarded.

use rayon::prelude::*;

use crate::table::error::{CallableError, TableError};
use crate::table::TemporalTable;
use crate::window::{anchor_row, plan_windows, WindowMode, WindowResult, WindowSpec, WindowView};

/// Strategy parameter selecting sequential or multi-worker execution.
///
/// Both strategies honor the same ordering contract; `Parallel` is purely a
/// resource-utilization choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// One partition after another on the calling thread.
    #[default]
    Sequential,
    /// One worker per key partition on a dedicated thread pool.
    Parallel,
}

/// Resolve the worker thread count for a partition-parallel dispatch.
fn resolve_worker_threads(num_partitions: usize) -> usize {
    let logical = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if num_partitions == 0 {
        1
    } else {
        num_partitions.min(logical)
    }
}

/// Run one window family over every partition of `tables`.
///
/// `tables` is the full operand list (the receiver first); all operands
/// have already been checked for identical (key, index) structure.
fn run_windows<T, F>(
    tables: &[&TemporalTable],
    mode: WindowMode,
    spec: &WindowSpec,
    exec: Execution,
    reduce: F,
) -> Result<Vec<WindowResult<T>>, TableError>
where
    T: Send,
    F: Fn(&[WindowView<'_>]) -> Result<T, CallableError> + Sync,
{
    spec.validate()?;
    let primary = tables[0];

    let run_partition = |part: usize| -> Result<Vec<WindowResult<T>>, TableError> {
        let (key, range) = &primary.partition_slices()[part];
        let plans = plan_windows(mode, spec, range.len());
        let mut results = Vec::with_capacity(plans.len());

        for rel in plans {
            let views: Vec<WindowView<'_>> = tables
                .iter()
                .map(|t| {
                    let start = t.partition_slices()[part].1.start;
                    WindowView {
                        table: t,
                        key,
                        rows: start + rel.start..start + rel.end,
                    }
                })
                .collect();
            let anchor_pos = range.start + anchor_row(spec.align, &rel);
            let anchor = primary.index[anchor_pos];

            let value = reduce(&views).map_err(|source| TableError::Reduction {
                key: key.clone(),
                anchor,
                source,
            })?;
            results.push(WindowResult {
                key: key.clone(),
                anchor,
                value,
            });
        }
        Ok(results)
    };

    let num_partitions = primary.num_keys();
    let nested: Vec<Vec<WindowResult<T>>> = match exec {
        Execution::Sequential => (0..num_partitions)
            .map(run_partition)
            .collect::<Result<_, _>>()?,
        Execution::Parallel => {
            let threads = resolve_worker_threads(num_partitions);
            log::debug!(
                "windowing {num_partitions} partition(s) over {threads} worker thread(s)"
            );
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| TableError::WorkerPool {
                    detail: e.to_string(),
                })?;
            // Indexed collect is the stable merge: results land in
            // partition order no matter which worker finishes first.
            pool.install(|| {
                (0..num_partitions)
                    .into_par_iter()
                    .map(run_partition)
                    .collect::<Result<_, _>>()
            })?
        }
    };

    Ok(nested.into_iter().flatten().collect())
}

/// Verify that `other` shares this table's (key, index) structure.
fn ensure_aligned(
    primary: &TemporalTable,
    other: &TemporalTable,
    position: usize,
) -> Result<(), TableError> {
    if primary.num_keys() != other.num_keys() {
        return Err(TableError::MisalignedInputs {
            detail: format!(
                "input {position} has {} key(s), expected {}",
                other.num_keys(),
                primary.num_keys()
            ),
        });
    }
    for ((ka, ra), (kb, rb)) in primary
        .partition_slices()
        .iter()
        .zip(other.partition_slices())
    {
        if ka != kb {
            return Err(TableError::MisalignedInputs {
                detail: format!("input {position} has key {kb} where {ka} was expected"),
            });
        }
        if ra.len() != rb.len() {
            return Err(TableError::MisalignedInputs {
                detail: format!(
                    "input {position} has {} row(s) for key {ka}, expected {}",
                    rb.len(),
                    ra.len()
                ),
            });
        }
        let ia = &primary.index[ra.clone()];
        let ib = &other.index[rb.clone()];
        if let Some(pos) = ia.iter().zip(ib).position(|(a, b)| a != b) {
            return Err(TableError::MisalignedInputs {
                detail: format!(
                    "input {position} diverges for key {ka} at row {pos}: {} vs {}",
                    ib[pos], ia[pos]
                ),
            });
        }
    }
    Ok(())
}

/// Check every operand against the first, eagerly, before any window runs.
fn ensure_all_aligned(tables: &[&TemporalTable]) -> Result<(), TableError> {
    let (primary, rest) = match tables.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };
    for (i, other) in rest.iter().enumerate() {
        ensure_aligned(primary, other, i + 1)?;
    }
    Ok(())
}

impl TemporalTable {
    /// Sliding windows: fixed `spec.size`, advancing by `spec.step`.
    ///
    /// With `Partial::Forbidden` a partition of length `N` yields
    /// `⌈(N − size + 1) / step⌉` windows (none when `N < size`); with
    /// `Partial::Allowed`, shrinking boundary windows are emitted at both
    /// ends as well. Results are in key-major, anchor-ascending order.
    ///
    /// `reduce` must be pure; under [`Execution::Parallel`] partitions run
    /// concurrently and the first failure aborts the call (fail-fast).
    pub fn slide<T, F>(
        &self,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        run_windows(&[self], WindowMode::Sliding, spec, exec, |views| {
            reduce(&views[0])
        })
    }

    /// Tiling windows: non-overlapping chunks of `spec.size`.
    ///
    /// `⌊N / size⌋` full tiles; `Partial::Allowed` keeps the single
    /// trailing remainder tile, `Partial::Forbidden` drops it. `spec.step`
    /// is ignored — tiles abut by definition.
    pub fn tile<T, F>(
        &self,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        run_windows(&[self], WindowMode::Tiling, spec, exec, |views| {
            reduce(&views[0])
        })
    }

    /// Stretching windows: anchored at the partition start, the first
    /// window spans `spec.size` rows and each successive window extends the
    /// end by `spec.step`; the final window always covers the whole
    /// partition.
    pub fn stretch<T, F>(
        &self,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        run_windows(&[self], WindowMode::Stretching, spec, exec, |views| {
            reduce(&views[0])
        })
    }

    /// Paired sliding windows over two index-aligned tables.
    ///
    /// Both tables must share identical (key, index) structure — checked
    /// eagerly, before any window runs — else
    /// [`TableError::MisalignedInputs`].
    pub fn slide2<T, F>(
        &self,
        other: &TemporalTable,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>, &WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        let tables = [self, other];
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Sliding, spec, exec, |views| {
            reduce(&views[0], &views[1])
        })
    }

    /// Sliding windows over a list of index-aligned tables (the receiver
    /// first). See [`TemporalTable::slide2`] for the alignment contract.
    pub fn slide_many<T, F>(
        &self,
        others: &[&TemporalTable],
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&[WindowView<'_>]) -> Result<T, CallableError> + Sync,
    {
        let mut tables = Vec::with_capacity(1 + others.len());
        tables.push(self);
        tables.extend_from_slice(others);
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Sliding, spec, exec, reduce)
    }

    /// Paired tiling windows over two index-aligned tables.
    pub fn tile2<T, F>(
        &self,
        other: &TemporalTable,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>, &WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        let tables = [self, other];
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Tiling, spec, exec, |views| {
            reduce(&views[0], &views[1])
        })
    }

    /// Tiling windows over a list of index-aligned tables.
    pub fn tile_many<T, F>(
        &self,
        others: &[&TemporalTable],
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&[WindowView<'_>]) -> Result<T, CallableError> + Sync,
    {
        let mut tables = Vec::with_capacity(1 + others.len());
        tables.push(self);
        tables.extend_from_slice(others);
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Tiling, spec, exec, reduce)
    }

    /// Paired stretching windows over two index-aligned tables.
    pub fn stretch2<T, F>(
        &self,
        other: &TemporalTable,
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&WindowView<'_>, &WindowView<'_>) -> Result<T, CallableError> + Sync,
    {
        let tables = [self, other];
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Stretching, spec, exec, |views| {
            reduce(&views[0], &views[1])
        })
    }

    /// Stretching windows over a list of index-aligned tables.
    pub fn stretch_many<T, F>(
        &self,
        others: &[&TemporalTable],
        spec: &WindowSpec,
        exec: Execution,
        reduce: F,
    ) -> Result<Vec<WindowResult<T>>, TableError>
    where
        T: Send,
        F: Fn(&[WindowView<'_>]) -> Result<T, CallableError> + Sync,
    {
        let mut tables = Vec::with_capacity(1 + others.len());
        tables.push(self);
        tables.extend_from_slice(others);
        ensure_all_aligned(&tables)?;
        run_windows(&tables, WindowMode::Stretching, spec, exec, reduce)
    }
}
