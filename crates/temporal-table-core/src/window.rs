//! Rolling-window computation over ordered key partitions.
//!
//! Three window families, named after how the window moves:
//!
//! - **sliding** ([`TemporalTable::slide`]) — fixed-size windows advancing
//!   by `step`; consecutive windows overlap by `size − step` rows.
//! - **tiling** ([`TemporalTable::tile`]) — non-overlapping fixed-size
//!   chunks partitioning the sequence.
//! - **stretching** ([`TemporalTable::stretch`]) — expanding windows
//!   anchored at the partition start, growing by `step` from an initial
//!   `size`.
//!
//! Each realized window is labeled with an anchor index chosen by
//! [`Align`], reduced by an opaque caller function, and emitted in
//! key-major, anchor-ascending order. Multi-input variants (`slide2`,
//! `slide_many`, …) feed aligned windows of several tables to the reduction
//! jointly; execution is sequential or partition-parallel per
//! [`Execution`] (see [`exec`]).

pub mod exec;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::table::error::CallableError;
use crate::table::TemporalTable;
use crate::value::{Datum, IndexValue, Key};

/// How a window family advances (internal; the public API names the family
/// through the method invoked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowMode {
    Sliding,
    Tiling,
    Stretching,
}

/// Which index of a realized window labels its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Align {
    /// The window's first index.
    Left,
    /// The window's middle index; even sizes round down.
    Center,
    /// The window's last index (the default).
    #[default]
    Right,
}

/// Whether shrunken windows at sequence boundaries are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Partial {
    /// Emit boundary windows smaller than the nominal size.
    Allowed,
    /// Only full-size windows (the default).
    #[default]
    Forbidden,
}

/// Size, stride, alignment and boundary policy of a window family.
///
/// For sliding and tiling, `size` is the window length in rows and `step`
/// the stride between window starts (tiling ignores `step`; tiles abut).
/// For stretching, `size` is the initial window length and `step` the
/// growth per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Window length in rows (initial length for stretching). Must be ≥ 1.
    pub size: usize,
    /// Stride between window starts (growth for stretching). Must be ≥ 1.
    pub step: usize,
    /// Anchor placement.
    pub align: Align,
    /// Boundary policy.
    pub partial: Partial,
}

impl WindowSpec {
    /// A spec of `size` rows with step 1, right alignment, no partials.
    pub fn new(size: usize) -> Self {
        WindowSpec {
            size,
            step: 1,
            align: Align::Right,
            partial: Partial::Forbidden,
        }
    }

    /// Replace the stride.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Replace the anchor placement.
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Replace the boundary policy.
    pub fn with_partial(mut self, partial: Partial) -> Self {
        self.partial = partial;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), crate::table::error::TableError> {
        if self.size == 0 || self.step == 0 {
            return Err(crate::table::error::TableError::InvalidWindow {
                detail: format!(
                    "size and step must be at least 1 (size={}, step={})",
                    self.size, self.step
                ),
            });
        }
        Ok(())
    }
}

/// One window's computed value, labeled with its key and anchor index.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult<T> {
    /// The partition the window was computed over.
    pub key: Key,
    /// The index labeling the window, per the spec's [`Align`].
    pub anchor: IndexValue,
    /// The reduction's output.
    pub value: T,
}

/// A borrowed, window-sized view into one partition of a table.
///
/// Reductions receive these; rows are in index order.
#[derive(Debug, Clone)]
pub struct WindowView<'a> {
    pub(crate) table: &'a TemporalTable,
    pub(crate) key: &'a Key,
    pub(crate) rows: Range<usize>,
}

impl<'a> WindowView<'a> {
    /// The partition's key.
    pub fn key(&self) -> &Key {
        self.key
    }

    /// Number of rows in the window.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the window holds no rows (never the case for emitted
    /// windows).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The window's index values, ascending.
    pub fn indices(&self) -> &'a [IndexValue] {
        &self.table.index[self.rows.clone()]
    }

    /// The window's cells of one column, in index order.
    pub fn values(&self, column: &str) -> Option<&'a [Datum]> {
        self.table
            .column(column)
            .map(|cells| &cells[self.rows.clone()])
    }

    /// Numeric view of one column's window cells (nulls skipped).
    ///
    /// Fails when the column does not exist, which is the common
    /// mis-configuration inside a reduction.
    pub fn numeric(&self, column: &str) -> Result<Vec<f64>, CallableError> {
        self.values(column)
            .map(|cells| cells.iter().filter_map(Datum::as_f64).collect())
            .ok_or_else(|| CallableError::new(format!("no column named {column}")))
    }
}

/// Enumerate the realized window row-ranges for one partition of `n` rows.
///
/// Ranges are emitted in ascending start order, which — windows being
/// contiguous row runs — is also ascending anchor order for every [`Align`].
pub(crate) fn plan_windows(mode: WindowMode, spec: &WindowSpec, n: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    if n == 0 {
        return out;
    }
    let size = spec.size;
    let step = spec.step;

    match mode {
        WindowMode::Sliding => {
            // Offsets where the kernel intersects the sequence. With
            // partials, starts run from -(size-1) so shrinking windows
            // appear at both ends.
            let n = n as i64;
            let (size, step) = (size as i64, step as i64);
            let mut start = match spec.partial {
                Partial::Allowed => -(size - 1),
                Partial::Forbidden => 0,
            };
            while start < n {
                let lo = start.max(0);
                let hi = (start + size).min(n);
                if hi > lo {
                    match spec.partial {
                        Partial::Allowed => out.push(lo as usize..hi as usize),
                        Partial::Forbidden => {
                            if hi - lo == size {
                                out.push(lo as usize..hi as usize);
                            } else {
                                break; // only truncated windows remain
                            }
                        }
                    }
                }
                start += step;
            }
        }
        WindowMode::Tiling => {
            let mut lo = 0usize;
            while lo < n {
                let hi = (lo + size).min(n);
                if hi - lo == size || spec.partial == Partial::Allowed {
                    out.push(lo..hi);
                }
                lo = hi;
            }
        }
        WindowMode::Stretching => {
            let mut end = size;
            loop {
                let hi = end.min(n);
                if !(spec.partial == Partial::Forbidden && hi < size) {
                    out.push(0..hi);
                }
                if hi >= n {
                    break;
                }
                end += step;
            }
        }
    }

    out
}

/// The anchor row of a realized window, per the alignment policy.
pub(crate) fn anchor_row(align: Align, rows: &Range<usize>) -> usize {
    match align {
        Align::Left => rows.start,
        Align::Right => rows.end - 1,
        // Rounds down on even sizes.
        Align::Center => rows.start + (rows.len() - 1) / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(size: usize) -> WindowSpec {
        WindowSpec::new(size)
    }

    #[test]
    fn sliding_full_window_count() {
        // N − s + 1 windows at step 1, partial forbidden.
        let plan = plan_windows(WindowMode::Sliding, &spec(3), 10);
        assert_eq!(plan.len(), 10 - 3 + 1);
        assert_eq!(plan.first(), Some(&(0..3)));
        assert_eq!(plan.last(), Some(&(7..10)));

        // Overlap between consecutive windows is size − step rows.
        for pair in plan.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 3 - 1);
        }
    }

    #[test]
    fn sliding_too_short_yields_nothing() {
        assert!(plan_windows(WindowMode::Sliding, &spec(5), 4).is_empty());
    }

    #[test]
    fn sliding_with_step() {
        // ceil((N − s + 1) / step) windows.
        let plan = plan_windows(WindowMode::Sliding, &spec(3).with_step(2), 10);
        assert_eq!(plan.len(), (10usize - 3 + 1).div_ceil(2));
        assert_eq!(plan[0], 0..3);
        assert_eq!(plan[1], 2..5);
    }

    #[test]
    fn sliding_partial_shrinks_at_both_ends() {
        let plan = plan_windows(
            WindowMode::Sliding,
            &spec(3).with_partial(Partial::Allowed),
            4,
        );
        assert_eq!(
            plan,
            vec![0..1, 0..2, 0..3, 1..4, 2..4, 3..4],
        );
    }

    #[test]
    fn tiling_partitions_without_overlap() {
        let plan = plan_windows(
            WindowMode::Tiling,
            &spec(3).with_partial(Partial::Allowed),
            8,
        );
        assert_eq!(plan, vec![0..3, 3..6, 6..8]);

        // Concatenated tiles cover the sequence exactly once, in order.
        let covered: Vec<usize> = plan.iter().flat_map(|r| r.clone()).collect();
        assert_eq!(covered, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn tiling_forbidden_drops_remainder() {
        let plan = plan_windows(WindowMode::Tiling, &spec(3), 8);
        assert_eq!(plan, vec![0..3, 3..6]);
    }

    #[test]
    fn stretching_grows_to_cover_everything() {
        let plan = plan_windows(
            WindowMode::Stretching,
            &WindowSpec::new(1).with_partial(Partial::Allowed),
            4,
        );
        assert_eq!(plan, vec![0..1, 0..2, 0..3, 0..4]);

        // Each window strictly contains its predecessor; the last covers all.
        for pair in plan.windows(2) {
            assert!(pair[1].end > pair[0].end);
            assert_eq!(pair[0].start, 0);
        }
    }

    #[test]
    fn stretching_with_init_and_step() {
        // init 2, growth 3 over 9 rows: ends 2, 5, 8, 9.
        let plan = plan_windows(
            WindowMode::Stretching,
            &WindowSpec::new(2).with_step(3),
            9,
        );
        assert_eq!(plan, vec![0..2, 0..5, 0..8, 0..9]);
    }

    #[test]
    fn stretching_short_partition() {
        // init larger than the partition: partial keeps one clipped window,
        // forbidden drops it.
        let allowed = plan_windows(
            WindowMode::Stretching,
            &WindowSpec::new(5).with_partial(Partial::Allowed),
            3,
        );
        assert_eq!(allowed, vec![0..3]);

        let forbidden = plan_windows(WindowMode::Stretching, &WindowSpec::new(5), 3);
        assert!(forbidden.is_empty());
    }

    #[test]
    fn anchor_rows_per_alignment() {
        let rows = 2..6; // four rows
        assert_eq!(anchor_row(Align::Left, &rows), 2);
        assert_eq!(anchor_row(Align::Right, &rows), 5);
        // Even size rounds down: rows 2,3,4,5 → middle 3.
        assert_eq!(anchor_row(Align::Center, &rows), 3);

        let odd = 2..5;
        assert_eq!(anchor_row(Align::Center, &odd), 3);
    }

    #[test]
    fn window_spec_json_roundtrip() {
        let spec = WindowSpec::new(7)
            .with_step(2)
            .with_align(Align::Center)
            .with_partial(Partial::Allowed);
        let json = serde_json::to_string(&spec).unwrap();
        let back: WindowSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
