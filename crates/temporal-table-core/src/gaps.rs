//! Implicit-gap detection and filling over the inferred step grid.
//!
//! For each key partition with a regular step, the partition's index ticks
//! are mapped onto the offset grid `min, min+step, …, max` and collected in
//! a `RoaringBitmap`; implicit gaps are `expected − present`. The report
//! carries per-key missing points, contiguous missing runs, coverage ratio,
//! and maximum gap length.
//!
//! [`TemporalTable::fill_gaps`] materializes a row for every gap. Existing
//! rows are never removed or reordered; the result stays key-major,
//! index-ascending. Per-column fill behavior is configured with
//! [`FillPolicy`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use roaring::RoaringBitmap;

use crate::interval::Interval;
use crate::schema::Column;
use crate::table::error::TableError;
use crate::table::TemporalTable;
use crate::value::{Datum, IndexValue, Key};

/// How one measurement column is populated on gap rows.
pub enum FillStrategy {
    /// Leave the cell as the missing-value marker ([`Datum::Null`]).
    Missing,
    /// Fill every gap cell with a constant.
    Constant(Datum),
    /// Derive the fill value from the partition's existing cells of this
    /// column (e.g. a default summary). Called once per (key, column).
    Derive(Box<dyn Fn(&[Datum]) -> Datum + Send + Sync>),
}

impl fmt::Debug for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillStrategy::Missing => write!(f, "Missing"),
            FillStrategy::Constant(d) => write!(f, "Constant({d:?})"),
            FillStrategy::Derive(_) => write!(f, "Derive(<fn>)"),
        }
    }
}

/// Per-column fill configuration for [`TemporalTable::fill_gaps`].
///
/// Columns without an explicit entry use the policy's default strategy.
#[derive(Debug)]
pub struct FillPolicy {
    default: FillStrategy,
    per_column: BTreeMap<String, FillStrategy>,
}

impl FillPolicy {
    /// Leave every unconfigured column as the missing-value marker.
    pub fn missing() -> Self {
        FillPolicy {
            default: FillStrategy::Missing,
            per_column: BTreeMap::new(),
        }
    }

    /// Fill every unconfigured column with the same constant.
    pub fn constant(value: Datum) -> Self {
        FillPolicy {
            default: FillStrategy::Constant(value),
            per_column: BTreeMap::new(),
        }
    }

    /// Override the strategy for one column.
    pub fn with_column(mut self, column: impl Into<String>, strategy: FillStrategy) -> Self {
        self.per_column.insert(column.into(), strategy);
        self
    }

    fn strategy_for(&self, column: &str) -> &FillStrategy {
        self.per_column.get(column).unwrap_or(&self.default)
    }

    pub(crate) fn configured_columns(&self) -> impl Iterator<Item = &str> {
        self.per_column.keys().map(String::as_str)
    }
}

impl Default for FillPolicy {
    fn default() -> Self {
        FillPolicy::missing()
    }
}

/// Gap findings for one key partition.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGapReport {
    key: Key,
    missing: Vec<IndexValue>,
    runs: Vec<RangeInclusive<IndexValue>>,
    expected: u64,
    present: u64,
    max_run_len: u64,
}

impl KeyGapReport {
    /// The partition's key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Every missing index value, ascending.
    pub fn missing(&self) -> &[IndexValue] {
        &self.missing
    }

    /// Number of missing points.
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Contiguous missing runs, ascending, endpoints inclusive.
    pub fn runs(&self) -> &[RangeInclusive<IndexValue>] {
        &self.runs
    }

    /// Fraction of the expected grid that is present, in `[0.0, 1.0]`.
    ///
    /// An empty expected grid counts as fully covered by convention.
    pub fn coverage_ratio(&self) -> f64 {
        if self.expected == 0 {
            return 1.0;
        }
        self.present as f64 / self.expected as f64
    }

    /// Length in steps of the longest contiguous missing run (0 when
    /// gap-free).
    pub fn max_gap_len(&self) -> u64 {
        self.max_run_len
    }

    /// True when this partition has no missing points.
    pub fn is_gap_free(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Gap findings for a whole table, one entry per key in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct GapReport {
    entries: Vec<KeyGapReport>,
}

impl GapReport {
    /// Per-key findings in canonical key order.
    pub fn entries(&self) -> &[KeyGapReport] {
        &self.entries
    }

    /// Findings for one key.
    pub fn get(&self, key: &Key) -> Option<&KeyGapReport> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Total missing points across all keys.
    pub fn total_missing(&self) -> usize {
        self.entries.iter().map(KeyGapReport::missing_count).sum()
    }

    /// True when no key has a missing point.
    pub fn is_gap_free(&self) -> bool {
        self.entries.iter().all(KeyGapReport::is_gap_free)
    }
}

impl TemporalTable {
    /// Detect implicit gaps against the inferred step.
    ///
    /// Fails with [`TableError::AmbiguousInterval`] on an irregular table
    /// (use [`TemporalTable::scan_gaps_with`] to supply the step). A table
    /// with an [`Interval::Unknown`] interval is trivially gap-free: no
    /// partition has two observations, so no interior point is implied.
    pub fn scan_gaps(&self) -> Result<GapReport, TableError> {
        match self.interval() {
            Interval::Regular { ticks } => self.scan_gaps_at(ticks),
            Interval::Unknown => Ok(self.trivial_report()),
            Interval::Irregular => Err(TableError::AmbiguousInterval {
                operation: "detect gaps",
            }),
        }
    }

    /// Detect implicit gaps against an explicit step in index ticks.
    ///
    /// Rows that do not sit on the `min + k·step` grid of their partition
    /// are kept but contribute nothing to coverage.
    pub fn scan_gaps_with(&self, step_ticks: i64) -> Result<GapReport, TableError> {
        if step_ticks <= 0 {
            return Err(TableError::NonPositiveStep { ticks: step_ticks });
        }
        self.scan_gaps_at(step_ticks)
    }

    fn trivial_report(&self) -> GapReport {
        let entries = self
            .partition_slices()
            .iter()
            .map(|(key, range)| KeyGapReport {
                key: key.clone(),
                missing: Vec::new(),
                runs: Vec::new(),
                expected: range.len() as u64,
                present: range.len() as u64,
                max_run_len: 0,
            })
            .collect();
        GapReport { entries }
    }

    fn scan_gaps_at(&self, step: i64) -> Result<GapReport, TableError> {
        let domain = self.schema().index_domain();
        let mut entries = Vec::with_capacity(self.num_keys());

        for (key, range) in self.partition_slices() {
            let ticks = self.partition_ticks(range);
            let (min, max) = match (ticks.first(), ticks.last()) {
                (Some(min), Some(max)) => (*min, *max),
                _ => continue,
            };

            let span_steps = (max - min) as u64 / step as u64;
            if span_steps > u64::from(u32::MAX) {
                return Err(TableError::GapDomainOverflow {
                    key: key.clone(),
                    offsets: span_steps + 1,
                    max: u32::MAX,
                });
            }

            let mut present = RoaringBitmap::new();
            for t in &ticks {
                let diff = t - min;
                if diff % step == 0 {
                    present.insert((diff / step) as u32);
                }
            }

            let mut missing_bm = RoaringBitmap::new();
            missing_bm.insert_range(0..=span_steps as u32);
            let expected = missing_bm.len();
            missing_bm -= &present;

            let missing: Vec<IndexValue> = missing_bm
                .iter()
                .filter_map(|off| {
                    let v = IndexValue::from_ticks(domain, min + i64::from(off) * step);
                    debug_assert!(v.is_some(), "grid tick between observed endpoints");
                    v
                })
                .collect();

            let offset_runs = runs_from_bitmap(&missing_bm);
            let max_run_len = offset_runs
                .iter()
                .map(|r| u64::from(r.end() - r.start()) + 1)
                .max()
                .unwrap_or(0);
            let runs = offset_runs
                .into_iter()
                .filter_map(|r| {
                    let lo = IndexValue::from_ticks(domain, min + i64::from(*r.start()) * step)?;
                    let hi = IndexValue::from_ticks(domain, min + i64::from(*r.end()) * step)?;
                    Some(lo..=hi)
                })
                .collect();

            entries.push(KeyGapReport {
                key: key.clone(),
                missing,
                runs,
                expected,
                present: expected - missing_bm.len(),
                max_run_len,
            });
        }

        Ok(GapReport { entries })
    }

    /// Materialize a row for every implicit gap, using the inferred step.
    ///
    /// Filling an already gap-free table returns a table equal to the input.
    /// Fails with [`TableError::AmbiguousInterval`] on an irregular table
    /// (use [`TemporalTable::fill_gaps_with`]); an unknown-interval table is
    /// returned unchanged. After a successful fill, each partition is a
    /// contiguous run from its original min to max index at the step size.
    pub fn fill_gaps(&self, policy: &FillPolicy) -> Result<TemporalTable, TableError> {
        match self.interval() {
            Interval::Regular { ticks } => {
                let report = self.scan_gaps_at(ticks)?;
                Ok(self.fill_from_report(&report, policy))
            }
            Interval::Unknown => Ok(self.clone()),
            Interval::Irregular => Err(TableError::AmbiguousInterval {
                operation: "fill gaps",
            }),
        }
    }

    /// Materialize gap rows against an explicit step in index ticks.
    pub fn fill_gaps_with(
        &self,
        step_ticks: i64,
        policy: &FillPolicy,
    ) -> Result<TemporalTable, TableError> {
        let report = self.scan_gaps_with(step_ticks)?;
        Ok(self.fill_from_report(&report, policy))
    }

    fn fill_from_report(&self, report: &GapReport, policy: &FillPolicy) -> TemporalTable {
        for col in policy.configured_columns() {
            if !self.schema().is_measurement(col) {
                log::warn!("fill policy configures {col}, which is not a measurement column; ignoring");
            }
        }

        if report.is_gap_free() {
            return self.clone();
        }

        let schema = self.schema().clone();
        let n_out = self.num_rows() + report.total_missing();
        let mut out: Vec<Column> = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: Vec::with_capacity(n_out),
            })
            .collect();

        for (key, range) in self.partition_slices() {
            let missing = report
                .get(key)
                .map(KeyGapReport::missing)
                .unwrap_or_default();

            // Fill values are derived once per (key, column).
            let fills: Vec<Datum> = self
                .columns
                .iter()
                .map(|c| {
                    if c.name == schema.index_column {
                        return Datum::Null; // replaced per gap row below
                    }
                    if let Some(pos) =
                        schema.key_columns.iter().position(|k| k == &c.name)
                    {
                        return key.values()[pos].clone().into();
                    }
                    match policy.strategy_for(&c.name) {
                        FillStrategy::Missing => Datum::Null,
                        FillStrategy::Constant(d) => d.clone(),
                        FillStrategy::Derive(f) => f(&c.values[range.clone()]),
                    }
                })
                .collect();

            // Merge existing rows and gap rows, both index-ascending.
            let mut existing = range.clone().peekable();
            let mut gaps = missing.iter().peekable();
            loop {
                let take_gap = match (existing.peek(), gaps.peek()) {
                    (Some(&row), Some(&&gap)) => gap < self.index[row],
                    (None, Some(_)) => true,
                    (Some(_), None) => false,
                    (None, None) => break,
                };
                if take_gap {
                    if let Some(&gap) = gaps.next() {
                        for (i, (col, out_col)) in
                            self.columns.iter().zip(out.iter_mut()).enumerate()
                        {
                            if col.name == schema.index_column {
                                out_col.values.push(gap.into());
                            } else {
                                out_col.values.push(fills[i].clone());
                            }
                        }
                    }
                } else if let Some(row) = existing.next() {
                    for (col, out_col) in self.columns.iter().zip(out.iter_mut()) {
                        out_col.values.push(col.values[row].clone());
                    }
                }
            }
        }

        let index: Vec<IndexValue> = out
            .iter()
            .find(|c| c.name == schema.index_column)
            .map(|c| {
                c.values
                    .iter()
                    .filter_map(Datum::as_index_value)
                    .collect()
            })
            .unwrap_or_default();

        let mut kept_keys = Vec::with_capacity(n_out);
        for (key, range) in self.partition_slices() {
            let added = report.get(key).map(KeyGapReport::missing_count).unwrap_or(0);
            kept_keys.extend(std::iter::repeat(key.clone()).take(range.len() + added));
        }
        let partitions = crate::table::partition_ranges(&kept_keys);

        TemporalTable {
            schema,
            columns: out,
            index,
            partitions,
            interval: self.interval,
        }
    }
}

/// Group a bitmap's set offsets into contiguous inclusive runs.
fn runs_from_bitmap(bitmap: &RoaringBitmap) -> Vec<RangeInclusive<u32>> {
    let mut out = Vec::new();
    let mut iter = bitmap.iter();

    let Some(mut start) = iter.next() else {
        return out;
    };
    let mut prev = start;

    for v in iter {
        if v == prev + 1 {
            prev = v;
        } else {
            out.push(start..=prev);
            start = v;
            prev = v;
        }
    }

    out.push(start..=prev);
    out
}
