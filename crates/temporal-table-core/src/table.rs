//! The validated temporal table.
//!
//! A [`TemporalTable`] is an immutable, column-oriented table with one
//! designated index column, zero or more key columns, and opaque measurement
//! columns. Construction validates the structural invariants:
//!
//! - (key, index) is unique across rows;
//! - within each key partition, index values are sorted ascending;
//! - the index interval is inferred once and stored as metadata.
//!
//! Rows are held in canonical order — key-major, then index-ascending — so
//! every key partition is one contiguous row range. Operations that "modify"
//! a table (`filter_index`, `fill_gaps`, `aggregate_index`, …) return new
//! table values.

pub mod error;

use std::ops::{Bound, Range, RangeBounds};

use crate::interval::{infer_interval, Interval};
use crate::schema::{build_schema, extract_index, extract_keys, Column, TableSchema};
use crate::table::error::TableError;
use crate::value::{Datum, IndexValue, Key};

/// A validated table of timestamped observations.
///
/// See the [module docs](crate::table) for the invariants; use
/// [`TemporalTable::new`] to construct one.
#[derive(Debug, Clone)]
pub struct TemporalTable {
    pub(crate) schema: TableSchema,
    /// All columns in canonical row order (index and key columns included).
    pub(crate) columns: Vec<Column>,
    /// Decoded index column, canonical row order.
    pub(crate) index: Vec<IndexValue>,
    /// Contiguous key partitions in ascending key order.
    pub(crate) partitions: Vec<(Key, Range<usize>)>,
    /// Inferred (or overridden) index interval.
    pub(crate) interval: Interval,
}

impl TemporalTable {
    /// Build a table from named columns.
    ///
    /// `index_column` designates the "when" column; `key_columns` the
    /// observational-unit columns (empty for a single global unit). Rows are
    /// re-ordered into canonical key-major, index-ascending order; input
    /// order does not survive.
    ///
    /// Fails with [`TableError::Schema`] on structural problems and with
    /// [`TableError::DuplicateKeyIndex`] — listing every offending pair —
    /// when two rows share (key, index). Interval inference runs once here
    /// and is stored as metadata.
    pub fn new(
        columns: Vec<Column>,
        index_column: &str,
        key_columns: &[&str],
    ) -> Result<Self, TableError> {
        let schema = build_schema(&columns, index_column, key_columns)?;

        let index_col = columns
            .iter()
            .find(|c| c.name == schema.index_column)
            .map(|c| extract_index(c, schema.index_domain))
            .transpose()?
            .unwrap_or_default();
        let keys = extract_keys(&columns, &schema.key_columns, index_col.len())?;

        // Canonical order: key-major, then index-ascending, stable.
        let mut order: Vec<usize> = (0..index_col.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]).then(index_col[a].cmp(&index_col[b])));

        let columns: Vec<Column> = columns
            .into_iter()
            .map(|c| Column {
                name: c.name,
                values: order.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        let index: Vec<IndexValue> = order.iter().map(|&i| index_col[i]).collect();
        let keys: Vec<Key> = order.iter().map(|&i| keys[i].clone()).collect();

        let partitions = partition_ranges(&keys);

        let mut duplicates = Vec::new();
        for (key, range) in &partitions {
            for i in range.start + 1..range.end {
                if index[i] == index[i - 1]
                    && !duplicates
                        .last()
                        .is_some_and(|(k, v): &(Key, IndexValue)| k == key && *v == index[i])
                {
                    duplicates.push((key.clone(), index[i]));
                }
            }
        }
        if !duplicates.is_empty() {
            return Err(TableError::DuplicateKeyIndex { pairs: duplicates });
        }

        let tick_slices: Vec<Vec<i64>> = partitions
            .iter()
            .map(|(_, r)| index[r.clone()].iter().map(IndexValue::ticks).collect())
            .collect();
        let interval = infer_interval(tick_slices.iter().map(Vec::as_slice));

        Ok(TemporalTable {
            schema,
            columns,
            index,
            partitions,
            interval,
        })
    }

    /// The table's schema (role split and index domain).
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The inferred (or overridden) index interval.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of key partitions (observational units present).
    pub fn num_keys(&self) -> usize {
        self.partitions.len()
    }

    /// The distinct keys, in ascending key order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.partitions.iter().map(|(k, _)| k)
    }

    /// The decoded index column, canonical row order.
    pub fn index_values(&self) -> &[IndexValue] {
        &self.index
    }

    /// A column's cells by name, canonical row order.
    pub fn column(&self, name: &str) -> Option<&[Datum]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// The canonical row range of one key's partition.
    pub fn partition(&self, key: &Key) -> Option<Range<usize>> {
        self.partitions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r.clone())
    }

    /// Key partitions in canonical order, as (key, row range) pairs.
    pub(crate) fn partition_slices(&self) -> &[(Key, Range<usize>)] {
        &self.partitions
    }

    /// Index ticks of one partition, ascending.
    pub(crate) fn partition_ticks(&self, range: &Range<usize>) -> Vec<i64> {
        self.index[range.clone()].iter().map(IndexValue::ticks).collect()
    }

    /// Re-run interval inference over the current rows.
    ///
    /// The stored interval is metadata and deliberately survives mutations;
    /// call this after operations that change spacing when a re-derived
    /// interval is wanted.
    pub fn with_re_inferred_interval(mut self) -> Self {
        let tick_slices: Vec<Vec<i64>> = self
            .partitions
            .iter()
            .map(|(_, r)| self.partition_ticks(r))
            .collect();
        self.interval = infer_interval(tick_slices.iter().map(Vec::as_slice));
        self
    }

    /// Replace the interval metadata with an explicit step.
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// The sub-table of rows whose index falls within `range`.
    ///
    /// Accepts any standard range over [`IndexValue`] (`a..b`, `a..=b`,
    /// `..b`, `a..`, `..`); bound semantics are exactly those of the range
    /// type supplied. Row order, schema, and interval metadata are
    /// preserved; gap state may of course change.
    pub fn filter_index<R: RangeBounds<IndexValue>>(&self, range: R) -> TemporalTable {
        let keep = |v: &IndexValue| {
            (match range.start_bound() {
                Bound::Included(s) => v >= s,
                Bound::Excluded(s) => v > s,
                Bound::Unbounded => true,
            }) && (match range.end_bound() {
                Bound::Included(e) => v <= e,
                Bound::Excluded(e) => v < e,
                Bound::Unbounded => true,
            })
        };
        let mask: Vec<bool> = self.index.iter().map(keep).collect();
        self.retain_rows(&mask)
    }

    /// Keep the rows flagged in `mask` (canonical order preserved).
    fn retain_rows(&self, mask: &[bool]) -> TemporalTable {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| v.clone())
                    .collect(),
            })
            .collect();
        let index: Vec<IndexValue> = self
            .index
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(v, _)| *v)
            .collect();

        let mut kept_keys = Vec::with_capacity(index.len());
        for (key, range) in &self.partitions {
            for i in range.clone() {
                if mask[i] {
                    kept_keys.push(key.clone());
                }
            }
        }
        let partitions = partition_ranges(&kept_keys);

        TemporalTable {
            schema: self.schema.clone(),
            columns,
            index,
            partitions,
            interval: self.interval,
        }
    }

    /// A copy of this table with one measurement column added or replaced.
    ///
    /// `values` must be in the table's canonical row order (see
    /// [`TemporalTable::index_values`]). Measurement-only mutation: key and
    /// index structure is untouched, so no re-validation or re-inference
    /// runs.
    pub fn with_measurement(
        &self,
        name: impl Into<String>,
        values: Vec<Datum>,
    ) -> Result<TemporalTable, TableError> {
        let name = name.into();
        if name == self.schema.index_column || self.schema.key_columns.contains(&name) {
            return Err(TableError::NoSuchMeasurement { column: name });
        }
        if values.len() != self.num_rows() {
            return Err(crate::schema::SchemaError::LengthMismatch {
                column: name,
                expected: self.num_rows(),
                actual: values.len(),
            }
            .into());
        }

        let mut out = self.clone();
        match out.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => {
                out.schema.measurement_columns.push(name.clone());
                out.columns.push(Column { name, values });
            }
        }
        Ok(out)
    }

    /// A copy of this table without the named measurement column.
    ///
    /// Fails with [`TableError::NoSuchMeasurement`] when the column is
    /// absent or is the index/a key column.
    pub fn drop_measurement(&self, name: &str) -> Result<TemporalTable, TableError> {
        if !self.schema.is_measurement(name) {
            return Err(TableError::NoSuchMeasurement {
                column: name.to_string(),
            });
        }
        let mut out = self.clone();
        out.schema.measurement_columns.retain(|c| c != name);
        out.columns.retain(|c| c.name != name);
        Ok(out)
    }

    /// Group the rows of one partition by an arbitrary mapping of the index.
    ///
    /// Helper shared by the aggregation layer; returns (mapped value, row
    /// range) groups in walk order.
    pub(crate) fn group_partition_by<F>(
        &self,
        range: &Range<usize>,
        map: F,
    ) -> Vec<(IndexValue, Range<usize>)>
    where
        F: Fn(&IndexValue) -> IndexValue,
    {
        let mut groups: Vec<(IndexValue, Range<usize>)> = Vec::new();
        for i in range.clone() {
            let bucket = map(&self.index[i]);
            match groups.last_mut() {
                Some((b, r)) if *b == bucket => r.end = i + 1,
                _ => groups.push((bucket, i..i + 1)),
            }
        }
        groups
    }
}

/// Compute contiguous (key, row range) partitions from per-row keys.
///
/// `keys` must already be in canonical (sorted) order.
pub(crate) fn partition_ranges(keys: &[Key]) -> Vec<(Key, Range<usize>)> {
    if keys.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<(Key, Range<usize>)> = Vec::new();
    let mut start = 0usize;
    for i in 1..keys.len() {
        if keys[i] != keys[i - 1] {
            out.push((keys[start].clone(), start..i));
            start = i;
        }
    }
    out.push((keys[start].clone(), start..keys.len()));
    out
}
