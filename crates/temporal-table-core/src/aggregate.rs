//! Index coarsening and grouped reduction (`aggregate_index`).
//!
//! The caller supplies a bucketing function mapping each index value onto a
//! coarser index value (for example, timestamp → start of month, via
//! [`crate::bucketing::floorer`]) and one reduction per output column.
//! The result has one row per (key, bucket): the bucket value is the new
//! index, each reduction's output a measurement column.
//!
//! The bucketing function must be monotonic non-decreasing with respect to
//! the index order; this is checked while walking each partition, so a
//! violation is reported with the key and the offending index value. Buckets
//! with no contributing rows are never synthesized — that is gap filling's
//! job, and it is explicit and separate.

use crate::table::error::{CallableError, TableError};
use crate::table::TemporalTable;
use crate::schema::Column;
use crate::value::{Datum, IndexValue};

/// One named reduction over a measurement column.
///
/// The reduction receives the bucket's cells for that key in original index
/// order, so order-sensitive reductions ("first value") are well defined.
pub struct Aggregation {
    pub(crate) column: String,
    pub(crate) name: String,
    pub(crate) reduce: Box<dyn Fn(&[Datum]) -> Result<Datum, CallableError> + Send + Sync>,
}

impl std::fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("column", &self.column)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Aggregation {
    /// An arbitrary reduction of `column`'s cells into output column `name`.
    pub fn new<F>(column: impl Into<String>, name: impl Into<String>, reduce: F) -> Self
    where
        F: Fn(&[Datum]) -> Result<Datum, CallableError> + Send + Sync + 'static,
    {
        Aggregation {
            column: column.into(),
            name: name.into(),
            reduce: Box::new(reduce),
        }
    }

    /// Sum of the numeric cells (nulls skipped); null when none are numeric.
    pub fn sum(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            let nums: Vec<f64> = values.iter().filter_map(Datum::as_f64).collect();
            Ok(if nums.is_empty() {
                Datum::Null
            } else {
                Datum::Float64(nums.iter().sum())
            })
        })
    }

    /// Mean of the numeric cells (nulls skipped); null when none are numeric.
    pub fn mean(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            let nums: Vec<f64> = values.iter().filter_map(Datum::as_f64).collect();
            Ok(if nums.is_empty() {
                Datum::Null
            } else {
                Datum::Float64(nums.iter().sum::<f64>() / nums.len() as f64)
            })
        })
    }

    /// Minimum of the numeric cells; null when none are numeric.
    pub fn min(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            Ok(values
                .iter()
                .filter_map(Datum::as_f64)
                .fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.min(v)))
                })
                .map_or(Datum::Null, Datum::Float64))
        })
    }

    /// Maximum of the numeric cells; null when none are numeric.
    pub fn max(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            Ok(values
                .iter()
                .filter_map(Datum::as_f64)
                .fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.max(v)))
                })
                .map_or(Datum::Null, Datum::Float64))
        })
    }

    /// Count of non-null cells.
    pub fn count(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            Ok(Datum::Int64(
                values.iter().filter(|d| !d.is_null()).count() as i64
            ))
        })
    }

    /// First cell of the bucket, in index order.
    pub fn first(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            Ok(values.first().cloned().unwrap_or(Datum::Null))
        })
    }

    /// Last cell of the bucket, in index order.
    pub fn last(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(column, name, |values| {
            Ok(values.last().cloned().unwrap_or(Datum::Null))
        })
    }
}

impl TemporalTable {
    /// Coarsen the index with `bucket` and reduce each (key, bucket) group.
    ///
    /// Output ordering is key-major (same key order as this table), then
    /// bucket-ascending; the result is a fresh, fully validated table with
    /// its own inferred interval.
    ///
    /// Fails with [`TableError::NoSuchMeasurement`] when an aggregation
    /// references a column that is not a measurement, with
    /// [`TableError::InvalidBucketFunction`] when `bucket` is not monotonic
    /// non-decreasing along a partition, and with
    /// [`TableError::Aggregation`] when a reduction fails (tagged with key
    /// and bucket).
    pub fn aggregate_index<B>(
        &self,
        bucket: B,
        aggregations: &[Aggregation],
    ) -> Result<TemporalTable, TableError>
    where
        B: Fn(&IndexValue) -> IndexValue,
    {
        for agg in aggregations {
            if !self.schema().is_measurement(&agg.column) {
                return Err(TableError::NoSuchMeasurement {
                    column: agg.column.clone(),
                });
            }
        }

        let schema = self.schema();
        let mut index_out: Vec<Datum> = Vec::new();
        let mut keys_out: Vec<Vec<Datum>> = vec![Vec::new(); schema.key_columns().len()];
        let mut aggs_out: Vec<Vec<Datum>> = vec![Vec::new(); aggregations.len()];

        for (key, range) in self.partition_slices() {
            let groups = self.group_partition_by(range, &bucket);

            // Adjacent equal buckets are merged by the grouping walk, so a
            // monotonic bucket function yields strictly ascending groups.
            for pair in groups.windows(2) {
                let (prev, _) = &pair[0];
                let (bucket_v, r) = &pair[1];
                if bucket_v <= prev {
                    return Err(TableError::InvalidBucketFunction {
                        key: key.clone(),
                        at_index: self.index[r.start],
                        bucket: *bucket_v,
                        previous: *prev,
                    });
                }
            }

            for (bucket_v, r) in &groups {
                index_out.push((*bucket_v).into());
                for (pos, kv) in key.values().iter().enumerate() {
                    keys_out[pos].push(kv.clone().into());
                }
                for (agg, out) in aggregations.iter().zip(aggs_out.iter_mut()) {
                    let cells = &self.columns_cells(&agg.column)[r.clone()];
                    let reduced =
                        (agg.reduce)(cells).map_err(|source| TableError::Aggregation {
                            name: agg.name.clone(),
                            key: key.clone(),
                            bucket: *bucket_v,
                            source,
                        })?;
                    out.push(reduced);
                }
            }
        }

        let mut columns = Vec::with_capacity(1 + keys_out.len() + aggs_out.len());
        columns.push(Column::new(schema.index_column(), index_out));
        for (name, values) in schema.key_columns().iter().zip(keys_out) {
            columns.push(Column::new(name.clone(), values));
        }
        for (agg, values) in aggregations.iter().zip(aggs_out) {
            columns.push(Column::new(agg.name.clone(), values));
        }

        let key_cols: Vec<&str> = schema.key_columns().iter().map(String::as_str).collect();
        let index_col = schema.index_column().to_string();
        TemporalTable::new(columns, &index_col, &key_cols)
    }

    /// Cells of a column known to exist (validated by the caller).
    fn columns_cells(&self, name: &str) -> &[Datum] {
        self.column(name).unwrap_or(&[])
    }
}
