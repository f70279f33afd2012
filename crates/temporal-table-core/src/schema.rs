//! Named columns and the validated table schema.
//!
//! A [`Column`] is a named vector of [`Datum`] values. [`TableSchema`] records
//! the role split — one index column, zero or more key columns, everything
//! else a measurement — plus the single [`IndexDomain`] of the index column.
//!
//! Validation here is purely structural (names, lengths, per-cell types);
//! the cross-row invariants (uniqueness, ordering, interval) live in the
//! table layer.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::value::{Datum, IndexDomain, IndexValue, Key, KeyValue};

/// A named column of measurement scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name, unique within a table.
    pub name: String,
    /// Cell values, one per row.
    pub values: Vec<Datum>,
}

impl Column {
    /// Build a column from name and cells.
    pub fn new(name: impl Into<String>, values: Vec<Datum>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Convenience constructor for a float column.
    pub fn f64(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Datum::Float64).collect())
    }

    /// Convenience constructor for an integer column.
    pub fn i64(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, values.into_iter().map(Datum::Int64).collect())
    }

    /// Convenience constructor for a string column.
    pub fn utf8<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            values.into_iter().map(|s| Datum::Utf8(s.into())).collect(),
        )
    }

    /// Convenience constructor for a UTC timestamp column.
    pub fn timestamps(
        name: impl Into<String>,
        values: impl IntoIterator<Item = chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        Self::new(name, values.into_iter().map(Datum::Timestamp).collect())
    }

    /// Number of rows in this column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The role split of a table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Name of the index ("when") column.
    pub(crate) index_column: String,
    /// Names of the key columns, in key order. Empty means one global unit.
    pub(crate) key_columns: Vec<String>,
    /// Names of the measurement columns, in input order.
    pub(crate) measurement_columns: Vec<String>,
    /// Domain of the index column.
    pub(crate) index_domain: IndexDomain,
}

impl TableSchema {
    /// Name of the index column.
    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    /// Names of the key columns, in key order.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Names of the measurement columns.
    pub fn measurement_columns(&self) -> &[String] {
        &self.measurement_columns
    }

    /// Domain of the index column.
    pub fn index_domain(&self) -> IndexDomain {
        self.index_domain
    }

    /// True when `name` is a measurement column of this schema.
    pub fn is_measurement(&self, name: &str) -> bool {
        self.measurement_columns.iter().any(|c| c == name)
    }
}

/// Structural validation errors raised while assembling a table from columns.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    /// Two input columns share a name.
    #[snafu(display("Duplicate column name: {column}"))]
    DuplicateColumn {
        /// The duplicated column name.
        column: String,
    },

    /// A designated index or key column is absent from the input.
    #[snafu(display("Column {column} not found (needed as {role})"))]
    ColumnNotFound {
        /// The missing column name.
        column: String,
        /// The role the column was designated for ("index" or "key").
        role: &'static str,
    },

    /// Input columns disagree on row count.
    #[snafu(display("Column {column} has {actual} rows, expected {expected}"))]
    LengthMismatch {
        /// The offending column name.
        column: String,
        /// Row count of the first column.
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },

    /// The index column holds a value that cannot serve as an index.
    #[snafu(display(
        "Index column {column} has unsupported value of type {datatype} at row {row}"
    ))]
    UnsupportedIndexType {
        /// The index column name.
        column: String,
        /// Type name of the offending cell.
        datatype: &'static str,
        /// Zero-based input row of the offending cell.
        row: usize,
    },

    /// The index column mixes more than one domain.
    #[snafu(display(
        "Index column {column} mixes domains: {expected} and {found} (row {row})"
    ))]
    MixedIndexDomain {
        /// The index column name.
        column: String,
        /// Domain established by the first row.
        expected: IndexDomain,
        /// Conflicting domain found later.
        found: IndexDomain,
        /// Zero-based input row of the conflicting cell.
        row: usize,
    },

    /// A key column holds a value that cannot serve as a key component.
    ///
    /// Key columns must be bool, int64 or utf8 and never null, so that keys
    /// are hashable and totally ordered.
    #[snafu(display("Key column {column} has unsupported value of type {datatype} at row {row}"))]
    UnsupportedKeyType {
        /// The key column name.
        column: String,
        /// Type name of the offending cell.
        datatype: &'static str,
        /// Zero-based input row of the offending cell.
        row: usize,
    },
}

/// Locate a column by name.
pub(crate) fn find_column<'a>(
    columns: &'a [Column],
    name: &str,
    role: &'static str,
) -> Result<&'a Column, SchemaError> {
    columns
        .iter()
        .find(|c| c.name == name)
        .context(ColumnNotFoundSnafu { column: name, role })
}

/// Validate names and lengths, and split roles into a [`TableSchema`].
///
/// The index domain is taken from the first index cell; empty tables get
/// [`IndexDomain::Ordinal`] by convention (nothing depends on it).
pub(crate) fn build_schema(
    columns: &[Column],
    index_column: &str,
    key_columns: &[&str],
) -> Result<TableSchema, SchemaError> {
    let mut seen = std::collections::HashSet::new();
    for c in columns {
        ensure!(
            seen.insert(c.name.as_str()),
            DuplicateColumnSnafu { column: &c.name }
        );
    }

    let index = find_column(columns, index_column, "index")?;
    for k in key_columns {
        find_column(columns, k, "key")?;
    }

    let expected = index.len();
    for c in columns {
        ensure!(
            c.len() == expected,
            LengthMismatchSnafu {
                column: &c.name,
                expected,
                actual: c.len(),
            }
        );
    }

    let index_domain = match index.values.first() {
        Some(d) => d
            .as_index_value()
            .map(|v| v.domain())
            .context(UnsupportedIndexTypeSnafu {
                column: index_column,
                datatype: d.type_name(),
                row: 0usize,
            })?,
        None => IndexDomain::Ordinal,
    };

    let measurement_columns = columns
        .iter()
        .map(|c| c.name.clone())
        .filter(|n| n != index_column && !key_columns.contains(&n.as_str()))
        .collect();

    Ok(TableSchema {
        index_column: index_column.to_string(),
        key_columns: key_columns.iter().map(|s| s.to_string()).collect(),
        measurement_columns,
        index_domain,
    })
}

/// Decode the index column into [`IndexValue`]s, enforcing a single domain.
pub(crate) fn extract_index(
    column: &Column,
    domain: IndexDomain,
) -> Result<Vec<IndexValue>, SchemaError> {
    let mut out = Vec::with_capacity(column.len());
    for (row, cell) in column.values.iter().enumerate() {
        let v = cell
            .as_index_value()
            .context(UnsupportedIndexTypeSnafu {
                column: &column.name,
                datatype: cell.type_name(),
                row,
            })?;
        ensure!(
            v.domain() == domain,
            MixedIndexDomainSnafu {
                column: &column.name,
                expected: domain,
                found: v.domain(),
                row,
            }
        );
        out.push(v);
    }
    Ok(out)
}

/// Decode the per-row keys from the key columns, in key-column order.
pub(crate) fn extract_keys(
    columns: &[Column],
    key_columns: &[String],
    rows: usize,
) -> Result<Vec<Key>, SchemaError> {
    if key_columns.is_empty() {
        return Ok(vec![Key::empty(); rows]);
    }

    let mut decoded: Vec<Vec<KeyValue>> = Vec::with_capacity(key_columns.len());
    for name in key_columns {
        let col = find_column(columns, name, "key")?;
        let mut vals = Vec::with_capacity(rows);
        for (row, cell) in col.values.iter().enumerate() {
            let v = cell.as_key_value().context(UnsupportedKeyTypeSnafu {
                column: name,
                datatype: cell.type_name(),
                row,
            })?;
            vals.push(v);
        }
        decoded.push(vals);
    }

    Ok((0..rows)
        .map(|r| Key::new(decoded.iter().map(|col| col[r].clone()).collect()))
        .collect())
}
