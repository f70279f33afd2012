//! Scalar values for the index, key, and measurement columns.
//!
//! Three families of scalars appear in a temporal table:
//!
//! - [`IndexValue`] — the orderable "when" of a row, over one of three
//!   domains (UTC timestamp, calendar date, integer ordinal). Every domain
//!   has an integer *tick* representation on which interval arithmetic and
//!   GCD computations run.
//! - [`KeyValue`] / [`Key`] — the values identifying one observational unit.
//!   Key values are restricted to hashable, totally ordered, non-null types.
//! - [`Datum`] — the general measurement scalar, including a null marker.
//!
//! A table's index column uses a single [`IndexDomain`]; mixing domains
//! within one column is rejected at construction time.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The domain an index column's values are drawn from.
///
/// Each domain maps to an integer tick unit:
///
/// - `Timestamp`: microseconds since the Unix epoch.
/// - `Date`: days (`chrono` day numbers from the Common Era).
/// - `Ordinal`: the ordinal value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexDomain {
    /// UTC timestamps with microsecond tick resolution.
    Timestamp,
    /// Calendar dates with one-day tick resolution.
    Date,
    /// Plain integer ordinals (stride 1 ticks).
    Ordinal,
}

impl fmt::Display for IndexDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDomain::Timestamp => write!(f, "timestamp"),
            IndexDomain::Date => write!(f, "date"),
            IndexDomain::Ordinal => write!(f, "ordinal"),
        }
    }
}

/// One value of a table's index column.
///
/// The derived ordering compares the domain discriminant first; tables only
/// ever hold a single domain, so within a table the ordering is the natural
/// temporal/numeric one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexValue {
    /// A point in time, UTC.
    Timestamp(DateTime<Utc>),
    /// A calendar date.
    Date(NaiveDate),
    /// An integer ordinal (e.g. a sequence number or a year).
    Ordinal(i64),
}

impl IndexValue {
    /// The domain this value belongs to.
    pub fn domain(&self) -> IndexDomain {
        match self {
            IndexValue::Timestamp(_) => IndexDomain::Timestamp,
            IndexValue::Date(_) => IndexDomain::Date,
            IndexValue::Ordinal(_) => IndexDomain::Ordinal,
        }
    }

    /// Integer tick representation of this value (see [`IndexDomain`]).
    pub fn ticks(&self) -> i64 {
        match self {
            IndexValue::Timestamp(ts) => ts.timestamp_micros(),
            IndexValue::Date(d) => i64::from(d.num_days_from_ce()),
            IndexValue::Ordinal(n) => *n,
        }
    }

    /// Reconstruct a value of `domain` from its tick representation.
    ///
    /// Returns `None` when `ticks` does not denote a representable value in
    /// that domain (for example, a day number outside `chrono`'s date range).
    pub fn from_ticks(domain: IndexDomain, ticks: i64) -> Option<IndexValue> {
        match domain {
            IndexDomain::Timestamp => {
                DateTime::from_timestamp_micros(ticks).map(IndexValue::Timestamp)
            }
            IndexDomain::Date => {
                let days = i32::try_from(ticks).ok()?;
                NaiveDate::from_num_days_from_ce_opt(days).map(IndexValue::Date)
            }
            IndexDomain::Ordinal => Some(IndexValue::Ordinal(ticks)),
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            IndexValue::Date(d) => write!(f, "{d}"),
            IndexValue::Ordinal(n) => write!(f, "{n}"),
        }
    }
}

/// One value of a key column.
///
/// Key columns are restricted to types with total order, equality, and
/// hashing, and never hold nulls; floats are intentionally excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    /// Boolean key component.
    Bool(bool),
    /// 64-bit integer key component.
    Int64(i64),
    /// UTF-8 string key component.
    Utf8(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(b) => write!(f, "{b}"),
            KeyValue::Int64(n) => write!(f, "{n}"),
            KeyValue::Utf8(s) => write!(f, "{s}"),
        }
    }
}

/// The ordered tuple of key-column values identifying one observational unit.
///
/// The empty tuple is the single global unit of a table without key columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Key(Vec<KeyValue>);

impl Key {
    /// Build a key from its components, in key-column order.
    pub fn new(values: Vec<KeyValue>) -> Self {
        Key(values)
    }

    /// The empty key of an un-keyed table.
    pub fn empty() -> Self {
        Key(Vec::new())
    }

    /// Key components in key-column order.
    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    /// True for the empty (global-unit) key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<global>");
        }
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

/// A measurement scalar.
///
/// `Null` is the missing-value marker; it is what gap filling inserts when a
/// column's fill strategy is "leave missing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// A point in time, UTC.
    Timestamp(DateTime<Utc>),
    /// A calendar date.
    Date(NaiveDate),
}

impl Datum {
    /// True for the missing-value marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Numeric view of this datum, if it has one (`Int64` widens to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Float64(v) => Some(*v),
            Datum::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Interpret this datum as an index value, if its type allows it.
    ///
    /// `Int64` maps to the ordinal domain.
    pub fn as_index_value(&self) -> Option<IndexValue> {
        match self {
            Datum::Timestamp(ts) => Some(IndexValue::Timestamp(*ts)),
            Datum::Date(d) => Some(IndexValue::Date(*d)),
            Datum::Int64(n) => Some(IndexValue::Ordinal(*n)),
            _ => None,
        }
    }

    /// Interpret this datum as a key component, if its type allows it.
    pub fn as_key_value(&self) -> Option<KeyValue> {
        match self {
            Datum::Bool(b) => Some(KeyValue::Bool(*b)),
            Datum::Int64(n) => Some(KeyValue::Int64(*n)),
            Datum::Utf8(s) => Some(KeyValue::Utf8(s.clone())),
            _ => None,
        }
    }

    /// Short name of this datum's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int64(_) => "int64",
            Datum::Float64(_) => "float64",
            Datum::Utf8(_) => "utf8",
            Datum::Timestamp(_) => "timestamp",
            Datum::Date(_) => "date",
        }
    }
}

impl From<IndexValue> for Datum {
    fn from(v: IndexValue) -> Self {
        match v {
            IndexValue::Timestamp(ts) => Datum::Timestamp(ts),
            IndexValue::Date(d) => Datum::Date(d),
            IndexValue::Ordinal(n) => Datum::Int64(n),
        }
    }
}

impl From<KeyValue> for Datum {
    fn from(v: KeyValue) -> Self {
        match v {
            KeyValue::Bool(b) => Datum::Bool(b),
            KeyValue::Int64(n) => Datum::Int64(n),
            KeyValue::Utf8(s) => Datum::Utf8(s),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int64(n) => write!(f, "{n}"),
            Datum::Float64(v) => write!(f, "{v}"),
            Datum::Utf8(s) => write!(f, "{s}"),
            Datum::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Datum::Date(d) => write!(f, "{d}"),
        }
    }
}
