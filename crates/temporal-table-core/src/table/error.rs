//! Error types and SNAFU context selectors for temporal-table operations.
//!
//! This module centralizes the `TableError` enum used by the public API and
//! exposes context selectors (via `#[snafu(visibility(pub(crate)))]`) so
//! sibling modules can attach error context without re-exporting everything
//! at the crate root. Keep new variants here to ensure consistent
//! user-facing messages.

use snafu::prelude::*;

use crate::schema::SchemaError;
use crate::value::{IndexValue, Key};

/// Failure raised by a caller-supplied callable (reduction, aggregation, or
/// fill derivation).
///
/// Callables return this concrete type so the engine can attach (key,
/// anchor) context without trait-object plumbing; use
/// [`CallableError::new`] or the `From<String>` impl inside a callable.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(display("{message}"))]
pub struct CallableError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl CallableError {
    /// Build a failure from any message.
    pub fn new(message: impl Into<String>) -> Self {
        CallableError {
            message: message.into(),
        }
    }
}

impl From<String> for CallableError {
    fn from(message: String) -> Self {
        CallableError { message }
    }
}

impl From<&str> for CallableError {
    fn from(message: &str) -> Self {
        CallableError {
            message: message.to_string(),
        }
    }
}

/// Errors from temporal-table operations.
///
/// Structural invariant violations are detected eagerly at construction and
/// never produce an inconsistent table; caller-function failures carry
/// enough context (key, index/anchor) to localize the fault and are never
/// retried here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// Structural column validation failed (names, lengths, cell types).
    #[snafu(display("Schema error: {source}"))]
    Schema {
        /// Underlying structural validation error.
        source: SchemaError,
    },

    /// Two or more rows share the same (key, index); all offending pairs are
    /// listed.
    #[snafu(display(
        "{} duplicate (key, index) pair(s); first: key {} at {}",
        pairs.len(),
        pairs.first().map(|(k, _)| k.to_string()).unwrap_or_default(),
        pairs.first().map(|(_, i)| i.to_string()).unwrap_or_default(),
    ))]
    DuplicateKeyIndex {
        /// Every (key, index) combination that appears more than once.
        pairs: Vec<(Key, IndexValue)>,
    },

    /// A step-dependent operation met an irregular table without an explicit
    /// interval override. Recoverable: supply the step via the `*_with`
    /// variant of the operation.
    #[snafu(display(
        "Cannot {operation} on an irregular table without an explicit interval"
    ))]
    AmbiguousInterval {
        /// The operation that needed a regular step.
        operation: &'static str,
    },

    /// An explicit interval override must be a positive tick count.
    #[snafu(display("Explicit interval step must be positive, got {ticks}"))]
    NonPositiveStep {
        /// The offending step value.
        ticks: i64,
    },

    /// A partition's step grid spans more offsets than the u32 bitmap
    /// domain can address.
    #[snafu(display(
        "Gap grid for key {key} spans {offsets} step offsets, exceeding the bitmap domain ({max})"
    ))]
    GapDomainOverflow {
        /// The partition whose grid overflowed.
        key: Key,
        /// Number of step offsets between the partition's min and max index.
        offsets: u64,
        /// Maximum addressable offset.
        max: u32,
    },

    /// The caller's bucketing function is not monotonic non-decreasing with
    /// respect to the index order.
    #[snafu(display(
        "Bucketing function is not monotonic for key {key}: index {at_index} mapped to {bucket}, \
         after an earlier row mapped to {previous}"
    ))]
    InvalidBucketFunction {
        /// The partition where monotonicity broke.
        key: Key,
        /// The index value whose bucket went backwards.
        at_index: IndexValue,
        /// The offending bucket value.
        bucket: IndexValue,
        /// The previous (larger) bucket value.
        previous: IndexValue,
    },

    /// Multi-input window operands do not share identical (key, index)
    /// structure.
    #[snafu(display("Window inputs are misaligned: {detail}"))]
    MisalignedInputs {
        /// Description of the first structural mismatch found.
        detail: String,
    },

    /// A caller-supplied reduction failed for one window; the computation
    /// for that call aborts, results already produced for other keys are
    /// unaffected by corruption.
    #[snafu(display("Reduction failed for key {key} at anchor {anchor}: {source}"))]
    Reduction {
        /// The partition whose window failed.
        key: Key,
        /// Anchor index of the failing window.
        anchor: IndexValue,
        /// The callable's failure.
        source: CallableError,
    },

    /// A caller-supplied aggregation failed for one bucket.
    #[snafu(display("Aggregation {name} failed for key {key} at bucket {bucket}: {source}"))]
    Aggregation {
        /// Output column name of the failing aggregation.
        name: String,
        /// The partition whose bucket failed.
        key: Key,
        /// Bucket value of the failing group.
        bucket: IndexValue,
        /// The callable's failure.
        source: CallableError,
    },

    /// An operation referenced a measurement column the table does not have.
    #[snafu(display("No measurement column named {column}"))]
    NoSuchMeasurement {
        /// The missing column name.
        column: String,
    },

    /// The window specification is unusable (zero size or step).
    #[snafu(display("Invalid window specification: {detail}"))]
    InvalidWindow {
        /// What is wrong with the specification.
        detail: String,
    },

    /// Building the worker pool for parallel execution failed.
    #[snafu(display("Failed to build worker pool: {detail}"))]
    WorkerPool {
        /// The pool builder's error message.
        detail: String,
    },
}

impl From<SchemaError> for TableError {
    fn from(source: SchemaError) -> Self {
        TableError::Schema { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::KeyValue;

    #[test]
    fn duplicate_pairs_display_counts_and_names_the_first() {
        let err = TableError::DuplicateKeyIndex {
            pairs: vec![
                (
                    Key::new(vec![KeyValue::Utf8("east".into())]),
                    IndexValue::Ordinal(3),
                ),
                (
                    Key::new(vec![KeyValue::Utf8("west".into())]),
                    IndexValue::Ordinal(7),
                ),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 duplicate"));
        assert!(msg.contains("(east)"));
        assert!(msg.contains("at 3"));
    }

    #[test]
    fn reduction_display_carries_key_anchor_and_cause() {
        let err = TableError::Reduction {
            key: Key::empty(),
            anchor: IndexValue::Ordinal(42),
            source: CallableError::new("sensor went dark"),
        };
        let msg = err.to_string();
        assert!(msg.contains("<global>"));
        assert!(msg.contains("42"));
        assert!(msg.contains("sensor went dark"));
    }

    #[test]
    fn callable_error_round_trips_its_message() {
        let err = CallableError::from("boom".to_string());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err, CallableError::new("boom"));
    }
}
