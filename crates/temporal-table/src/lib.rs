//! # temporal-table
//!
//! Temporal tidy tables: validated (key, index) structure, automatic
//! interval inference, implicit-gap detection and filling, index
//! aggregation, and the sliding / tiling / stretching window families.
//!
//! This crate is the supported public entry point and provides a small,
//! stable surface over `temporal-table-core`.
//!
//! ## Example
//!
//! ```rust
//! use temporal_table::prelude::*;
//!
//! let table = TemporalTable::new(
//!     vec![
//!         Column::i64("t", [1, 2, 3, 5, 6]),
//!         Column::utf8("sensor", ["A", "A", "A", "A", "A"]),
//!         Column::f64("reading", [0.1, 0.2, 0.3, 0.5, 0.6]),
//!     ],
//!     "t",
//!     &["sensor"],
//! )?;
//!
//! // The step is inferred; index 4 is an implicit gap.
//! let report = table.scan_gaps()?;
//! assert_eq!(report.total_missing(), 1);
//!
//! let filled = table.fill_gaps(&FillPolicy::constant(Datum::Float64(0.0)))?;
//! assert_eq!(filled.num_rows(), 6);
//!
//! // Rolling sum over windows of three observations.
//! let sums = filled.slide(
//!     &WindowSpec::new(3),
//!     Execution::Sequential,
//!     |w: &WindowView<'_>| Ok::<_, CallableError>(w.numeric("reading")?.iter().sum::<f64>()),
//! )?;
//! assert_eq!(sums.len(), 4);
//! # Ok::<(), temporal_table::TableError>(())
//! ```
#![deny(missing_docs)]

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

pub use temporal_table_core::aggregate::Aggregation;
pub use temporal_table_core::bucketing::{
    bucket_id, bucket_start, floor_index, floorer, BucketError, BucketSpec,
};
pub use temporal_table_core::gaps::{FillPolicy, FillStrategy, GapReport, KeyGapReport};
pub use temporal_table_core::interval::Interval;
pub use temporal_table_core::schema::{Column, SchemaError, TableSchema};
pub use temporal_table_core::table::error::{CallableError, TableError};
pub use temporal_table_core::table::TemporalTable;
pub use temporal_table_core::value::{Datum, IndexDomain, IndexValue, Key, KeyValue};
pub use temporal_table_core::window::exec::Execution;
pub use temporal_table_core::window::{Align, Partial, WindowResult, WindowSpec, WindowView};
