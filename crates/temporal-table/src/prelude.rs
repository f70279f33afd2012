//! Wrapper prelude.
//!
//! The `temporal-table` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::{
    Aggregation, Align, BucketSpec, CallableError, Column, Datum, Execution, FillPolicy,
    FillStrategy, GapReport, IndexDomain, IndexValue, Interval, Key, KeyValue, Partial,
    TableError, TableSchema, TemporalTable, WindowResult, WindowSpec, WindowView,
};
