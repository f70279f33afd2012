//! Core engine for validated temporal tables.
//!
//! This crate provides the foundational pieces for `temporal-table`:
//!
//! - Scalar domains for index, key, and measurement values
//!   (`value` module).
//! - A validated, immutable, column-oriented [`table::TemporalTable`] with
//!   unique (key, index) rows, canonical key-major/index-ascending order,
//!   and automatically inferred index intervals (`interval` module).
//! - RoaringBitmap-based implicit-gap detection and gap filling against the
//!   inferred step grid (`gaps` module).
//! - Index coarsening with monotonic bucketing plus grouped reduction
//!   (`bucketing` and `aggregate` modules).
//! - Sliding / tiling / stretching window computation with multi-input and
//!   partition-parallel variants (`window` module).
//!
//! The crate's boundary is purely in-process: it consumes and produces
//! tabular values, never files or wire formats. Higher-level integration
//! is expected to depend on the `temporal-table` facade crate rather than
//! on internal module paths here.
#![deny(missing_docs)]
pub mod aggregate;
pub mod bucketing;
pub mod gaps;
pub mod interval;
pub mod schema;
pub mod table;
pub mod value;
pub mod window;
