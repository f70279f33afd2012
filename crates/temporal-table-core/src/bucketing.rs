//! Helpers for mapping index values into coarser, discrete buckets.
//!
//! These helpers are intentionally independent of the aggregation layer.
//! They just define a stable, documented mapping:
//!
//! - Bucket ids are `i64`, counted forward from the domain's zero point
//!   (the Unix epoch for timestamps, day zero for dates, zero for ordinals).
//! - The bucket width is determined by [`BucketSpec`].
//! - `bucket_id` is monotonic in the index: a later index value never maps
//!   to a smaller bucket id, which is exactly the contract
//!   [`crate::table::TemporalTable::aggregate_index`] checks for.
//! - Mapping uses euclidean division, so pre-epoch values floor correctly.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::value::{IndexDomain, IndexValue};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Bucket width for coarsening an index axis.
///
/// Time-based variants apply to the timestamp domain (`Days` also to the
/// date domain); `Ordinal` strides apply to the ordinal domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BucketSpec {
    /// A bucket spanning a fixed number of seconds.
    Seconds(u32),
    /// A bucket spanning a fixed number of minutes.
    Minutes(u32),
    /// A bucket spanning a fixed number of hours.
    Hours(u32),
    /// A bucket spanning a fixed number of days.
    Days(u32),
    /// A bucket spanning a fixed ordinal stride.
    Ordinal(i64),
}

/// Errors from resolving a bucket spec against an index domain.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum BucketError {
    /// The spec's unit does not apply to the index domain.
    #[snafu(display("Bucket spec {spec:?} does not apply to the {domain} domain"))]
    IncompatibleDomain {
        /// The offending spec.
        spec: BucketSpec,
        /// The index domain it was applied to.
        domain: IndexDomain,
    },

    /// The spec's width is zero (or negative, for ordinal strides).
    #[snafu(display("Bucket width must be positive: {spec:?}"))]
    NonPositiveWidth {
        /// The offending spec.
        spec: BucketSpec,
    },

    /// A floored tick value is not representable in the index domain.
    #[snafu(display("Bucket start at tick {ticks} is not representable in the {domain} domain"))]
    OutOfRange {
        /// The unrepresentable tick value.
        ticks: i64,
        /// The index domain.
        domain: IndexDomain,
    },
}

/// Bucket width in index ticks for `domain`.
pub fn width_ticks(spec: BucketSpec, domain: IndexDomain) -> Result<i64, BucketError> {
    let width = match (spec, domain) {
        (BucketSpec::Seconds(n), IndexDomain::Timestamp) => i64::from(n) * MICROS_PER_SECOND,
        (BucketSpec::Minutes(n), IndexDomain::Timestamp) => i64::from(n) * MICROS_PER_MINUTE,
        (BucketSpec::Hours(n), IndexDomain::Timestamp) => i64::from(n) * MICROS_PER_HOUR,
        (BucketSpec::Days(n), IndexDomain::Timestamp) => i64::from(n) * MICROS_PER_DAY,
        (BucketSpec::Days(n), IndexDomain::Date) => i64::from(n),
        (BucketSpec::Ordinal(k), IndexDomain::Ordinal) => k,
        _ => return IncompatibleDomainSnafu { spec, domain }.fail(),
    };
    ensure!(width > 0, NonPositiveWidthSnafu { spec });
    Ok(width)
}

/// Map an index value to its bucket id.
///
/// Bucket 0 starts at the domain's zero point; buckets are contiguous,
/// non-overlapping half-open intervals of `width_ticks` ticks. The returned
/// id is `floor(ticks / width)`, computed with euclidean division so the
/// mapping stays monotonic for pre-epoch values too.
pub fn bucket_id(spec: BucketSpec, value: &IndexValue) -> Result<i64, BucketError> {
    let width = width_ticks(spec, value.domain())?;
    Ok(value.ticks().div_euclid(width))
}

/// The index value at which bucket `id` starts.
pub fn bucket_start(
    spec: BucketSpec,
    domain: IndexDomain,
    id: i64,
) -> Result<IndexValue, BucketError> {
    let width = width_ticks(spec, domain)?;
    let ticks = id * width;
    IndexValue::from_ticks(domain, ticks).context(OutOfRangeSnafu { ticks, domain })
}

/// Floor an index value to the start of its containing bucket.
pub fn floor_index(spec: BucketSpec, value: &IndexValue) -> Result<IndexValue, BucketError> {
    let domain = value.domain();
    let width = width_ticks(spec, domain)?;
    let ticks = value.ticks().div_euclid(width) * width;
    IndexValue::from_ticks(domain, ticks).context(OutOfRangeSnafu { ticks, domain })
}

/// Build an infallible flooring function for use as a bucketing function.
///
/// Width/domain compatibility is validated once up front; the returned
/// closure is monotonic non-decreasing and therefore always a valid
/// argument to [`crate::table::TemporalTable::aggregate_index`].
pub fn floorer(
    spec: BucketSpec,
    domain: IndexDomain,
) -> Result<impl Fn(&IndexValue) -> IndexValue, BucketError> {
    let width = width_ticks(spec, domain)?;
    Ok(move |value: &IndexValue| {
        let ticks = value.ticks().div_euclid(width) * width;
        let floored = IndexValue::from_ticks(domain, ticks);
        debug_assert!(floored.is_some(), "floored tick below a valid value");
        floored.unwrap_or(*value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn bucket_id_monotonic_over_minutes() {
        let spec = BucketSpec::Minutes(1);
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let values: Vec<IndexValue> = [0, 1, 60, 61, 3600]
            .into_iter()
            .map(|s| IndexValue::Timestamp(base + chrono::Duration::seconds(s)))
            .collect();

        let ids: Vec<i64> = values
            .iter()
            .map(|v| bucket_id(spec, v).unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ids[0], ids[1]); // both in the first minute
        assert_eq!(ids[2], ids[0] + 1);
        assert_eq!(ids[4], ids[0] + 60);
    }

    #[test]
    fn floor_index_truncates_to_bucket_start() {
        let v = IndexValue::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 10, 17, 42).unwrap());
        let floored = floor_index(BucketSpec::Minutes(5), &v).unwrap();
        assert_eq!(
            floored,
            IndexValue::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 10, 15, 0).unwrap())
        );

        let d = IndexValue::Date(NaiveDate::from_ymd_opt(2020, 3, 7).unwrap());
        let week_ish = floor_index(BucketSpec::Days(7), &d).unwrap();
        assert!(matches!(week_ish, IndexValue::Date(_)));
        assert!(week_ish <= d);
        assert!(d.ticks() - week_ish.ticks() < 7);
    }

    #[test]
    fn floor_index_pre_epoch_floors_downward() {
        let v = IndexValue::Timestamp(Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 30).unwrap());
        let floored = floor_index(BucketSpec::Minutes(1), &v).unwrap();
        assert_eq!(
            floored,
            IndexValue::Timestamp(Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 0).unwrap())
        );
    }

    #[test]
    fn ordinal_strides() {
        assert_eq!(
            floor_index(BucketSpec::Ordinal(10), &IndexValue::Ordinal(37)).unwrap(),
            IndexValue::Ordinal(30)
        );
        assert_eq!(
            floor_index(BucketSpec::Ordinal(10), &IndexValue::Ordinal(-3)).unwrap(),
            IndexValue::Ordinal(-10)
        );
    }

    #[test]
    fn incompatible_units_are_rejected() {
        let d = IndexValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert!(matches!(
            floor_index(BucketSpec::Minutes(5), &d),
            Err(BucketError::IncompatibleDomain { .. })
        ));
        assert!(matches!(
            floor_index(BucketSpec::Ordinal(2), &IndexValue::Timestamp(Utc::now())),
            Err(BucketError::IncompatibleDomain { .. })
        ));
        assert!(matches!(
            floor_index(BucketSpec::Seconds(0), &IndexValue::Timestamp(Utc::now())),
            Err(BucketError::NonPositiveWidth { .. })
        ));
    }

    #[test]
    fn bucket_start_inverts_bucket_id() {
        let spec = BucketSpec::Hours(6);
        let v = IndexValue::Timestamp(Utc.with_ymd_and_hms(2021, 5, 5, 14, 30, 0).unwrap());
        let id = bucket_id(spec, &v).unwrap();
        let start = bucket_start(spec, IndexDomain::Timestamp, id).unwrap();
        assert_eq!(start, floor_index(spec, &v).unwrap());
    }

    #[test]
    fn bucket_spec_json_roundtrip() {
        for spec in [
            BucketSpec::Seconds(30),
            BucketSpec::Minutes(1),
            BucketSpec::Hours(6),
            BucketSpec::Days(7),
            BucketSpec::Ordinal(12),
        ] {
            let json = serde_json::to_string(&spec).unwrap();
            let back: BucketSpec = serde_json::from_str(&json).unwrap();
            assert_eq!(back, spec);
        }
    }
}
