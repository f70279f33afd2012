//! Canonical step inference for the index axis.
//!
//! The interval is the smallest consistent step between consecutive
//! observations of one unit, expressed in ticks of the table's index domain
//! (microseconds, days, or ordinal strides — see
//! [`crate::value::IndexDomain`]).
//!
//! Inference pools the successive differences of every key partition and
//! takes their greatest common divisor, so
//!
//! - a single partition observed at `[t, t+h, t+3h]` infers `h`, and
//! - partitions stepping at `2h` and `3h` respectively infer `h` as well.
//!
//! Partitions with fewer than two observations carry no spacing evidence and
//! are skipped; a table with no evidence at all is [`Interval::Unknown`],
//! which is distinct from [`Interval::Irregular`] (evidence of *no* grid).

use serde::{Deserialize, Serialize};

/// The inferred (or explicitly supplied) step of a table's index axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    /// A consistent step of `ticks` index ticks.
    Regular {
        /// Step width in index ticks; always positive.
        ticks: i64,
    },
    /// No consistent step exists; step-dependent operations need an explicit
    /// override.
    Irregular,
    /// No partition had two observations, so there is no spacing evidence.
    Unknown,
}

impl Interval {
    /// The step width, when the interval is regular.
    pub fn regular_ticks(&self) -> Option<i64> {
        match self {
            Interval::Regular { ticks } => Some(*ticks),
            _ => None,
        }
    }

    /// True when the interval is [`Interval::Regular`].
    pub fn is_regular(&self) -> bool {
        matches!(self, Interval::Regular { .. })
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Regular { ticks } => write!(f, "regular ({ticks} ticks)"),
            Interval::Irregular => write!(f, "irregular"),
            Interval::Unknown => write!(f, "unknown"),
        }
    }
}

/// Greatest common divisor of two non-negative tick counts.
fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Infer the interval from per-partition tick sequences.
///
/// Each slice must be the sorted, distinct tick values of one key partition
/// (the table layer guarantees both). The result is classified as:
///
/// - `Unknown` — no partition contributed a difference;
/// - `Regular { ticks: g }` — `g` is the GCD of all pooled differences;
/// - `Irregular` — the GCD collapsed to a single base tick that was never
///   itself an observed difference, i.e. the data look like arbitrary event
///   times rather than a grid.
pub fn infer_interval<'a>(partitions: impl IntoIterator<Item = &'a [i64]>) -> Interval {
    let mut g: i64 = 0;
    let mut min_diff = i64::MAX;

    for ticks in partitions {
        for pair in ticks.windows(2) {
            let diff = pair[1] - pair[0];
            debug_assert!(diff > 0, "partition ticks must be sorted and distinct");
            g = gcd(g, diff);
            min_diff = min_diff.min(diff);
        }
    }

    if g == 0 {
        return Interval::Unknown;
    }

    if g == 1 && min_diff > 1 {
        // Pooled differences are co-prime down to the tick unit without the
        // unit ever being observed: arbitrary event times, not a grid.
        log::debug!(
            "interval inference collapsed to one base tick (min diff {min_diff}); \
             marking irregular"
        );
        return Interval::Irregular;
    }

    Interval::Regular { ticks: g }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_partition_infers_common_step() {
        let ticks = [0i64, 10, 20, 30];
        assert_eq!(
            infer_interval([ticks.as_slice()]),
            Interval::Regular { ticks: 10 }
        );
    }

    #[test]
    fn gap_in_partition_still_infers_gcd_step() {
        // [t, t+h, t+3h]: diffs h and 2h, gcd h.
        let ticks = [0i64, 5, 15];
        assert_eq!(
            infer_interval([ticks.as_slice()]),
            Interval::Regular { ticks: 5 }
        );
    }

    #[test]
    fn disagreeing_partitions_infer_cross_partition_gcd() {
        let a = [0i64, 6, 12];
        let b = [1i64, 10, 19];
        assert_eq!(
            infer_interval([a.as_slice(), b.as_slice()]),
            Interval::Regular { ticks: 3 }
        );
    }

    #[test]
    fn coprime_event_times_are_irregular() {
        let ticks = [0i64, 7, 18];
        assert_eq!(infer_interval([ticks.as_slice()]), Interval::Irregular);
    }

    #[test]
    fn unit_step_observed_is_regular() {
        let ticks = [0i64, 1, 2, 9];
        assert_eq!(
            infer_interval([ticks.as_slice()]),
            Interval::Regular { ticks: 1 }
        );
    }

    #[test]
    fn short_partitions_contribute_nothing() {
        let single = [42i64];
        let empty: [i64; 0] = [];
        assert_eq!(
            infer_interval([single.as_slice(), empty.as_slice()]),
            Interval::Unknown
        );

        // A short partition next to a real one does not disturb inference.
        let real = [0i64, 4, 8];
        assert_eq!(
            infer_interval([single.as_slice(), real.as_slice()]),
            Interval::Regular { ticks: 4 }
        );
    }

    #[test]
    fn interval_json_roundtrip() {
        for interval in [
            Interval::Regular { ticks: 60_000_000 },
            Interval::Irregular,
            Interval::Unknown,
        ] {
            let json = serde_json::to_string(&interval).unwrap();
            let back: Interval = serde_json::from_str(&json).unwrap();
            assert_eq!(back, interval);
        }
    }
}
