//! Time interval value type used by the activity aggregator.
//!
//! Intervals are created per computation and discarded after the response is
//! built; they are never persisted.

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// An immutable `[start, end]` time range with `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, rejecting an inverted range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "interval start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True iff this interval's end instant exactly equals `next`'s start.
    ///
    /// Strict equality on the underlying instant, no tolerance window: two
    /// events that end/begin at the same instant are one continuous
    /// activity, while a one-second gap keeps them separate. Overlap does
    /// NOT make two intervals connected; only exact adjacency does.
    pub fn is_connected(&self, next: &TimeInterval) -> bool {
        self.end == next.start
    }

    /// Merge two connected intervals into one continuous interval.
    ///
    /// # Panics
    ///
    /// Panics if the intervals are not connected. Calling merge on
    /// non-connected intervals is a programming error in the aggregation
    /// fold, not a recoverable condition.
    pub fn merge(&self, next: &TimeInterval) -> TimeInterval {
        assert!(
            self.is_connected(next),
            "merge called on non-connected intervals ({} .. {}) and ({} .. {})",
            self.start,
            self.end,
            next.start,
            next.end
        );
        TimeInterval {
            start: self.start,
            end: next.end,
        }
    }
}
