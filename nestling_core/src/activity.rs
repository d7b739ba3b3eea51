//! Active-time aggregation for duration-bearing care events.
//!
//! Raw `(start, end)` event records for one category are merged into
//! non-overlapping blocks per calendar day, then folded into a weekly
//! summary. Merging uses strict adjacency: blocks that touch at exactly the
//! same instant are one continuous activity, any gap keeps them apart.

use crate::{Error, RecordType, Result, TimeInterval};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of days in a weekly summary window
pub const WEEK_DAYS: u64 = 7;

// ============================================================================
// Duration Categories
// ============================================================================

/// The closed subset of record types that carry a real duration.
///
/// Only these three categories are meaningful as continuous activity
/// intervals; every other `RecordType` is instantaneous and rejected at the
/// conversion boundary rather than silently producing an empty summary.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    Feeding,
    Sleep,
    Excretion,
}

impl DurationCategory {
    /// The record type this category aggregates
    pub fn record_type(&self) -> RecordType {
        match self {
            DurationCategory::Feeding => RecordType::Feeding,
            DurationCategory::Sleep => RecordType::Sleep,
            DurationCategory::Excretion => RecordType::Excretion,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DurationCategory::Feeding => "feeding",
            DurationCategory::Sleep => "sleep",
            DurationCategory::Excretion => "excretion",
        }
    }
}

impl TryFrom<RecordType> for DurationCategory {
    type Error = Error;

    fn try_from(record_type: RecordType) -> Result<Self> {
        match record_type {
            RecordType::Feeding => Ok(DurationCategory::Feeding),
            RecordType::Sleep => Ok(DurationCategory::Sleep),
            RecordType::Excretion => Ok(DurationCategory::Excretion),
            other => Err(Error::InvalidInput(format!(
                "record type {:?} carries no duration and cannot be aggregated",
                other
            ))),
        }
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// One merged activity window within a day, in minutes since midnight.
///
/// `end_minute` may be 1440 for a block that runs to the end of the day.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveBlock {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl ActiveBlock {
    pub fn duration_minutes(&self) -> u32 {
        self.end_minute - self.start_minute
    }
}

/// Merged activity windows for one category on one calendar day.
///
/// Blocks are sorted ascending by start and pairwise non-connected (any two
/// connected blocks would have been merged).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyActiveTime {
    pub date: NaiveDate,
    pub blocks: Vec<ActiveBlock>,
}

impl DailyActiveTime {
    /// Total merged active minutes for the day
    pub fn total_minutes(&self) -> u32 {
        self.blocks.iter().map(|b| b.duration_minutes()).sum()
    }
}

/// Seven consecutive daily summaries ending at the anchor date
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeeklyStatistics {
    pub category: DurationCategory,
    pub anchor_date: NaiveDate,
    pub days: Vec<DailyActiveTime>,
}

// ============================================================================
// Aggregation
// ============================================================================

/// Merge raw event intervals into the minimal daily block set.
///
/// Intervals are clipped at the day boundary, so an activity spanning
/// midnight contributes a trailing block to the earlier day and a leading
/// block to the later one; each day's summary is self-contained and
/// independently re-derivable. An empty event list yields empty blocks, not
/// an error.
pub fn aggregate_daily(events: &[TimeInterval], day: NaiveDate) -> DailyActiveTime {
    let day_start = day.and_time(NaiveTime::MIN).and_utc();
    let day_end = (day + Days::new(1)).and_time(NaiveTime::MIN).and_utc();

    // Clip to the day, dropping events without positive overlap
    let mut clipped: Vec<TimeInterval> = events
        .iter()
        .filter(|e| e.start() < day_end && e.end() > day_start)
        .filter_map(|e| TimeInterval::new(e.start().max(day_start), e.end().min(day_end)).ok())
        .collect();

    clipped.sort_by_key(|i| i.start());

    // Left-to-right fold: merge strictly adjacent intervals, emit on any gap
    let mut merged: Vec<TimeInterval> = Vec::new();
    let mut iter = clipped.into_iter();
    if let Some(mut current) = iter.next() {
        for next in iter {
            if current.is_connected(&next) {
                current = current.merge(&next);
            } else {
                merged.push(current);
                current = next;
            }
        }
        merged.push(current);
    }

    let minute_of_day = |t: DateTime<Utc>| (t - day_start).num_minutes() as u32;
    let blocks = merged
        .iter()
        .map(|i| ActiveBlock {
            start_minute: minute_of_day(i.start()),
            end_minute: minute_of_day(i.end()),
        })
        .collect();

    DailyActiveTime { date: day, blocks }
}

/// Compute the weekly summary for the 7-day window ending at `anchor_date`
/// (inclusive).
///
/// `events` are the raw intervals for this category across the window, as
/// loaded by the caller. Always returns exactly 7 daily entries regardless
/// of how many days had zero events.
pub fn weekly_statistics(
    category: DurationCategory,
    anchor_date: NaiveDate,
    events: &[TimeInterval],
) -> WeeklyStatistics {
    let days: Vec<DailyActiveTime> = (0..WEEK_DAYS)
        .map(|i| {
            let day = anchor_date - Days::new(WEEK_DAYS - 1 - i);
            aggregate_daily(events, day)
        })
        .collect();

    tracing::debug!(
        "Weekly {} summary ending {}: {} active minutes across {} events",
        category.name(),
        anchor_date,
        days.iter().map(|d| d.total_minutes()).sum::<u32>(),
        events.len()
    );

    WeeklyStatistics {
        category,
        anchor_date,
        days,
    }
}
