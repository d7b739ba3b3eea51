//! Append-only record journal.
//!
//! Care events, growth samples, and dosing events are appended to JSONL
//! (JSON Lines) files with file locking for safe concurrent access. The
//! journal stands in for the surrounding record store: the engine itself
//! never reads files, it is handed the slices these loaders return.

use crate::{CareEvent, DosingEvent, DurationCategory, GrowthSample, Result, TimeInterval};
use chrono::{Days, NaiveDate, NaiveTime};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Journal file name for duration-bearing care events
pub const EVENTS_FILE: &str = "events.jsonl";
/// Journal file name for administered doses
pub const DOSES_FILE: &str = "doses.jsonl";
/// Journal file name for growth samples
pub const GROWTH_FILE: &str = "growth.jsonl";

/// Record sink for appending journal entries
pub trait RecordSink<T> {
    fn append(&mut self, record: &T) -> Result<()>;
}

/// JSONL-based record sink with file locking
pub struct JsonlSink<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> JsonlSink<T> {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl<T: Serialize> RecordSink<T> for JsonlSink<T> {
    fn append(&mut self, record: &T) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Exclusive lock while appending; released on drop
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended record to {:?}", self.path);
        Ok(())
    }
}

/// Read all records from a JSONL file.
///
/// Malformed lines are logged and skipped so one corrupt entry does not
/// hide the rest of the journal.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse record at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Load the raw event intervals for one category across a date window.
///
/// Returns intervals for events of the category that overlap
/// `[from, to]` (whole calendar days, inclusive), sorted by start
/// ascending. Events of other categories are ignored; events with an
/// inverted range are logged and skipped.
pub fn load_category_intervals(
    path: &Path,
    category: DurationCategory,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<TimeInterval>> {
    let window_start = from.and_time(NaiveTime::MIN).and_utc();
    let window_end = (to + Days::new(1)).and_time(NaiveTime::MIN).and_utc();

    let events: Vec<CareEvent> = read_records(path)?;
    let mut intervals = Vec::new();

    for event in &events {
        if event.record_type != category.record_type() {
            continue;
        }
        if event.ended_at <= window_start || event.started_at >= window_end {
            continue;
        }
        match TimeInterval::new(event.started_at, event.ended_at) {
            Ok(interval) => intervals.push(interval),
            Err(e) => {
                tracing::warn!("Skipping event {} with invalid range: {}", event.id, e);
            }
        }
    }

    intervals.sort_by_key(|i| i.start());

    tracing::info!(
        "Loaded {} {} intervals between {} and {}",
        intervals.len(),
        category.name(),
        from,
        to
    );

    Ok(intervals)
}

/// Load the full dosing history, newest first
pub fn load_dosing_history(path: &Path) -> Result<Vec<DosingEvent>> {
    let mut doses: Vec<DosingEvent> = read_records(path)?;
    doses.sort_by(|a, b| b.administered_at.cmp(&a.administered_at));

    tracing::debug!("Loaded {} dosing events", doses.len());
    Ok(doses)
}

/// Load all growth samples, oldest first
pub fn load_growth_samples(path: &Path) -> Result<Vec<GrowthSample>> {
    let mut samples: Vec<GrowthSample> = read_records(path)?;
    samples.sort_by_key(|s| s.measured_at);

    tracing::debug!("Loaded {} growth samples", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DrugClass, MeasurementType, RecordType};
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, d, h, m, 0).unwrap()
    }

    fn care_event(record_type: RecordType, start: DateTime<Utc>, end: DateTime<Utc>) -> CareEvent {
        CareEvent {
            id: Uuid::new_v4(),
            record_type,
            started_at: start,
            ended_at: end,
        }
    }

    #[test]
    fn test_append_and_read_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EVENTS_FILE);

        let mut sink = JsonlSink::new(&path);
        let event = care_event(RecordType::Sleep, at(2, 13, 0), at(2, 15, 0));
        let event_id = event.id;
        sink.append(&event).unwrap();

        let events: Vec<CareEvent> = read_records(&path).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event_id);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nonexistent.jsonl");

        let events: Vec<CareEvent> = read_records(&path).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EVENTS_FILE);

        let mut sink = JsonlSink::new(&path);
        sink.append(&care_event(RecordType::Sleep, at(2, 13, 0), at(2, 15, 0)))
            .unwrap();

        // Inject a corrupt line, then append another valid record
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json }}").unwrap();
        }
        sink.append(&care_event(RecordType::Sleep, at(3, 1, 0), at(3, 2, 0)))
            .unwrap();

        let events: Vec<CareEvent> = read_records(&path).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_load_category_intervals_filters_and_sorts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EVENTS_FILE);

        let mut sink = JsonlSink::new(&path);
        sink.append(&care_event(RecordType::Sleep, at(2, 20, 0), at(2, 21, 0)))
            .unwrap();
        sink.append(&care_event(RecordType::Feeding, at(2, 9, 0), at(2, 9, 30)))
            .unwrap();
        sink.append(&care_event(RecordType::Sleep, at(2, 13, 0), at(2, 15, 0)))
            .unwrap();

        let from = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 4, 7).unwrap();

        let intervals =
            load_category_intervals(&path, DurationCategory::Sleep, from, to).unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start(), at(2, 13, 0));
        assert_eq!(intervals[1].start(), at(2, 20, 0));
    }

    #[test]
    fn test_load_category_intervals_window_excludes_outside_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EVENTS_FILE);

        let mut sink = JsonlSink::new(&path);
        sink.append(&care_event(RecordType::Sleep, at(1, 10, 0), at(1, 11, 0)))
            .unwrap();
        sink.append(&care_event(RecordType::Sleep, at(20, 10, 0), at(20, 11, 0)))
            .unwrap();

        let from = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 4, 8).unwrap();

        let intervals =
            load_category_intervals(&path, DurationCategory::Sleep, from, to).unwrap();
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_midnight_spanning_event_included_at_window_edge() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EVENTS_FILE);

        // Ends inside the window even though it starts before it
        let mut sink = JsonlSink::new(&path);
        sink.append(&care_event(RecordType::Sleep, at(1, 23, 0), at(2, 1, 0)))
            .unwrap();

        let from = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 4, 8).unwrap();

        let intervals =
            load_category_intervals(&path, DurationCategory::Sleep, from, to).unwrap();
        assert_eq!(intervals.len(), 1);
    }

    #[test]
    fn test_dosing_history_sorted_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(DOSES_FILE);

        let mut sink = JsonlSink::new(&path);
        for (hour, amount) in [(8, 120.0), (14, 120.0), (11, 80.0)] {
            sink.append(&DosingEvent {
                id: Uuid::new_v4(),
                drug_class: DrugClass::Acetaminophen,
                amount_mg: amount,
                administered_at: at(2, hour, 0),
            })
            .unwrap();
        }

        let doses = load_dosing_history(&path).unwrap();
        assert_eq!(doses.len(), 3);
        assert_eq!(doses[0].administered_at, at(2, 14, 0));
        assert_eq!(doses[2].administered_at, at(2, 8, 0));
    }

    #[test]
    fn test_growth_samples_sorted_oldest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(GROWTH_FILE);

        let mut sink = JsonlSink::new(&path);
        for (day, value) in [(10, 4.2), (2, 3.6)] {
            sink.append(&GrowthSample {
                id: Uuid::new_v4(),
                measurement_type: MeasurementType::Weight,
                value,
                measured_at: at(day, 9, 0),
            })
            .unwrap();
        }

        let samples = load_growth_samples(&path).unwrap();
        assert_eq!(samples[0].value, 3.6);
        assert_eq!(samples[1].value, 4.2);
    }
}
