//! Growth percentile reference tables.
//!
//! This module provides the static reference population data used by the
//! growth resolver: per-(sex, measurement, day-of-life) percentile rows,
//! a cached built-in table derived from the WHO Child Growth Standards,
//! and a CSV loader for swapping in a fuller table.

use crate::{Error, MeasurementType, Result, Sex};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Band label under which the 99th-percentile column value is published.
///
/// A measurement above every tabulated percentile classifies into this band
/// (top-out), so the band axis is 3/10/25/50/75/90/97/100.
pub const TOP_OUT_BAND: u8 = 100;

/// The percentile band axis, ascending
pub const PERCENTILE_BANDS: [u8; 8] = [3, 10, 25, 50, 75, 90, 97, TOP_OUT_BAND];

/// One reference-population row: percentile values for a sex, measurement
/// kind, and day of life.
#[derive(Clone, Debug)]
pub struct PercentileRow {
    pub sex: Sex,
    pub measurement_type: MeasurementType,
    pub day_of_life: u32,
    pub p3: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p97: f64,
    pub p99: f64,
}

impl PercentileRow {
    /// The row's band axis as a precomputed ascending `(band, value)` array.
    ///
    /// The 99th-percentile value is exposed under [`TOP_OUT_BAND`].
    pub fn bands(&self) -> [(u8, f64); 8] {
        [
            (3, self.p3),
            (10, self.p10),
            (25, self.p25),
            (50, self.p50),
            (75, self.p75),
            (90, self.p90),
            (97, self.p97),
            (TOP_OUT_BAND, self.p99),
        ]
    }

    /// Population median for this row
    pub fn median(&self) -> f64 {
        self.p50
    }

    fn values_ascending(&self) -> bool {
        self.bands().windows(2).all(|w| w[0].1 <= w[1].1)
    }
}

/// A queryable growth reference table.
///
/// Rows are grouped per `(sex, measurement_type)` series and kept sorted by
/// day of life so lookups resolve by nearest-or-equal day.
#[derive(Clone, Debug)]
pub struct GrowthReference {
    series: HashMap<(Sex, MeasurementType), Vec<PercentileRow>>,
}

impl GrowthReference {
    /// Build a reference table from a flat row list
    pub fn from_rows(rows: Vec<PercentileRow>) -> Self {
        let mut series: HashMap<(Sex, MeasurementType), Vec<PercentileRow>> = HashMap::new();
        for row in rows {
            series
                .entry((row.sex, row.measurement_type))
                .or_default()
                .push(row);
        }
        for rows in series.values_mut() {
            rows.sort_by_key(|r| r.day_of_life);
        }
        GrowthReference { series }
    }

    /// Resolve the reference row for a day of life.
    ///
    /// "Nearest-or-equal" resolution: the row with the greatest tabulated
    /// day `<=` the requested day. A day of life below the series' first
    /// tabulated day, or a series the table does not carry at all, is
    /// reported as `NotFound` rather than silently defaulted.
    pub fn lookup(
        &self,
        sex: Sex,
        measurement_type: MeasurementType,
        day_of_life: u32,
    ) -> Result<&PercentileRow> {
        let rows = self.series.get(&(sex, measurement_type)).ok_or_else(|| {
            Error::NotFound(format!(
                "no growth reference series for {:?}/{:?}",
                sex, measurement_type
            ))
        })?;

        let idx = rows.partition_point(|r| r.day_of_life <= day_of_life);
        if idx == 0 {
            return Err(Error::NotFound(format!(
                "growth reference for {:?}/{:?} does not cover day of life {}",
                sex, measurement_type, day_of_life
            )));
        }
        Ok(&rows[idx - 1])
    }

    /// Validate the table for consistency.
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for ((sex, ty), rows) in &self.series {
            if rows.is_empty() {
                errors.push(format!("Series {:?}/{:?} has no rows", sex, ty));
            }

            for row in rows {
                if !row.values_ascending() {
                    errors.push(format!(
                        "Series {:?}/{:?} day {}: percentile values not non-decreasing",
                        sex, ty, row.day_of_life
                    ));
                }
                if row.p3 <= 0.0 {
                    errors.push(format!(
                        "Series {:?}/{:?} day {}: non-positive percentile value",
                        sex, ty, row.day_of_life
                    ));
                }
            }

            for pair in rows.windows(2) {
                if pair[0].day_of_life == pair[1].day_of_life {
                    errors.push(format!(
                        "Series {:?}/{:?}: duplicate day of life {}",
                        sex, ty, pair[0].day_of_life
                    ));
                }
            }
        }

        errors
    }

    /// Load a reference table from a CSV file.
    ///
    /// Expected header: `sex,measurement_type,day_of_life,p3,p10,p25,p50,p75,p90,p97,p99`.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

        let mut rows = Vec::new();
        for result in reader.deserialize::<CsvRow>() {
            let row = result?;
            rows.push(PercentileRow::try_from(row)?);
        }

        tracing::info!("Loaded {} growth reference rows from {:?}", rows.len(), path);
        Ok(Self::from_rows(rows))
    }
}

/// CSV row format for externally supplied reference tables
#[derive(Debug, Deserialize)]
struct CsvRow {
    sex: String,
    measurement_type: String,
    day_of_life: u32,
    p3: f64,
    p10: f64,
    p25: f64,
    p50: f64,
    p75: f64,
    p90: f64,
    p97: f64,
    p99: f64,
}

impl TryFrom<CsvRow> for PercentileRow {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let sex = match row.sex.to_lowercase().as_str() {
            "male" | "m" | "boy" => Sex::Male,
            "female" | "f" | "girl" => Sex::Female,
            other => {
                return Err(Error::InvalidInput(format!("unknown sex '{}'", other)));
            }
        };

        let measurement_type = match row.measurement_type.to_lowercase().as_str() {
            "height" | "length" => MeasurementType::Height,
            "weight" => MeasurementType::Weight,
            "head_size" | "head" => MeasurementType::HeadSize,
            other => {
                return Err(Error::InvalidInput(format!(
                    "unknown measurement type '{}'",
                    other
                )));
            }
        };

        Ok(PercentileRow {
            sex,
            measurement_type,
            day_of_life: row.day_of_life,
            p3: row.p3,
            p10: row.p10,
            p25: row.p25,
            p50: row.p50,
            p75: row.p75,
            p90: row.p90,
            p97: row.p97,
            p99: row.p99,
        })
    }
}

// ============================================================================
// Built-in Reference Data (WHO Child Growth Standards, birth to 24 months)
// ============================================================================

/// Cached built-in reference table - built once and reused across all
/// operations
static BUILTIN_REFERENCE: Lazy<GrowthReference> = Lazy::new(build_builtin_reference_internal);

/// Get a reference to the cached built-in growth reference table
pub fn builtin_reference() -> &'static GrowthReference {
    &BUILTIN_REFERENCE
}

/// Build a fresh copy of the built-in table.
///
/// **Note**: For production use, prefer `builtin_reference()` which returns
/// a cached reference. This function is retained for testing.
pub fn build_builtin_reference() -> GrowthReference {
    build_builtin_reference_internal()
}

type SeriesData = [(u32, [f64; 8]); 7];

// Percentile columns per row: [p3, p10, p25, p50, p75, p90, p97, p99].
// Day points at birth and months 3, 6, 9, 12, 18, 24.

// Weight-for-age, kilograms
const BOY_WEIGHT: SeriesData = [
    (0, [2.5, 2.8, 3.0, 3.3, 3.7, 4.0, 4.3, 4.6]),
    (91, [5.1, 5.6, 6.0, 6.4, 7.0, 7.5, 8.0, 8.5]),
    (182, [6.4, 6.9, 7.4, 7.9, 8.6, 9.2, 9.8, 10.4]),
    (274, [7.2, 7.8, 8.3, 8.9, 9.6, 10.3, 11.0, 11.6]),
    (365, [7.8, 8.4, 9.0, 9.6, 10.4, 11.2, 12.0, 12.7]),
    (548, [8.9, 9.6, 10.2, 10.9, 11.8, 12.7, 13.7, 14.5]),
    (730, [9.8, 10.6, 11.3, 12.2, 13.1, 14.2, 15.3, 16.2]),
];

const GIRL_WEIGHT: SeriesData = [
    (0, [2.4, 2.7, 2.9, 3.2, 3.6, 3.9, 4.2, 4.4]),
    (91, [4.6, 5.1, 5.4, 5.8, 6.4, 6.9, 7.4, 7.9]),
    (182, [5.8, 6.3, 6.8, 7.3, 7.9, 8.5, 9.2, 9.7]),
    (274, [6.5, 7.1, 7.6, 8.2, 8.9, 9.6, 10.4, 10.9]),
    (365, [7.1, 7.7, 8.2, 8.9, 9.6, 10.4, 11.2, 11.8]),
    (548, [8.2, 8.9, 9.5, 10.2, 11.1, 12.0, 13.0, 13.7]),
    (730, [9.2, 9.9, 10.6, 11.5, 12.4, 13.5, 14.6, 15.4]),
];

// Length/height-for-age, centimetres
const BOY_HEIGHT: SeriesData = [
    (0, [46.1, 47.2, 48.4, 49.9, 51.4, 52.7, 53.8, 54.7]),
    (91, [57.3, 58.5, 59.9, 61.4, 63.0, 64.3, 65.5, 66.4]),
    (182, [63.3, 64.6, 66.0, 67.6, 69.3, 70.7, 72.0, 73.0]),
    (274, [67.5, 68.9, 70.4, 72.0, 73.8, 75.3, 76.7, 77.7]),
    (365, [71.0, 72.4, 74.0, 75.7, 77.6, 79.2, 80.7, 81.7]),
    (548, [76.9, 78.4, 80.3, 82.3, 84.4, 86.2, 87.9, 89.1]),
    (730, [81.0, 82.8, 84.8, 87.1, 89.4, 91.4, 93.3, 94.6]),
];

const GIRL_HEIGHT: SeriesData = [
    (0, [45.4, 46.5, 47.7, 49.1, 50.6, 51.9, 53.0, 53.9]),
    (91, [55.6, 56.9, 58.3, 59.8, 61.4, 62.8, 64.1, 65.0]),
    (182, [61.2, 62.6, 64.1, 65.7, 67.4, 68.9, 70.3, 71.3]),
    (274, [65.3, 66.8, 68.4, 70.1, 72.0, 73.6, 75.1, 76.2]),
    (365, [68.9, 70.4, 72.1, 74.0, 76.0, 77.7, 79.3, 80.5]),
    (548, [74.9, 76.6, 78.5, 80.7, 83.0, 84.9, 86.8, 88.1]),
    (730, [79.3, 81.1, 83.2, 85.7, 88.2, 90.4, 92.5, 93.9]),
];

// Head-circumference-for-age, centimetres
const BOY_HEAD: SeriesData = [
    (0, [32.1, 32.8, 33.6, 34.5, 35.3, 36.1, 36.9, 37.3]),
    (91, [38.3, 39.0, 39.7, 40.5, 41.3, 42.0, 42.7, 43.1]),
    (182, [41.0, 41.7, 42.5, 43.3, 44.2, 44.9, 45.6, 46.0]),
    (274, [42.7, 43.4, 44.2, 45.0, 45.8, 46.6, 47.3, 47.7]),
    (365, [43.8, 44.5, 45.3, 46.1, 47.0, 47.7, 48.4, 48.9]),
    (548, [45.0, 45.8, 46.6, 47.4, 48.3, 49.1, 49.8, 50.2]),
    (730, [45.9, 46.6, 47.4, 48.3, 49.1, 49.9, 50.7, 51.1]),
];

const GIRL_HEAD: SeriesData = [
    (0, [31.7, 32.4, 33.1, 33.9, 34.7, 35.4, 36.1, 36.6]),
    (91, [37.4, 38.1, 38.8, 39.5, 40.4, 41.1, 41.8, 42.2]),
    (182, [39.9, 40.6, 41.4, 42.2, 43.0, 43.8, 44.5, 44.9]),
    (274, [41.5, 42.2, 42.9, 43.8, 44.6, 45.4, 46.1, 46.5]),
    (365, [42.6, 43.3, 44.1, 44.9, 45.7, 46.5, 47.2, 47.7]),
    (548, [43.9, 44.6, 45.4, 46.2, 47.1, 47.9, 48.6, 49.1]),
    (730, [44.8, 45.5, 46.3, 47.2, 48.0, 48.8, 49.6, 50.1]),
];

fn push_series(
    rows: &mut Vec<PercentileRow>,
    sex: Sex,
    measurement_type: MeasurementType,
    data: &SeriesData,
) {
    for (day_of_life, p) in data {
        rows.push(PercentileRow {
            sex,
            measurement_type,
            day_of_life: *day_of_life,
            p3: p[0],
            p10: p[1],
            p25: p[2],
            p50: p[3],
            p75: p[4],
            p90: p[5],
            p97: p[6],
            p99: p[7],
        });
    }
}

fn build_builtin_reference_internal() -> GrowthReference {
    let mut rows = Vec::new();

    push_series(&mut rows, Sex::Male, MeasurementType::Weight, &BOY_WEIGHT);
    push_series(&mut rows, Sex::Female, MeasurementType::Weight, &GIRL_WEIGHT);
    push_series(&mut rows, Sex::Male, MeasurementType::Height, &BOY_HEIGHT);
    push_series(&mut rows, Sex::Female, MeasurementType::Height, &GIRL_HEIGHT);
    push_series(&mut rows, Sex::Male, MeasurementType::HeadSize, &BOY_HEAD);
    push_series(&mut rows, Sex::Female, MeasurementType::HeadSize, &GIRL_HEAD);

    GrowthReference::from_rows(rows)
}
