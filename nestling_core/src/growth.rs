//! Growth percentile resolution.
//!
//! Two read paths over the reference table:
//! - band classification of the latest measurement against the reference
//!   population for the baby's current day of life
//! - a charting series of population medians at a fixed cadence with the
//!   baby's own samples overlaid

use crate::{
    BabyProfile, Error, GrowthReference, GrowthSample, MeasurementType, Result, TOP_OUT_BAND,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sampling cadence of the population-median trend line, in days of life
pub const TREND_CADENCE_DAYS: u32 = 14;

/// The most recent sample of a measurement type, if any
pub fn latest_sample(
    samples: &[GrowthSample],
    measurement_type: MeasurementType,
) -> Option<&GrowthSample> {
    samples
        .iter()
        .filter(|s| s.measurement_type == measurement_type)
        .max_by_key(|s| s.measured_at)
}

/// Classify the baby's latest measurement into a percentile band.
///
/// The band is the smallest percentile whose reference value is `>=` the
/// measured value; a value exactly on a boundary classifies into that
/// boundary's band, and a value above the 99th-percentile column tops out
/// at band [`TOP_OUT_BAND`]. A missing sample or uncovered day of life is
/// `NotFound`, never defaulted.
pub fn classify_band(
    reference: &GrowthReference,
    profile: &BabyProfile,
    samples: &[GrowthSample],
    measurement_type: MeasurementType,
    today: NaiveDate,
) -> Result<u8> {
    let sample = latest_sample(samples, measurement_type).ok_or_else(|| {
        Error::NotFound(format!("no {:?} sample recorded", measurement_type))
    })?;

    let day_of_life = profile.day_of_life(today);
    if day_of_life < 0 {
        return Err(Error::InvalidInput(format!(
            "date {} is before the birth date {}",
            today, profile.birth_date
        )));
    }

    let row = reference.lookup(profile.sex, measurement_type, day_of_life as u32)?;

    let band = row
        .bands()
        .iter()
        .find(|(_, value)| *value >= sample.value)
        .map(|(band, _)| *band)
        .unwrap_or(TOP_OUT_BAND);

    tracing::info!(
        "Classified {:?} {} at day {} into band {}",
        measurement_type,
        sample.value,
        day_of_life,
        band
    );

    Ok(band)
}

/// One point of the growth trend chart.
///
/// Median points lie on the fixed cadence grid; measured points lie at the
/// sample's actual day of life. The two series share a point only when
/// those days coincide.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub day_of_life: u32,
    pub population_median: Option<f64>,
    pub measured: Option<f64>,
}

/// Build the charting series: population medians every
/// [`TREND_CADENCE_DAYS`] up to the baby's current day of life, overlaid
/// with the baby's own recorded measurements at their actual day of life.
///
/// The two series are independently sampled and merged for display only,
/// never averaged or interpolated against each other.
pub fn growth_history(
    reference: &GrowthReference,
    profile: &BabyProfile,
    samples: &[GrowthSample],
    measurement_type: MeasurementType,
    today: NaiveDate,
) -> Result<Vec<TrendPoint>> {
    let current_day = profile.day_of_life(today);
    if current_day < 0 {
        return Err(Error::InvalidInput(format!(
            "date {} is before the birth date {}",
            today, profile.birth_date
        )));
    }
    let current_day = current_day as u32;

    let mut points: BTreeMap<u32, TrendPoint> = BTreeMap::new();

    let mut median_points = 0usize;
    let mut day = 0;
    while day <= current_day {
        if let Ok(row) = reference.lookup(profile.sex, measurement_type, day) {
            points
                .entry(day)
                .or_insert_with(|| TrendPoint {
                    day_of_life: day,
                    population_median: None,
                    measured: None,
                })
                .population_median = Some(row.median());
            median_points += 1;
        }
        day += TREND_CADENCE_DAYS;
    }

    if median_points == 0 {
        return Err(Error::NotFound(format!(
            "growth reference carries no {:?}/{:?} medians up to day {}",
            profile.sex, measurement_type, current_day
        )));
    }

    // Overlay the baby's samples at their actual day of life, oldest first
    // so a re-measurement on the same day wins.
    let mut own: Vec<&GrowthSample> = samples
        .iter()
        .filter(|s| s.measurement_type == measurement_type)
        .collect();
    own.sort_by_key(|s| s.measured_at);

    for sample in own {
        let day = profile.day_of_life(sample.measured_at.date_naive());
        if day < 0 {
            tracing::warn!(
                "Skipping {:?} sample measured before birth ({})",
                measurement_type,
                sample.measured_at
            );
            continue;
        }
        let day = day as u32;
        points
            .entry(day)
            .or_insert_with(|| TrendPoint {
                day_of_life: day,
                population_median: None,
                measured: None,
            })
            .measured = Some(sample.value);
    }

    Ok(points.into_values().collect())
}
