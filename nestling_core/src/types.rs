//! Core domain types for the Nestling infant-care system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Care event records and their categories
//! - Growth measurements
//! - Antipyretic dosing events and drug classes
//! - The baby profile (birth date and sex)

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Record Types
// ============================================================================

/// Category of a recorded care event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Feeding,
    Sleep,
    Excretion,
    Fever,
    Medication,
    Growth,
}

/// Biological sex, the lookup key axis for growth reference tables
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// Kind of growth measurement
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Height,
    Weight,
    HeadSize,
}

/// Active pharmaceutical ingredient class of an antipyretic dose.
///
/// Drug classes carry separate minimum-age, per-dose, daily-total, and
/// re-dosing-interval rules.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DrugClass {
    Acetaminophen,
    Ibuprofen,
}

impl DrugClass {
    /// Human-readable drug name for display
    pub fn name(&self) -> &'static str {
        match self {
            DrugClass::Acetaminophen => "acetaminophen",
            DrugClass::Ibuprofen => "ibuprofen",
        }
    }
}

// ============================================================================
// Record Types (persisted by the surrounding record flow, read-only here)
// ============================================================================

/// A raw timestamped care event as persisted by the record flow.
///
/// Duration-bearing categories (feeding, sleep, excretion) carry a real
/// `[started_at, ended_at]` range; instantaneous categories store
/// `ended_at == started_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CareEvent {
    pub id: Uuid,
    pub record_type: RecordType,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// A growth measurement sample
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrowthSample {
    pub id: Uuid,
    pub measurement_type: MeasurementType,
    /// Centimetres for height/head size, kilograms for weight
    pub value: f64,
    pub measured_at: DateTime<Utc>,
}

/// An administered antipyretic dose
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DosingEvent {
    pub id: Uuid,
    pub drug_class: DrugClass,
    pub amount_mg: f64,
    pub administered_at: DateTime<Utc>,
}

// ============================================================================
// Baby Profile
// ============================================================================

/// The baby this data directory belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BabyProfile {
    pub birth_date: NaiveDate,
    pub sex: Sex,
}

impl BabyProfile {
    /// Integer number of full days elapsed since birth.
    ///
    /// Negative for dates before the birth date; callers reject that as
    /// invalid input.
    pub fn day_of_life(&self, on: NaiveDate) -> i64 {
        (on - self.birth_date).num_days()
    }

    /// Whole calendar months of age on the given date
    pub fn age_in_months(&self, on: NaiveDate) -> u32 {
        age_in_months(self.birth_date, on)
    }
}

/// Whole calendar months elapsed from `birth_date` to `on` (floor)
pub fn age_in_months(birth_date: NaiveDate, on: NaiveDate) -> u32 {
    if on <= birth_date {
        return 0;
    }
    let years = on.year() - birth_date.year();
    let months = on.month() as i32 - birth_date.month() as i32;
    let mut total = years * 12 + months;
    if on.day() < birth_date.day() {
        total -= 1;
    }
    total.max(0) as u32
}
