//! Antipyretic dosing safety validation.
//!
//! A safety check is a pure function of the proposed dose, the dosing
//! history, the latest weight record, and the baby's age; nothing is stored
//! between checks and every check is recomputed fully from history. All
//! rules are evaluated and violations accumulate, so one check can report
//! several problems at once. Recording an administered dose is the caller's
//! responsibility; this module only decides.

use crate::config::DosingConfig;
use crate::{age_in_months, DosingEvent, DrugClass};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One failed safety rule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SafetyViolation {
    /// Below the drug's minimum approved age
    AgeNotSafe,
    /// A dose of any drug class was given within the any-dose window
    TooSoonSinceAnyDose,
    /// A dose of the same drug class was given within its re-dosing window
    TooSoonSinceSameDrug,
    /// Proposed amount exceeds the weight-based per-dose ceiling
    SingleDoseExceeded,
    /// Trailing-24h same-drug total incl. the proposed dose exceeds the
    /// weight-based daily maximum
    DailyDoseExceeded,
    /// No weight record exists; weight-based rules could not be evaluated
    WeightMissing,
}

impl SafetyViolation {
    /// Stable label for display and logs
    pub fn label(&self) -> &'static str {
        match self {
            SafetyViolation::AgeNotSafe => "AGE_NOT_SAFE",
            SafetyViolation::TooSoonSinceAnyDose => "TOO_SOON_SINCE_ANY_DOSE",
            SafetyViolation::TooSoonSinceSameDrug => "TOO_SOON_SINCE_SAME_DRUG",
            SafetyViolation::SingleDoseExceeded => "SINGLE_DOSE_EXCEEDED",
            SafetyViolation::DailyDoseExceeded => "DAILY_DOSE_EXCEEDED",
            SafetyViolation::WeightMissing => "WEIGHT_MISSING",
        }
    }
}

/// Outcome of a safety check.
///
/// A disallowed dose is a normal domain decision, not an error: `allowed`
/// is true iff `violations` is empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetyCheckResult {
    pub allowed: bool,
    pub violations: BTreeSet<SafetyViolation>,
}

impl SafetyCheckResult {
    fn from_violations(violations: BTreeSet<SafetyViolation>) -> Self {
        SafetyCheckResult {
            allowed: violations.is_empty(),
            violations,
        }
    }
}

/// Everything a safety check reads, loaded by the caller
#[derive(Clone, Debug)]
pub struct DoseCheckContext<'a> {
    pub now: DateTime<Utc>,
    pub birth_date: NaiveDate,
    pub drug_class: DrugClass,
    pub proposed_amount_mg: f64,
    /// Dosing history ordered by `administered_at` descending
    pub history: &'a [DosingEvent],
    /// Most recent recorded weight in kilograms, if any
    pub latest_weight_kg: Option<f64>,
}

/// `true` iff the dose at `administered_at` falls strictly within `window`
/// before `now`. Equality with the window boundary is outside the window,
/// i.e. safe.
fn within_window(now: DateTime<Utc>, administered_at: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(administered_at) < window
}

/// Evaluate the five dosing-safety rules against the proposed dose.
///
/// Rules:
/// 1. age below the drug's minimum approved age;
/// 2. missing weight record, which also skips rules 3 and 4 (they are
///    absent from the violation set, not evaluated as safe);
/// 3. weight-based per-dose ceiling;
/// 4. weight-based trailing-24h same-drug cumulative ceiling, proposed
///    dose included;
/// 5. minimum spacing since any dose and, independently, since the last
///    same-drug dose.
pub fn check_safety(ctx: &DoseCheckContext, config: &DosingConfig) -> SafetyCheckResult {
    let mut violations = BTreeSet::new();
    let limits = config.limits(ctx.drug_class);

    // Rule 1: minimum approved age
    let age_months = age_in_months(ctx.birth_date, ctx.now.date_naive());
    if age_months < limits.min_age_months {
        tracing::debug!(
            "Age {} months is below the {} minimum of {} months",
            age_months,
            ctx.drug_class.name(),
            limits.min_age_months
        );
        violations.insert(SafetyViolation::AgeNotSafe);
    }

    // Rules 2-4: weight-based ceilings, skipped entirely without a weight
    match ctx.latest_weight_kg {
        None => {
            violations.insert(SafetyViolation::WeightMissing);
        }
        Some(weight_kg) => {
            let single_ceiling_mg = weight_kg * limits.single_dose_max_mg_per_kg;
            if ctx.proposed_amount_mg > single_ceiling_mg {
                tracing::debug!(
                    "Proposed {} mg exceeds the per-dose ceiling of {} mg at {} kg",
                    ctx.proposed_amount_mg,
                    single_ceiling_mg,
                    weight_kg
                );
                violations.insert(SafetyViolation::SingleDoseExceeded);
            }

            let daily_ceiling_mg = weight_kg * limits.daily_max_mg_per_kg;
            let taken_mg: f64 = ctx
                .history
                .iter()
                .filter(|d| d.drug_class == ctx.drug_class)
                .filter(|d| within_window(ctx.now, d.administered_at, Duration::hours(24)))
                .map(|d| d.amount_mg)
                .sum();
            if taken_mg + ctx.proposed_amount_mg > daily_ceiling_mg {
                tracing::debug!(
                    "Trailing-24h {} total {} mg + proposed {} mg exceeds {} mg",
                    ctx.drug_class.name(),
                    taken_mg,
                    ctx.proposed_amount_mg,
                    daily_ceiling_mg
                );
                violations.insert(SafetyViolation::DailyDoseExceeded);
            }
        }
    }

    // Rule 5: minimum intervals. History is newest-first, so the first
    // entry is the latest dose of any drug class.
    if let Some(last_any) = ctx.history.first() {
        let any_window = Duration::hours(config.any_dose_interval_hours);
        if within_window(ctx.now, last_any.administered_at, any_window) {
            violations.insert(SafetyViolation::TooSoonSinceAnyDose);
        }
    }
    if let Some(last_same) = ctx
        .history
        .iter()
        .find(|d| d.drug_class == ctx.drug_class)
    {
        let same_window = Duration::hours(limits.same_drug_interval_hours);
        if within_window(ctx.now, last_same.administered_at, same_window) {
            violations.insert(SafetyViolation::TooSoonSinceSameDrug);
        }
    }

    let result = SafetyCheckResult::from_violations(violations);
    tracing::info!(
        "Safety check for {} mg {}: allowed={} violations={:?}",
        ctx.proposed_amount_mg,
        ctx.drug_class.name(),
        result.allowed,
        result.violations.iter().map(|v| v.label()).collect::<Vec<_>>()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap()
    }

    fn birth_date() -> NaiveDate {
        // 19 months old at `now`
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn dose(drug_class: DrugClass, amount_mg: f64, minutes_ago: i64) -> DosingEvent {
        DosingEvent {
            id: Uuid::new_v4(),
            drug_class,
            amount_mg,
            administered_at: now() - Duration::minutes(minutes_ago),
        }
    }

    fn ctx<'a>(history: &'a [DosingEvent], amount_mg: f64) -> DoseCheckContext<'a> {
        DoseCheckContext {
            now: now(),
            birth_date: birth_date(),
            drug_class: DrugClass::Acetaminophen,
            proposed_amount_mg: amount_mg,
            history,
            latest_weight_kg: Some(10.0),
        }
    }

    #[test]
    fn test_all_clear_dose_is_allowed() {
        let result = check_safety(&ctx(&[], 120.0), &DosingConfig::default());
        assert!(result.allowed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_age_below_minimum_is_not_safe() {
        let mut context = ctx(&[], 30.0);
        // 2 months old, acetaminophen minimum is 3
        context.birth_date = NaiveDate::from_ymd_opt(2025, 12, 10).unwrap();

        let result = check_safety(&context, &DosingConfig::default());
        assert!(!result.allowed);
        assert!(result.violations.contains(&SafetyViolation::AgeNotSafe));
    }

    #[test]
    fn test_age_rule_fires_regardless_of_other_inputs() {
        let history = vec![dose(DrugClass::Acetaminophen, 100.0, 30)];
        let mut context = ctx(&history, 500.0);
        context.birth_date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        context.latest_weight_kg = None;

        let result = check_safety(&context, &DosingConfig::default());
        assert!(result.violations.contains(&SafetyViolation::AgeNotSafe));
        assert!(result.violations.contains(&SafetyViolation::WeightMissing));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
    }

    #[test]
    fn test_missing_weight_suppresses_dose_ceiling_rules() {
        // An absurd amount that would trip both ceilings must NOT surface
        // them without a weight basis; they are skipped, not passed.
        let mut context = ctx(&[], 100_000.0);
        context.latest_weight_kg = None;

        let result = check_safety(&context, &DosingConfig::default());
        assert!(!result.allowed);
        assert!(result.violations.contains(&SafetyViolation::WeightMissing));
        assert!(!result
            .violations
            .contains(&SafetyViolation::SingleDoseExceeded));
        assert!(!result
            .violations
            .contains(&SafetyViolation::DailyDoseExceeded));
    }

    #[test]
    fn test_single_dose_ceiling() {
        // 10 kg at 15 mg/kg: ceiling is exactly 150 mg
        let result = check_safety(&ctx(&[], 150.0), &DosingConfig::default());
        assert!(result.allowed, "a dose exactly at the ceiling is allowed");

        let result = check_safety(&ctx(&[], 150.1), &DosingConfig::default());
        assert!(result
            .violations
            .contains(&SafetyViolation::SingleDoseExceeded));
    }

    #[test]
    fn test_daily_ceiling_counts_trailing_24h_same_drug() {
        // 10 kg at 75 mg/kg/day: ceiling is 750 mg. 300 + 300 within the
        // window plus 150 proposed sits exactly at the ceiling.
        let history = vec![
            dose(DrugClass::Acetaminophen, 300.0, 5 * 60),
            dose(DrugClass::Acetaminophen, 300.0, 10 * 60),
        ];
        let result = check_safety(&ctx(&history, 150.0), &DosingConfig::default());
        assert!(!result.violations.contains(&SafetyViolation::DailyDoseExceeded));

        let result = check_safety(&ctx(&history, 151.0), &DosingConfig::default());
        assert!(result.violations.contains(&SafetyViolation::DailyDoseExceeded));
    }

    #[test]
    fn test_daily_ceiling_ignores_doses_older_than_24h() {
        let history = vec![
            dose(DrugClass::Acetaminophen, 300.0, 5 * 60),
            dose(DrugClass::Acetaminophen, 700.0, 25 * 60),
        ];
        let result = check_safety(&ctx(&history, 150.0), &DosingConfig::default());
        assert!(!result.violations.contains(&SafetyViolation::DailyDoseExceeded));
    }

    #[test]
    fn test_daily_ceiling_ignores_other_drug_classes() {
        let history = vec![
            dose(DrugClass::Ibuprofen, 700.0, 7 * 60),
            dose(DrugClass::Acetaminophen, 300.0, 10 * 60),
        ];
        let result = check_safety(&ctx(&history, 150.0), &DosingConfig::default());
        assert!(!result.violations.contains(&SafetyViolation::DailyDoseExceeded));
    }

    #[test]
    fn test_dose_90_minutes_after_same_drug_trips_both_intervals() {
        // Last acetaminophen at 10:30, proposed at 12:00: inside both the
        // 2h any-dose and 4h same-drug windows.
        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 90)];
        let result = check_safety(&ctx(&history, 120.0), &DosingConfig::default());

        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));
    }

    #[test]
    fn test_same_drug_window_outlasts_any_dose_window() {
        // 3h after the last acetaminophen: past the 2h any-dose spacing but
        // still inside the 4h same-drug window.
        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 3 * 60)];
        let result = check_safety(&ctx(&history, 120.0), &DosingConfig::default());

        assert!(!result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));
    }

    #[test]
    fn test_window_boundary_equality_is_safe() {
        // Exactly 4h after the last same-drug dose: both windows are
        // satisfied because boundary equality is outside the window.
        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 4 * 60)];
        let result = check_safety(&ctx(&history, 120.0), &DosingConfig::default());
        assert!(result.allowed);

        // One minute earlier is still inside the same-drug window.
        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 4 * 60 - 1)];
        let result = check_safety(&ctx(&history, 120.0), &DosingConfig::default());
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));
    }

    #[test]
    fn test_other_drug_dose_trips_only_any_dose_interval() {
        let history = vec![dose(DrugClass::Ibuprofen, 80.0, 60)];
        let result = check_safety(&ctx(&history, 120.0), &DosingConfig::default());

        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
        assert!(!result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));
    }

    #[test]
    fn test_interval_scenario_with_three_hour_same_drug_window() {
        // Last dose at 10:00. With a 3h same-drug window, a 11:30 proposal
        // violates both interval rules and a 13:00 proposal violates
        // neither (boundary equality is safe).
        let mut config = DosingConfig::default();
        config.acetaminophen.same_drug_interval_hours = 3;

        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 2 * 60)];

        let mut at_1130 = ctx(&history, 120.0);
        at_1130.now = now() - Duration::minutes(30); // 90 min after the dose
        let result = check_safety(&at_1130, &config);
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));

        let mut at_1300 = ctx(&history, 120.0);
        at_1300.now = now() + Duration::hours(1); // 3h after the dose
        let result = check_safety(&at_1300, &config);
        assert!(result.allowed);
    }

    #[test]
    fn test_violations_accumulate() {
        let mut config = DosingConfig::default();
        config.acetaminophen.min_age_months = 24;

        let history = vec![dose(DrugClass::Acetaminophen, 300.0, 60)];
        let result = check_safety(&ctx(&history, 200.0), &config);

        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 4);
        assert!(result.violations.contains(&SafetyViolation::AgeNotSafe));
        assert!(result
            .violations
            .contains(&SafetyViolation::SingleDoseExceeded));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceAnyDose));
        assert!(result
            .violations
            .contains(&SafetyViolation::TooSoonSinceSameDrug));
    }

    #[test]
    fn test_check_never_mutates_history() {
        let history = vec![dose(DrugClass::Acetaminophen, 120.0, 90)];
        let before = history.clone();

        let _ = check_safety(&ctx(&history, 120.0), &DosingConfig::default());

        assert_eq!(history.len(), before.len());
        assert_eq!(history[0].amount_mg, before[0].amount_mg);
    }
}
