//! Canonical result envelope: one JSON-serializable shape for every search
//! outcome, successful or not, plus the per-failure-mode diagnostic reports
//! and the sodium advisory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use nutrition::UlViolation;

use crate::feasibility::{MaxDailyAchievable, DAILY_TOLERANCE};
use crate::model::{
    Assignment, DailyTracker, PlanningUserProfile, WeeklyTracker, MAX_SLOTS_PER_DAY,
};
use crate::state::PinnedConflict;

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TerminationCode {
    /// Full multi-day plan found.
    #[serde(rename = "TC-1")]
    #[strum(serialize = "TC-1")]
    FullWeekly,
    /// No plan exists under the constraints.
    #[serde(rename = "TC-2")]
    #[strum(serialize = "TC-2")]
    Infeasible,
    /// Attempt limit reached before an outcome was proven.
    #[serde(rename = "TC-3")]
    #[strum(serialize = "TC-3")]
    LimitExhausted,
    /// Single-day plan found (no weekly validation).
    #[serde(rename = "TC-4")]
    #[strum(serialize = "TC-4")]
    SingleDaySuccess,
}

/// Why a failed search failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum FailureMode {
    /// Some slot has no eligible recipe at all.
    #[serde(rename = "FM-1")]
    #[strum(serialize = "FM-1")]
    UnfillableSlot,
    /// No combination lands some day inside its tolerances.
    #[serde(rename = "FM-2")]
    #[strum(serialize = "FM-2")]
    DailyInfeasibility,
    /// A pinned assignment violates a hard constraint.
    #[serde(rename = "FM-3")]
    #[strum(serialize = "FM-3")]
    PinnedConflict,
    /// Weekly micronutrient shortfall or sodium-ceiling block.
    #[serde(rename = "FM-4")]
    #[strum(serialize = "FM-4")]
    WeeklyShortfall,
    /// Attempt limit reached; best partial attached.
    #[serde(rename = "FM-5")]
    #[strum(serialize = "FM-5")]
    AttemptLimitReached,
}

/// Weekly sodium advisory attached when tracked sodium exceeds twice the
/// prorated RDI. Advisory only; never fails the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SodiumAdvisory {
    #[serde(rename = "type")]
    pub kind: String,
    pub weekly_sodium_mg: f64,
    pub recommended_max_mg: f64,
    pub ratio: f64,
}

/// Build the sodium advisory when warranted.
pub fn build_sodium_advisory(
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
    days: usize,
) -> Option<SodiumAdvisory> {
    let daily_rdi = profile.micronutrient_targets.get("sodium_mg").copied()?;
    if daily_rdi <= 0.0 {
        return None;
    }
    let weekly_sodium = weekly_tracker.weekly_totals.micronutrient("sodium_mg");
    let recommended_max = 2.0 * daily_rdi * days as f64;
    if weekly_sodium <= recommended_max {
        return None;
    }
    Some(SodiumAdvisory {
        kind: "sodium_advisory".to_string(),
        weekly_sodium_mg: weekly_sodium,
        recommended_max_mg: recommended_max,
        ratio: weekly_sodium / recommended_max,
    })
}

/// One macro outside its allowed daily band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroViolation {
    pub actual: f64,
    pub target: f64,
    pub allowed_min: f64,
    pub allowed_max: f64,
}

/// Per-macro violations for one day's totals; empty when the day is valid.
pub fn macro_violations(
    tracker: &DailyTracker,
    profile: &PlanningUserProfile,
) -> BTreeMap<String, MacroViolation> {
    let mut violations = BTreeMap::new();
    let checks = [
        (
            "calories",
            tracker.calories_consumed,
            profile.daily_calories as f64,
        ),
        ("protein_g", tracker.protein_consumed, profile.daily_protein_g),
        ("carbs_g", tracker.carbs_consumed, profile.daily_carbs_g),
    ];
    for (name, actual, target) in checks {
        let tolerance = DAILY_TOLERANCE * target;
        if (actual - target).abs() > tolerance {
            violations.insert(
                name.to_string(),
                MacroViolation {
                    actual,
                    target,
                    allowed_min: target - tolerance,
                    allowed_max: target + tolerance,
                },
            );
        }
    }
    let (fat_min, fat_max) = profile.daily_fat_g;
    if tracker.fat_consumed < fat_min || tracker.fat_consumed > fat_max {
        violations.insert(
            "fat_g".to_string(),
            MacroViolation {
                actual: tracker.fat_consumed,
                target: (fat_min + fat_max) / 2.0,
                allowed_min: fat_min,
                allowed_max: fat_max,
            },
        );
    }
    if let Some(ceiling) = profile.max_daily_calories {
        if tracker.calories_consumed > ceiling as f64 {
            violations.insert(
                "max_daily_calories".to_string(),
                MacroViolation {
                    actual: tracker.calories_consumed,
                    target: ceiling as f64,
                    allowed_min: 0.0,
                    allowed_max: ceiling as f64,
                },
            );
        }
    }
    violations
}

/// A partial plan attached to failure reports: the assignments plus the
/// trackers that held when it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub assignments: Vec<Assignment>,
    pub daily_trackers: BTreeMap<usize, DailyTracker>,
}

/// A slot that could not be filled, with the constraints that blocked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfillableSlot {
    pub day: usize,
    pub slot_index: usize,
    pub eligible_recipe_count: usize,
    pub blocking_constraints: Vec<String>,
}

/// One day that failed daily validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedDayReport {
    pub day: usize,
    pub macro_violations: BTreeMap<String, MacroViolation>,
    pub ul_violations: Vec<UlViolation>,
    pub detail: String,
}

/// Whether one best day of eating could close a weekly deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeficitClass {
    /// One day of maximum intake would close the gap.
    Marginal,
    /// Even the best possible day cannot.
    Structural,
}

/// A tracked nutrient short of its weekly requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeficientNutrient {
    pub nutrient: String,
    pub achieved: f64,
    pub required: f64,
    pub deficit: f64,
    pub classification: DeficitClass,
}

/// Classify every weekly deficit as marginal or structural against the
/// best-case single-day intake table.
pub fn deficient_nutrients(
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
    days: usize,
    max_daily_achievable: &MaxDailyAchievable,
) -> Vec<DeficientNutrient> {
    let mut out = Vec::new();
    for (nutrient, daily_rdi) in &profile.micronutrient_targets {
        if *daily_rdi <= 0.0 {
            continue;
        }
        let required = daily_rdi * days as f64;
        let achieved = weekly_tracker.weekly_totals.micronutrient(nutrient);
        let deficit = required - achieved;
        if deficit <= 0.0 {
            continue;
        }
        let best_single_day = max_daily_achievable
            .get(nutrient)
            .map(|per_count| {
                (1..=MAX_SLOTS_PER_DAY)
                    .filter_map(|m| per_count.get(&m))
                    .fold(0.0_f64, |a, b| a.max(*b))
            })
            .unwrap_or(0.0);
        let classification = if deficit <= best_single_day {
            DeficitClass::Marginal
        } else {
            DeficitClass::Structural
        };
        out.push(DeficientNutrient {
            nutrient: nutrient.clone(),
            achieved,
            required,
            deficit,
            classification,
        });
    }
    out
}

/// Mode-specific diagnostics carried in the result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureReport {
    Unfillable {
        unfillable_slots: Vec<UnfillableSlot>,
    },
    DailyInfeasibility {
        failed_days: Vec<FailedDayReport>,
        closest_plan: Option<PlanSnapshot>,
    },
    PinnedConflicts {
        pinned_conflicts: Vec<PinnedConflict>,
    },
    WeeklyShortfall {
        deficient_nutrients: Vec<DeficientNutrient>,
    },
    AttemptLimit {
        attempts: usize,
        backtracks: usize,
        search_exhaustive: bool,
        best_plan: Option<PlanSnapshot>,
        best_plan_violations: Vec<FailedDayReport>,
    },
}

/// Observational search statistics. Never affects results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatsSummary {
    pub attempts: usize,
    pub backtracks: usize,
    /// Candidate-list size per decision point, keyed `"day:slot"`.
    pub branching_factors: BTreeMap<String, usize>,
    pub attempts_per_day: BTreeMap<usize, usize>,
    pub max_backtrack_depth: usize,
    pub average_backtrack_depth: f64,
    pub total_runtime_secs: f64,
    pub day_runtime_secs: BTreeMap<usize, f64>,
}

/// Canonical result of one search invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanResult {
    pub success: bool,
    pub termination_code: TerminationCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_mode: Option<FailureMode>,
    /// The full plan on success; `None` on failure.
    pub plan: Option<Vec<Assignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_trackers: Option<BTreeMap<usize, DailyTracker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_tracker: Option<WeeklyTracker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<SodiumAdvisory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<FailureReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStatsSummary>,
}

impl MealPlanResult {
    pub fn success(
        termination_code: TerminationCode,
        plan: Vec<Assignment>,
        daily_trackers: BTreeMap<usize, DailyTracker>,
        weekly_tracker: WeeklyTracker,
        warning: Option<SodiumAdvisory>,
        stats: Option<SearchStatsSummary>,
    ) -> Self {
        MealPlanResult {
            success: true,
            termination_code,
            failure_mode: None,
            plan: Some(plan),
            daily_trackers: Some(daily_trackers),
            weekly_tracker: Some(weekly_tracker),
            warning,
            report: None,
            stats,
        }
    }

    pub fn failure(
        termination_code: TerminationCode,
        failure_mode: FailureMode,
        report: FailureReport,
        warning: Option<SodiumAdvisory>,
        stats: Option<SearchStatsSummary>,
    ) -> Self {
        MealPlanResult {
            success: false,
            termination_code,
            failure_mode: Some(failure_mode),
            plan: None,
            daily_trackers: None,
            weekly_tracker: None,
            warning,
            report: Some(report),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn profile() -> PlanningUserProfile {
        PlanningUserProfile {
            daily_calories: 2000,
            daily_protein_g: 100.0,
            daily_fat_g: (50.0, 80.0),
            daily_carbs_g: 250.0,
            max_daily_calories: None,
            schedule: vec![vec![crate::model::MealSlot::new("08:00", 3, "breakfast")]],
            excluded_ingredients: BTreeSet::new(),
            liked_foods: BTreeSet::new(),
            demographic: "adult_male".to_string(),
            upper_limits_overrides: BTreeMap::new(),
            pinned_assignments: Vec::new(),
            micronutrient_targets: BTreeMap::new(),
            activity_schedule: None,
            enable_primary_carb_downscaling: false,
            max_scaling_steps: 4,
            scaling_step_fraction: 0.10,
        }
    }

    #[test]
    fn test_codes_serialize_as_wire_strings() {
        assert_eq!(
            serde_json::to_value(TerminationCode::FullWeekly).unwrap(),
            "TC-1"
        );
        assert_eq!(
            serde_json::to_value(FailureMode::PinnedConflict).unwrap(),
            "FM-3"
        );
        assert_eq!(TerminationCode::SingleDaySuccess.to_string(), "TC-4");
        assert_eq!(FailureMode::AttemptLimitReached.to_string(), "FM-5");
    }

    #[test]
    fn test_sodium_advisory_threshold() {
        let mut profile = profile();
        profile
            .micronutrient_targets
            .insert("sodium_mg".to_string(), 500.0);
        let mut weekly = WeeklyTracker::new(2, &profile.micronutrient_targets);

        let mut micros = nutrition::MicronutrientProfile::default();
        micros.set("sodium_mg", 4400.0);
        weekly.weekly_totals =
            nutrition::NutritionProfile::new(4000.0, 200.0, 120.0, 500.0).with_micronutrients(micros);

        // 4400 > 2 * 500 * 2 = 2000
        let advisory = build_sodium_advisory(&weekly, &profile, 2).unwrap();
        assert_eq!(advisory.kind, "sodium_advisory");
        assert_eq!(advisory.recommended_max_mg, 2000.0);
        assert!((advisory.ratio - 2.2).abs() < 1e-9);

        // At or under the threshold there is no advisory
        let mut micros = nutrition::MicronutrientProfile::default();
        micros.set("sodium_mg", 2000.0);
        weekly.weekly_totals =
            nutrition::NutritionProfile::new(4000.0, 200.0, 120.0, 500.0).with_micronutrients(micros);
        assert!(build_sodium_advisory(&weekly, &profile, 2).is_none());
    }

    #[test]
    fn test_macro_violations_reports_out_of_band_macros() {
        let profile = profile();
        let mut tracker = DailyTracker::new(1);
        tracker.calories_consumed = 2500.0; // 25% over
        tracker.protein_consumed = 100.0; // on target
        tracker.carbs_consumed = 250.0;
        tracker.fat_consumed = 40.0; // below the 50 minimum

        let violations = macro_violations(&tracker, &profile);
        assert!(violations.contains_key("calories"));
        assert!(violations.contains_key("fat_g"));
        assert!(!violations.contains_key("protein_g"));
        assert_eq!(violations["calories"].allowed_max, 2200.0);
    }

    #[test]
    fn test_deficit_classification() {
        let mut profile = profile();
        profile
            .micronutrient_targets
            .insert("iron_mg".to_string(), 10.0);
        profile
            .micronutrient_targets
            .insert("zinc_mg".to_string(), 11.0);

        let mut weekly = WeeklyTracker::new(2, &profile.micronutrient_targets);
        let mut micros = nutrition::MicronutrientProfile::default();
        micros.set("iron_mg", 15.0); // needs 20, deficit 5
        micros.set("zinc_mg", 2.0); // needs 22, deficit 20
        weekly.weekly_totals =
            nutrition::NutritionProfile::new(4000.0, 200.0, 120.0, 500.0).with_micronutrients(micros);

        let mut mda = MaxDailyAchievable::new();
        mda.insert("iron_mg".to_string(), [(2usize, 8.0)].into_iter().collect());
        mda.insert("zinc_mg".to_string(), [(2usize, 6.0)].into_iter().collect());

        let deficits = deficient_nutrients(&weekly, &profile, 2, &mda);
        assert_eq!(deficits.len(), 2);
        let iron = deficits.iter().find(|d| d.nutrient == "iron_mg").unwrap();
        assert_eq!(iron.classification, DeficitClass::Marginal);
        let zinc = deficits.iter().find(|d| d.nutrient == "zinc_mg").unwrap();
        assert_eq!(zinc.classification, DeficitClass::Structural);
        assert_eq!(zinc.deficit, 20.0);
    }

    #[test]
    fn test_result_envelope_roundtrips_through_json() {
        let result = MealPlanResult::failure(
            TerminationCode::Infeasible,
            FailureMode::UnfillableSlot,
            FailureReport::Unfillable {
                unfillable_slots: vec![UnfillableSlot {
                    day: 0,
                    slot_index: 1,
                    eligible_recipe_count: 0,
                    blocking_constraints: vec!["HC-2".to_string()],
                }],
            },
            None,
            None,
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: MealPlanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert!(json.contains("\"TC-2\""));
        assert!(json.contains("\"FM-1\""));
    }
}
