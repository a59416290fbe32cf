//! Initial-state construction from pinned assignments, pinned
//! pre-validation, and the target arithmetic shared by scoring and
//! feasibility (adjusted daily micronutrient targets, per-meal macro
//! targets).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraints::{
    check_calorie_ceiling, check_cooking_time, check_excluded_ingredients, CandidateView,
    HcViolation,
};
use crate::model::{
    Assignment, DailyTracker, PlanningRecipe, PlanningUserProfile, WeeklyTracker,
};
use crate::slots::{activity_context, next_day_first_slot, ActivityContext, Satiety};

/// One pinned assignment the search can never satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedConflict {
    /// 1-based day, matching the pin's own addressing.
    pub day: usize,
    pub slot_index: usize,
    pub recipe_id: String,
    pub violation: HcViolation,
}

/// Pre-validate every pin without constructing state.
///
/// Checks pin addressing (day/slot range, recipe present in the pool) plus
/// the hard constraints that are decidable from pins alone: excluded
/// ingredients, cooking-time bounds, the per-day calorie ceiling over pinned
/// recipes, same-day duplicate pins and consecutive-day non-workout
/// repetition. An empty return means the search may proceed.
pub fn validate_pinned_assignments(
    profile: &PlanningUserProfile,
    recipe_by_id: &BTreeMap<&str, &PlanningRecipe>,
    days: usize,
) -> Vec<PinnedConflict> {
    let mut conflicts = Vec::new();
    let schedule = &profile.schedule;

    for pin in &profile.pinned_assignments {
        let conflict = |violation| PinnedConflict {
            day: pin.day,
            slot_index: pin.slot_index,
            recipe_id: pin.recipe_id.clone(),
            violation,
        };

        if pin.day < 1 || pin.day > days {
            conflicts.push(conflict(HcViolation::PinnedMismatch));
            continue;
        }
        let day_index = pin.day - 1;
        let Some(day_slots) = schedule.get(day_index) else {
            conflicts.push(conflict(HcViolation::PinnedMismatch));
            continue;
        };
        if pin.slot_index >= day_slots.len() {
            conflicts.push(conflict(HcViolation::PinnedMismatch));
            continue;
        }
        let Some(recipe) = recipe_by_id.get(pin.recipe_id.as_str()) else {
            conflicts.push(conflict(HcViolation::PinnedMismatch));
            continue;
        };

        let view = CandidateView::base(recipe);
        if !check_excluded_ingredients(&view, profile) {
            conflicts.push(conflict(HcViolation::ExcludedIngredient));
        }
        if !check_cooking_time(&view, &day_slots[pin.slot_index]) {
            conflicts.push(conflict(HcViolation::CookingTimeExceeded));
        }
    }

    // Calorie ceiling over each day's pins combined: pins are permanent, so
    // a pinned day that already busts the ceiling can never be planned.
    if profile.max_daily_calories.is_some() {
        for day_index in 0..days {
            let Some(day_slots) = schedule.get(day_index) else {
                continue;
            };
            let mut tracker = DailyTracker::new(day_slots.len());
            for slot_index in 0..day_slots.len() {
                let Some(recipe_id) = profile.pinned_recipe_id(day_index, slot_index) else {
                    continue;
                };
                let Some(recipe) = recipe_by_id.get(recipe_id) else {
                    continue;
                };
                let view = CandidateView::base(recipe);
                if !check_calorie_ceiling(&view, Some(&tracker), profile) {
                    conflicts.push(PinnedConflict {
                        day: day_index + 1,
                        slot_index,
                        recipe_id: recipe_id.to_string(),
                        violation: HcViolation::CalorieCeilingExceeded,
                    });
                    continue;
                }
                tracker.add_assignment(&recipe.nutrition, &recipe.id, false);
            }
        }
    }

    // Same-day duplicate pins
    for day_index in 0..days {
        let mut seen: BTreeMap<&str, ()> = BTreeMap::new();
        for pin in pins_on_day(profile, day_index + 1) {
            if seen.insert(pin.recipe_id.as_str(), ()).is_some() {
                conflicts.push(PinnedConflict {
                    day: pin.day,
                    slot_index: pin.slot_index,
                    recipe_id: pin.recipe_id.clone(),
                    violation: HcViolation::SameDayReuse,
                });
            }
        }
    }

    // Consecutive-day repetition among non-workout pins
    let non_workout_by_day: Vec<Vec<&str>> = (0..days)
        .map(|day_index| {
            let day_slots = match profile.schedule.get(day_index) {
                Some(slots) => slots,
                None => return Vec::new(),
            };
            let next_first = next_day_first_slot(&profile.schedule, day_index);
            pins_on_day(profile, day_index + 1)
                .filter(|pin| pin.slot_index < day_slots.len())
                .filter(|pin| {
                    let ctx = activity_context(
                        pin.slot_index,
                        day_slots,
                        next_first,
                        profile.activity_schedule.as_ref(),
                    );
                    !ctx.is_workout()
                })
                .map(|pin| pin.recipe_id.as_str())
                .collect()
        })
        .collect();
    for day_index in 1..days {
        for pin in pins_on_day(profile, day_index + 1) {
            if non_workout_by_day[day_index].contains(&pin.recipe_id.as_str())
                && non_workout_by_day[day_index - 1].contains(&pin.recipe_id.as_str())
            {
                conflicts.push(PinnedConflict {
                    day: pin.day,
                    slot_index: pin.slot_index,
                    recipe_id: pin.recipe_id.clone(),
                    violation: HcViolation::ConsecutiveDayRepeat,
                });
            }
        }
    }

    conflicts
}

fn pins_on_day(
    profile: &PlanningUserProfile,
    day: usize,
) -> impl Iterator<Item = &crate::model::PinnedAssignment> {
    profile
        .pinned_assignments
        .iter()
        .filter(move |p| p.day == day)
}

/// State the search starts from: pinned assignments applied, weekly tracker
/// zeroed (weekly totals accumulate only as days complete during search).
#[derive(Debug, Clone)]
pub struct InitialState {
    pub assignments: Vec<Assignment>,
    pub daily_trackers: BTreeMap<usize, DailyTracker>,
    pub weekly_tracker: WeeklyTracker,
}

/// Build the initial state from pins alone. Callers must have run
/// [`validate_pinned_assignments`] successfully first.
pub fn build_initial_state(
    profile: &PlanningUserProfile,
    recipe_by_id: &BTreeMap<&str, &PlanningRecipe>,
    days: usize,
) -> InitialState {
    let schedule = &profile.schedule;
    let mut assignments = Vec::new();
    let mut daily_trackers: BTreeMap<usize, DailyTracker> = BTreeMap::new();

    for day_index in 0..days {
        let day_slots = &schedule[day_index];
        let next_first = next_day_first_slot(schedule, day_index);
        let mut tracker = DailyTracker::new(day_slots.len());

        for slot_index in 0..day_slots.len() {
            let Some(recipe_id) = profile.pinned_recipe_id(day_index, slot_index) else {
                continue;
            };
            let Some(recipe) = recipe_by_id.get(recipe_id) else {
                continue;
            };
            let ctx = activity_context(
                slot_index,
                day_slots,
                next_first,
                profile.activity_schedule.as_ref(),
            );
            tracker.add_assignment(&recipe.nutrition, &recipe.id, ctx.is_workout());
            assignments.push(Assignment::new(day_index, slot_index, recipe_id, 0));
        }

        if tracker.slots_assigned > 0 {
            daily_trackers.insert(day_index, tracker);
        }
    }

    InitialState {
        assignments,
        daily_trackers,
        weekly_tracker: WeeklyTracker::new(days, &profile.micronutrient_targets),
    }
}

/// Adjusted daily target for one micronutrient: base RDI plus an even share
/// of the unmet carryover over the remaining days (current day included).
pub fn adjusted_daily_target(base_daily_target: f64, carryover: f64, days_remaining: usize) -> f64 {
    if days_remaining == 0 {
        return base_daily_target;
    }
    base_daily_target + carryover / days_remaining as f64
}

// Per-meal adjustment factors by activity context and satiety.
const PRE_WORKOUT_PROTEIN_FACTOR: f64 = 0.8;
const PRE_WORKOUT_CARBS_FACTOR: f64 = 1.1;
const POST_WORKOUT_CALORIES_FACTOR: f64 = 1.1;
const POST_WORKOUT_PROTEIN_FACTOR: f64 = 1.2;
const POST_WORKOUT_CARBS_FACTOR: f64 = 1.1;
const HIGH_SATIETY_CALORIES_FACTOR: f64 = 1.1;
const HIGH_SATIETY_PROTEIN_FACTOR: f64 = 1.1;
const HIGH_SATIETY_FAT_FACTOR: f64 = 1.1;

/// Macro target for one meal slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerMealTarget {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_min: f64,
    pub fat_max: f64,
    pub carbs_g: f64,
}

/// Per-meal target for a decision point: the remaining daily budget split
/// evenly over the remaining slots, then adjusted for workout proximity and
/// satiety.
pub fn per_meal_target(
    tracker: &DailyTracker,
    profile: &PlanningUserProfile,
    ctx: &ActivityContext,
    satiety: Satiety,
) -> PerMealTarget {
    let remaining_calories = profile.daily_calories as f64 - tracker.calories_consumed;
    let remaining_protein = profile.daily_protein_g - tracker.protein_consumed;
    let remaining_fat_min = profile.daily_fat_g.0 - tracker.fat_consumed;
    let remaining_fat_max = profile.daily_fat_g.1 - tracker.fat_consumed;
    let remaining_carbs = profile.daily_carbs_g - tracker.carbs_consumed;
    let slots_left = (tracker.slots_total - tracker.slots_assigned.min(tracker.slots_total)).max(1);

    let mut calories = remaining_calories / slots_left as f64;
    let mut protein = remaining_protein / slots_left as f64;
    let mut fat_min = remaining_fat_min / slots_left as f64;
    let mut fat_max = remaining_fat_max / slots_left as f64;
    let mut carbs = remaining_carbs / slots_left as f64;

    if ctx.pre_workout {
        protein *= PRE_WORKOUT_PROTEIN_FACTOR;
        carbs *= PRE_WORKOUT_CARBS_FACTOR;
    }
    if ctx.post_workout {
        calories *= POST_WORKOUT_CALORIES_FACTOR;
        protein *= POST_WORKOUT_PROTEIN_FACTOR;
        carbs *= POST_WORKOUT_CARBS_FACTOR;
    }
    if satiety == Satiety::High {
        calories *= HIGH_SATIETY_CALORIES_FACTOR;
        protein *= HIGH_SATIETY_PROTEIN_FACTOR;
        fat_min *= HIGH_SATIETY_FAT_FACTOR;
        fat_max *= HIGH_SATIETY_FAT_FACTOR;
    }

    PerMealTarget {
        calories,
        protein_g: protein,
        fat_min,
        fat_max,
        carbs_g: carbs,
    }
}
