//! Hard constraints as pure predicates over a candidate, a slot and the
//! current state. This module is the single place that answers "does this
//! placement violate a hard constraint?". No feasibility reasoning, no
//! scoring, no mutation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use nutrition::{Ingredient, NutritionProfile, UpperLimits};

use crate::model::{DailyTracker, MealSlot, PlanningRecipe, PlanningUserProfile};
use crate::slots::cooking_time_max;

/// Hard-constraint codes as they appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum HcViolation {
    /// Recipe contains an ingredient the user excluded.
    #[serde(rename = "HC-1")]
    #[strum(serialize = "HC-1")]
    ExcludedIngredient,
    /// Recipe id already used on this day.
    #[serde(rename = "HC-2")]
    #[strum(serialize = "HC-2")]
    SameDayReuse,
    /// Cooking time exceeds the slot's busyness bound.
    #[serde(rename = "HC-3")]
    #[strum(serialize = "HC-3")]
    CookingTimeExceeded,
    /// A micronutrient would exceed its tolerable upper limit.
    #[serde(rename = "HC-4")]
    #[strum(serialize = "HC-4")]
    UpperLimitExceeded,
    /// The day's calorie ceiling would be exceeded.
    #[serde(rename = "HC-5")]
    #[strum(serialize = "HC-5")]
    CalorieCeilingExceeded,
    /// Slot is pinned to a different recipe, or the pin itself is invalid.
    #[serde(rename = "HC-6")]
    #[strum(serialize = "HC-6")]
    PinnedMismatch,
    /// Non-workout recipe repeated from the previous day's non-workout slots.
    #[serde(rename = "HC-8")]
    #[strum(serialize = "HC-8")]
    ConsecutiveDayRepeat,
}

/// A candidate under evaluation: either a base recipe or a scaled variant of
/// one. Variants share the base recipe's id and ingredients but substitute
/// their own nutrition.
#[derive(Debug, Clone, Copy)]
pub struct CandidateView<'a> {
    pub id: &'a str,
    pub ingredients: &'a [Ingredient],
    pub cooking_time_minutes: u32,
    pub nutrition: &'a NutritionProfile,
}

impl<'a> CandidateView<'a> {
    pub fn base(recipe: &'a PlanningRecipe) -> Self {
        CandidateView {
            id: &recipe.id,
            ingredients: &recipe.ingredients,
            cooking_time_minutes: recipe.cooking_time_minutes,
            nutrition: &recipe.nutrition,
        }
    }

    pub fn variant(recipe: &'a PlanningRecipe, nutrition: &'a NutritionProfile) -> Self {
        CandidateView {
            id: &recipe.id,
            ingredients: &recipe.ingredients,
            cooking_time_minutes: recipe.cooking_time_minutes,
            nutrition,
        }
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The candidate contains no ingredient in the user's exclusion set.
/// Matching is case-folded and trimmed.
pub fn check_excluded_ingredients(
    candidate: &CandidateView,
    profile: &PlanningUserProfile,
) -> bool {
    if profile.excluded_ingredients.is_empty() {
        return true;
    }
    !candidate
        .ingredients
        .iter()
        .any(|ing| profile.excluded_ingredients.contains(&normalize_name(&ing.name)))
}

/// The recipe id is not already placed on this day. Variants share the base
/// id, so a base and its variant can never share a day.
pub fn check_no_same_day_reuse(candidate: &CandidateView, tracker: Option<&DailyTracker>) -> bool {
    match tracker {
        Some(t) => !t.used_recipe_ids.contains(candidate.id),
        None => true,
    }
}

/// Cooking time fits the slot's busyness bound; level 4 is exempt.
pub fn check_cooking_time(candidate: &CandidateView, slot: &MealSlot) -> bool {
    match cooking_time_max(slot.busyness_level) {
        Some(max_minutes) => candidate.cooking_time_minutes <= max_minutes,
        None => true,
    }
}

/// Adding the candidate keeps every limited micronutrient at or under its
/// tolerable upper limit. Equality at the limit passes.
pub fn check_daily_upper_limits(
    candidate: &CandidateView,
    tracker: Option<&DailyTracker>,
    resolved_ul: Option<&UpperLimits>,
) -> bool {
    let Some(limits) = resolved_ul else {
        return true;
    };
    for (nutrient, limit) in limits.iter() {
        let Some(limit) = limit else { continue };
        let current = tracker
            .map(|t| t.micronutrients_consumed.get(nutrient))
            .unwrap_or(0.0);
        if current + candidate.nutrition.micronutrient(nutrient) > limit {
            return false;
        }
    }
    true
}

/// Adding the candidate keeps the day's calories at or under the optional
/// hard ceiling. Equality passes.
pub fn check_calorie_ceiling(
    candidate: &CandidateView,
    tracker: Option<&DailyTracker>,
    profile: &PlanningUserProfile,
) -> bool {
    let Some(ceiling) = profile.max_daily_calories else {
        return true;
    };
    let current = tracker.map(|t| t.calories_consumed).unwrap_or(0.0);
    current + candidate.nutrition.calories <= ceiling as f64
}

/// If the slot is pinned, the candidate must carry the pinned recipe id.
pub fn check_pinned_slot(
    candidate: &CandidateView,
    day_index: usize,
    slot_index: usize,
    profile: &PlanningUserProfile,
) -> bool {
    match profile.pinned_recipe_id(day_index, slot_index) {
        Some(pinned_id) => candidate.id == pinned_id,
        None => true,
    }
}

/// For day > 0 and a non-workout slot, the recipe id must not appear among
/// the previous day's non-workout placements. Day 0 and workout slots are
/// exempt.
pub fn check_cross_day_repeat(
    candidate: &CandidateView,
    day_index: usize,
    prev_day_tracker: Option<&DailyTracker>,
    is_workout_slot: bool,
) -> bool {
    if day_index == 0 || is_workout_slot {
        return true;
    }
    match prev_day_tracker {
        Some(prev) => !prev.non_workout_recipe_ids.contains(candidate.id),
        None => true,
    }
}

/// Evaluate every hard constraint for one placement. Returns the violated
/// codes, empty when all pass.
#[allow(clippy::too_many_arguments)]
pub fn check_all(
    candidate: &CandidateView,
    slot: &MealSlot,
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    profile: &PlanningUserProfile,
    resolved_ul: Option<&UpperLimits>,
    is_workout_slot: bool,
) -> Vec<HcViolation> {
    let tracker = daily_trackers.get(&day_index);
    let prev_tracker = day_index
        .checked_sub(1)
        .and_then(|prev| daily_trackers.get(&prev));

    let mut violated = Vec::new();
    if !check_excluded_ingredients(candidate, profile) {
        violated.push(HcViolation::ExcludedIngredient);
    }
    if !check_no_same_day_reuse(candidate, tracker) {
        violated.push(HcViolation::SameDayReuse);
    }
    if !check_cooking_time(candidate, slot) {
        violated.push(HcViolation::CookingTimeExceeded);
    }
    if !check_daily_upper_limits(candidate, tracker, resolved_ul) {
        violated.push(HcViolation::UpperLimitExceeded);
    }
    if !check_calorie_ceiling(candidate, tracker, profile) {
        violated.push(HcViolation::CalorieCeilingExceeded);
    }
    if !check_pinned_slot(candidate, day_index, slot_index, profile) {
        violated.push(HcViolation::PinnedMismatch);
    }
    if !check_cross_day_repeat(candidate, day_index, prev_tracker, is_workout_slot) {
        violated.push(HcViolation::ConsecutiveDayRepeat);
    }
    violated
}
