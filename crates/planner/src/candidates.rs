//! Candidate generation for one decision point: filter the pool through the
//! hard constraints and forward feasibility, record calorie-excess
//! rejections for possible carb downscaling, and detect backtrack triggers.
//! Reads state, never mutates it.

use std::collections::{BTreeMap, BTreeSet};

use nutrition::{NutritionProfile, UpperLimits};
use tracing::trace;

use crate::constraints::{
    check_calorie_ceiling, check_cooking_time, check_cross_day_repeat,
    check_excluded_ingredients, check_no_same_day_reuse, CandidateView,
};
use crate::error::PlanningError;
use crate::feasibility::{
    check_calorie_feasibility, check_macro_feasibility, check_upper_limit_feasibility,
    MacroBounds,
};
use crate::model::{DailyTracker, MealSlot, PlanningRecipe, PlanningUserProfile};
use crate::scaling::{
    compute_variant_nutrition, effective_step_fraction, is_recipe_scalable, ScalableCarbSources,
};
use crate::slots::{activity_context, next_day_first_slot};

/// One entry in a decision point's candidate set: a recipe id, the scaling
/// step it was generated at (0 = base), and the nutrition it would add.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub recipe_id: String,
    pub variant_index: u32,
    pub nutrition: NutritionProfile,
}

/// Result of candidate generation at `(day_index, slot_index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    /// Surviving candidates in `(recipe_id, variant_index)` order, unscored.
    pub candidates: Vec<Candidate>,
    /// True when this slot, or some later slot of the same day, can no
    /// longer be filled: the search must backtrack instead of descending.
    pub trigger_backtrack: bool,
    /// The first later slot of the same day with zero eligible recipes,
    /// when that is what tripped the trigger.
    pub empty_future_slot: Option<usize>,
    /// Recipes removed solely because they would overrun the calorie
    /// ceiling; input to carb downscaling.
    pub calorie_excess_rejections: BTreeSet<String>,
}

/// Pool deduplicated by id and sorted, so every downstream iteration is
/// deterministic regardless of the pool's listing order.
fn sorted_pool(recipe_pool: &[PlanningRecipe]) -> Vec<&PlanningRecipe> {
    let mut by_id: BTreeMap<&str, &PlanningRecipe> = BTreeMap::new();
    for recipe in recipe_pool {
        by_id.entry(&recipe.id).or_insert(recipe);
    }
    by_id.into_values().collect()
}

/// Would this recipe fail calorie feasibility purely because it overruns the
/// hard ceiling (as opposed to making the tolerance band unreachable)?
fn overruns_calorie_ceiling(
    nutrition: &NutritionProfile,
    day_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    profile: &PlanningUserProfile,
) -> bool {
    let Some(ceiling) = profile.max_daily_calories else {
        return false;
    };
    let current = daily_trackers
        .get(&day_index)
        .map(|t| t.calories_consumed)
        .unwrap_or(0.0);
    current + nutrition.calories > ceiling as f64
}

/// Hard-constraint-only eligibility used by the future-slot check: excluded
/// ingredients, same-day reuse, cooking time and cross-day repetition. The
/// macro-budget constraints are not applied here: a future slot counts as
/// fillable as long as some recipe passes these.
fn hc_only_eligible_count(
    pool: &[&PlanningRecipe],
    day_index: usize,
    slot: &MealSlot,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    profile: &PlanningUserProfile,
    is_workout: bool,
) -> usize {
    let tracker = daily_trackers.get(&day_index);
    let prev_tracker = day_index
        .checked_sub(1)
        .and_then(|prev| daily_trackers.get(&prev));
    pool.iter()
        .filter(|recipe| {
            let view = CandidateView::base(recipe);
            check_excluded_ingredients(&view, profile)
                && check_no_same_day_reuse(&view, tracker)
                && check_cooking_time(&view, slot)
                && check_cross_day_repeat(&view, day_index, prev_tracker, is_workout)
        })
        .count()
}

/// First still-unassigned slot later on the same day with zero
/// hard-constraint-eligible recipes, if any.
fn first_empty_future_slot(
    pool: &[&PlanningRecipe],
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
) -> Option<usize> {
    let day_slots = schedule.get(day_index)?;
    let next_first = next_day_first_slot(schedule, day_index);
    for future_index in slot_index + 1..day_slots.len() {
        let ctx = activity_context(
            future_index,
            day_slots,
            next_first,
            profile.activity_schedule.as_ref(),
        );
        let eligible = hc_only_eligible_count(
            pool,
            day_index,
            &day_slots[future_index],
            daily_trackers,
            profile,
            ctx.is_workout(),
        );
        if eligible == 0 {
            trace!(day_index, future_index, "future slot has no eligible recipe");
            return Some(future_index);
        }
    }
    None
}

/// Compute the candidate set for one decision point.
///
/// Filtering order: excluded ingredients and same-day reuse, cooking time,
/// calorie ceiling (recording excess rejections), cross-day repetition,
/// then the three per-candidate feasibility checks. When downscaling is on
/// and the slot qualifies, scaled variants of the calorie-excess rejections
/// are appended after passing the same gauntlet.
#[allow(clippy::too_many_arguments)]
pub fn generate_candidates(
    recipe_pool: &[PlanningRecipe],
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
    resolved_ul: Option<&UpperLimits>,
    macro_bounds: &MacroBounds,
    scalable_sources: Option<&ScalableCarbSources>,
) -> Result<CandidateSet, PlanningError> {
    let empty_set = || CandidateSet {
        candidates: Vec::new(),
        trigger_backtrack: true,
        empty_future_slot: None,
        calorie_excess_rejections: BTreeSet::new(),
    };
    let Some(day_slots) = schedule.get(day_index) else {
        return Ok(empty_set());
    };
    let Some(slot) = day_slots.get(slot_index) else {
        return Ok(empty_set());
    };

    let pool = sorted_pool(recipe_pool);
    let next_first = next_day_first_slot(schedule, day_index);
    let ctx = activity_context(
        slot_index,
        day_slots,
        next_first,
        profile.activity_schedule.as_ref(),
    );
    let is_workout = ctx.is_workout();
    let tracker = daily_trackers.get(&day_index);
    let prev_tracker = day_index
        .checked_sub(1)
        .and_then(|prev| daily_trackers.get(&prev));

    let mut calorie_excess: BTreeSet<String> = BTreeSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for recipe in &pool {
        let view = CandidateView::base(recipe);
        if !check_excluded_ingredients(&view, profile)
            || !check_no_same_day_reuse(&view, tracker)
            || !check_cooking_time(&view, slot)
        {
            continue;
        }
        if !check_calorie_ceiling(&view, tracker, profile) {
            calorie_excess.insert(recipe.id.clone());
            continue;
        }
        if !check_cross_day_repeat(&view, day_index, prev_tracker, is_workout) {
            continue;
        }
        if !check_calorie_feasibility(
            &view,
            day_index,
            slot_index,
            daily_trackers,
            schedule,
            profile,
            macro_bounds,
        ) {
            if overruns_calorie_ceiling(&recipe.nutrition, day_index, daily_trackers, profile) {
                calorie_excess.insert(recipe.id.clone());
            }
            continue;
        }
        if !check_macro_feasibility(
            &view,
            day_index,
            slot_index,
            daily_trackers,
            schedule,
            profile,
            macro_bounds,
        ) {
            continue;
        }
        if !check_upper_limit_feasibility(&view, day_index, daily_trackers, resolved_ul) {
            continue;
        }
        candidates.push(Candidate {
            recipe_id: recipe.id.clone(),
            variant_index: 0,
            nutrition: recipe.nutrition.clone(),
        });
    }

    // Scaled variants for sedentary, unpinned slots when the feature is on.
    let slot_is_pinned = profile.is_pinned(day_index, slot_index);
    if profile.enable_primary_carb_downscaling
        && ctx.sedentary
        && !slot_is_pinned
        && !calorie_excess.is_empty()
    {
        if let Some(sources) = scalable_sources {
            let fraction = effective_step_fraction(profile);
            for recipe in &pool {
                if !calorie_excess.contains(&recipe.id) || !is_recipe_scalable(recipe, sources) {
                    continue;
                }
                for step in 1..=profile.max_scaling_steps.max(1) {
                    if 1.0 - step as f64 * fraction <= 0.0 {
                        continue;
                    }
                    let variant_nutrition = compute_variant_nutrition(recipe, step, profile)?;
                    let view = CandidateView::variant(recipe, &variant_nutrition);
                    if !check_excluded_ingredients(&view, profile)
                        || !check_no_same_day_reuse(&view, tracker)
                        || !check_cooking_time(&view, slot)
                        || !check_calorie_ceiling(&view, tracker, profile)
                    {
                        continue;
                    }
                    if !check_cross_day_repeat(&view, day_index, prev_tracker, is_workout) {
                        continue;
                    }
                    if !check_calorie_feasibility(
                        &view,
                        day_index,
                        slot_index,
                        daily_trackers,
                        schedule,
                        profile,
                        macro_bounds,
                    ) || !check_macro_feasibility(
                        &view,
                        day_index,
                        slot_index,
                        daily_trackers,
                        schedule,
                        profile,
                        macro_bounds,
                    ) || !check_upper_limit_feasibility(
                        &view,
                        day_index,
                        daily_trackers,
                        resolved_ul,
                    ) {
                        continue;
                    }
                    candidates.push(Candidate {
                        recipe_id: recipe.id.clone(),
                        variant_index: step,
                        nutrition: variant_nutrition,
                    });
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.recipe_id
            .cmp(&b.recipe_id)
            .then_with(|| a.variant_index.cmp(&b.variant_index))
    });

    let empty_future_slot = first_empty_future_slot(
        &pool,
        day_index,
        slot_index,
        daily_trackers,
        schedule,
        profile,
    );
    let trigger_backtrack = candidates.is_empty() || empty_future_slot.is_some();

    Ok(CandidateSet {
        candidates,
        trigger_backtrack,
        empty_future_slot,
        calorie_excess_rejections: calorie_excess,
    })
}
