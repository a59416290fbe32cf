//! Composite candidate scoring: five weighted components on a 0–100 scale.
//! Pure and deterministic; identical inputs always produce identical scores.

use std::collections::BTreeMap;

use crate::constraints::CandidateView;
use crate::model::{DailyTracker, MealSlot, PlanningUserProfile, WeeklyTracker};
use crate::slots::{
    activity_context, cooking_time_max, next_day_first_slot, satiety_requirement,
    time_until_next_meal, Satiety,
};
use crate::state::{adjusted_daily_target, per_meal_target, PerMealTarget};

// Component weights, normalized from the (40, 30, 15, 15, 10) tuple.
const WEIGHT_TOTAL: f64 = 110.0;
pub const W_NUTRITION: f64 = 40.0 / WEIGHT_TOTAL;
pub const W_MICRONUTRIENT: f64 = 30.0 / WEIGHT_TOTAL;
pub const W_SATIETY: f64 = 15.0 / WEIGHT_TOTAL;
pub const W_BALANCE: f64 = 15.0 / WEIGHT_TOTAL;
pub const W_SCHEDULE: f64 = 10.0 / WEIGHT_TOTAL;

/// Deviation fraction at which a macro sub-score reaches zero.
const NUTRITION_DEVIATION_TOLERANCE: f64 = 0.10;

/// Reference cooking time for unconstrained (busyness 4) slots.
const BUSYNESS_4_REFERENCE_MINUTES: f64 = 30.0;

fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Sub-score for calories, protein or carbs: full marks on target, falling
/// to zero at a 10% deviation. A non-positive target scores 100.
pub fn macro_subscore(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    let deviation = (actual - target).abs() / target;
    clamp_score(100.0 * (1.0 - deviation / NUTRITION_DEVIATION_TOLERANCE))
}

/// Fat sub-score: best at the midpoint of the per-meal fat range, falling to
/// zero at the range edges.
pub fn fat_subscore(recipe_fat: f64, meal_fat_min: f64, meal_fat_max: f64) -> f64 {
    if meal_fat_max <= meal_fat_min {
        return 100.0;
    }
    let midpoint = (meal_fat_min + meal_fat_max) / 2.0;
    let half_range = (meal_fat_max - meal_fat_min) / 2.0;
    let deviation = ((recipe_fat - midpoint) / half_range).abs();
    clamp_score(100.0 * (1.0 - deviation.min(1.0)))
}

/// Mean of the four macro sub-scores against the per-meal target.
pub fn nutrition_match(candidate: &CandidateView, per_meal: &PerMealTarget) -> f64 {
    let n = candidate.nutrition;
    let calorie_score = macro_subscore(n.calories, per_meal.calories);
    let protein_score = macro_subscore(n.protein_g, per_meal.protein_g);
    let fat_score = fat_subscore(n.fat_g, per_meal.fat_min, per_meal.fat_max);
    let carb_score = macro_subscore(n.carbs_g, per_meal.carbs_g);
    (calorie_score + protein_score + fat_score + carb_score) / 4.0
}

/// How much of today's outstanding micronutrient gaps the candidate fills,
/// weighted toward the largest gaps. 50 when nothing is tracked or nothing
/// is deficient.
pub fn micronutrient_match(
    candidate: &CandidateView,
    day_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
) -> f64 {
    let tracked = &profile.micronutrient_targets;
    if tracked.is_empty() {
        return 50.0;
    }
    let days_left = weekly_tracker.days_remaining.max(1);
    let tracker = daily_trackers.get(&day_index);

    let mut total_contribution = 0.0;
    let mut total_weight = 0.0;
    for (nutrient, base_target) in tracked {
        if *base_target <= 0.0 {
            continue;
        }
        let carryover = weekly_tracker
            .carryover_needs
            .get(nutrient)
            .copied()
            .unwrap_or(0.0);
        let adjusted = adjusted_daily_target(*base_target, carryover, days_left);
        let consumed = tracker
            .map(|t| t.micronutrients_consumed.get(nutrient))
            .unwrap_or(0.0);
        if consumed >= adjusted {
            continue;
        }
        let gap = adjusted - consumed;
        let amount = candidate.nutrition.micronutrient(nutrient);
        if amount <= 0.0 {
            continue;
        }
        let fill_ratio = (amount / gap).min(1.0);
        let weight = gap + carryover;
        total_contribution += weight * fill_ratio;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return 50.0;
    }
    clamp_score(100.0 * total_contribution / total_weight)
}

/// High-satiety slots reward fiber, protein and caloric heft; moderate slots
/// reward protein near 25 g.
pub fn satiety_match(candidate: &CandidateView, satiety: Satiety) -> f64 {
    let n = candidate.nutrition;
    let fiber = n.micronutrient("fiber_g");
    match satiety {
        Satiety::High => {
            let fiber_score = (fiber * 6.0).min(100.0);
            let protein_score = (n.protein_g * 2.5).min(100.0);
            let calorie_score = (n.calories / 6.0).min(100.0);
            clamp_score((fiber_score + protein_score + calorie_score) / 3.0)
        }
        Satiety::Moderate => clamp_score(70.0 - (n.protein_g - 25.0).abs() * 0.5),
    }
}

/// Mean of a macro-trajectory score (fit against the per-remaining-slot
/// average need) and a diversity score (tracked nutrients the candidate
/// introduces to the day). 50 before the day has a tracker.
pub fn balance(
    candidate: &CandidateView,
    day_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    profile: &PlanningUserProfile,
) -> f64 {
    let Some(tracker) = daily_trackers.get(&day_index) else {
        return 50.0;
    };
    let slots_left = (tracker.slots_total - tracker.slots_assigned.min(tracker.slots_total)).max(1);
    let fat_mid = (profile.daily_fat_g.0 + profile.daily_fat_g.1) / 2.0;

    let need_calories = (profile.daily_calories as f64 - tracker.calories_consumed) / slots_left as f64;
    let need_protein = (profile.daily_protein_g - tracker.protein_consumed) / slots_left as f64;
    let need_fat = (fat_mid - tracker.fat_consumed) / slots_left as f64;
    let need_carbs = (profile.daily_carbs_g - tracker.carbs_consumed) / slots_left as f64;

    let n = candidate.nutrition;
    let t_calories = if need_calories > 0.0 {
        macro_subscore(n.calories, need_calories)
    } else {
        50.0
    };
    let t_protein = if need_protein != 0.0 {
        macro_subscore(n.protein_g, need_protein)
    } else {
        50.0
    };
    let t_fat = if need_fat != 0.0 {
        macro_subscore(n.fat_g, need_fat)
    } else {
        50.0
    };
    let t_carbs = if need_carbs > 0.0 {
        macro_subscore(n.carbs_g, need_carbs)
    } else {
        50.0
    };
    let trajectory = (t_calories + t_protein + t_fat + t_carbs) / 4.0;

    let diversity = match &n.micronutrients {
        Some(micros) if !profile.micronutrient_targets.is_empty() => {
            let novel = profile
                .micronutrient_targets
                .keys()
                .filter(|nutrient| {
                    micros.get(nutrient) > 0.0
                        && tracker.micronutrients_consumed.get(nutrient) < 1.0
                })
                .count();
            (novel as f64 * 10.0).min(100.0)
        }
        _ => 50.0,
    };

    clamp_score((trajectory + diversity) / 2.0)
}

/// Fit of cooking time to the slot: within a bound, shorter is better; an
/// unconstrained slot prefers cooking near the 30-minute reference.
pub fn schedule_match(candidate: &CandidateView, slot: &MealSlot) -> f64 {
    let cooking_time = candidate.cooking_time_minutes as f64;
    match cooking_time_max(slot.busyness_level) {
        Some(max_minutes) => {
            if candidate.cooking_time_minutes > max_minutes {
                return 0.0;
            }
            clamp_score(100.0 * (1.0 - cooking_time / max_minutes as f64))
        }
        None => {
            let distance = (cooking_time - BUSYNESS_4_REFERENCE_MINUTES).abs();
            clamp_score(100.0 - distance * 2.0)
        }
    }
}

/// Weighted composite of all five components, clamped to [0, 100].
pub fn composite_score(
    candidate: &CandidateView,
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    weekly_tracker: &WeeklyTracker,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
) -> f64 {
    let Some(day_slots) = schedule.get(day_index) else {
        return 50.0;
    };
    let Some(slot) = day_slots.get(slot_index) else {
        return 50.0;
    };
    let next_first = next_day_first_slot(schedule, day_index);
    let ctx = activity_context(
        slot_index,
        day_slots,
        next_first,
        profile.activity_schedule.as_ref(),
    );
    let hours_until_next = time_until_next_meal(slot_index, day_slots, next_first);
    let is_last = slot_index + 1 >= day_slots.len();
    let satiety = satiety_requirement(hours_until_next, is_last);

    let default_tracker = DailyTracker::new(day_slots.len());
    let tracker = daily_trackers.get(&day_index).unwrap_or(&default_tracker);
    let per_meal = per_meal_target(tracker, profile, &ctx, satiety);

    let nutrition = nutrition_match(candidate, &per_meal);
    let micronutrient =
        micronutrient_match(candidate, day_index, daily_trackers, weekly_tracker, profile);
    let satiety_score = satiety_match(candidate, satiety);
    let balance_score = balance(candidate, day_index, daily_trackers, profile);
    let schedule_score = schedule_match(candidate, slot);

    clamp_score(
        W_NUTRITION * nutrition
            + W_MICRONUTRIENT * micronutrient
            + W_SATIETY * satiety_score
            + W_BALANCE * balance_score
            + W_SCHEDULE * schedule_score,
    )
}
