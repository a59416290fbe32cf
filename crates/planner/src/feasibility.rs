//! Forward-looking feasibility: can the plan still be completed if this
//! placement is made? Prunes doomed branches before the search descends into
//! them. No scoring, no mutation.

use std::collections::{BTreeMap, BTreeSet};

use nutrition::NUTRIENT_NAMES;

use crate::constraints::{check_daily_upper_limits, CandidateView};
use crate::model::{
    DailyTracker, MealSlot, PlanningRecipe, PlanningUserProfile, WeeklyTracker,
    MAX_SLOTS_PER_DAY,
};
use nutrition::UpperLimits;

/// Daily tolerance for calories, protein and carbs. Fat is a hard range.
pub const DAILY_TOLERANCE: f64 = 0.10;

/// Min and max achievable sum of one macro over M distinct recipes,
/// M = 1..=8. When the pool holds fewer than M recipes both bounds collapse
/// to the full-pool sum.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTable {
    min: [f64; MAX_SLOTS_PER_DAY + 1],
    max: [f64; MAX_SLOTS_PER_DAY + 1],
}

impl BoundTable {
    fn from_sorted_values(sorted: &[f64]) -> Self {
        let total: f64 = sorted.iter().sum();
        let mut min = [0.0; MAX_SLOTS_PER_DAY + 1];
        let mut max = [0.0; MAX_SLOTS_PER_DAY + 1];
        for m in 1..=MAX_SLOTS_PER_DAY {
            if m > sorted.len() {
                min[m] = total;
                max[m] = total;
            } else {
                min[m] = sorted[..m].iter().sum();
                max[m] = sorted[sorted.len() - m..].iter().sum();
            }
        }
        BoundTable { min, max }
    }

    /// Minimum sum over `m` distinct recipes.
    pub fn min(&self, m: usize) -> f64 {
        self.min.get(m).copied().unwrap_or(0.0)
    }

    /// Maximum sum over `m` distinct recipes.
    pub fn max(&self, m: usize) -> f64 {
        self.max.get(m).copied().unwrap_or(0.0)
    }
}

/// Per-macro bound tables, built once per search from the recipe pool.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroBounds {
    pub calories: BoundTable,
    pub protein: BoundTable,
    pub fat: BoundTable,
    pub carbs: BoundTable,
}

fn sorted_values_by_recipe(pool: &[PlanningRecipe], value: impl Fn(&PlanningRecipe) -> f64) -> Vec<f64> {
    let mut by_id: BTreeMap<&str, f64> = BTreeMap::new();
    for recipe in pool {
        by_id.entry(&recipe.id).or_insert_with(|| value(recipe));
    }
    let mut values: Vec<f64> = by_id.into_values().collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Precompute min/max macro sums over M distinct recipes for M = 1..=8.
pub fn precompute_macro_bounds(pool: &[PlanningRecipe]) -> MacroBounds {
    MacroBounds {
        calories: BoundTable::from_sorted_values(&sorted_values_by_recipe(pool, |r| {
            r.nutrition.calories
        })),
        protein: BoundTable::from_sorted_values(&sorted_values_by_recipe(pool, |r| {
            r.nutrition.protein_g
        })),
        fat: BoundTable::from_sorted_values(&sorted_values_by_recipe(pool, |r| r.nutrition.fat_g)),
        carbs: BoundTable::from_sorted_values(&sorted_values_by_recipe(pool, |r| {
            r.nutrition.carbs_g
        })),
    }
}

/// For each tracked nutrient and slot count M: the most of that nutrient one
/// day of M distinct recipes could supply.
pub type MaxDailyAchievable = BTreeMap<String, BTreeMap<usize, f64>>;

/// Precompute the best-case daily intake table for the tracked nutrients and
/// the slot counts that actually occur in the schedule.
pub fn precompute_max_daily_achievable(
    pool: &[PlanningRecipe],
    nutrient_names: impl IntoIterator<Item = String>,
    slot_counts: &BTreeSet<usize>,
) -> MaxDailyAchievable {
    let mut result = MaxDailyAchievable::new();
    for nutrient in nutrient_names {
        if !NUTRIENT_NAMES.contains(&nutrient.as_str()) {
            continue;
        }
        let mut values = sorted_values_by_recipe(pool, |r| r.nutrition.micronutrient(&nutrient));
        values.reverse();
        let per_count = slot_counts
            .iter()
            .map(|&m| (m, values.iter().take(m).sum()))
            .collect();
        result.insert(nutrient, per_count);
    }
    result
}

/// Slots still unassigned on the day after tentatively filling
/// `(day_index, slot_index)`.
pub fn slots_remaining_after(
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    schedule: &[Vec<MealSlot>],
    day_index: usize,
    slot_index: usize,
) -> usize {
    match daily_trackers.get(&day_index) {
        Some(tracker) => (tracker.slots_total).saturating_sub(tracker.slots_assigned + 1),
        None => schedule
            .get(day_index)
            .map(|day| day.len().saturating_sub(slot_index + 1))
            .unwrap_or(0),
    }
}

fn interval_intersects(low: f64, high: f64, min_achievable: f64, max_achievable: f64) -> bool {
    min_achievable <= high && max_achievable >= low
}

/// After tentatively adding the candidate, the day's calories must stay
/// under the optional hard ceiling and the remaining slots must still be
/// able to land the day within tolerance of the target.
pub fn check_calorie_feasibility(
    candidate: &CandidateView,
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
    macro_bounds: &MacroBounds,
) -> bool {
    let daily_calories = profile.daily_calories as f64;
    let current = daily_trackers
        .get(&day_index)
        .map(|t| t.calories_consumed)
        .unwrap_or(0.0);
    let used = current + candidate.nutrition.calories;
    let remaining = daily_calories - used;

    if let Some(ceiling) = profile.max_daily_calories {
        if used > ceiling as f64 {
            return false;
        }
    }

    let k = slots_remaining_after(daily_trackers, schedule, day_index, slot_index);
    let tolerance = DAILY_TOLERANCE * daily_calories;
    if k == 0 {
        return remaining.abs() <= tolerance;
    }
    interval_intersects(
        remaining - tolerance,
        remaining + tolerance,
        macro_bounds.calories.min(k),
        macro_bounds.calories.max(k),
    )
}

/// Protein and carbs must remain reachable within tolerance; fat must remain
/// reachable inside its hard range.
pub fn check_macro_feasibility(
    candidate: &CandidateView,
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
    macro_bounds: &MacroBounds,
) -> bool {
    let tracker = daily_trackers.get(&day_index);
    let k = slots_remaining_after(daily_trackers, schedule, day_index, slot_index);

    // Protein, ±tolerance
    let target_protein = profile.daily_protein_g;
    let used_protein =
        tracker.map(|t| t.protein_consumed).unwrap_or(0.0) + candidate.nutrition.protein_g;
    let remaining_protein = target_protein - used_protein;
    let protein_tolerance = DAILY_TOLERANCE * target_protein;
    if k > 0 {
        if !interval_intersects(
            remaining_protein - protein_tolerance,
            remaining_protein + protein_tolerance,
            macro_bounds.protein.min(k),
            macro_bounds.protein.max(k),
        ) {
            return false;
        }
    } else if remaining_protein.abs() > protein_tolerance {
        return false;
    }

    // Carbs, ±tolerance
    let target_carbs = profile.daily_carbs_g;
    let used_carbs = tracker.map(|t| t.carbs_consumed).unwrap_or(0.0) + candidate.nutrition.carbs_g;
    let remaining_carbs = target_carbs - used_carbs;
    let carbs_tolerance = DAILY_TOLERANCE * target_carbs;
    if k > 0 {
        if !interval_intersects(
            remaining_carbs - carbs_tolerance,
            remaining_carbs + carbs_tolerance,
            macro_bounds.carbs.min(k),
            macro_bounds.carbs.max(k),
        ) {
            return false;
        }
    } else if remaining_carbs.abs() > carbs_tolerance {
        return false;
    }

    // Fat, hard range
    let (fat_min, fat_max) = profile.daily_fat_g;
    let used_fat = tracker.map(|t| t.fat_consumed).unwrap_or(0.0) + candidate.nutrition.fat_g;
    if k > 0 {
        if !interval_intersects(
            fat_min - used_fat,
            fat_max - used_fat,
            macro_bounds.fat.min(k),
            macro_bounds.fat.max(k),
        ) {
            return false;
        }
    } else if used_fat < fat_min || used_fat > fat_max {
        return false;
    }

    true
}

/// Incremental upper-limit feasibility: identical to the hard-constraint UL
/// check, framed as pruning.
pub fn check_upper_limit_feasibility(
    candidate: &CandidateView,
    day_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    resolved_ul: Option<&UpperLimits>,
) -> bool {
    check_daily_upper_limits(candidate, daily_trackers.get(&day_index), resolved_ul)
}

/// At the start of day `d > 0`: for every tracked nutrient, the remaining
/// days at best-case intake must still be able to close the weekly deficit.
pub fn check_cross_day_recoverability(
    day_index: usize,
    weekly_tracker: &WeeklyTracker,
    schedule: &[Vec<MealSlot>],
    profile: &PlanningUserProfile,
    days: usize,
    max_daily_achievable: &MaxDailyAchievable,
) -> bool {
    if day_index == 0 {
        return true;
    }
    let days_left = weekly_tracker.days_remaining;
    if days_left == 0 {
        return true;
    }
    let Some(day_slots) = schedule.get(day_index) else {
        return true;
    };
    let slot_count = day_slots.len();

    for (nutrient, daily_rdi) in &profile.micronutrient_targets {
        if *daily_rdi <= 0.0 {
            continue;
        }
        let total_needed = daily_rdi * days as f64;
        let consumed = weekly_tracker.weekly_totals.micronutrient(nutrient);
        let deficit = total_needed - consumed;
        if deficit <= 0.0 {
            continue;
        }
        let best_day = max_daily_achievable
            .get(nutrient)
            .and_then(|per_count| per_count.get(&slot_count))
            .copied()
            .unwrap_or(0.0);
        if deficit > days_left as f64 * best_day {
            return false;
        }
    }
    true
}
