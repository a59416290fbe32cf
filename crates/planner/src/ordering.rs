//! Deterministic candidate ordering: composite score first, then a
//! tie-break cascade ending in lexicographic recipe id (and variant step),
//! which makes the order a total one.

use std::collections::BTreeMap;

use crate::candidates::Candidate;
use crate::constraints::normalize_name;
use crate::model::{DailyTracker, PlanningRecipe, PlanningUserProfile, WeeklyTracker};
use crate::state::adjusted_daily_target;

/// Tracked nutrients currently deficient for the day, with their remaining
/// gaps against the adjusted daily target.
fn nutrients_still_needed(
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
    day_index: usize,
) -> BTreeMap<String, f64> {
    let mut gaps = BTreeMap::new();
    if profile.micronutrient_targets.is_empty() {
        return gaps;
    }
    let days_left = weekly_tracker.days_remaining.max(1);
    let tracker = daily_trackers.get(&day_index);
    for (nutrient, base_target) in &profile.micronutrient_targets {
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
        if consumed < adjusted {
            gaps.insert(nutrient.clone(), adjusted - consumed);
        }
    }
    gaps
}

/// How many currently-deficient nutrients the candidate supplies at all.
pub fn gap_fill_count(candidate: &Candidate, gaps: &BTreeMap<String, f64>) -> usize {
    gaps.keys()
        .filter(|nutrient| candidate.nutrition.micronutrient(nutrient) > 0.0)
        .count()
}

/// Total deficit reduction: the candidate's contribution as a fraction of
/// each gap, capped at 1 per nutrient.
pub fn deficit_reduction(candidate: &Candidate, gaps: &BTreeMap<String, f64>) -> f64 {
    let mut total = 0.0;
    for (nutrient, gap) in gaps {
        if *gap <= 0.0 {
            continue;
        }
        let amount = candidate.nutrition.micronutrient(nutrient);
        if amount <= 0.0 {
            continue;
        }
        total += (amount / gap).min(1.0);
    }
    total
}

/// Number of recipe ingredients whose normalized name the user likes.
pub fn liked_foods_count(recipe: &PlanningRecipe, profile: &PlanningUserProfile) -> usize {
    if profile.liked_foods.is_empty() {
        return 0;
    }
    recipe
        .ingredients
        .iter()
        .filter(|ing| profile.liked_foods.contains(&normalize_name(&ing.name)))
        .count()
}

struct OrderingKey {
    score: f64,
    gap_fill: usize,
    deficit_reduction: f64,
    liked: usize,
}

/// Sort scored candidates best-first: score, then gap-fill count, then
/// deficit reduction, then liked-food matches (all descending), then recipe
/// id and variant step ascending. The final keys form a total order, so the
/// result is unique for a given state.
pub fn order_scored_candidates(
    mut scored: Vec<(Candidate, f64)>,
    recipe_by_id: &BTreeMap<&str, &PlanningRecipe>,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
    day_index: usize,
) -> Vec<(Candidate, f64)> {
    let gaps = nutrients_still_needed(daily_trackers, weekly_tracker, profile, day_index);
    let keys: BTreeMap<(String, u32), OrderingKey> = scored
        .iter()
        .map(|(candidate, score)| {
            let liked = recipe_by_id
                .get(candidate.recipe_id.as_str())
                .map(|recipe| liked_foods_count(recipe, profile))
                .unwrap_or(0);
            (
                (candidate.recipe_id.clone(), candidate.variant_index),
                OrderingKey {
                    score: *score,
                    gap_fill: gap_fill_count(candidate, &gaps),
                    deficit_reduction: deficit_reduction(candidate, &gaps),
                    liked,
                },
            )
        })
        .collect();

    scored.sort_by(|(a, _), (b, _)| {
        let ka = &keys[&(a.recipe_id.clone(), a.variant_index)];
        let kb = &keys[&(b.recipe_id.clone(), b.variant_index)];
        kb.score
            .total_cmp(&ka.score)
            .then_with(|| kb.gap_fill.cmp(&ka.gap_fill))
            .then_with(|| kb.deficit_reduction.total_cmp(&ka.deficit_reduction))
            .then_with(|| kb.liked.cmp(&ka.liked))
            .then_with(|| a.recipe_id.cmp(&b.recipe_id))
            .then_with(|| a.variant_index.cmp(&b.variant_index))
    });
    scored
}
