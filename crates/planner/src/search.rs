//! Search orchestrator: walks the decision points in order, fills each slot
//! from a cached, scored candidate list, validates days and the week, and
//! backtracks through the nearest decision point that still has untried
//! candidates. Owns all mutable state for one invocation; every helper it
//! calls is pure.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tracing::{debug, info, trace};

use nutrition::{validate_daily_upper_limits, UpperLimits, NUTRIENT_NAMES};

use crate::candidates::{generate_candidates, Candidate};
use crate::constraints::{check_all, CandidateView};
use crate::error::PlanningError;
use crate::feasibility::{
    check_cross_day_recoverability, precompute_macro_bounds, precompute_max_daily_achievable,
    MaxDailyAchievable,
};
use crate::model::{
    decision_order, validate_planning_horizon, validate_schedule, Assignment, DailyTracker,
    PlanningRecipe, PlanningUserProfile, WeeklyTracker,
};
use crate::ordering::order_scored_candidates;
use crate::report::{
    build_sodium_advisory, deficient_nutrients, macro_violations, FailedDayReport, FailureMode,
    FailureReport, MealPlanResult, PlanSnapshot, SearchStatsSummary, SodiumAdvisory,
    TerminationCode, UnfillableSlot,
};
use crate::scaling::{effective_nutrition, ScalableCarbSources};
use crate::scoring::composite_score;
use crate::slots::{activity_context, next_day_first_slot};
use crate::state::{build_initial_state, validate_pinned_assignments};

/// Default cap on forward steps before the search gives up with the best
/// partial plan seen.
pub const DEFAULT_ATTEMPT_LIMIT: usize = 50_000;

/// Caller-facing knobs for one search invocation.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Forward-step budget; reaching it ends the search with the best
    /// partial seen.
    pub attempt_limit: usize,
    /// Collect branching factors and runtimes into the result.
    pub collect_stats: bool,
    /// Scalable carb reference data; required for downscaling to produce
    /// variants, ignored when the profile has the feature off.
    pub scalable_sources: Option<ScalableCarbSources>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            collect_stats: false,
            scalable_sources: None,
        }
    }
}

/// Scored, ordered candidates for one decision point plus a cursor over the
/// not-yet-tried suffix.
#[derive(Debug, Clone)]
struct CacheEntry {
    ordered: Vec<(Candidate, f64)>,
    pointer: usize,
}

impl CacheEntry {
    fn has_untried(&self) -> bool {
        self.pointer < self.ordered.len()
    }
}

#[derive(Debug)]
struct StatsCollector {
    started: Instant,
    branching_factors: BTreeMap<(usize, usize), usize>,
    attempts_per_day: BTreeMap<usize, usize>,
    backtrack_depths: Vec<usize>,
    day_starts: BTreeMap<usize, Instant>,
    day_runtime_secs: BTreeMap<usize, f64>,
}

impl StatsCollector {
    fn new() -> Self {
        StatsCollector {
            started: Instant::now(),
            branching_factors: BTreeMap::new(),
            attempts_per_day: BTreeMap::new(),
            backtrack_depths: Vec::new(),
            day_starts: BTreeMap::new(),
            day_runtime_secs: BTreeMap::new(),
        }
    }

    fn summary(&self, attempts: usize, backtracks: usize) -> SearchStatsSummary {
        let max_depth = self.backtrack_depths.iter().copied().max().unwrap_or(0);
        let average_depth = if self.backtrack_depths.is_empty() {
            0.0
        } else {
            self.backtrack_depths.iter().sum::<usize>() as f64 / self.backtrack_depths.len() as f64
        };
        SearchStatsSummary {
            attempts,
            backtracks,
            branching_factors: self
                .branching_factors
                .iter()
                .map(|((d, s), n)| (format!("{}:{}", d, s), *n))
                .collect(),
            attempts_per_day: self.attempts_per_day.clone(),
            max_backtrack_depth: max_depth,
            average_backtrack_depth: average_depth,
            total_runtime_secs: self.started.elapsed().as_secs_f64(),
            day_runtime_secs: self.day_runtime_secs.clone(),
        }
    }
}

/// Assignments in canonical decision order, regardless of the order pins
/// and search steps produced them.
fn sorted_plan(assignments: &[Assignment]) -> Vec<Assignment> {
    let mut plan = assignments.to_vec();
    plan.sort_by_key(|a| (a.day_index, a.slot_index));
    plan
}

fn snapshot(
    assignments: &[Assignment],
    daily_trackers: &BTreeMap<usize, DailyTracker>,
) -> PlanSnapshot {
    PlanSnapshot {
        assignments: sorted_plan(assignments),
        daily_trackers: daily_trackers.clone(),
    }
}

/// Daily validation: macros within tolerance, fat in range, optional
/// ceiling honored, no UL exceeded. `None` means the day passes.
fn validate_day(
    day_index: usize,
    tracker: &DailyTracker,
    profile: &PlanningUserProfile,
    resolved_ul: Option<&UpperLimits>,
) -> Option<FailedDayReport> {
    let macros = macro_violations(tracker, profile);
    let ul_violations = resolved_ul
        .map(|limits| validate_daily_upper_limits(&tracker.micronutrients_consumed, limits))
        .unwrap_or_default();
    if macros.is_empty() && ul_violations.is_empty() {
        return None;
    }
    let detail = macros
        .keys()
        .next()
        .cloned()
        .or_else(|| ul_violations.first().map(|v| format!("UL:{}", v.nutrient)))
        .unwrap_or_default();
    Some(FailedDayReport {
        day: day_index,
        macro_violations: macros,
        ul_violations,
        detail,
    })
}

/// First tracked nutrient whose weekly total falls short of `RDI * days`.
fn weekly_deficit(
    weekly_tracker: &WeeklyTracker,
    profile: &PlanningUserProfile,
    days: usize,
) -> Option<String> {
    for (nutrient, daily_rdi) in &profile.micronutrient_targets {
        if *daily_rdi <= 0.0 {
            continue;
        }
        let needed = daily_rdi * days as f64;
        if weekly_tracker.weekly_totals.micronutrient(nutrient) < needed {
            return Some(nutrient.clone());
        }
    }
    None
}

/// Union of hard-constraint codes blocking every pool recipe at a slot,
/// for unfillable-slot reports.
fn blocking_constraints(
    recipe_pool: &[PlanningRecipe],
    day_index: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    profile: &PlanningUserProfile,
    resolved_ul: Option<&UpperLimits>,
) -> Vec<String> {
    let Some(day_slots) = profile.schedule.get(day_index) else {
        return Vec::new();
    };
    let Some(slot) = day_slots.get(slot_index) else {
        return Vec::new();
    };
    let next_first = next_day_first_slot(&profile.schedule, day_index);
    let ctx = activity_context(
        slot_index,
        day_slots,
        next_first,
        profile.activity_schedule.as_ref(),
    );
    let mut codes: BTreeSet<String> = BTreeSet::new();
    for recipe in recipe_pool {
        for violation in check_all(
            &CandidateView::base(recipe),
            slot,
            day_index,
            slot_index,
            daily_trackers,
            profile,
            resolved_ul,
            ctx.is_workout(),
        ) {
            codes.insert(violation.to_string());
        }
    }
    codes.into_iter().collect()
}

/// Greatest decision point before `current` that is not pinned and still
/// has untried candidates.
fn find_backtrack_target(
    order: &[(usize, usize)],
    current: usize,
    cache: &BTreeMap<(usize, usize), CacheEntry>,
    profile: &PlanningUserProfile,
) -> Option<usize> {
    for j in (0..current).rev() {
        let (day_index, slot_index) = order[j];
        if profile.is_pinned(day_index, slot_index) {
            continue;
        }
        if let Some(entry) = cache.get(&(day_index, slot_index)) {
            if entry.has_untried() {
                return Some(j);
            }
        }
    }
    None
}

/// Run the meal plan search.
///
/// `Err` covers data errors only (bad horizon or schedule shape, malformed
/// carb contributions). Every search outcome, success or failure, comes
/// back as `Ok(MealPlanResult)`. Deterministic: identical inputs produce
/// identical plans, attempts and backtracks.
pub fn run_meal_plan_search(
    profile: &PlanningUserProfile,
    recipe_pool: &[PlanningRecipe],
    days: usize,
    resolved_ul: Option<&UpperLimits>,
    options: SearchOptions,
) -> Result<MealPlanResult, PlanningError> {
    validate_planning_horizon(days)?;
    validate_schedule(&profile.schedule, days)?;

    let mut stats = options.collect_stats.then(StatsCollector::new);
    let recipe_by_id: BTreeMap<&str, &PlanningRecipe> = recipe_pool
        .iter()
        .map(|recipe| (recipe.id.as_str(), recipe))
        .collect();

    // Pinned pre-validation: any conflict ends the search before state is
    // built.
    let pinned_conflicts = validate_pinned_assignments(profile, &recipe_by_id, days);
    if !pinned_conflicts.is_empty() {
        debug!(conflicts = pinned_conflicts.len(), "pinned pre-validation failed");
        let summary = stats.as_ref().map(|s| s.summary(0, 0));
        return Ok(MealPlanResult::failure(
            TerminationCode::Infeasible,
            FailureMode::PinnedConflict,
            FailureReport::PinnedConflicts { pinned_conflicts },
            None,
            summary,
        ));
    }

    let initial = build_initial_state(profile, &recipe_by_id, days);
    let mut daily_trackers = initial.daily_trackers;
    let mut weekly_tracker = initial.weekly_tracker;
    let mut assignments = initial.assignments;

    let macro_bounds = precompute_macro_bounds(recipe_pool);
    let slot_counts: BTreeSet<usize> = profile.schedule.iter().map(Vec::len).collect();
    let tracked_names: Vec<String> = if profile.micronutrient_targets.is_empty() {
        NUTRIENT_NAMES.iter().map(|n| n.to_string()).collect()
    } else {
        profile.micronutrient_targets.keys().cloned().collect()
    };
    let max_daily_achievable: MaxDailyAchievable =
        precompute_max_daily_achievable(recipe_pool, tracked_names, &slot_counts);

    let order = decision_order(&profile.schedule);
    let mut cache: BTreeMap<(usize, usize), CacheEntry> = BTreeMap::new();
    let mut completed_days: BTreeSet<usize> = BTreeSet::new();
    let mut attempt_count = 0usize;
    let mut backtrack_count = 0usize;
    let mut best_assignments = assignments.clone();
    let mut best_daily_trackers = daily_trackers.clone();
    let mut last_sodium_advisory: Option<SodiumAdvisory> = None;
    let mut i = 0usize;

    // Unwinds state back to the decision point at `order[target]`. Removes
    // every non-pinned assignment at or beyond the target in reverse order,
    // un-completing days as their assignments come back out, and drops
    // cache entries beyond the target. The target's own pointer was already
    // advanced when its current candidate was applied, so the failed choice
    // is not retried.
    macro_rules! unwind_to {
        ($target:expr) => {{
            let target: usize = $target;
            let (target_day, target_slot) = order[target];
            let mut to_remove: Vec<Assignment> = assignments
                .iter()
                .filter(|a| {
                    (a.day_index, a.slot_index) >= (target_day, target_slot)
                        && !profile.is_pinned(a.day_index, a.slot_index)
                })
                .cloned()
                .collect();
            to_remove.sort_by_key(|a| std::cmp::Reverse((a.day_index, a.slot_index)));

            for removed in &to_remove {
                let Some(recipe) = recipe_by_id.get(removed.recipe_id.as_str()) else {
                    continue;
                };
                if completed_days.remove(&removed.day_index) {
                    let day_totals = daily_trackers
                        .get(&removed.day_index)
                        .map(|t| t.day_totals())
                        .unwrap_or_else(nutrition::NutritionProfile::zero);
                    weekly_tracker.uncomplete_day(
                        &day_totals,
                        days,
                        &profile.micronutrient_targets,
                    );
                }
                let nutrition = effective_nutrition(recipe, removed.variant_index, profile)?;
                let day_slots = &profile.schedule[removed.day_index];
                let next_first = next_day_first_slot(&profile.schedule, removed.day_index);
                let ctx = activity_context(
                    removed.slot_index,
                    day_slots,
                    next_first,
                    profile.activity_schedule.as_ref(),
                );
                let mut day_emptied = false;
                if let Some(tracker) = daily_trackers.get_mut(&removed.day_index) {
                    tracker.remove_assignment(&nutrition, &removed.recipe_id, ctx.is_workout());
                    day_emptied = tracker.slots_assigned == 0;
                }
                if day_emptied {
                    daily_trackers.remove(&removed.day_index);
                }
                assignments.retain(|a| {
                    !(a.day_index == removed.day_index && a.slot_index == removed.slot_index)
                });
            }

            cache.retain(|key, _| *key <= (target_day, target_slot));
            backtrack_count += 1;
            if let Some(s) = stats.as_mut() {
                s.backtrack_depths.push(i - target);
            }
            debug!(
                from = i,
                to = target,
                removed = to_remove.len(),
                "backtracking"
            );
            i = target;
        }};
    }

    while i < order.len() {
        let (day_index, slot_index) = order[i];

        if attempt_count >= options.attempt_limit {
            info!(attempt_count, "attempt limit reached");
            let summary = stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
            let best_plan_violations: Vec<FailedDayReport> = best_daily_trackers
                .iter()
                .filter(|(_, t)| t.is_complete())
                .filter_map(|(d, t)| validate_day(*d, t, profile, resolved_ul))
                .collect();
            return Ok(MealPlanResult::failure(
                TerminationCode::LimitExhausted,
                FailureMode::AttemptLimitReached,
                FailureReport::AttemptLimit {
                    attempts: attempt_count,
                    backtracks: backtrack_count,
                    search_exhaustive: false,
                    best_plan: Some(snapshot(&best_assignments, &best_daily_trackers)),
                    best_plan_violations,
                },
                last_sodium_advisory,
                summary,
            ));
        }

        if let Some(s) = stats.as_mut() {
            if slot_index == 0 {
                s.day_starts.entry(day_index).or_insert_with(Instant::now);
            }
        }

        // Cross-day recoverability at each day boundary.
        if day_index > 0 && slot_index == 0 {
            if !check_cross_day_recoverability(
                day_index,
                &weekly_tracker,
                &profile.schedule,
                profile,
                days,
                &max_daily_achievable,
            ) {
                debug!(day_index, "weekly deficit irrecoverable from this day");
                match find_backtrack_target(&order, i, &cache, profile) {
                    Some(target) => {
                        unwind_to!(target);
                        continue;
                    }
                    None => {
                        let summary =
                            stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
                        return Ok(MealPlanResult::failure(
                            TerminationCode::Infeasible,
                            FailureMode::WeeklyShortfall,
                            FailureReport::WeeklyShortfall {
                                deficient_nutrients: deficient_nutrients(
                                    &weekly_tracker,
                                    profile,
                                    days,
                                    &max_daily_achievable,
                                ),
                            },
                            last_sodium_advisory,
                            summary,
                        ));
                    }
                }
            }
        }

        if profile.is_pinned(day_index, slot_index) {
            let already_present = assignments
                .iter()
                .any(|a| a.day_index == day_index && a.slot_index == slot_index);
            if !already_present {
                // Pins normally enter through the initial state; this path
                // covers a pinned slot re-reached after partial unwinds.
                let Some(recipe) = profile
                    .pinned_recipe_id(day_index, slot_index)
                    .and_then(|id| recipe_by_id.get(id))
                else {
                    // Pre-validation guarantees the pin resolves; an absent
                    // recipe here is a programmer invariant violation.
                    unreachable!("pinned recipe missing after pre-validation");
                };
                let day_slots = &profile.schedule[day_index];
                let next_first = next_day_first_slot(&profile.schedule, day_index);
                let ctx = activity_context(
                    slot_index,
                    day_slots,
                    next_first,
                    profile.activity_schedule.as_ref(),
                );
                let tracker = daily_trackers
                    .entry(day_index)
                    .or_insert_with(|| DailyTracker::new(day_slots.len()));
                tracker.add_assignment(&recipe.nutrition, &recipe.id, ctx.is_workout());
                assignments.push(Assignment::new(day_index, slot_index, &recipe.id, 0));
                attempt_count += 1;
                if let Some(s) = stats.as_mut() {
                    *s.attempts_per_day.entry(day_index).or_insert(0) += 1;
                }
            }
            i += 1;
        } else {
            if !cache.contains_key(&(day_index, slot_index)) {
                let candidate_set = generate_candidates(
                    recipe_pool,
                    day_index,
                    slot_index,
                    &daily_trackers,
                    &profile.schedule,
                    profile,
                    resolved_ul,
                    &macro_bounds,
                    options.scalable_sources.as_ref(),
                )?;
                if candidate_set.trigger_backtrack {
                    match find_backtrack_target(&order, i, &cache, profile) {
                        Some(target) => {
                            unwind_to!(target);
                            continue;
                        }
                        None => {
                            let failed_slot =
                                candidate_set.empty_future_slot.unwrap_or(slot_index);
                            let summary = stats
                                .as_ref()
                                .map(|s| s.summary(attempt_count, backtrack_count));
                            return Ok(MealPlanResult::failure(
                                TerminationCode::Infeasible,
                                FailureMode::UnfillableSlot,
                                FailureReport::Unfillable {
                                    unfillable_slots: vec![UnfillableSlot {
                                        day: day_index,
                                        slot_index: failed_slot,
                                        eligible_recipe_count: 0,
                                        blocking_constraints: blocking_constraints(
                                            recipe_pool,
                                            day_index,
                                            failed_slot,
                                            &daily_trackers,
                                            profile,
                                            resolved_ul,
                                        ),
                                    }],
                                },
                                last_sodium_advisory,
                                summary,
                            ));
                        }
                    }
                }
                let scored: Vec<(Candidate, f64)> = candidate_set
                    .candidates
                    .into_iter()
                    .map(|candidate| {
                        let score = composite_score(
                            &CandidateView {
                                id: &candidate.recipe_id,
                                ingredients: recipe_by_id
                                    .get(candidate.recipe_id.as_str())
                                    .map(|r| r.ingredients.as_slice())
                                    .unwrap_or(&[]),
                                cooking_time_minutes: recipe_by_id
                                    .get(candidate.recipe_id.as_str())
                                    .map(|r| r.cooking_time_minutes)
                                    .unwrap_or(0),
                                nutrition: &candidate.nutrition,
                            },
                            day_index,
                            slot_index,
                            &daily_trackers,
                            &weekly_tracker,
                            &profile.schedule,
                            profile,
                        );
                        (candidate, score)
                    })
                    .collect();
                let ordered = order_scored_candidates(
                    scored,
                    &recipe_by_id,
                    &daily_trackers,
                    &weekly_tracker,
                    profile,
                    day_index,
                );
                if let Some(s) = stats.as_mut() {
                    s.branching_factors
                        .insert((day_index, slot_index), ordered.len());
                }
                cache.insert((day_index, slot_index), CacheEntry { ordered, pointer: 0 });
            }

            let has_untried = cache
                .get(&(day_index, slot_index))
                .map(CacheEntry::has_untried)
                .unwrap_or(false);
            if !has_untried {
                match find_backtrack_target(&order, i, &cache, profile) {
                    Some(target) => {
                        unwind_to!(target);
                        continue;
                    }
                    None => {
                        debug!(day_index, slot_index, "candidates exhausted at search root");
                        let summary =
                            stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
                        return Ok(MealPlanResult::failure(
                            TerminationCode::Infeasible,
                            FailureMode::DailyInfeasibility,
                            FailureReport::DailyInfeasibility {
                                failed_days: Vec::new(),
                                closest_plan: Some(snapshot(
                                    &best_assignments,
                                    &best_daily_trackers,
                                )),
                            },
                            last_sodium_advisory,
                            summary,
                        ));
                    }
                }
            }

            let (candidate, score) = {
                let entry = cache
                    .get_mut(&(day_index, slot_index))
                    .expect("cache entry just ensured");
                let chosen = entry.ordered[entry.pointer].clone();
                entry.pointer += 1;
                chosen
            };
            trace!(
                day_index,
                slot_index,
                recipe_id = %candidate.recipe_id,
                variant_index = candidate.variant_index,
                score,
                "assigning"
            );
            let day_slots = &profile.schedule[day_index];
            let next_first = next_day_first_slot(&profile.schedule, day_index);
            let ctx = activity_context(
                slot_index,
                day_slots,
                next_first,
                profile.activity_schedule.as_ref(),
            );
            let tracker = daily_trackers
                .entry(day_index)
                .or_insert_with(|| DailyTracker::new(day_slots.len()));
            tracker.add_assignment(&candidate.nutrition, &candidate.recipe_id, ctx.is_workout());
            assignments.push(Assignment::new(
                day_index,
                slot_index,
                &candidate.recipe_id,
                candidate.variant_index,
            ));
            attempt_count += 1;
            if let Some(s) = stats.as_mut() {
                *s.attempts_per_day.entry(day_index).or_insert(0) += 1;
            }
            i += 1;
        }

        if assignments.len() > best_assignments.len() {
            best_assignments = assignments.clone();
            best_daily_trackers = daily_trackers.clone();
        }

        // Day boundary: the day's tracker just filled up.
        let day_is_complete = daily_trackers
            .get(&day_index)
            .map(|t| t.is_complete())
            .unwrap_or(false);
        if day_is_complete && !completed_days.contains(&day_index) {
            let failed_day = validate_day(day_index, &daily_trackers[&day_index], profile, resolved_ul);
            if let Some(failed) = failed_day {
                debug!(day_index, detail = %failed.detail, "day failed validation");
                match find_backtrack_target(&order, i, &cache, profile) {
                    Some(target) => {
                        unwind_to!(target);
                        continue;
                    }
                    None => {
                        let summary =
                            stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
                        return Ok(MealPlanResult::failure(
                            TerminationCode::Infeasible,
                            FailureMode::DailyInfeasibility,
                            FailureReport::DailyInfeasibility {
                                failed_days: vec![failed],
                                closest_plan: Some(snapshot(&assignments, &daily_trackers)),
                            },
                            last_sodium_advisory,
                            summary,
                        ));
                    }
                }
            }
            let day_totals = daily_trackers[&day_index].day_totals();
            weekly_tracker.complete_day(&day_totals, days, &profile.micronutrient_targets);
            completed_days.insert(day_index);
            debug!(
                day_index,
                calories = day_totals.calories,
                days_completed = weekly_tracker.days_completed,
                "day completed"
            );
            if let Some(s) = stats.as_mut() {
                if let Some(start) = s.day_starts.get(&day_index) {
                    s.day_runtime_secs
                        .insert(day_index, start.elapsed().as_secs_f64());
                }
            }
        }

        // Week boundary: the last day has passed daily validation.
        if day_index == days - 1 && completed_days.contains(&day_index) {
            if days == 1 {
                info!(attempt_count, "single-day plan complete");
                let warning = build_sodium_advisory(&weekly_tracker, profile, days);
                let summary =
                    stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
                return Ok(MealPlanResult::success(
                    TerminationCode::SingleDaySuccess,
                    sorted_plan(&assignments),
                    daily_trackers,
                    weekly_tracker,
                    warning,
                    summary,
                ));
            }
            let advisory = build_sodium_advisory(&weekly_tracker, profile, days);
            if advisory.is_some() {
                last_sodium_advisory = advisory.clone();
            }
            if let Some(nutrient) = weekly_deficit(&weekly_tracker, profile, days) {
                debug!(%nutrient, "weekly validation failed");
                match find_backtrack_target(&order, i, &cache, profile) {
                    Some(target) => {
                        unwind_to!(target);
                        continue;
                    }
                    None => {
                        let summary =
                            stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
                        return Ok(MealPlanResult::failure(
                            TerminationCode::Infeasible,
                            FailureMode::WeeklyShortfall,
                            FailureReport::WeeklyShortfall {
                                deficient_nutrients: deficient_nutrients(
                                    &weekly_tracker,
                                    profile,
                                    days,
                                    &max_daily_achievable,
                                ),
                            },
                            last_sodium_advisory,
                            summary,
                        ));
                    }
                }
            }
            info!(
                attempt_count,
                backtrack_count,
                days_completed = weekly_tracker.days_completed,
                "weekly plan complete"
            );
            let summary = stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
            return Ok(MealPlanResult::success(
                TerminationCode::FullWeekly,
                sorted_plan(&assignments),
                daily_trackers,
                weekly_tracker,
                advisory,
                summary,
            ));
        }
    }

    // Every slot consumed without reaching the week boundary: treat as
    // daily infeasibility with the best partial attached.
    let summary = stats.as_ref().map(|s| s.summary(attempt_count, backtrack_count));
    Ok(MealPlanResult::failure(
        TerminationCode::Infeasible,
        FailureMode::DailyInfeasibility,
        FailureReport::DailyInfeasibility {
            failed_days: Vec::new(),
            closest_plan: Some(snapshot(&best_assignments, &best_daily_trackers)),
        },
        last_sodium_advisory,
        summary,
    ))
}
