//! Planning data model: schedule, profile, recipe pool, assignments and the
//! running trackers mutated by the search.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use nutrition::{Ingredient, MicronutrientProfile, NutritionProfile};

use crate::error::PlanningError;

pub const MIN_SLOTS_PER_DAY: usize = 1;
pub const MAX_SLOTS_PER_DAY: usize = 8;
pub const PLANNING_DAYS_MIN: usize = 1;
pub const PLANNING_DAYS_MAX: usize = 7;

/// A single meal slot in one day's schedule.
///
/// Slot order within a day is the listed order, not sorted by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
    /// Time of day, `"HH:MM"`.
    pub time: String,
    /// 1 = barely any time … 4 = unconstrained.
    pub busyness_level: u8,
    /// e.g. "breakfast", "lunch", "snack", "dinner".
    pub meal_type: String,
}

impl MealSlot {
    pub fn new(time: &str, busyness_level: u8, meal_type: &str) -> Self {
        MealSlot {
            time: time.to_string(),
            busyness_level,
            meal_type: meal_type.to_string(),
        }
    }

    /// Minutes since midnight. Schedule validation guarantees the time
    /// parses; a malformed value reads as midnight.
    pub fn minutes_of_day(&self) -> u32 {
        parse_hhmm(&self.time).unwrap_or(0)
    }
}

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_hhmm(time: &str) -> Option<u32> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .ok()
        .map(|t| t.hour() * 60 + t.minute())
}

/// Optional daily workout window. When only one edge is given, the other is
/// derived at sixty minutes away.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_end: Option<String>,
}

impl ActivitySchedule {
    /// Resolved workout window as minutes since midnight, if any edge is set.
    pub fn workout_window_minutes(&self) -> Option<(u32, u32)> {
        let start = self.workout_start.as_deref().and_then(parse_hhmm);
        let end = self.workout_end.as_deref().and_then(parse_hhmm);
        match (start, end) {
            (Some(s), Some(e)) => Some((s, e)),
            (Some(s), None) => Some((s, s + 60)),
            (None, Some(e)) => Some((e.saturating_sub(60), e)),
            (None, None) => None,
        }
    }
}

/// A user-fixed `(day, slot) -> recipe` assignment the search must honor and
/// never remove. Days are 1-based, slot indices 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedAssignment {
    pub day: usize,
    pub slot_index: usize,
    pub recipe_id: String,
}

/// User profile consumed by the planner: daily macro targets, schedule,
/// preferences, pins and the knobs for primary-carb downscaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningUserProfile {
    pub daily_calories: u32,
    pub daily_protein_g: f64,
    /// (min, max) grams.
    pub daily_fat_g: (f64, f64),
    pub daily_carbs_g: f64,
    /// Optional hard ceiling on any single day's calories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_calories: Option<u32>,
    /// `schedule[day_index]` = that day's slots, in decision order.
    pub schedule: Vec<Vec<MealSlot>>,
    /// Normalized ingredient names the user will not eat.
    #[serde(default)]
    pub excluded_ingredients: BTreeSet<String>,
    /// Normalized ingredient names the user prefers.
    #[serde(default)]
    pub liked_foods: BTreeSet<String>,
    #[serde(default = "default_demographic")]
    pub demographic: String,
    /// Partial UL overrides; `None` values and unknown names are ignored at
    /// resolution time.
    #[serde(default)]
    pub upper_limits_overrides: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub pinned_assignments: Vec<PinnedAssignment>,
    /// Tracked micronutrients: field name -> daily RDI.
    #[serde(default)]
    pub micronutrient_targets: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_schedule: Option<ActivitySchedule>,
    #[serde(default)]
    pub enable_primary_carb_downscaling: bool,
    #[serde(default = "default_max_scaling_steps")]
    pub max_scaling_steps: u32,
    #[serde(default = "default_scaling_step_fraction")]
    pub scaling_step_fraction: f64,
}

fn default_demographic() -> String {
    "adult_male".to_string()
}

fn default_max_scaling_steps() -> u32 {
    4
}

fn default_scaling_step_fraction() -> f64 {
    0.10
}

impl PlanningUserProfile {
    pub fn is_pinned(&self, day_index: usize, slot_index: usize) -> bool {
        self.pinned_assignments
            .iter()
            .any(|p| p.day == day_index + 1 && p.slot_index == slot_index)
    }

    pub fn pinned_recipe_id(&self, day_index: usize, slot_index: usize) -> Option<&str> {
        self.pinned_assignments
            .iter()
            .find(|p| p.day == day_index + 1 && p.slot_index == slot_index)
            .map(|p| p.recipe_id.as_str())
    }
}

/// Recipe as consumed by the planner. Nutrition is pre-computed upstream and
/// already scaled to the recipe's ingredient quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRecipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub cooking_time_minutes: u32,
    pub nutrition: NutritionProfile,
    /// Nutrition contributed by the primary carbohydrate source alone; only
    /// used when primary-carb downscaling is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_carb_contribution: Option<NutritionProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_carb_source: Option<String>,
}

/// One placement decision: a recipe (or scaled variant of it) in a slot.
/// `variant_index` 0 is the base recipe and is omitted from serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub day_index: usize,
    pub slot_index: usize,
    pub recipe_id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub variant_index: u32,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl Assignment {
    pub fn new(day_index: usize, slot_index: usize, recipe_id: &str, variant_index: u32) -> Self {
        Assignment {
            day_index,
            slot_index,
            recipe_id: recipe_id.to_string(),
            variant_index,
        }
    }
}

/// Running totals for one day of the plan under construction. Created on the
/// day's first assignment, dropped when its last assignment is unwound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTracker {
    pub calories_consumed: f64,
    pub protein_consumed: f64,
    pub fat_consumed: f64,
    pub carbs_consumed: f64,
    pub micronutrients_consumed: MicronutrientProfile,
    pub used_recipe_ids: BTreeSet<String>,
    /// Recipe ids placed in non-workout slots; drives the consecutive-day
    /// repetition restriction.
    pub non_workout_recipe_ids: BTreeSet<String>,
    pub slots_assigned: usize,
    pub slots_total: usize,
}

impl DailyTracker {
    pub fn new(slots_total: usize) -> Self {
        DailyTracker {
            calories_consumed: 0.0,
            protein_consumed: 0.0,
            fat_consumed: 0.0,
            carbs_consumed: 0.0,
            micronutrients_consumed: MicronutrientProfile::default(),
            used_recipe_ids: BTreeSet::new(),
            non_workout_recipe_ids: BTreeSet::new(),
            slots_assigned: 0,
            slots_total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slots_assigned == self.slots_total
    }

    /// Fold one assignment's nutrition into the day.
    pub fn add_assignment(&mut self, nutrition: &NutritionProfile, recipe_id: &str, is_workout: bool) {
        self.calories_consumed += nutrition.calories;
        self.protein_consumed += nutrition.protein_g;
        self.fat_consumed += nutrition.fat_g;
        self.carbs_consumed += nutrition.carbs_g;
        if let Some(micros) = &nutrition.micronutrients {
            self.micronutrients_consumed = self.micronutrients_consumed.add(micros);
        }
        self.used_recipe_ids.insert(recipe_id.to_string());
        if !is_workout {
            self.non_workout_recipe_ids.insert(recipe_id.to_string());
        }
        self.slots_assigned += 1;
    }

    /// Exact inverse of [`DailyTracker::add_assignment`].
    pub fn remove_assignment(
        &mut self,
        nutrition: &NutritionProfile,
        recipe_id: &str,
        is_workout: bool,
    ) {
        self.calories_consumed -= nutrition.calories;
        self.protein_consumed -= nutrition.protein_g;
        self.fat_consumed -= nutrition.fat_g;
        self.carbs_consumed -= nutrition.carbs_g;
        if let Some(micros) = &nutrition.micronutrients {
            self.micronutrients_consumed = self.micronutrients_consumed.subtract(micros);
        }
        self.used_recipe_ids.remove(recipe_id);
        if !is_workout {
            self.non_workout_recipe_ids.remove(recipe_id);
        }
        self.slots_assigned -= 1;
    }

    /// The day's totals as one profile, micronutrients included.
    pub fn day_totals(&self) -> NutritionProfile {
        NutritionProfile::new(
            self.calories_consumed,
            self.protein_consumed,
            self.fat_consumed,
            self.carbs_consumed,
        )
        .with_micronutrients(self.micronutrients_consumed.clone())
    }
}

/// Accumulation across the planning horizon. A day contributes exactly once,
/// at the moment it passes daily validation; unwinding a completed day takes
/// its contribution back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTracker {
    pub weekly_totals: NutritionProfile,
    pub days_completed: usize,
    pub days_remaining: usize,
    /// Tracked nutrient -> unmet amount carried forward from completed days.
    pub carryover_needs: BTreeMap<String, f64>,
}

impl WeeklyTracker {
    pub fn new(days: usize, tracked: &BTreeMap<String, f64>) -> Self {
        WeeklyTracker {
            weekly_totals: NutritionProfile::zero(),
            days_completed: 0,
            days_remaining: days,
            // Same key set recompute_carryover produces, so completing and
            // unwinding a day restores this state exactly.
            carryover_needs: tracked
                .iter()
                .filter(|(_, rdi)| **rdi > 0.0)
                .map(|(n, _)| (n.clone(), 0.0))
                .collect(),
        }
    }

    /// Fold a validated day into the weekly totals.
    pub fn complete_day(
        &mut self,
        day_totals: &NutritionProfile,
        days: usize,
        tracked: &BTreeMap<String, f64>,
    ) {
        self.weekly_totals = self.weekly_totals.add(day_totals);
        self.days_completed += 1;
        self.days_remaining = days - self.days_completed;
        self.recompute_carryover(tracked);
    }

    /// Exact inverse of [`WeeklyTracker::complete_day`].
    pub fn uncomplete_day(
        &mut self,
        day_totals: &NutritionProfile,
        days: usize,
        tracked: &BTreeMap<String, f64>,
    ) {
        self.weekly_totals = self.weekly_totals.subtract(day_totals);
        self.days_completed = self.days_completed.saturating_sub(1);
        self.days_remaining = days - self.days_completed;
        self.recompute_carryover(tracked);
    }

    /// Carryover for each tracked nutrient: what completed days should have
    /// supplied but did not.
    pub fn recompute_carryover(&mut self, tracked: &BTreeMap<String, f64>) {
        let mut carryover = BTreeMap::new();
        for (nutrient, daily_rdi) in tracked {
            if *daily_rdi <= 0.0 {
                continue;
            }
            let needed = daily_rdi * self.days_completed as f64;
            let consumed = self.weekly_totals.micronutrient(nutrient);
            carryover.insert(nutrient.clone(), (needed - consumed).max(0.0));
        }
        self.carryover_needs = carryover;
    }
}

/// Validate the planning horizon is 1..=7 days.
pub fn validate_planning_horizon(days: usize) -> Result<(), PlanningError> {
    if !(PLANNING_DAYS_MIN..=PLANNING_DAYS_MAX).contains(&days) {
        return Err(PlanningError::InvalidHorizon(days));
    }
    Ok(())
}

/// Validate the schedule shape: exactly `days` days, 1..=8 slots per day,
/// every slot time parseable as `"HH:MM"`.
pub fn validate_schedule(schedule: &[Vec<MealSlot>], days: usize) -> Result<(), PlanningError> {
    if schedule.len() != days {
        return Err(PlanningError::InvalidSchedule(format!(
            "schedule must have exactly {} days; got {}",
            days,
            schedule.len()
        )));
    }
    for (day_index, day_slots) in schedule.iter().enumerate() {
        let n = day_slots.len();
        if !(MIN_SLOTS_PER_DAY..=MAX_SLOTS_PER_DAY).contains(&n) {
            return Err(PlanningError::InvalidSchedule(format!(
                "day {} has {} slots; must be between {} and {}",
                day_index + 1,
                n,
                MIN_SLOTS_PER_DAY,
                MAX_SLOTS_PER_DAY
            )));
        }
        for (slot_index, slot) in day_slots.iter().enumerate() {
            if parse_hhmm(&slot.time).is_none() {
                return Err(PlanningError::InvalidSchedule(format!(
                    "day {} slot {} has unparseable time '{}'",
                    day_index + 1,
                    slot_index,
                    slot.time
                )));
            }
        }
    }
    Ok(())
}

/// Decision points in lexicographic `(day_index, slot_index)` order.
pub fn decision_order(schedule: &[Vec<MealSlot>]) -> Vec<(usize, usize)> {
    let mut order = Vec::new();
    for (day_index, day_slots) in schedule.iter().enumerate() {
        for slot_index in 0..day_slots.len() {
            order.push((day_index, slot_index));
        }
    }
    order
}
