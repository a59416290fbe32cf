//! Derived slot attributes: cooking-time bound, gap to the next meal,
//! workout context and satiety requirement. Pure functions of the slot, its
//! day's schedule, the next day's first slot and the workout window.

use serde::{Deserialize, Serialize};

use crate::model::{ActivitySchedule, MealSlot};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Maximum cooking time in minutes allowed by a slot's busyness level.
/// Level 4 is unconstrained.
pub fn cooking_time_max(busyness_level: u8) -> Option<u32> {
    match busyness_level {
        1 => Some(5),
        2 => Some(15),
        3 => Some(30),
        4 => None,
        // fallback for out-of-range levels
        _ => Some(30),
    }
}

/// Hours until the next meal: the next slot on the same day, else the next
/// day's first slot (wrapping overnight), else infinity.
pub fn time_until_next_meal(
    slot_index: usize,
    day_slots: &[MealSlot],
    next_day_first_slot: Option<&MealSlot>,
) -> f64 {
    let slot_min = day_slots[slot_index].minutes_of_day();
    if slot_index + 1 < day_slots.len() {
        let next_min = day_slots[slot_index + 1].minutes_of_day();
        let mut delta = next_min as i64 - slot_min as i64;
        if delta <= 0 {
            delta += MINUTES_PER_DAY as i64;
        }
        return delta as f64 / 60.0;
    }
    if let Some(next_first) = next_day_first_slot {
        let delta = (MINUTES_PER_DAY - slot_min) + next_first.minutes_of_day();
        return delta as f64 / 60.0;
    }
    f64::INFINITY
}

/// Where a slot sits relative to the user's workout window and the fasting
/// gap that follows it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityContext {
    /// A workout begins within two hours after this slot.
    pub pre_workout: bool,
    /// A workout ended within three hours before this slot.
    pub post_workout: bool,
    /// Neither pre- nor post-workout.
    pub sedentary: bool,
    /// More than four hours to the next meal, or a long overnight fast.
    pub overnight_fast_ahead: bool,
}

impl ActivityContext {
    pub fn is_workout(&self) -> bool {
        self.pre_workout || self.post_workout
    }
}

/// Derive the activity context for one slot.
pub fn activity_context(
    slot_index: usize,
    day_slots: &[MealSlot],
    next_day_first_slot: Option<&MealSlot>,
    activity_schedule: Option<&ActivitySchedule>,
) -> ActivityContext {
    let mut ctx = ActivityContext::default();
    let slot_min = day_slots[slot_index].minutes_of_day();

    if let Some((workout_start, workout_end)) =
        activity_schedule.and_then(ActivitySchedule::workout_window_minutes)
    {
        let two_hours = 120;
        let delta_start = (workout_start as i64 - slot_min as i64).rem_euclid(MINUTES_PER_DAY as i64);
        if delta_start > 0 && delta_start <= two_hours {
            ctx.pre_workout = true;
        }

        let three_hours = 180;
        let delta_end = (slot_min as i64 - workout_end as i64).rem_euclid(MINUTES_PER_DAY as i64);
        if delta_end < three_hours {
            ctx.post_workout = true;
        }
    }

    if !ctx.pre_workout && !ctx.post_workout {
        ctx.sedentary = true;
    }

    let hours_until_next = time_until_next_meal(slot_index, day_slots, next_day_first_slot);
    let is_last_slot = slot_index + 1 >= day_slots.len();
    if hours_until_next > 4.0 || (is_last_slot && hours_until_next >= 12.0) {
        ctx.overnight_fast_ahead = true;
    }

    ctx
}

/// How filling a meal in this slot needs to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Satiety {
    High,
    Moderate,
}

/// High satiety when the gap to the next meal exceeds four hours, or the slot
/// is the day's last and the overnight fast runs twelve hours or more.
pub fn satiety_requirement(time_until_next_meal_hours: f64, is_last_slot_of_day: bool) -> Satiety {
    if time_until_next_meal_hours > 4.0 {
        return Satiety::High;
    }
    if is_last_slot_of_day && time_until_next_meal_hours >= 12.0 {
        return Satiety::High;
    }
    Satiety::Moderate
}

/// First slot of the following day, if there is one.
pub fn next_day_first_slot(schedule: &[Vec<MealSlot>], day_index: usize) -> Option<&MealSlot> {
    schedule.get(day_index + 1).and_then(|day| day.first())
}
