use std::collections::BTreeMap;

use nutrition::{Ingredient, MicronutrientProfile, NutritionProfile};
use planner::{
    run_meal_plan_search, FailureMode, FailureReport, MealSlot, PlanningRecipe,
    PlanningUserProfile, SearchOptions, TerminationCode,
};

fn create_test_recipe(id: &str, calories: f64, protein: f64, fat: f64, carbs: f64) -> PlanningRecipe {
    PlanningRecipe {
        id: id.to_string(),
        name: format!("Recipe {}", id),
        ingredients: vec![Ingredient::new("chicken", 150.0, "g"), Ingredient::new("rice", 100.0, "g")],
        cooking_time_minutes: 10,
        nutrition: NutritionProfile::new(calories, protein, fat, carbs),
        primary_carb_contribution: None,
        primary_carb_source: None,
    }
}

fn with_micronutrient(mut recipe: PlanningRecipe, nutrient: &str, amount: f64) -> PlanningRecipe {
    let mut micros = recipe
        .nutrition
        .micronutrients
        .clone()
        .unwrap_or_default();
    micros.set(nutrient, amount);
    recipe.nutrition = recipe.nutrition.clone().with_micronutrients(micros);
    recipe
}

fn two_slot_day() -> Vec<MealSlot> {
    vec![
        MealSlot::new("08:00", 3, "breakfast"),
        MealSlot::new("18:00", 3, "dinner"),
    ]
}

fn create_test_profile(days: usize) -> PlanningUserProfile {
    PlanningUserProfile {
        daily_calories: 2000,
        daily_protein_g: 100.0,
        daily_fat_g: (50.0, 80.0),
        daily_carbs_g: 250.0,
        max_daily_calories: None,
        schedule: (0..days).map(|_| two_slot_day()).collect(),
        excluded_ingredients: Default::default(),
        liked_foods: Default::default(),
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

fn stats_options() -> SearchOptions {
    SearchOptions {
        collect_stats: true,
        ..SearchOptions::default()
    }
}

#[test]
fn test_perfect_identical_week() {
    // 14 identical recipes, each exactly half a day's targets: a full week
    // should assemble greedily.
    let pool: Vec<PlanningRecipe> = (1..=14)
        .map(|n| create_test_recipe(&format!("r{:02}", n), 1000.0, 50.0, 32.0, 125.0))
        .collect();
    let profile = create_test_profile(7);

    let result = run_meal_plan_search(&profile, &pool, 7, None, stats_options()).unwrap();
    assert!(result.success, "expected success, got {:?}", result.failure_mode);
    assert_eq!(result.termination_code, TerminationCode::FullWeekly);
    let plan = result.plan.as_ref().unwrap();
    assert_eq!(plan.len(), 14);
    let weekly = result.weekly_tracker.as_ref().unwrap();
    assert_eq!(weekly.days_completed, 7);
    assert_eq!(weekly.days_remaining, 0);
    let stats = result.stats.as_ref().unwrap();
    assert!(stats.attempts <= 16, "attempts {} > 16", stats.attempts);

    // Same plan on a repeated run
    let again = run_meal_plan_search(&profile, &pool, 7, None, SearchOptions::default()).unwrap();
    assert_eq!(again.plan.as_ref().unwrap(), plan);
}

#[test]
fn test_successful_days_stay_within_tolerance() {
    let pool: Vec<PlanningRecipe> = (1..=14)
        .map(|n| create_test_recipe(&format!("r{:02}", n), 1000.0, 50.0, 32.0, 125.0))
        .collect();
    let profile = create_test_profile(7);

    let result = run_meal_plan_search(&profile, &pool, 7, None, SearchOptions::default()).unwrap();
    let trackers = result.daily_trackers.as_ref().unwrap();
    assert_eq!(trackers.len(), 7);
    for tracker in trackers.values() {
        assert!((tracker.calories_consumed - 2000.0).abs() <= 200.0);
        assert!((tracker.protein_consumed - 100.0).abs() <= 10.0);
        assert!((tracker.carbs_consumed - 250.0).abs() <= 25.0);
        assert!(tracker.fat_consumed >= 50.0 && tracker.fat_consumed <= 80.0);
        assert_eq!(tracker.used_recipe_ids.len(), tracker.slots_assigned);
    }
}

#[test]
fn test_no_non_workout_repeat_on_consecutive_days() {
    let pool: Vec<PlanningRecipe> = (1..=14)
        .map(|n| create_test_recipe(&format!("r{:02}", n), 1000.0, 50.0, 32.0, 125.0))
        .collect();
    let profile = create_test_profile(7);

    let result = run_meal_plan_search(&profile, &pool, 7, None, SearchOptions::default()).unwrap();
    let plan = result.plan.unwrap();
    let mut by_day: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for assignment in &plan {
        by_day
            .entry(assignment.day_index)
            .or_default()
            .push(&assignment.recipe_id);
    }
    for day in 1..7 {
        for id in &by_day[&day] {
            // No workout window configured, so every slot is non-workout
            assert!(
                !by_day[&(day - 1)].contains(id),
                "recipe {} repeated on days {} and {}",
                id,
                day - 1,
                day
            );
        }
    }
    for ids in by_day.values() {
        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), ids.len(), "same-day repeat in {:?}", ids);
    }
}

#[test]
fn test_unfillable_slot_reports_location_and_constraint() {
    // A single recipe cannot fill two slots on one day.
    let pool = vec![create_test_recipe("r1", 1000.0, 50.0, 32.0, 125.0)];
    let profile = create_test_profile(1);

    let result = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    assert!(!result.success);
    assert_eq!(result.termination_code, TerminationCode::Infeasible);
    assert_eq!(result.failure_mode, Some(FailureMode::UnfillableSlot));
    match result.report.unwrap() {
        FailureReport::Unfillable { unfillable_slots } => {
            assert_eq!(unfillable_slots.len(), 1);
            assert_eq!(unfillable_slots[0].day, 0);
            assert_eq!(unfillable_slots[0].slot_index, 1);
            assert!(unfillable_slots[0]
                .blocking_constraints
                .contains(&"HC-2".to_string()));
        }
        other => panic!("expected unfillable report, got {:?}", other),
    }
}

#[test]
fn test_cross_day_micronutrient_assembly() {
    // Iron RDI of 10 mg/day; every recipe carries 5 mg, so each full day
    // supplies exactly the requirement.
    let pool: Vec<PlanningRecipe> = (1..=6)
        .map(|n| {
            with_micronutrient(
                create_test_recipe(&format!("r{}", n), 1000.0, 50.0, 32.0, 125.0),
                "iron_mg",
                5.0,
            )
        })
        .collect();
    let mut profile = create_test_profile(3);
    profile
        .micronutrient_targets
        .insert("iron_mg".to_string(), 10.0);

    let result = run_meal_plan_search(&profile, &pool, 3, None, SearchOptions::default()).unwrap();
    assert!(result.success, "expected success, got {:?}", result.report);
    let weekly = result.weekly_tracker.as_ref().unwrap();
    assert_eq!(weekly.days_completed, 3);
    assert!(weekly.weekly_totals.micronutrient("iron_mg") >= 30.0);
}

#[test]
fn test_attempt_limit_returns_best_partial() {
    let pool = vec![
        create_test_recipe("r1", 1000.0, 50.0, 32.0, 125.0),
        create_test_recipe("r2", 1000.0, 50.0, 32.0, 125.0),
    ];
    let profile = create_test_profile(1);
    let options = SearchOptions {
        attempt_limit: 1,
        ..SearchOptions::default()
    };

    let result = run_meal_plan_search(&profile, &pool, 1, None, options).unwrap();
    assert!(!result.success);
    assert_eq!(result.termination_code, TerminationCode::LimitExhausted);
    assert_eq!(result.failure_mode, Some(FailureMode::AttemptLimitReached));
    match result.report.unwrap() {
        FailureReport::AttemptLimit {
            attempts,
            best_plan,
            search_exhaustive,
            ..
        } => {
            assert_eq!(attempts, 1);
            assert!(!search_exhaustive);
            assert_eq!(best_plan.unwrap().assignments.len(), 1);
        }
        other => panic!("expected attempt-limit report, got {:?}", other),
    }
}

#[test]
fn test_sodium_advisory_on_success() {
    // Four salty recipes: the week succeeds but sodium runs past twice the
    // prorated requirement.
    let pool: Vec<PlanningRecipe> = (1..=4)
        .map(|n| {
            with_micronutrient(
                create_test_recipe(&format!("r{}", n), 1000.0, 50.0, 32.0, 125.0),
                "sodium_mg",
                1100.0,
            )
        })
        .collect();
    let mut profile = create_test_profile(2);
    profile
        .micronutrient_targets
        .insert("sodium_mg".to_string(), 500.0);

    let result = run_meal_plan_search(&profile, &pool, 2, None, SearchOptions::default()).unwrap();
    assert!(result.success, "expected success, got {:?}", result.report);
    assert_eq!(result.termination_code, TerminationCode::FullWeekly);
    let warning = result.warning.unwrap();
    assert_eq!(warning.kind, "sodium_advisory");
    assert_eq!(warning.weekly_sodium_mg, 4400.0);
    assert_eq!(warning.recommended_max_mg, 2000.0);
    assert!(warning.ratio > 1.0);
}

#[test]
fn test_single_day_returns_tc4_without_weekly_validation() {
    // An absurd iron requirement would fail any weekly validation, but a
    // one-day plan never runs it.
    let pool = vec![
        create_test_recipe("r1", 1000.0, 50.0, 32.0, 125.0),
        create_test_recipe("r2", 1000.0, 50.0, 32.0, 125.0),
    ];
    let mut profile = create_test_profile(1);
    profile
        .micronutrient_targets
        .insert("iron_mg".to_string(), 500.0);

    let result = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    assert!(result.success);
    assert_eq!(result.termination_code, TerminationCode::SingleDaySuccess);
    assert_eq!(result.plan.unwrap().len(), 2);
}

#[test]
fn test_exact_pool_succeeds_without_backtracking() {
    // Exactly as many recipes as slots, all uniformly on target.
    let pool: Vec<PlanningRecipe> = (1..=4)
        .map(|n| create_test_recipe(&format!("r{}", n), 1000.0, 50.0, 32.0, 125.0))
        .collect();
    let profile = create_test_profile(2);

    let result = run_meal_plan_search(&profile, &pool, 2, None, stats_options()).unwrap();
    assert!(result.success);
    let stats = result.stats.unwrap();
    assert_eq!(stats.backtracks, 0);
    assert_eq!(stats.attempts, 4);
    // One branching entry per decision point
    assert_eq!(stats.branching_factors.len(), 4);
}

#[test]
fn test_search_is_deterministic() {
    let pool: Vec<PlanningRecipe> = (1..=6)
        .map(|n| {
            with_micronutrient(
                create_test_recipe(&format!("r{}", n), 1000.0, 50.0, 32.0, 125.0),
                "iron_mg",
                5.0,
            )
        })
        .collect();
    let mut profile = create_test_profile(3);
    profile
        .micronutrient_targets
        .insert("iron_mg".to_string(), 10.0);

    let first = run_meal_plan_search(&profile, &pool, 3, None, SearchOptions::default()).unwrap();
    let second = run_meal_plan_search(&profile, &pool, 3, None, SearchOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_upper_limits_steer_selection() {
    // Two iron-heavy recipes would breach the 45 mg UL together; the search
    // must route around the second one.
    let pool = vec![
        with_micronutrient(create_test_recipe("r_a", 1000.0, 50.0, 32.0, 125.0), "iron_mg", 30.0),
        with_micronutrient(create_test_recipe("r_b", 1000.0, 50.0, 32.0, 125.0), "iron_mg", 30.0),
        with_micronutrient(create_test_recipe("r_c", 1000.0, 50.0, 32.0, 125.0), "iron_mg", 2.0),
    ];
    let profile = create_test_profile(1);
    let mut limits = nutrition::UpperLimits::default();
    limits.set("iron_mg", Some(45.0));

    let result =
        run_meal_plan_search(&profile, &pool, 1, Some(&limits), SearchOptions::default()).unwrap();
    assert!(result.success, "expected success, got {:?}", result.report);
    let trackers = result.daily_trackers.unwrap();
    let day = &trackers[&0];
    assert!(day.micronutrients_consumed.get("iron_mg") <= 45.0);
}

#[test]
fn test_invalid_horizon_and_schedule_are_data_errors() {
    let pool = vec![create_test_recipe("r1", 1000.0, 50.0, 32.0, 125.0)];
    let profile = create_test_profile(1);

    assert!(run_meal_plan_search(&profile, &pool, 0, None, SearchOptions::default()).is_err());
    assert!(run_meal_plan_search(&profile, &pool, 8, None, SearchOptions::default()).is_err());
    // Schedule shorter than the horizon
    assert!(run_meal_plan_search(&profile, &pool, 2, None, SearchOptions::default()).is_err());

    let mut empty_day = create_test_profile(1);
    empty_day.schedule[0].clear();
    assert!(run_meal_plan_search(&empty_day, &pool, 1, None, SearchOptions::default()).is_err());
}

#[test]
fn test_empty_micronutrients_still_plan() {
    // Recipes with no micronutrient data at all plan fine when nothing is
    // tracked and no UL is supplied.
    let pool = vec![
        create_test_recipe("r1", 1000.0, 50.0, 32.0, 125.0),
        create_test_recipe("r2", 1000.0, 50.0, 32.0, 125.0),
    ];
    let profile = create_test_profile(1);

    let result = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    assert!(result.success);
    let micros: MicronutrientProfile = result.daily_trackers.unwrap()[&0]
        .micronutrients_consumed
        .clone();
    assert_eq!(micros, MicronutrientProfile::default());
}
