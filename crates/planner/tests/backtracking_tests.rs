use std::collections::BTreeMap;

use nutrition::{Ingredient, NutritionProfile};
use planner::{
    compute_variant_nutrition, run_meal_plan_search, DailyTracker, MealSlot, PlanningRecipe,
    PlanningUserProfile, ScalableCarbSources, SearchOptions, TerminationCode, WeeklyTracker,
};

fn recipe_with_cooking_time(id: &str, cooking_time: u32) -> PlanningRecipe {
    PlanningRecipe {
        id: id.to_string(),
        name: format!("Recipe {}", id),
        ingredients: vec![Ingredient::new("rice", 100.0, "g")],
        cooking_time_minutes: cooking_time,
        nutrition: NutritionProfile::new(1000.0, 50.0, 20.0, 125.0),
        primary_carb_contribution: None,
        primary_carb_source: None,
    }
}

fn three_slot_profile() -> PlanningUserProfile {
    PlanningUserProfile {
        daily_calories: 3000,
        daily_protein_g: 150.0,
        daily_fat_g: (50.0, 70.0),
        daily_carbs_g: 375.0,
        max_daily_calories: None,
        schedule: vec![vec![
            MealSlot::new("08:00", 3, "breakfast"),
            MealSlot::new("13:00", 3, "lunch"),
            // Busyness 1: only a 5-minute recipe fits here
            MealSlot::new("19:00", 1, "dinner"),
        ]],
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

/// The quick recipe scores best everywhere, but it is the only recipe that
/// can fill the busy last slot. Greedy placement therefore dead-ends twice
/// and the search has to back out of both choices before the day closes.
#[test]
fn test_search_backtracks_out_of_greedy_dead_ends() {
    let pool = vec![
        recipe_with_cooking_time("r_quick", 5),
        recipe_with_cooking_time("r_slow_a", 10),
        recipe_with_cooking_time("r_slow_b", 10),
    ];
    let profile = three_slot_profile();
    let options = SearchOptions {
        collect_stats: true,
        ..SearchOptions::default()
    };

    let result = run_meal_plan_search(&profile, &pool, 1, None, options).unwrap();
    assert!(result.success, "expected success, got {:?}", result.report);
    assert_eq!(result.termination_code, TerminationCode::SingleDaySuccess);

    let plan = result.plan.unwrap();
    let ids: Vec<&str> = plan.iter().map(|a| a.recipe_id.as_str()).collect();
    // The quick recipe must end up in the busy slot, the slow ones earlier
    assert_eq!(ids, vec!["r_slow_a", "r_slow_b", "r_quick"]);

    let stats = result.stats.unwrap();
    assert_eq!(stats.backtracks, 2);
    // r_quick, then r_slow_a; r_quick again at the second slot; r_slow_b;
    // r_quick where it belongs
    assert_eq!(stats.attempts, 5);
    assert!(stats.max_backtrack_depth >= 1);
}

#[test]
fn test_backtracking_search_is_reproducible() {
    let pool = vec![
        recipe_with_cooking_time("r_quick", 5),
        recipe_with_cooking_time("r_slow_a", 10),
        recipe_with_cooking_time("r_slow_b", 10),
    ];
    let profile = three_slot_profile();

    let first = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    let second = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    assert_eq!(first, second);
}

/// State after a backtrack must equal the state before the failed descent.
/// The day totals of the final plan are the arithmetic proof: they must be
/// exactly the sum of the three surviving recipes, with nothing left over
/// from the two unwound placements.
#[test]
fn test_unwound_assignments_leave_no_residue() {
    let pool = vec![
        recipe_with_cooking_time("r_quick", 5),
        recipe_with_cooking_time("r_slow_a", 10),
        recipe_with_cooking_time("r_slow_b", 10),
    ];
    let profile = three_slot_profile();

    let result = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    let trackers = result.daily_trackers.unwrap();
    let day = &trackers[&0];
    assert_eq!(day.calories_consumed, 3000.0);
    assert_eq!(day.protein_consumed, 150.0);
    assert_eq!(day.fat_consumed, 60.0);
    assert_eq!(day.carbs_consumed, 375.0);
    assert_eq!(day.slots_assigned, 3);
    assert_eq!(day.used_recipe_ids.len(), 3);

    let weekly = result.weekly_tracker.unwrap();
    assert_eq!(weekly.weekly_totals.calories, 3000.0);
    assert_eq!(weekly.days_completed, 1);
}

fn downscaling_profile() -> PlanningUserProfile {
    PlanningUserProfile {
        daily_calories: 2000,
        daily_protein_g: 100.0,
        daily_fat_g: (50.0, 80.0),
        daily_carbs_g: 250.0,
        max_daily_calories: Some(2100),
        schedule: vec![vec![
            MealSlot::new("08:00", 3, "breakfast"),
            MealSlot::new("18:00", 3, "dinner"),
        ]],
        excluded_ingredients: Default::default(),
        liked_foods: Default::default(),
        demographic: "adult_male".to_string(),
        upper_limits_overrides: BTreeMap::new(),
        pinned_assignments: Vec::new(),
        micronutrient_targets: BTreeMap::new(),
        activity_schedule: None,
        enable_primary_carb_downscaling: true,
        max_scaling_steps: 4,
        scaling_step_fraction: 0.10,
    }
}

#[test]
fn test_downscaled_variant_rescues_calorie_excess() {
    let light = PlanningRecipe {
        id: "r_light".to_string(),
        name: "Light Bowl".to_string(),
        ingredients: vec![Ingredient::new("oats", 100.0, "g")],
        cooking_time_minutes: 10,
        nutrition: NutritionProfile::new(1000.0, 50.0, 32.0, 125.0),
        primary_carb_contribution: None,
        primary_carb_source: None,
    };
    let heavy = PlanningRecipe {
        id: "r_rice_heavy".to_string(),
        name: "Big Rice Plate".to_string(),
        ingredients: vec![
            Ingredient::new("white rice", 250.0, "g"),
            Ingredient::new("chicken", 150.0, "g"),
        ],
        cooking_time_minutes: 20,
        nutrition: NutritionProfile::new(1300.0, 50.0, 32.0, 185.0),
        primary_carb_contribution: Some(NutritionProfile::new(700.0, 0.0, 0.0, 175.0)),
        primary_carb_source: Some("white rice".to_string()),
    };
    let pool = vec![light, heavy];
    let profile = downscaling_profile();
    let options = SearchOptions {
        scalable_sources: Some(ScalableCarbSources {
            rice_variants: vec!["white rice".to_string()],
            potato_variants: vec![],
        }),
        ..SearchOptions::default()
    };

    let result = run_meal_plan_search(&profile, &pool, 1, None, options).unwrap();
    assert!(result.success, "expected success, got {:?}", result.report);

    let plan = result.plan.unwrap();
    assert_eq!(plan.len(), 2);
    let variant = plan.iter().find(|a| a.recipe_id == "r_rice_heavy").unwrap();
    assert!(variant.variant_index > 0, "expected a downscaled variant");

    // Tracker totals reflect the variant's substituted nutrition
    let trackers = result.daily_trackers.unwrap();
    let day = &trackers[&0];
    let ceiling = 2100.0;
    assert!(day.calories_consumed <= ceiling);
    assert!((day.calories_consumed - 2000.0).abs() <= 200.0);

    // Serialized assignments carry the variant index
    let json = serde_json::to_value(&plan).unwrap();
    let serialized_variant = json
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["recipe_id"] == "r_rice_heavy")
        .unwrap();
    assert!(serialized_variant["variant_index"].as_u64().unwrap() > 0);
}

#[test]
fn test_downscaling_disabled_without_sources() {
    // Same setup but no reference data: the heavy recipe stays rejected and
    // the day cannot be completed.
    let heavy = PlanningRecipe {
        id: "r_rice_heavy".to_string(),
        name: "Big Rice Plate".to_string(),
        ingredients: vec![Ingredient::new("white rice", 250.0, "g")],
        cooking_time_minutes: 20,
        nutrition: NutritionProfile::new(1300.0, 50.0, 32.0, 185.0),
        primary_carb_contribution: Some(NutritionProfile::new(700.0, 0.0, 0.0, 175.0)),
        primary_carb_source: Some("white rice".to_string()),
    };
    let light = PlanningRecipe {
        id: "r_light".to_string(),
        name: "Light Bowl".to_string(),
        ingredients: vec![Ingredient::new("oats", 100.0, "g")],
        cooking_time_minutes: 10,
        nutrition: NutritionProfile::new(1000.0, 50.0, 32.0, 125.0),
        primary_carb_contribution: None,
        primary_carb_source: None,
    };
    let pool = vec![heavy, light];
    let profile = downscaling_profile();

    let result = run_meal_plan_search(&profile, &pool, 1, None, SearchOptions::default()).unwrap();
    assert!(!result.success);
}

/// Applying and removing an assignment, including a scaled variant and a
/// completed-day fold, restores the exact prior state.
#[test]
fn test_apply_remove_roundtrip_with_variant_and_weekly_fold() {
    let recipe = PlanningRecipe {
        id: "r_rice".to_string(),
        name: "Rice Plate".to_string(),
        ingredients: vec![Ingredient::new("white rice", 200.0, "g")],
        cooking_time_minutes: 15,
        nutrition: NutritionProfile::new(900.0, 40.0, 25.0, 120.0).with_micronutrients({
            let mut m = nutrition::MicronutrientProfile::default();
            m.set("iron_mg", 4.0);
            m.set("sodium_mg", 600.0);
            m
        }),
        primary_carb_contribution: Some(
            NutritionProfile::new(400.0, 4.0, 1.0, 90.0).with_micronutrients({
                let mut m = nutrition::MicronutrientProfile::default();
                m.set("iron_mg", 1.0);
                m
            }),
        ),
        primary_carb_source: Some("white rice".to_string()),
    };
    let profile = downscaling_profile();
    let variant_nutrition = compute_variant_nutrition(&recipe, 2, &profile).unwrap();

    let tracked: BTreeMap<String, f64> = [("iron_mg".to_string(), 10.0)].into_iter().collect();
    let tracker_before = DailyTracker::new(1);
    let weekly_before = WeeklyTracker::new(2, &tracked);

    let mut tracker = tracker_before.clone();
    let mut weekly = weekly_before.clone();

    // Apply the variant; the day completes; fold it into the week
    tracker.add_assignment(&variant_nutrition, &recipe.id, false);
    assert!(tracker.is_complete());
    weekly.complete_day(&tracker.day_totals(), 2, &tracked);
    assert_eq!(weekly.days_completed, 1);
    assert!(weekly.carryover_needs["iron_mg"] > 0.0);

    // Reverse in the same order the search unwinds: un-complete, then remove
    weekly.uncomplete_day(&tracker.day_totals(), 2, &tracked);
    let recomputed = compute_variant_nutrition(&recipe, 2, &profile).unwrap();
    tracker.remove_assignment(&recomputed, &recipe.id, false);

    assert_eq!(tracker, tracker_before);
    assert_eq!(weekly, weekly_before);
}
