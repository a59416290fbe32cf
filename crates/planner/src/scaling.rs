//! Primary-carb downscaling: when a recipe is rejected only for calorie
//! excess, generate variants with its primary carbohydrate source scaled
//! down in steps. Variants reuse the base recipe's id and participate in
//! candidate generation like any other recipe.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use nutrition::NutritionProfile;

use crate::error::PlanningError;
use crate::model::{PlanningRecipe, PlanningUserProfile};

/// Carb sources eligible for downscaling, loaded from
/// `data/reference/scalable_carb_sources.json`. Matching is case-folded and
/// trimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalableCarbSources {
    #[serde(default)]
    pub rice_variants: Vec<String>,
    #[serde(default)]
    pub potato_variants: Vec<String>,
}

impl ScalableCarbSources {
    pub fn from_json(text: &str) -> Result<Self, PlanningError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, PlanningError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn normalized(&self) -> BTreeSet<String> {
        self.rice_variants
            .iter()
            .chain(self.potato_variants.iter())
            .map(|s| s.trim().to_lowercase())
            .collect()
    }

    /// Whether a primary-carb source name is in the scalable set.
    pub fn contains(&self, source: &str) -> bool {
        self.normalized().contains(&source.trim().to_lowercase())
    }
}

/// A recipe is scalable when it declares both a primary-carb contribution
/// and a source name in the scalable set.
pub fn is_recipe_scalable(recipe: &PlanningRecipe, sources: &ScalableCarbSources) -> bool {
    if recipe.primary_carb_contribution.is_none() {
        return false;
    }
    match &recipe.primary_carb_source {
        Some(source) if !source.trim().is_empty() => sources.contains(source),
        _ => false,
    }
}

/// Step fraction actually used: the profile's fraction clamped to [0, 1],
/// then capped so that `max_scaling_steps * fraction < 1`.
pub fn effective_step_fraction(profile: &PlanningUserProfile) -> f64 {
    let steps = profile.max_scaling_steps.max(1) as f64;
    let fraction = profile.scaling_step_fraction.clamp(0.0, 1.0);
    if steps * fraction >= 1.0 {
        0.99 / steps
    } else {
        fraction
    }
}

/// Nutrition for scaling step `step_index` (1-based):
/// `base - contribution + contribution * (1 - step * fraction)`.
///
/// A contribution that would drive any macro or micronutrient negative is a
/// data error, not a search outcome.
pub fn compute_variant_nutrition(
    recipe: &PlanningRecipe,
    step_index: u32,
    profile: &PlanningUserProfile,
) -> Result<NutritionProfile, PlanningError> {
    if step_index == 0 {
        return Ok(recipe.nutrition.clone());
    }
    let Some(contribution) = &recipe.primary_carb_contribution else {
        return Ok(recipe.nutrition.clone());
    };

    let fraction = effective_step_fraction(profile);
    let mut scale = 1.0 - step_index as f64 * fraction;
    if scale <= 0.0 {
        scale = 1e-9;
    }
    let scaled = contribution.scale(scale);
    let variant = recipe.nutrition.subtract(contribution).add(&scaled);

    let invalid = |nutrient: &str| PlanningError::InvalidCarbContribution {
        recipe_id: recipe.id.clone(),
        nutrient: nutrient.to_string(),
    };
    if variant.calories < 0.0 {
        return Err(invalid("calories"));
    }
    if variant.protein_g < 0.0 {
        return Err(invalid("protein_g"));
    }
    if variant.fat_g < 0.0 {
        return Err(invalid("fat_g"));
    }
    if variant.carbs_g < 0.0 {
        return Err(invalid("carbs_g"));
    }
    if let Some(micros) = &variant.micronutrients {
        for (nutrient, amount) in micros.iter() {
            if amount < 0.0 {
                return Err(invalid(nutrient));
            }
        }
    }
    Ok(variant)
}

/// Nutrition as assigned: the base recipe's for variant 0, otherwise the
/// scaled variant's. Deterministic in its inputs, so unwinding an assignment
/// recomputes exactly the nutrition that was applied.
pub fn effective_nutrition(
    recipe: &PlanningRecipe,
    variant_index: u32,
    profile: &PlanningUserProfile,
) -> Result<NutritionProfile, PlanningError> {
    if variant_index == 0 {
        Ok(recipe.nutrition.clone())
    } else {
        compute_variant_nutrition(recipe, variant_index, profile)
    }
}
