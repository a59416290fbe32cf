use thiserror::Error;

/// Data-validation errors surfaced before or during search setup.
///
/// Search failures (unfillable slots, infeasible days, attempt limits) are
/// *not* errors: they come back as a normal [`crate::report::MealPlanResult`]
/// with `success = false`.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Planning horizon must be between 1 and 7 days; got {0}")]
    InvalidHorizon(usize),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error(
        "Invalid primary_carb_contribution for recipe {recipe_id}: \
         {nutrient} would become negative after scaling"
    )]
    InvalidCarbContribution {
        recipe_id: String,
        nutrient: String,
    },

    #[error("Reference data unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed reference data: {0}")]
    Json(#[from] serde_json::Error),
}
