//! Meal plan search engine: assigns recipes from a pool to a schedule of
//! meal slots so that every hard constraint holds, every day lands within
//! tolerance of its macro targets, and the week accumulates its
//! micronutrient requirements without exceeding tolerable upper limits.
//!
//! The search is a pure function of its inputs (no randomness, no clock
//! dependence in any decision), so identical inputs always produce the
//! identical plan, attempt count and backtrack sequence.
//!
//! Layering, leaves first: slot attributes, the data model, hard-constraint
//! predicates, forward-feasibility pruning, scoring, ordering, candidate
//! generation, and the orchestrator that composes them. Primary-carb
//! downscaling and reporting plug into the orchestrator.

pub mod candidates;
pub mod constraints;
pub mod error;
pub mod feasibility;
pub mod model;
pub mod ordering;
pub mod report;
pub mod scaling;
pub mod scoring;
pub mod search;
pub mod slots;
pub mod state;

pub use candidates::{generate_candidates, Candidate, CandidateSet};
pub use constraints::{CandidateView, HcViolation};
pub use error::PlanningError;
pub use feasibility::{
    precompute_macro_bounds, precompute_max_daily_achievable, MacroBounds, MaxDailyAchievable,
    DAILY_TOLERANCE,
};
pub use model::{
    ActivitySchedule, Assignment, DailyTracker, MealSlot, PinnedAssignment, PlanningRecipe,
    PlanningUserProfile, WeeklyTracker,
};
pub use report::{
    FailureMode, FailureReport, MealPlanResult, PlanSnapshot, SearchStatsSummary, SodiumAdvisory,
    TerminationCode,
};
pub use scaling::{compute_variant_nutrition, ScalableCarbSources};
pub use search::{run_meal_plan_search, SearchOptions, DEFAULT_ATTEMPT_LIMIT};
pub use slots::{ActivityContext, Satiety};
pub use state::{
    adjusted_daily_target, build_initial_state, per_meal_target, validate_pinned_assignments,
    PerMealTarget, PinnedConflict,
};
