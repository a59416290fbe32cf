use thiserror::Error;

#[derive(Error, Debug)]
pub enum NutritionError {
    #[error("UL reference file not found or unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed UL reference data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Demographic '{demographic}' not found in UL reference (available: {available:?})")]
    UnknownDemographic {
        demographic: String,
        available: Vec<String>,
    },
}
