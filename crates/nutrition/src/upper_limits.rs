//! Tolerable upper intake limits: reference-data loading by demographic,
//! user-override merging, and daily intake validation.
//!
//! Reference values come from `data/reference/ul_by_demographic.json`
//! (IOM DRI / EFSA guidelines). Nutrient field names in the JSON must match
//! the [`MicronutrientProfile`] schema; JSON `null` means no limit.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NutritionError;
use crate::profile::{MicronutrientProfile, NUTRIENT_NAMES};

pub use crate::profile::UpperLimits;

/// One nutrient whose daily intake exceeds its tolerable upper limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UlViolation {
    /// Field name, e.g. `vitamin_a_ug`.
    pub nutrient: String,
    pub actual: f64,
    pub limit: f64,
    pub excess: f64,
}

#[derive(Debug, Deserialize)]
struct UlReferenceFile {
    #[serde(default)]
    #[allow(dead_code)]
    source: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    note: Option<String>,
    demographics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

/// Loads upper limits from the reference JSON, keyed by demographic
/// (e.g. `adult_male`, `adult_female`).
#[derive(Debug, Clone)]
pub struct UpperLimitsLoader {
    demographics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl UpperLimitsLoader {
    /// Parse reference data from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, NutritionError> {
        let file: UlReferenceFile = serde_json::from_str(text)?;
        Ok(UpperLimitsLoader {
            demographics: file.demographics,
        })
    }

    /// Read and parse reference data from disk.
    pub fn from_path(path: &Path) -> Result<Self, NutritionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Demographic keys present in the reference data.
    pub fn demographics(&self) -> impl Iterator<Item = &str> {
        self.demographics.keys().map(String::as_str)
    }

    /// Upper limits for one demographic. Fields missing from the reference
    /// record default to no limit; field names outside the nutrient schema
    /// are ignored.
    pub fn for_demographic(&self, demographic: &str) -> Result<UpperLimits, NutritionError> {
        let record = self.demographics.get(demographic).ok_or_else(|| {
            NutritionError::UnknownDemographic {
                demographic: demographic.to_string(),
                available: self.demographics.keys().cloned().collect(),
            }
        })?;
        let mut limits = UpperLimits::default();
        for name in NUTRIENT_NAMES {
            if let Some(value) = record.get(*name) {
                limits.set(name, *value);
            }
        }
        Ok(limits)
    }
}

/// Merge reference limits with user overrides.
///
/// Override precedence: a non-null override replaces the reference value
/// (it may raise or lower it); null overrides are ignored; override keys
/// that name no schema field are ignored; everything else keeps the
/// reference value.
pub fn resolve_upper_limits(
    reference: &UpperLimits,
    overrides: &BTreeMap<String, Option<f64>>,
) -> UpperLimits {
    let mut resolved = reference.clone();
    for (name, value) in overrides {
        if let Some(v) = value {
            resolved.set(name, Some(*v));
        }
    }
    resolved
}

/// Validate one day's micronutrient totals against resolved upper limits.
///
/// Intake exactly at a limit passes; only strict excess is a violation.
/// Returns every violation, in schema order.
pub fn validate_daily_upper_limits(
    daily: &MicronutrientProfile,
    limits: &UpperLimits,
) -> Vec<UlViolation> {
    let mut violations = Vec::new();
    for (nutrient, limit) in limits.iter() {
        let Some(limit) = limit else { continue };
        let actual = daily.get(nutrient);
        if actual > limit {
            violations.push(UlViolation {
                nutrient: nutrient.to_string(),
                actual,
                limit,
                excess: actual - limit,
            });
        }
    }
    violations
}
