use serde::{Deserialize, Serialize};

/// Defines the micronutrient schema once and derives both the amount profile
/// (`f64` per field) and the upper-limit table (`Option<f64>` per field), so
/// the two can never drift apart. Field iteration goes through the generated
/// `NUTRIENT_NAMES` list rather than any runtime reflection.
macro_rules! nutrient_schema {
    ($($field:ident),+ $(,)?) => {
        /// Micronutrient amounts over a fixed schema. All values default to
        /// zero, allowing partial specification.
        ///
        /// Units follow the field-name suffix: `_ug` micrograms, `_mg`
        /// milligrams, `_g` grams, `_iu` international units.
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct MicronutrientProfile {
            $(
                #[serde(default)]
                pub $field: f64,
            )+
        }

        /// Daily tolerable upper intake limits. Field names match
        /// [`MicronutrientProfile`] exactly; `None` means no limit is
        /// established and validation is skipped for that nutrient.
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct UpperLimits {
            $(
                #[serde(default)]
                pub $field: Option<f64>,
            )+
        }

        /// Every nutrient field name, in schema order.
        pub const NUTRIENT_NAMES: &[&str] = &[$(stringify!($field)),+];

        impl MicronutrientProfile {
            /// Amount for a nutrient by field name. Unknown names read as zero.
            pub fn get(&self, nutrient: &str) -> f64 {
                match nutrient {
                    $(stringify!($field) => self.$field,)+
                    _ => 0.0,
                }
            }

            /// Set the amount for a nutrient by field name. Unknown names are
            /// ignored.
            pub fn set(&mut self, nutrient: &str, amount: f64) {
                match nutrient {
                    $(stringify!($field) => self.$field = amount,)+
                    _ => {}
                }
            }

            /// Iterate `(field_name, amount)` pairs in schema order.
            pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
                [$((stringify!($field), self.$field)),+].into_iter()
            }

            /// Pointwise sum.
            pub fn add(&self, other: &MicronutrientProfile) -> MicronutrientProfile {
                MicronutrientProfile {
                    $($field: self.$field + other.$field,)+
                }
            }

            /// Pointwise difference.
            pub fn subtract(&self, other: &MicronutrientProfile) -> MicronutrientProfile {
                MicronutrientProfile {
                    $($field: self.$field - other.$field,)+
                }
            }

            /// Every field multiplied by `factor`.
            pub fn scale(&self, factor: f64) -> MicronutrientProfile {
                MicronutrientProfile {
                    $($field: self.$field * factor,)+
                }
            }
        }

        impl UpperLimits {
            /// Limit for a nutrient by field name. Unknown names have no limit.
            pub fn get(&self, nutrient: &str) -> Option<f64> {
                match nutrient {
                    $(stringify!($field) => self.$field,)+
                    _ => None,
                }
            }

            /// Set the limit for a nutrient by field name. Unknown names are
            /// ignored.
            pub fn set(&mut self, nutrient: &str, limit: Option<f64>) {
                match nutrient {
                    $(stringify!($field) => self.$field = limit,)+
                    _ => {}
                }
            }

            /// Iterate `(field_name, limit)` pairs in schema order.
            pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> {
                [$((stringify!($field), self.$field)),+].into_iter()
            }
        }
    };
}

nutrient_schema!(
    // Vitamins
    vitamin_a_ug,
    vitamin_c_mg,
    vitamin_d_iu,
    vitamin_e_mg,
    vitamin_k_ug,
    b1_thiamine_mg,
    b2_riboflavin_mg,
    b3_niacin_mg,
    b5_pantothenic_acid_mg,
    b6_pyridoxine_mg,
    b12_cobalamin_ug,
    folate_ug,
    // Minerals
    calcium_mg,
    copper_mg,
    iron_mg,
    magnesium_mg,
    manganese_mg,
    phosphorus_mg,
    potassium_mg,
    selenium_ug,
    sodium_mg,
    zinc_mg,
    // Other
    fiber_g,
    omega_3_g,
    omega_6_g,
);

/// Nutrition information for one recipe or one accumulated total: the four
/// macros plus optional micronutrients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micronutrients: Option<MicronutrientProfile>,
}

impl NutritionProfile {
    pub fn new(calories: f64, protein_g: f64, fat_g: f64, carbs_g: f64) -> Self {
        NutritionProfile {
            calories,
            protein_g,
            fat_g,
            carbs_g,
            micronutrients: None,
        }
    }

    pub fn zero() -> Self {
        NutritionProfile::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn with_micronutrients(mut self, micronutrients: MicronutrientProfile) -> Self {
        self.micronutrients = Some(micronutrients);
        self
    }

    /// Amount of one micronutrient, reading absent micronutrients as zero.
    pub fn micronutrient(&self, nutrient: &str) -> f64 {
        self.micronutrients
            .as_ref()
            .map(|m| m.get(nutrient))
            .unwrap_or(0.0)
    }

    /// Pointwise sum over macros and micronutrients. The result carries
    /// micronutrients when either operand does.
    pub fn add(&self, other: &NutritionProfile) -> NutritionProfile {
        NutritionProfile {
            calories: self.calories + other.calories,
            protein_g: self.protein_g + other.protein_g,
            fat_g: self.fat_g + other.fat_g,
            carbs_g: self.carbs_g + other.carbs_g,
            micronutrients: merge_micros(&self.micronutrients, &other.micronutrients, false),
        }
    }

    /// Every macro and micronutrient multiplied by `factor`.
    pub fn scale(&self, factor: f64) -> NutritionProfile {
        NutritionProfile {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            fat_g: self.fat_g * factor,
            carbs_g: self.carbs_g * factor,
            micronutrients: self.micronutrients.as_ref().map(|m| m.scale(factor)),
        }
    }

    /// Pointwise difference over macros and micronutrients.
    pub fn subtract(&self, other: &NutritionProfile) -> NutritionProfile {
        NutritionProfile {
            calories: self.calories - other.calories,
            protein_g: self.protein_g - other.protein_g,
            fat_g: self.fat_g - other.fat_g,
            carbs_g: self.carbs_g - other.carbs_g,
            micronutrients: merge_micros(&self.micronutrients, &other.micronutrients, true),
        }
    }
}

fn merge_micros(
    a: &Option<MicronutrientProfile>,
    b: &Option<MicronutrientProfile>,
    subtract: bool,
) -> Option<MicronutrientProfile> {
    match (a, b) {
        (None, None) => None,
        (a, b) => {
            let left = a.clone().unwrap_or_default();
            let right = b.clone().unwrap_or_default();
            Some(if subtract {
                left.subtract(&right)
            } else {
                left.add(&right)
            })
        }
    }
}

/// An ingredient as it appears in a recipe. Names are expected to arrive
/// normalized from ingestion; the planner matches them case-folded and
/// trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// "To taste" ingredients carry no measurable quantity and are excluded
    /// from nutrition computation upstream.
    #[serde(default)]
    pub is_to_taste: bool,
}

impl Ingredient {
    pub fn new(name: &str, quantity: f64, unit: &str) -> Self {
        Ingredient {
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            is_to_taste: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrient_schema_has_25_fields() {
        assert_eq!(NUTRIENT_NAMES.len(), 25);
        assert_eq!(NUTRIENT_NAMES[0], "vitamin_a_ug");
        assert_eq!(NUTRIENT_NAMES[NUTRIENT_NAMES.len() - 1], "omega_6_g");
    }

    #[test]
    fn test_get_set_by_name() {
        let mut micros = MicronutrientProfile::default();
        assert_eq!(micros.get("iron_mg"), 0.0);
        micros.set("iron_mg", 8.5);
        assert_eq!(micros.get("iron_mg"), 8.5);
        // Unknown names are inert
        micros.set("unobtainium_mg", 1.0);
        assert_eq!(micros.get("unobtainium_mg"), 0.0);
    }

    #[test]
    fn test_micros_add_subtract_roundtrip() {
        let mut a = MicronutrientProfile::default();
        a.set("iron_mg", 5.0);
        a.set("sodium_mg", 300.0);
        let mut b = MicronutrientProfile::default();
        b.set("iron_mg", 2.5);
        b.set("fiber_g", 4.0);

        let sum = a.add(&b);
        assert_eq!(sum.iron_mg, 7.5);
        assert_eq!(sum.sodium_mg, 300.0);
        assert_eq!(sum.fiber_g, 4.0);
        assert_eq!(sum.subtract(&b), a);
    }

    #[test]
    fn test_nutrition_profile_add_merges_optional_micros() {
        let plain = NutritionProfile::new(500.0, 30.0, 15.0, 60.0);
        let mut micros = MicronutrientProfile::default();
        micros.set("vitamin_c_mg", 40.0);
        let enriched = NutritionProfile::new(250.0, 10.0, 5.0, 35.0).with_micronutrients(micros);

        let sum = plain.add(&enriched);
        assert_eq!(sum.calories, 750.0);
        assert_eq!(sum.micronutrient("vitamin_c_mg"), 40.0);

        let back = sum.subtract(&enriched);
        assert_eq!(back.calories, 500.0);
        assert_eq!(back.micronutrient("vitamin_c_mg"), 0.0);
    }

    #[test]
    fn test_nutrition_profile_add_without_micros_stays_bare() {
        let a = NutritionProfile::new(100.0, 5.0, 2.0, 10.0);
        let b = NutritionProfile::new(50.0, 2.0, 1.0, 5.0);
        assert!(a.add(&b).micronutrients.is_none());
    }
}
