// ABOUTME: Raw-to-cooked conversion factor tables keyed by (class, method)
// ABOUTME: Hydration, shrinkage, fat render, oil uptake, macro retention
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Conversion-factor configuration for the Stage-2 physical kernels.
//!
//! Factors are empirical yield constants in the USDA Agriculture Handbook
//! 102 tradition: grains absorb water (hydration), meats lose it
//! (shrinkage), rendered fat leaves the pan, frying oil is taken up.
//! Every factor is validated against its documented physical range at load
//! time.

use super::error::ConfigError;
use crate::models::CookMethod;
use serde::{Deserialize, Serialize};

/// Kernel parameters for one (class, method) pair. A kernel whose factor is
/// absent is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionFactors {
    /// Cooked mass / raw mass for water-absorbing foods (> 1.0 when set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydration_factor: Option<f64>,
    /// Mass fraction lost to moisture during cooking, in (0, 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrinkage_fraction: Option<f64>,
    /// Fraction of fat rendered off during cooking, in (0, 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_render_fraction: Option<f64>,
    /// Cooking oil absorbed, grams per 100g
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oil_uptake_g: Option<f64>,
    /// Protein retained through cooking, in (0, 1]
    pub protein_retention: f64,
    /// Carbohydrate retained through cooking, in (0, 1]
    pub carb_retention: f64,
    /// Fat retained through cooking (distinct from rendering), in (0, 1]
    pub fat_retention: f64,
}

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            hydration_factor: None,
            shrinkage_fraction: None,
            fat_render_fraction: None,
            oil_uptake_g: None,
            protein_retention: 1.0,
            carb_retention: 1.0,
            fat_retention: 1.0,
        }
    }
}

impl ConversionFactors {
    fn hydrating(factor: f64) -> Self {
        Self {
            hydration_factor: Some(factor),
            ..Self::default()
        }
    }

    fn shrinking(fraction: f64) -> Self {
        Self {
            shrinkage_fraction: Some(fraction),
            ..Self::default()
        }
    }

    const fn with_fat_render(mut self, fraction: f64) -> Self {
        self.fat_render_fraction = Some(fraction);
        self
    }

    const fn with_oil_uptake(mut self, grams: f64) -> Self {
        self.oil_uptake_g = Some(grams);
        self
    }

    const fn with_retention(mut self, protein: f64, carbs: f64, fat: f64) -> Self {
        self.protein_retention = protein;
        self.carb_retention = carbs;
        self.fat_retention = fat;
        self
    }

    /// Validate factors against their documented physical ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValueOutOfRange` for any factor outside its range.
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        if let Some(h) = self.hydration_factor {
            if !(1.0..=4.5).contains(&h) || h <= 1.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "{context}: hydration_factor must be in (1.0, 4.5], got {h}"
                )));
            }
        }
        if let Some(s) = self.shrinkage_fraction {
            if !(0.0..0.6).contains(&s) || s <= 0.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "{context}: shrinkage_fraction must be in (0, 0.6), got {s}"
                )));
            }
        }
        if let Some(r) = self.fat_render_fraction {
            if !(0.0..0.8).contains(&r) || r <= 0.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "{context}: fat_render_fraction must be in (0, 0.8), got {r}"
                )));
            }
        }
        if let Some(o) = self.oil_uptake_g {
            if !(0.0..=30.0).contains(&o) || o <= 0.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "{context}: oil_uptake_g must be in (0, 30], got {o}"
                )));
            }
        }
        for (name, value) in [
            ("protein_retention", self.protein_retention),
            ("carb_retention", self.carb_retention),
            ("fat_retention", self.fat_retention),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "{context}: {name} must be in (0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One conversion rule binding a class and method to its factors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRule {
    /// Core class key the rule applies to
    pub class: String,
    /// Cooking method the rule applies to
    pub method: CookMethod,
    /// Kernel parameters
    pub factors: ConversionFactors,
}

/// Full conversion table with lookup by (class, method-equivalence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTable {
    /// All configured rules
    pub rules: Vec<ConversionRule>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        let rule = |class: &str, method: CookMethod, factors: ConversionFactors| ConversionRule {
            class: class.to_owned(),
            method,
            factors,
        };
        Self {
            rules: vec![
                // Grains and legumes: water absorption dominates
                rule(
                    "rice_white",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.80),
                ),
                rule(
                    "rice_brown",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.60),
                ),
                rule(
                    "pasta",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.25),
                ),
                rule(
                    "quinoa",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.65),
                ),
                rule(
                    "oats",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.50),
                ),
                rule(
                    "lentil",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.40).with_retention(0.95, 1.0, 1.0),
                ),
                rule(
                    "bean_black",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.30).with_retention(0.95, 1.0, 1.0),
                ),
                rule(
                    "chickpea",
                    CookMethod::Boiled,
                    ConversionFactors::hydrating(2.30).with_retention(0.95, 1.0, 1.0),
                ),
                // Poultry: moisture loss, modest rendering on dark meat
                rule(
                    "chicken_breast",
                    CookMethod::Roasted,
                    ConversionFactors::shrinking(0.25),
                ),
                rule(
                    "chicken_breast",
                    CookMethod::Grilled,
                    ConversionFactors::shrinking(0.27),
                ),
                rule(
                    "chicken_thigh",
                    CookMethod::Roasted,
                    ConversionFactors::shrinking(0.28).with_fat_render(0.15),
                ),
                rule(
                    "turkey_breast",
                    CookMethod::Roasted,
                    ConversionFactors::shrinking(0.26),
                ),
                // Red meat
                rule(
                    "beef_steak",
                    CookMethod::Grilled,
                    ConversionFactors::shrinking(0.29).with_fat_render(0.20),
                ),
                rule(
                    "beef_ground",
                    CookMethod::PanSeared,
                    ConversionFactors::shrinking(0.25).with_fat_render(0.25),
                ),
                rule(
                    "pork_chop",
                    CookMethod::Grilled,
                    ConversionFactors::shrinking(0.28).with_fat_render(0.18),
                ),
                rule(
                    "lamb_chop",
                    CookMethod::Grilled,
                    ConversionFactors::shrinking(0.28).with_fat_render(0.22),
                ),
                // Fish: gentler moisture loss
                rule(
                    "salmon",
                    CookMethod::Baked,
                    ConversionFactors::shrinking(0.18),
                ),
                rule(
                    "cod",
                    CookMethod::Baked,
                    ConversionFactors::shrinking(0.20),
                ),
                rule(
                    "shrimp",
                    CookMethod::Boiled,
                    ConversionFactors::shrinking(0.22),
                ),
                // Oil-uptake preparations
                rule(
                    "egg",
                    CookMethod::Fried,
                    ConversionFactors::default().with_oil_uptake(4.0),
                ),
                rule(
                    "potato",
                    CookMethod::DeepFried,
                    ConversionFactors::shrinking(0.30).with_oil_uptake(10.0),
                ),
                rule(
                    "vegetable_mixed",
                    CookMethod::Sauteed,
                    ConversionFactors::default()
                        .with_oil_uptake(5.0)
                        .with_retention(1.0, 0.95, 1.0),
                ),
                rule(
                    "broccoli",
                    CookMethod::Boiled,
                    ConversionFactors::default().with_retention(0.95, 0.90, 1.0),
                ),
            ],
        }
    }
}

impl ConversionTable {
    /// Find factors for a (class, method) pair. Method matching honors the
    /// compatibility equivalence so a "baked" prediction finds a "roasted"
    /// rule.
    #[must_use]
    pub fn lookup(&self, class: &str, method: CookMethod) -> Option<&ConversionFactors> {
        // Exact method match wins over group-compatible match
        self.rules
            .iter()
            .find(|r| r.class == class && r.method == method)
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|r| r.class == class && r.method.is_compatible_with(method))
            })
            .map(|r| &r.factors)
    }

    /// Default method to convert toward when the detector gave none:
    /// the first configured rule for the class
    #[must_use]
    pub fn default_method_for(&self, class: &str) -> Option<CookMethod> {
        self.rules.iter().find(|r| r.class == class).map(|r| r.method)
    }

    /// Fail-fast validation of every rule
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for out-of-range factors or duplicate
    /// (class, method) keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for r in &self.rules {
            let context = format!("{} / {:?}", r.class, r.method);
            if !seen.insert((r.class.clone(), r.method)) {
                return Err(ConfigError::Duplicate(context));
            }
            r.factors.validate(&context)?;
        }
        Ok(())
    }
}
