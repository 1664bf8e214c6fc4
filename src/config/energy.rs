// ABOUTME: Empirical energy-density bands for gating and clamping
// ABOUTME: Keyed by (class, method) with category-level fallback bands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Energy-band configuration.
//!
//! Bands are empirically-derived plausible kcal/100g ranges. They serve two
//! roles: admission gating (is a candidate plausible for this class?) and
//! clamping (the final authority over converted energy). The (class, method)
//! table is consulted first; the category table is the fallback.

use super::error::ConfigError;
use crate::models::{CookMethod, FoodCategory};
use serde::{Deserialize, Serialize};

/// A plausible kcal/100g range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBand {
    /// Lower bound (kcal/100g)
    pub min_kcal: f64,
    /// Upper bound (kcal/100g)
    pub max_kcal: f64,
}

impl EnergyBand {
    /// Construct a band
    #[must_use]
    pub const fn new(min_kcal: f64, max_kcal: f64) -> Self {
        Self { min_kcal, max_kcal }
    }

    /// Whether a value lies inside the band (inclusive)
    #[must_use]
    pub fn contains(&self, kcal: f64) -> bool {
        (self.min_kcal..=self.max_kcal).contains(&kcal)
    }

    /// Clamp a value into the band. Idempotent for in-band values.
    #[must_use]
    pub fn clamp(&self, kcal: f64) -> f64 {
        kcal.clamp(self.min_kcal, self.max_kcal)
    }

    /// Band midpoint, used by the energy-only proxy
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        f64::midpoint(self.min_kcal, self.max_kcal)
    }

    /// Fail-fast validation: min < max, both non-negative
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRange` for inverted or negative bounds.
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        if self.min_kcal < 0.0 || self.max_kcal < 0.0 {
            return Err(ConfigError::InvalidRange(format!(
                "{context}: band bounds must be non-negative"
            )));
        }
        if self.min_kcal >= self.max_kcal {
            return Err(ConfigError::InvalidRange(format!(
                "{context}: min_kcal {} must be < max_kcal {}",
                self.min_kcal, self.max_kcal
            )));
        }
        Ok(())
    }
}

/// One (class, method) band entry. `method: None` applies to any method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBand {
    /// Core class key
    pub class: String,
    /// Method restriction, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<CookMethod>,
    /// The band
    pub band: EnergyBand,
}

/// Full energy-band configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyBandTable {
    /// (class, method) bands, consulted first
    pub class_bands: Vec<ClassBand>,
    /// Category fallback bands
    pub category_bands: Vec<(FoodCategory, EnergyBand)>,
}

impl Default for EnergyBandTable {
    fn default() -> Self {
        let class_band = |class: &str, method: Option<CookMethod>, min: f64, max: f64| ClassBand {
            class: class.to_owned(),
            method,
            band: EnergyBand::new(min, max),
        };
        Self {
            class_bands: vec![
                class_band("rice_white", Some(CookMethod::Boiled), 115.0, 150.0),
                class_band("rice_brown", Some(CookMethod::Boiled), 105.0, 140.0),
                class_band("pasta", Some(CookMethod::Boiled), 130.0, 175.0),
                class_band("quinoa", Some(CookMethod::Boiled), 110.0, 135.0),
                class_band("oats", Some(CookMethod::Boiled), 60.0, 95.0),
                class_band("potato", Some(CookMethod::Boiled), 75.0, 100.0),
                class_band("potato", Some(CookMethod::DeepFried), 260.0, 340.0),
                class_band("chicken_breast", Some(CookMethod::Roasted), 150.0, 185.0),
                class_band("chicken_thigh", Some(CookMethod::Roasted), 200.0, 250.0),
                class_band("beef_steak", Some(CookMethod::Grilled), 200.0, 290.0),
                class_band("beef_ground", Some(CookMethod::PanSeared), 210.0, 290.0),
                class_band("pork_chop", Some(CookMethod::Grilled), 190.0, 260.0),
                class_band("salmon", Some(CookMethod::Baked), 170.0, 230.0),
                class_band("cod", Some(CookMethod::Baked), 90.0, 130.0),
                class_band("shrimp", None, 85.0, 145.0),
                class_band("egg", Some(CookMethod::Boiled), 140.0, 165.0),
                class_band("egg", Some(CookMethod::Fried), 175.0, 210.0),
                class_band("lentil", Some(CookMethod::Boiled), 100.0, 130.0),
                class_band("bean_black", Some(CookMethod::Boiled), 110.0, 145.0),
                class_band("chickpea", Some(CookMethod::Boiled), 130.0, 175.0),
            ],
            category_bands: vec![
                (FoodCategory::Fruit, EnergyBand::new(30.0, 105.0)),
                (FoodCategory::NutsSeeds, EnergyBand::new(450.0, 700.0)),
                (FoodCategory::Vegetable, EnergyBand::new(15.0, 95.0)),
                (FoodCategory::Legume, EnergyBand::new(80.0, 190.0)),
                (FoodCategory::MeatPoultry, EnergyBand::new(110.0, 320.0)),
                (FoodCategory::FishSeafood, EnergyBand::new(70.0, 280.0)),
                (FoodCategory::StarchGrain, EnergyBand::new(70.0, 380.0)),
                (FoodCategory::Egg, EnergyBand::new(140.0, 210.0)),
                (FoodCategory::Dairy, EnergyBand::new(40.0, 420.0)),
                (FoodCategory::Other, EnergyBand::new(20.0, 600.0)),
            ],
        }
    }
}

impl EnergyBandTable {
    /// Resolve the band for a (class, method) pair, falling back to the
    /// class's any-method band, then the category band.
    #[must_use]
    pub fn lookup(&self, class: &str, method: Option<CookMethod>) -> Option<EnergyBand> {
        if let Some(m) = method {
            if let Some(cb) = self.class_bands.iter().find(|cb| {
                cb.class == class && cb.method.is_some_and(|bm| bm.is_compatible_with(m))
            }) {
                return Some(cb.band);
            }
        }
        if let Some(cb) = self
            .class_bands
            .iter()
            .find(|cb| cb.class == class && cb.method.is_none())
        {
            return Some(cb.band);
        }
        self.category_band(FoodCategory::classify(class))
    }

    /// Band for a category
    #[must_use]
    pub fn category_band(&self, category: FoodCategory) -> Option<EnergyBand> {
        self.category_bands
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, b)| *b)
    }

    /// Fail-fast validation of every band
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for any malformed band or a missing category.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for cb in &self.class_bands {
            cb.band
                .validate(&format!("class band {} / {:?}", cb.class, cb.method))?;
        }
        for (category, band) in &self.category_bands {
            band.validate(&format!("category band {category:?}"))?;
        }
        Ok(())
    }
}
