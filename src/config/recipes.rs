// ABOUTME: Recipe decomposition templates and single-item proxy whitelist
// ABOUTME: Trigger substrings, weighted components, ratio-sum validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Decomposition configuration for Stage 5.
//!
//! A `RecipeTemplate` splits a composite prediction ("chicken burrito") into
//! weighted components that re-enter the resolver independently. Component
//! ratios must sum to 1 within 1e-6 and keys must be unique, both enforced
//! at load time. The proxy whitelist maps selected composite classes
//! directly to a pre-vetted per-100g formula.

use super::energy::EnergyBand;
use super::error::ConfigError;
use crate::models::MacroProfile;
use serde::{Deserialize, Serialize};

/// Tolerance on the component ratio sum
pub const RATIO_SUM_TOLERANCE: f64 = 1e-6;

/// One weighted sub-item of a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeComponent {
    /// Component key, resolved as its own query
    pub key: String,
    /// Mass fraction of the parent item, in (0, 1]
    pub ratio: f64,
    /// Search keys tried before the component key itself
    #[serde(default)]
    pub preferred_keys: Vec<String>,
    /// Pin resolution to a specific reference record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_id: Option<u64>,
    /// Candidate-name substrings that disqualify a match for this component
    #[serde(default)]
    pub reject_patterns: Vec<String>,
    /// Plausibility bound on the resolved component's energy density
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_bounds: Option<EnergyBand>,
}

/// Named decomposition pattern matched by substring trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeTemplate {
    /// Template name (telemetry and reports)
    pub name: String,
    /// Substrings of the normalized input name that select this template
    pub triggers: Vec<String>,
    /// Ordered components; ratios sum to 1
    pub components: Vec<RecipeComponent>,
}

impl RecipeTemplate {
    /// Fail-fast validation: ratio sum, ratio ranges, unique keys
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the ratio sum is off by more than 1e-6,
    /// a ratio is outside (0, 1], or a component key repeats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.triggers.is_empty() {
            return Err(ConfigError::MissingField("template triggers"));
        }
        if self.components.is_empty() {
            return Err(ConfigError::MissingField("template components"));
        }
        let mut sum = 0.0;
        let mut seen = std::collections::HashSet::new();
        for c in &self.components {
            if c.ratio <= 0.0 || c.ratio > 1.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "template {}: component {} ratio must be in (0, 1], got {}",
                    self.name, c.key, c.ratio
                )));
            }
            if !seen.insert(c.key.as_str()) {
                return Err(ConfigError::Duplicate(format!(
                    "template {}: component key {}",
                    self.name, c.key
                )));
            }
            if let Some(bounds) = &c.energy_bounds {
                bounds.validate(&format!("template {} component {}", self.name, c.key))?;
            }
            sum += c.ratio;
        }
        if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights(format!(
                "template {}: component ratios must sum to 1.0, got {sum}",
                self.name
            )));
        }
        Ok(())
    }
}

/// Pre-vetted formula for a whitelisted single-item proxy class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFormula {
    /// Composite class the formula covers
    pub class: String,
    /// Substring triggers selecting the formula
    pub triggers: Vec<String>,
    /// Vetted per-100g profile
    pub per_100g: MacroProfile,
}

/// Full decomposition catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCatalog {
    /// Decomposition templates
    pub templates: Vec<RecipeTemplate>,
    /// Single-item proxy formulas
    pub proxies: Vec<ProxyFormula>,
    /// Classes cleared for proxy use. A configured formula outside this
    /// list is a flagged violation at resolution time, never a silent
    /// acceptance.
    pub proxy_whitelist: Vec<String>,
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        let component = |key: &str, ratio: f64| RecipeComponent {
            key: key.to_owned(),
            ratio,
            preferred_keys: Vec::new(),
            pinned_id: None,
            reject_patterns: Vec::new(),
            energy_bounds: None,
        };
        Self {
            templates: vec![
                RecipeTemplate {
                    name: "burrito".to_owned(),
                    triggers: vec!["burrito".to_owned()],
                    components: vec![
                        RecipeComponent {
                            key: "tortilla".to_owned(),
                            ratio: 0.30,
                            preferred_keys: vec!["tortilla flour".to_owned()],
                            pinned_id: None,
                            reject_patterns: vec!["chips".to_owned()],
                            energy_bounds: Some(EnergyBand::new(250.0, 340.0)),
                        },
                        component("rice_white cooked", 0.25),
                        RecipeComponent {
                            key: "bean_black cooked".to_owned(),
                            ratio: 0.20,
                            preferred_keys: Vec::new(),
                            pinned_id: None,
                            reject_patterns: vec!["soup".to_owned()],
                            energy_bounds: None,
                        },
                        component("chicken_breast roasted", 0.15),
                        component("cheese cheddar", 0.10),
                    ],
                },
                RecipeTemplate {
                    name: "chicken_caesar_salad".to_owned(),
                    triggers: vec!["caesar salad".to_owned(), "caesar_salad".to_owned()],
                    components: vec![
                        component("lettuce romaine", 0.55),
                        component("chicken_breast grilled", 0.25),
                        RecipeComponent {
                            key: "caesar dressing".to_owned(),
                            ratio: 0.12,
                            preferred_keys: Vec::new(),
                            pinned_id: None,
                            reject_patterns: vec!["fat free".to_owned()],
                            energy_bounds: Some(EnergyBand::new(300.0, 560.0)),
                        },
                        component("crouton", 0.08),
                    ],
                },
                RecipeTemplate {
                    name: "stir_fry".to_owned(),
                    triggers: vec!["stir fry".to_owned(), "stir-fry".to_owned()],
                    components: vec![
                        component("vegetable_mixed sauteed", 0.55),
                        component("chicken_breast grilled", 0.30),
                        component("soy sauce", 0.05),
                        component("rice_white cooked", 0.10),
                    ],
                },
                RecipeTemplate {
                    name: "cheeseburger".to_owned(),
                    triggers: vec!["cheeseburger".to_owned(), "burger".to_owned()],
                    components: vec![
                        component("bun hamburger", 0.33),
                        component("beef_ground cooked", 0.42),
                        component("cheese cheddar", 0.12),
                        component("lettuce", 0.07),
                        component("tomato", 0.06),
                    ],
                },
            ],
            proxies: vec![
                ProxyFormula {
                    class: "pizza_cheese".to_owned(),
                    triggers: vec!["cheese pizza".to_owned(), "pizza".to_owned()],
                    per_100g: MacroProfile {
                        protein_g: 11.0,
                        carbs_g: 33.0,
                        fat_g: 10.0,
                        kcal: 266.0,
                        fiber_g: 2.3,
                    },
                },
                ProxyFormula {
                    class: "mac_and_cheese".to_owned(),
                    triggers: vec!["mac and cheese".to_owned(), "macaroni cheese".to_owned()],
                    per_100g: MacroProfile {
                        protein_g: 7.3,
                        carbs_g: 20.0,
                        fat_g: 8.2,
                        kcal: 184.0,
                        fiber_g: 1.2,
                    },
                },
                ProxyFormula {
                    class: "fried_rice".to_owned(),
                    triggers: vec!["fried rice".to_owned()],
                    per_100g: MacroProfile {
                        protein_g: 4.9,
                        carbs_g: 24.8,
                        fat_g: 6.2,
                        kcal: 174.0,
                        fiber_g: 0.9,
                    },
                },
            ],
            proxy_whitelist: vec![
                "pizza_cheese".to_owned(),
                "mac_and_cheese".to_owned(),
                "fried_rice".to_owned(),
            ],
        }
    }
}

impl RecipeCatalog {
    /// Find the first template whose trigger appears in the normalized name
    #[must_use]
    pub fn match_template(&self, normalized_name: &str) -> Option<&RecipeTemplate> {
        self.templates
            .iter()
            .find(|t| t.triggers.iter().any(|tr| normalized_name.contains(tr.as_str())))
    }

    /// Find a whitelisted proxy formula for the normalized name
    #[must_use]
    pub fn match_proxy(&self, normalized_name: &str) -> Option<&ProxyFormula> {
        self.proxies
            .iter()
            .find(|p| p.triggers.iter().any(|tr| normalized_name.contains(tr.as_str())))
    }

    /// Whether a class is on the proxy whitelist
    #[must_use]
    pub fn is_whitelisted_proxy_class(&self, class: &str) -> bool {
        self.proxy_whitelist.iter().any(|c| c == class)
    }

    /// Fail-fast validation of every template and proxy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed templates, duplicate names, or
    /// proxies with non-positive energy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = std::collections::HashSet::new();
        for t in &self.templates {
            if !names.insert(t.name.as_str()) {
                return Err(ConfigError::Duplicate(format!("template name: {}", t.name)));
            }
            t.validate()?;
        }
        for p in &self.proxies {
            if !p.per_100g.is_non_negative() || p.per_100g.kcal <= 0.0 {
                return Err(ConfigError::ValueOutOfRange(format!(
                    "proxy {}: per-100g profile must be positive",
                    p.class
                )));
            }
        }
        Ok(())
    }
}
