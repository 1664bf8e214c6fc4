// ABOUTME: Load-time validation tests for every configuration table
// ABOUTME: Malformed entries must fail fast, before any resolution is served
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Configuration validation tests.
//!
//! The resolver's contract is that configuration problems surface at load
//! time, never at request time. Every invariant named by a table gets a
//! passing and a failing case here.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use nutralign::config::recipes::{RecipeComponent, RecipeTemplate};
use nutralign::config::{
    ConversionFactors, EnergyBand, FallbackCandidate, FallbackEntry, ResolverConfig,
};

fn component(key: &str, ratio: f64) -> RecipeComponent {
    RecipeComponent {
        key: key.to_owned(),
        ratio,
        preferred_keys: Vec::new(),
        pinned_id: None,
        reject_patterns: Vec::new(),
        energy_bounds: None,
    }
}

// ============================================================================
// RECIPE TEMPLATE INVARIANTS
// ============================================================================

#[test]
fn default_templates_all_sum_to_one() {
    let config = ResolverConfig::default();
    for template in &config.recipes.templates {
        let sum: f64 = template.components.iter().map(|c| c.ratio).sum();
        assert!(
            (sum - 1.0).abs() <= 1e-6,
            "template {} ratios sum to {sum}",
            template.name
        );
    }
}

#[test]
fn ratio_sum_off_by_more_than_tolerance_fails() {
    let template = RecipeTemplate {
        name: "broken".to_owned(),
        triggers: vec!["broken".to_owned()],
        components: vec![component("a", 0.6), component("b", 0.5)],
    };
    assert!(template.validate().is_err());
}

#[test]
fn ratio_sum_within_tolerance_passes() {
    let template = RecipeTemplate {
        name: "tight".to_owned(),
        triggers: vec!["tight".to_owned()],
        components: vec![component("a", 0.5), component("b", 0.5 + 5e-7)],
    };
    assert!(template.validate().is_ok());
}

#[test]
fn duplicate_component_keys_fail() {
    let template = RecipeTemplate {
        name: "dup".to_owned(),
        triggers: vec!["dup".to_owned()],
        components: vec![component("a", 0.5), component("a", 0.5)],
    };
    assert!(template.validate().is_err());
}

#[test]
fn zero_ratio_component_fails() {
    let template = RecipeTemplate {
        name: "zero".to_owned(),
        triggers: vec!["zero".to_owned()],
        components: vec![component("a", 0.0), component("b", 1.0)],
    };
    assert!(template.validate().is_err());
}

// ============================================================================
// ENERGY BAND INVARIANTS
// ============================================================================

#[test]
fn inverted_band_fails() {
    assert!(EnergyBand::new(100.0, 50.0).validate("test").is_err());
    assert!(EnergyBand::new(100.0, 100.0).validate("test").is_err());
    assert!(EnergyBand::new(-5.0, 50.0).validate("test").is_err());
    assert!(EnergyBand::new(50.0, 100.0).validate("test").is_ok());
}

#[test]
fn default_band_tables_validate() {
    let config = ResolverConfig::default();
    assert!(config.energy_bands.validate().is_ok());
}

// ============================================================================
// CONVERSION FACTOR PHYSICAL RANGES
// ============================================================================

#[test]
fn hydration_must_exceed_one() {
    let factors = ConversionFactors {
        hydration_factor: Some(0.9),
        ..ConversionFactors::default()
    };
    assert!(factors.validate("test").is_err());
}

#[test]
fn shrinkage_must_stay_physical() {
    let factors = ConversionFactors {
        shrinkage_fraction: Some(0.7),
        ..ConversionFactors::default()
    };
    assert!(factors.validate("test").is_err());
}

#[test]
fn retention_outside_unit_interval_fails() {
    let factors = ConversionFactors {
        protein_retention: 1.2,
        ..ConversionFactors::default()
    };
    assert!(factors.validate("test").is_err());

    let factors = ConversionFactors {
        fat_retention: 0.0,
        ..ConversionFactors::default()
    };
    assert!(factors.validate("test").is_err());
}

#[test]
fn default_conversion_table_validates() {
    let config = ResolverConfig::default();
    assert!(config.conversions.validate().is_ok());
}

// ============================================================================
// FALLBACK TABLE INVARIANTS
// ============================================================================

#[test]
fn inverted_fallback_kcal_range_fails() {
    let candidate = FallbackCandidate {
        reference_id: 1,
        brand: None,
        kcal_min: 100.0,
        kcal_max: 100.0,
    };
    assert!(candidate.validate("test").is_err());
}

#[test]
fn duplicate_fallback_keys_fail() {
    let mut config = ResolverConfig::default();
    let clone = FallbackEntry {
        key: config.fallbacks.entries[0].key.clone(),
        synonyms: Vec::new(),
        primary: FallbackCandidate {
            reference_id: 42,
            brand: None,
            kcal_min: 1.0,
            kcal_max: 2.0,
        },
        alternates: Vec::new(),
        required_token: None,
        low_confidence: false,
        peel_hint: None,
    };
    config.fallbacks.entries.push(clone);
    assert!(config.validate().is_err());
}

// ============================================================================
// AGGREGATE LOAD BEHAVIOR
// ============================================================================

#[test]
fn default_aggregate_validates() {
    assert!(ResolverConfig::default().validate().is_ok());
}

#[test]
fn json_override_round_trips_and_validates() {
    let config = ResolverConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let reloaded = ResolverConfig::from_json_str(&json).unwrap();
    assert_eq!(
        reloaded.recipes.templates.len(),
        config.recipes.templates.len()
    );
    assert!(!reloaded.flags.lenient_energy_gate);
}

#[test]
fn malformed_json_fails_with_parse_error() {
    assert!(ResolverConfig::from_json_str("{not json").is_err());
}

#[test]
fn strict_tolerance_is_the_default() {
    let config = ResolverConfig::default();
    assert!((config.flags.energy_tolerance() - 0.20).abs() < f64::EPSILON);
    let mut lenient = config;
    lenient.flags.lenient_energy_gate = true;
    assert!((lenient.flags.energy_tolerance() - 0.30).abs() < f64::EPSILON);
}
