// ABOUTME: Conversion engine kernel tests: ordering, composition, cross-checks
// ABOUTME: Covers hydration, shrinkage, rendering, oil uptake, Atwater, clamping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Conversion Engine tests.
//!
//! The kernels must compose in their fixed order and each must be a no-op
//! when its factor is absent. The energy-band clamp is the final authority.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use nutralign::config::{ConversionFactors, EnergyBand, ResolverFlags};
use nutralign::convert::convert_raw_seed;
use nutralign::models::{
    CookMethod, FoodForm, MacroProfile, ProvenanceTier, ReferenceEntry,
};
use nutralign::telemetry::StageRejection;

fn seed(core_class: &str, protein: f64, carbs: f64, fat: f64, kcal: f64) -> ReferenceEntry {
    ReferenceEntry {
        id: 100,
        core_class: core_class.to_owned(),
        name: format!("{core_class}, raw"),
        tier: ProvenanceTier::Foundation,
        form: FoodForm::Raw,
        method: None,
        per_100g: MacroProfile {
            protein_g: protein,
            carbs_g: carbs,
            fat_g: fat,
            kcal,
            fiber_g: 1.0,
        },
        brand: None,
    }
}

// ============================================================================
// REFERENCE SCENARIOS
// ============================================================================

#[test]
fn raw_rice_hydrates_to_cooked_density() {
    // Raw white rice 365 kcal/100g with hydration factor 2.80 lands near
    // the cooked value of ~130 kcal/100g
    let rice = seed("rice_white", 7.1, 80.0, 0.7, 365.0);
    let factors = ConversionFactors {
        hydration_factor: Some(2.80),
        ..ConversionFactors::default()
    };
    let out = convert_raw_seed(&rice, &factors, None, &ResolverFlags::default()).unwrap();
    assert!((out.per_100g.kcal - 130.4).abs() < 5.0);
    assert!(out.atwater_ok);
    assert_eq!(out.provenance.len(), 1);
}

#[test]
fn raw_meat_shrinks_to_cooked_density() {
    // Raw meat 120 kcal/100g with shrinkage 0.29 concentrates to ~169
    let meat = seed("beef_steak", 22.0, 0.0, 3.0, 120.0);
    let factors = ConversionFactors {
        shrinkage_fraction: Some(0.29),
        ..ConversionFactors::default()
    };
    let out = convert_raw_seed(&meat, &factors, None, &ResolverFlags::default()).unwrap();
    assert!((out.per_100g.kcal - 169.0).abs() < 5.0);
}

// ============================================================================
// KERNEL COMPOSITION AND ORDER
// ============================================================================

#[test]
fn render_then_uptake_compose_on_shrunk_fat() {
    // Shrinkage concentrates fat before rendering removes a share of it,
    // then oil uptake adds back; order matters and the provenance log
    // records each step
    let meat = seed("chicken_thigh", 19.0, 0.0, 10.0, 170.0);
    let factors = ConversionFactors {
        shrinkage_fraction: Some(0.20),
        fat_render_fraction: Some(0.25),
        oil_uptake_g: Some(2.0),
        ..ConversionFactors::default()
    };
    let out = convert_raw_seed(&meat, &factors, None, &ResolverFlags::default()).unwrap();

    let shrunk_fat = 10.0 / 0.8; // 12.5
    let rendered = shrunk_fat * 0.25; // 3.125
    let expected_fat = shrunk_fat - rendered + 2.0;
    assert!((out.per_100g.fat_g - expected_fat).abs() < 1e-9);

    let expected_kcal = 170.0 / 0.8 - rendered * 9.0 + 2.0 * 9.0;
    assert!(out.atwater_ok);
    assert!((out.per_100g.kcal - expected_kcal).abs() < 1e-9);
    assert_eq!(out.provenance.len(), 3);
}

#[test]
fn absent_factors_are_no_ops() {
    let rice = seed("rice_white", 7.1, 80.0, 0.7, 358.0);
    let out = convert_raw_seed(
        &rice,
        &ConversionFactors::default(),
        None,
        &ResolverFlags::default(),
    )
    .unwrap();
    assert!((out.per_100g.kcal - 358.0).abs() < f64::EPSILON);
    assert!(out.provenance.is_empty());
}

// ============================================================================
// GUARDRAILS AND CROSS-CHECKS
// ============================================================================

#[test]
fn non_raw_seed_is_rejected_never_converted() {
    let mut cooked = seed("rice_white", 2.7, 28.2, 0.3, 130.0);
    cooked.form = FoodForm::Cooked;
    cooked.method = Some(CookMethod::Boiled);
    let err = convert_raw_seed(
        &cooked,
        &ConversionFactors::default(),
        None,
        &ResolverFlags::default(),
    )
    .unwrap_err();
    assert_eq!(err, StageRejection::SeedNotRaw);
}

#[test]
fn branded_seed_is_rejected() {
    let mut branded = seed("rice_white", 7.1, 80.0, 0.7, 365.0);
    branded.tier = ProvenanceTier::Branded;
    let err = convert_raw_seed(
        &branded,
        &ConversionFactors::default(),
        None,
        &ResolverFlags::default(),
    )
    .unwrap_err();
    assert_eq!(err, StageRejection::SeedNotFoundation);
}

#[test]
fn atwater_blend_corrects_high_protein_outlier() {
    // Stated energy 40% above Atwater on a protein food: blend pulls it in
    let fish = seed("cod", 20.0, 0.0, 1.0, 130.0); // atwater = 89
    let out = convert_raw_seed(
        &fish,
        &ConversionFactors::default(),
        None,
        &ResolverFlags::default(),
    )
    .unwrap();
    assert!(!out.atwater_ok);
    let expected = 0.7 * 89.0 + 0.3 * 130.0;
    assert!((out.per_100g.kcal - expected).abs() < 0.5);
}

#[test]
fn clamp_runs_last_and_is_idempotent() {
    let rice = seed("rice_white", 7.1, 80.0, 0.7, 365.0);
    let factors = ConversionFactors {
        hydration_factor: Some(2.80),
        ..ConversionFactors::default()
    };
    let band = EnergyBand::new(115.0, 150.0);
    let out =
        convert_raw_seed(&rice, &factors, Some(band), &ResolverFlags::default()).unwrap();
    // 130.4 already in band: unchanged, flag stays down
    assert!(!out.energy_clamped);
    assert!(!out.out_of_band);

    let tight = EnergyBand::new(100.0, 120.0);
    let clamped =
        convert_raw_seed(&rice, &factors, Some(tight), &ResolverFlags::default()).unwrap();
    assert!(clamped.energy_clamped);
    assert!((clamped.per_100g.kcal - 120.0).abs() < f64::EPSILON);
    assert!(clamped.confidence < out.confidence);
}

#[test]
fn disabled_clamp_leaves_outlier_flagged() {
    let rice = seed("rice_white", 7.1, 80.0, 0.7, 365.0);
    let flags = ResolverFlags {
        energy_band_clamp: false,
        ..ResolverFlags::default()
    };
    let band = EnergyBand::new(100.0, 120.0);
    let factors = ConversionFactors {
        hydration_factor: Some(2.80),
        ..ConversionFactors::default()
    };
    let out = convert_raw_seed(&rice, &factors, Some(band), &flags).unwrap();
    assert!(!out.energy_clamped);
    assert!(out.out_of_band);
    assert!((out.per_100g.kcal - 130.36).abs() < 0.1);
}

// ============================================================================
// ATWATER DETERMINISM
// ============================================================================

#[test]
fn atwater_formula_is_exact() {
    let cases = [
        (0.0, 0.0, 0.0),
        (10.0, 20.0, 5.0),
        (31.0, 0.0, 3.6),
        (2.7, 28.2, 0.3),
    ];
    for (p, c, f) in cases {
        let profile = MacroProfile {
            protein_g: p,
            carbs_g: c,
            fat_g: f,
            kcal: 0.0,
            fiber_g: 0.0,
        };
        let expected = 4.0f64.mul_add(p, 4.0f64.mul_add(c, 9.0 * f));
        assert!((profile.atwater_kcal() - expected).abs() < f64::EPSILON);
    }
}
