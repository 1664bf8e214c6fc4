// ABOUTME: Stage-2 conversion engine applying raw-to-cooked physical kernels
// ABOUTME: Hydration, shrinkage, fat render, oil uptake, retention, Atwater check, band clamp
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Conversion Engine.
//!
//! Transforms a raw-form Foundation seed record into a cooked per-100g
//! profile by composing physical kernels in a fixed order. Each kernel is a
//! no-op when its factor is absent. The energy-band clamp runs last and is
//! the final authority over the converted energy.
//!
//! # Kernel order
//!
//! 1. Hydration: grains/legumes absorb water, diluting density: `v' = v / h`
//! 2. Shrinkage: meats lose moisture, concentrating density: `v' = v / (1 − s)`
//! 3. Fat rendering: rendered fat leaves the pan with its calories
//! 4. Oil uptake: frying oil is absorbed with its calories
//! 5. Macro retention: nutrient losses to the cooking medium
//! 6. Atwater soft-correction: cross-check against 4/4/9, blended not forced
//! 7. Energy-band clamp: final authority

use crate::config::{ConversionFactors, EnergyBand, ResolverFlags};
use crate::models::{FoodForm, MacroProfile, ProvenanceTier, ReferenceEntry, KCAL_PER_G_FAT};
use crate::telemetry::StageRejection;
use tracing::debug;

/// Base confidence before quality flags decrement it
const BASE_CONFIDENCE: f64 = 0.9;
/// Confidence decrement per quality flag raised
const CONFIDENCE_STEP: f64 = 0.1;
/// Relative tolerance for the Atwater cross-check
const ATWATER_TOLERANCE: f64 = 0.20;
/// Blend weight given to the Atwater estimate when correcting
const ATWATER_BLEND: f64 = 0.7;
/// Protein floor (g/100g) below which the starch-floor flag suppresses the
/// Atwater correction so it never fights the empirical band for starches
const STARCH_PROTEIN_FLOOR_G: f64 = 12.0;

/// Output of the conversion engine
#[derive(Debug, Clone)]
pub struct ConvertedEntry {
    /// The seed record (read-only)
    pub source: ReferenceEntry,
    /// Converted per-100g profile
    pub per_100g: MacroProfile,
    /// Ordered, human-readable log of every kernel that fired
    pub provenance: Vec<String>,
    /// Stated energy agreed with the Atwater estimate within tolerance
    pub atwater_ok: bool,
    /// The band clamp changed the energy value
    pub energy_clamped: bool,
    /// Energy remained outside the band after all kernels (outlier)
    pub out_of_band: bool,
    /// Confidence in [0, 1], strictly non-increasing per quality flag
    pub confidence: f64,
}

/// Convert a raw Foundation seed toward a cooked target.
///
/// The seed guardrail rejects non-raw or non-Foundation seeds with a typed
/// rejection, never a silent conversion.
///
/// # Errors
///
/// Returns `StageRejection::SeedNotRaw` or `StageRejection::SeedNotFoundation`
/// when the guardrail trips.
pub fn convert_raw_seed(
    seed: &ReferenceEntry,
    factors: &ConversionFactors,
    band: Option<EnergyBand>,
    flags: &ResolverFlags,
) -> Result<ConvertedEntry, StageRejection> {
    if seed.form != FoodForm::Raw {
        return Err(StageRejection::SeedNotRaw);
    }
    if seed.tier != ProvenanceTier::Foundation {
        return Err(StageRejection::SeedNotFoundation);
    }

    let mut p = seed.per_100g;
    let mut provenance = Vec::new();

    // 1. Hydration
    if let Some(h) = factors.hydration_factor {
        if h > 1.0 {
            let before = p.kcal;
            p = p.scale(1.0 / h);
            provenance.push(format!(
                "hydration /{h:.2}: {before:.1} -> {:.1} kcal/100g",
                p.kcal
            ));
        }
    }

    // 2. Shrinkage
    if let Some(s) = factors.shrinkage_fraction {
        let before = p.kcal;
        p = p.scale(1.0 / (1.0 - s));
        provenance.push(format!(
            "shrinkage /{:.2}: {before:.1} -> {:.1} kcal/100g",
            1.0 - s,
            p.kcal
        ));
    }

    // 3. Fat rendering
    if let Some(r) = factors.fat_render_fraction {
        let rendered = p.fat_g * r;
        p.fat_g -= rendered;
        p.kcal -= rendered * KCAL_PER_G_FAT;
        provenance.push(format!(
            "fat render {:.0}%: -{rendered:.1} g fat, -{:.1} kcal",
            r * 100.0,
            rendered * KCAL_PER_G_FAT
        ));
    }

    // 4. Oil uptake
    if let Some(oil) = factors.oil_uptake_g {
        p.fat_g += oil;
        p.kcal += oil * KCAL_PER_G_FAT;
        provenance.push(format!(
            "oil uptake +{oil:.1} g: +{:.1} kcal",
            oil * KCAL_PER_G_FAT
        ));
    }

    // 5. Macro retention
    if factors.protein_retention < 1.0
        || factors.carb_retention < 1.0
        || factors.fat_retention < 1.0
    {
        p.protein_g *= factors.protein_retention;
        p.carbs_g *= factors.carb_retention;
        p.fat_g *= factors.fat_retention;
        provenance.push(format!(
            "retention p{:.2}/c{:.2}/f{:.2}",
            factors.protein_retention, factors.carb_retention, factors.fat_retention
        ));
    }

    // 6. Atwater soft-correction
    let atwater = p.atwater_kcal();
    let mut atwater_ok = true;
    if atwater > 0.0 {
        let deviation = (p.kcal - atwater).abs() / atwater;
        if deviation > ATWATER_TOLERANCE {
            atwater_ok = false;
            if flags.starch_atwater_floor && p.protein_g < STARCH_PROTEIN_FLOOR_G {
                provenance.push(format!(
                    "atwater correction skipped (starch floor, protein {:.1} g)",
                    p.protein_g
                ));
            } else {
                let corrected = ATWATER_BLEND * atwater + (1.0 - ATWATER_BLEND) * p.kcal;
                provenance.push(format!(
                    "atwater blend: {:.1} -> {corrected:.1} kcal/100g (atwater {atwater:.1})",
                    p.kcal
                ));
                p.kcal = corrected;
            }
        }
    }

    // 7. Energy-band clamp: the final authority
    let mut energy_clamped = false;
    let mut out_of_band = false;
    if let Some(b) = band {
        if flags.energy_band_clamp {
            let clamped = b.clamp(p.kcal);
            if (clamped - p.kcal).abs() > f64::EPSILON {
                provenance.push(format!(
                    "band clamp [{:.0}, {:.0}]: {:.1} -> {clamped:.1} kcal/100g",
                    b.min_kcal, b.max_kcal, p.kcal
                ));
                p.kcal = clamped;
                energy_clamped = true;
            }
        }
        out_of_band = !b.contains(p.kcal);
    }

    let flags_raised = usize::from(!atwater_ok)
        + usize::from(energy_clamped)
        + usize::from(out_of_band);
    let confidence =
        (flags_raised as f64).mul_add(-CONFIDENCE_STEP, BASE_CONFIDENCE).max(0.0);

    debug!(
        seed_id = seed.id,
        kcal = p.kcal,
        atwater_ok,
        energy_clamped,
        confidence,
        "conversion kernels applied"
    );

    Ok(ConvertedEntry {
        source: seed.clone(),
        per_100g: p,
        provenance,
        atwater_ok,
        energy_clamped,
        out_of_band,
        confidence,
    })
}
