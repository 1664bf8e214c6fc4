// ABOUTME: Shared fixtures for integration tests
// ABOUTME: Builds a deterministic reference corpus and resolver instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use nutralign::config::ResolverConfig;
use nutralign::gateway::StaticGateway;
use nutralign::models::{CookMethod, FoodForm, MacroProfile, ProvenanceTier, ReferenceEntry};
use nutralign::resolver::Resolver;
use std::sync::Arc;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install the test subscriber once; RUST_LOG controls verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Curated Z1 ids used by the default fallback table
pub const SUN_DRIED_TOMATO_ID: u64 = 1_103_276;
pub const CHERRY_TOMATO_ALT_ID: u64 = 2_345_551;

pub fn entry(
    id: u64,
    core_class: &str,
    name: &str,
    tier: ProvenanceTier,
    form: FoodForm,
    method: Option<CookMethod>,
    protein: f64,
    carbs: f64,
    fat: f64,
    kcal: f64,
) -> ReferenceEntry {
    ReferenceEntry {
        id,
        core_class: core_class.to_owned(),
        name: name.to_owned(),
        tier,
        form,
        method,
        per_100g: MacroProfile {
            protein_g: protein,
            carbs_g: carbs,
            fat_g: fat,
            kcal,
            fiber_g: 0.0,
        },
        brand: None,
    }
}

/// A compact but representative reference corpus: raw/cooked pairs for the
/// conversion and direct stages, branded records for scoring, and the Z1
/// curated ids.
pub fn corpus() -> Vec<ReferenceEntry> {
    use CookMethod as M;
    use FoodForm as F;
    use ProvenanceTier as T;
    vec![
        // Rice: raw Foundation seed + cooked SR record
        entry(1001, "rice_white", "Rice, white, raw", T::Foundation, F::Raw, None, 7.1, 80.0, 0.7, 365.0),
        entry(1002, "rice_white", "Rice, white, cooked, boiled", T::SrLegacy, F::Cooked, Some(M::Boiled), 2.7, 28.2, 0.3, 130.0),
        // Chicken breast: raw seed + roasted record
        entry(2001, "chicken_breast", "Chicken, breast, raw", T::Foundation, F::Raw, None, 22.5, 0.0, 2.6, 120.0),
        entry(2002, "chicken_breast", "Chicken, breast, cooked, roasted", T::SrLegacy, F::Cooked, Some(M::Roasted), 31.0, 0.0, 3.6, 165.0),
        // Egg: the Stage-1c switch scenario pair
        entry(3001, "egg", "Egg, whole, raw, fresh", T::Foundation, F::Raw, None, 12.6, 0.7, 9.5, 143.0),
        entry(3002, "bread_egg", "Bread, egg, toasted", T::SrLegacy, F::Cooked, Some(M::Baked), 11.3, 36.0, 13.0, 315.0),
        // Apple for raw-direct
        entry(5001, "apple", "Apples, raw, with skin", T::Foundation, F::Raw, None, 0.26, 13.8, 0.17, 52.0),
        // Burrito components
        entry(6001, "tortilla_flour", "Tortilla, flour, soft", T::SrLegacy, F::Cooked, None, 8.2, 49.4, 7.7, 306.0),
        entry(7001, "bean_black", "Beans, black, mature seeds, raw", T::Foundation, F::Raw, None, 21.6, 62.4, 1.4, 341.0),
        entry(7002, "bean_black", "Beans, black, mature seeds, cooked, boiled", T::SrLegacy, F::Cooked, Some(M::Boiled), 8.9, 23.7, 0.5, 132.0),
        entry(8001, "cheese_cheddar", "Cheese, cheddar", T::SrLegacy, F::Raw, None, 22.9, 3.4, 33.3, 403.0),
        entry(8002, "lettuce_romaine", "Lettuce, romaine, raw", T::Foundation, F::Raw, None, 1.2, 3.3, 0.3, 17.0),
        entry(8003, "tomato", "Tomatoes, red, ripe, raw", T::Foundation, F::Raw, None, 0.9, 3.9, 0.2, 18.0),
        entry(8004, "beef_ground", "Beef, ground, 85% lean, cooked, pan-seared", T::SrLegacy, F::Cooked, Some(M::PanSeared), 25.0, 0.0, 15.0, 250.0),
        entry(8005, "bun_hamburger", "Bun, hamburger, plain", T::SrLegacy, F::Cooked, None, 9.5, 49.0, 3.9, 278.0),
        entry(8006, "crouton", "Crouton, plain", T::SrLegacy, F::Cooked, None, 11.9, 73.5, 6.6, 407.0),
        entry(8007, "dressing_caesar", "Dressing, caesar, regular", T::SrLegacy, F::Raw, None, 2.0, 4.0, 47.0, 440.0),
        entry(8008, "chicken_breast", "Chicken, breast, cooked, grilled", T::SrLegacy, F::Cooked, Some(M::Grilled), 31.5, 0.0, 3.7, 166.0),
        // Branded records for the scoring stage
        branded(4001, "yogurt_greek", "Greek Yogurt, Plain, Nonfat", "FitBrand", 10.2, 3.6, 0.4, 59.0),
        branded(4002, "yogurt_greek", "Greek Yogurt Seasoned Dessert Cup", "SweetCo", 6.0, 18.0, 4.0, 132.0),
        // Z1 curated targets: reachable by id, lexically weak for scoring
        branded(SUN_DRIED_TOMATO_ID, "tomato_sun_dried", "Sun Dried Tomato Medley", "PantryCo", 14.1, 55.8, 3.0, 258.0),
        branded(CHERRY_TOMATO_ALT_ID, "tomato_cherry", "Cherry Snack Pack", "FreshCo", 0.9, 3.9, 0.2, 22.0),
    ]
}

pub fn branded(
    id: u64,
    core_class: &str,
    name: &str,
    brand: &str,
    protein: f64,
    carbs: f64,
    fat: f64,
    kcal: f64,
) -> ReferenceEntry {
    let mut e = entry(
        id,
        core_class,
        name,
        ProvenanceTier::Branded,
        FoodForm::Raw,
        None,
        protein,
        carbs,
        fat,
        kcal,
    );
    e.brand = Some(brand.to_owned());
    e
}

pub fn resolver() -> Resolver<StaticGateway> {
    resolver_with_config(ResolverConfig::default())
}

pub fn resolver_with_config(config: ResolverConfig) -> Resolver<StaticGateway> {
    init_tracing();
    config.validate().expect("test config must validate");
    Resolver::new(StaticGateway::new(corpus()), Arc::new(config))
}
