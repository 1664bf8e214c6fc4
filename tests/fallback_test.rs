// ABOUTME: Stage-Z fallback tests: keyed substitution gates and the energy-only proxy
// ABOUTME: Alternate consumption order, blacklist, category eligibility bars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Stage-Z tests.
//!
//! Z1 candidates pass a plausibility kcal range and the reject-term
//! blacklist; alternates are consulted in listed order under the same gates.
//! Z2 eligibility is a hard category gate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use nutralign::config::fallback_table::{FallbackCandidate, FallbackEntry};
use nutralign::config::ResolverConfig;
use nutralign::gateway::StaticGateway;
use nutralign::models::{DetectedItem, MatchStage};
use nutralign::resolver::Resolver;
use nutralign::telemetry::{StageRejection, TraceEvent};
use std::sync::Arc;

// ============================================================================
// Z1 KEYED FALLBACK
// ============================================================================

#[tokio::test]
async fn cherry_tomatoes_fall_through_to_the_passing_alternate() {
    // The curated primary (sun-dried medley, 258 kcal) fails its 15–30
    // plausibility range; the alternate (22 kcal) passes. The entry's
    // alternates are consulted in listed order under the same gates.
    let resolver = common::resolver();
    let item = DetectedItem::new("cherry tomatoes", 150.0);
    let result = resolver.resolve(&item).await;

    assert_eq!(result.stage, MatchStage::KeyedFallback);
    assert_eq!(result.reference_id, Some(common::CHERRY_TOMATO_ALT_ID));
    assert!(result.trail.contains(|e| matches!(
        e,
        TraceEvent::StageRejected {
            rejection: StageRejection::ImplausibleKcal { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn reject_term_blacklist_discards_fast_food_candidates() {
    let mut config = ResolverConfig::default();
    config.fallbacks.entries.push(FallbackEntry {
        key: "onion_ring".to_owned(),
        synonyms: Vec::new(),
        primary: FallbackCandidate {
            reference_id: 9501,
            brand: None,
            kcal_min: 200.0,
            kcal_max: 450.0,
        },
        alternates: Vec::new(),
        required_token: None,
        low_confidence: false,
        peel_hint: None,
    });

    let mut corpus = common::corpus();
    corpus.push(common::branded(
        9501,
        "onion_ring",
        "Onion rings, fast food, fried",
        "QuickBite",
        4.0,
        38.0,
        16.0,
        320.0,
    ));
    let resolver = Resolver::new(StaticGateway::new(corpus), Arc::new(config));

    let item = DetectedItem::new("onion ring", 85.0);
    let result = resolver.resolve(&item).await;

    assert_ne!(result.stage, MatchStage::KeyedFallback);
    assert!(result.trail.contains(|e| matches!(
        e,
        TraceEvent::StageRejected {
            rejection: StageRejection::RejectTermPresent { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn key_variants_reach_the_entry_from_plural_input() {
    // "sweet potatoes" → key sweet_potato via substitution; the entry also
    // answers underscore/space/plural variants
    let resolver = common::resolver();
    let item = DetectedItem::new("sweet potatoes", 130.0);
    let result = resolver.resolve(&item).await;
    // The curated id is absent from the corpus gateway, so the entry is
    // discarded; what matters is that Z1 was attempted with the entry found
    // (no NoFallbackKey rejection)
    assert!(!result.trail.contains(|e| matches!(
        e,
        TraceEvent::StageRejected {
            rejection: StageRejection::NoFallbackKey,
            ..
        }
    )));
}

#[tokio::test]
async fn required_token_guards_entry_application() {
    // The cherry_tomato entry requires the "tomato" token; a bare "cherry"
    // query must not hit it
    let resolver = common::resolver();
    let item = DetectedItem::new("cherry", 50.0);
    let result = resolver.resolve(&item).await;
    assert_ne!(result.stage, MatchStage::KeyedFallback);
}

#[tokio::test]
async fn low_confidence_entries_mark_the_admission() {
    let mut config = ResolverConfig::default();
    config.fallbacks.entries.push(FallbackEntry {
        key: "trail_mix".to_owned(),
        synonyms: Vec::new(),
        primary: FallbackCandidate {
            reference_id: 9502,
            brand: None,
            kcal_min: 350.0,
            kcal_max: 550.0,
        },
        alternates: Vec::new(),
        required_token: None,
        low_confidence: true,
        peel_hint: None,
    });

    let mut corpus = common::corpus();
    corpus.push(common::branded(
        9502,
        "trail_mix",
        "Trail mix blend, no added sugar",
        "PackCo",
        14.0,
        44.0,
        29.0,
        484.0,
    ));
    let resolver = Resolver::new(StaticGateway::new(corpus), Arc::new(config));

    let item = DetectedItem::new("trail mix", 40.0);
    let result = resolver.resolve(&item).await;
    assert_eq!(result.stage, MatchStage::KeyedFallback);
    assert!((result.confidence - 0.35).abs() < f64::EPSILON);
}

// ============================================================================
// Z2 ENERGY-ONLY GATES (end-to-end)
// ============================================================================

#[tokio::test]
async fn produce_categories_never_reach_energy_only() {
    let resolver = common::resolver();
    for name in ["starfruit", "celeriac", "butter bean"] {
        let item = DetectedItem::new(name, 100.0);
        let result = resolver.resolve(&item).await;
        assert_ne!(
            result.stage,
            MatchStage::EnergyOnly,
            "{name} must not take the energy-only proxy"
        );
    }
}

#[tokio::test]
async fn fish_degrades_to_energy_only_with_band_midpoint() {
    let resolver = common::resolver();
    let item = DetectedItem::new("poached monkfish", 140.0);
    let result = resolver.resolve(&item).await;
    assert_eq!(result.stage, MatchStage::EnergyOnly);
    // Fish/seafood band [70, 280] midpoint
    assert_eq!(result.nutrients.kcal_per_100g(), Some(175.0));
    assert!(result.nutrients.per_100g().is_none());
}
