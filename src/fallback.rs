// ABOUTME: Stage-Z fallback logic: keyed curated substitution and energy-only proxy
// ABOUTME: Key variant expansion, plausibility gates, category eligibility rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Stage-Z Fallback Module.
//!
//! **Z1** expands the normalized key into singular/plural/space/underscore
//! variants and consults the curated table; the primary candidate (then each
//! alternate, in listed order) must pass a kcal plausibility range and the
//! reject-term blacklist.
//!
//! **Z2** is the strictly-gated energy-only last resort: produce categories
//! are permanently barred (a hit there is an upstream bug, not a coverage
//! gap), meat-like categories are always admitted (cooked-protein coverage
//! is known-poor), and the rest require an empty raw-Foundation pool.

use crate::config::fallback_table::{matched_reject_term, FallbackCandidate, FallbackEntry};
use crate::config::FallbackTable;
use crate::models::{FoodCategory, ReferenceEntry};
use crate::telemetry::StageRejection;
use tracing::warn;

/// Expand a normalized key into lookup variants: as-is, space/underscore
/// swapped, naive singular and plural of the trailing token.
#[must_use]
pub fn key_variants(key: &str) -> Vec<String> {
    let mut variants = vec![key.to_owned()];
    let push_unique = |variants: &mut Vec<String>, v: String| {
        if !variants.contains(&v) {
            variants.push(v);
        }
    };

    push_unique(&mut variants, key.replace('_', " "));
    push_unique(&mut variants, key.replace(' ', "_"));

    if let Some(stripped) = key.strip_suffix('s') {
        push_unique(&mut variants, stripped.to_owned());
        push_unique(&mut variants, stripped.replace('_', " "));
    } else {
        push_unique(&mut variants, format!("{key}s"));
        push_unique(&mut variants, format!("{}s", key.replace('_', " ")));
    }

    variants
}

/// Find the first table entry matching any key variant. The query tokens
/// must contain the entry's required token when one is configured.
#[must_use]
pub fn find_entry<'a>(
    table: &'a FallbackTable,
    key: &str,
    query_tokens: &[String],
) -> Option<(&'a FallbackEntry, String)> {
    for variant in key_variants(key) {
        if let Some(entry) = table.lookup(&variant) {
            if let Some(required) = &entry.required_token {
                if !query_tokens.iter().any(|t| t == required) {
                    continue;
                }
            }
            return Some((entry, variant));
        }
    }
    None
}

/// Gate one curated candidate against the fetched record: kcal plausibility
/// range plus the reject-term blacklist.
///
/// # Errors
///
/// Returns the typed rejection describing which gate failed.
pub fn gate_candidate(
    curated: &FallbackCandidate,
    record: &ReferenceEntry,
) -> Result<(), StageRejection> {
    let name_lower = record.name.to_lowercase();
    if let Some(term) = matched_reject_term(&name_lower) {
        return Err(StageRejection::RejectTermPresent {
            term: term.to_owned(),
        });
    }
    let kcal = record.per_100g.kcal;
    if kcal < curated.kcal_min || kcal > curated.kcal_max {
        return Err(StageRejection::ImplausibleKcal {
            kcal,
            min: curated.kcal_min,
            max: curated.kcal_max,
        });
    }
    Ok(())
}

/// Stage-Z2 eligibility for a category given the raw-Foundation candidate
/// count observed in the pool.
///
/// # Errors
///
/// Returns `CategoryBarred` for permanently barred or unlisted categories
/// and `RawCandidatesExist` when coverage makes the proxy unnecessary.
pub fn energy_proxy_eligibility(
    category: FoodCategory,
    raw_foundation_count: usize,
) -> Result<(), StageRejection> {
    if category.barred_from_energy_proxy() {
        // A barred-category request reaching Z2 means every richer stage
        // failed on a food the reference store covers densely
        warn!(?category, "energy-only proxy requested for barred category");
        return Err(StageRejection::CategoryBarred {
            category: format!("{category:?}").to_lowercase(),
        });
    }
    if category.energy_proxy_always_admitted() {
        return Ok(());
    }
    match category {
        FoodCategory::StarchGrain | FoodCategory::Egg => {
            if raw_foundation_count == 0 {
                Ok(())
            } else {
                Err(StageRejection::RawCandidatesExist {
                    count: raw_foundation_count,
                })
            }
        }
        _ => Err(StageRejection::CategoryBarred {
            category: format!("{category:?}").to_lowercase(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodForm, MacroProfile, ProvenanceTier};

    fn record(name: &str, kcal: f64) -> ReferenceEntry {
        ReferenceEntry {
            id: 9,
            core_class: "test".to_owned(),
            name: name.to_owned(),
            tier: ProvenanceTier::Branded,
            form: FoodForm::Raw,
            method: None,
            per_100g: MacroProfile {
                kcal,
                ..MacroProfile::default()
            },
            brand: None,
        }
    }

    #[test]
    fn variants_cover_plural_and_separator_forms() {
        let variants = key_variants("cherry_tomato");
        assert!(variants.contains(&"cherry_tomato".to_owned()));
        assert!(variants.contains(&"cherry tomato".to_owned()));
        assert!(variants.contains(&"cherry_tomatos".to_owned()));

        let variants = key_variants("oats");
        assert!(variants.contains(&"oat".to_owned()));
    }

    #[test]
    fn fast_food_is_blacklisted() {
        let curated = FallbackCandidate {
            reference_id: 1,
            brand: None,
            kcal_min: 10.0,
            kcal_max: 500.0,
        };
        let rejection = gate_candidate(&curated, &record("Fast food burger", 250.0)).unwrap_err();
        assert!(matches!(
            rejection,
            StageRejection::RejectTermPresent { .. }
        ));
    }

    #[test]
    fn implausible_kcal_fails_gate() {
        let curated = FallbackCandidate {
            reference_id: 1,
            brand: None,
            kcal_min: 15.0,
            kcal_max: 30.0,
        };
        assert!(gate_candidate(&curated, &record("Tomatoes, cherry", 22.0)).is_ok());
        assert!(gate_candidate(&curated, &record("Tomatoes, sun-dried", 258.0)).is_err());
    }

    #[test]
    fn fruit_is_barred_even_with_empty_pool() {
        assert!(matches!(
            energy_proxy_eligibility(FoodCategory::Fruit, 0),
            Err(StageRejection::CategoryBarred { .. })
        ));
    }

    #[test]
    fn meat_admitted_despite_raw_candidates() {
        assert!(energy_proxy_eligibility(FoodCategory::MeatPoultry, 12).is_ok());
        assert!(energy_proxy_eligibility(FoodCategory::FishSeafood, 3).is_ok());
    }

    #[test]
    fn starch_requires_empty_raw_pool() {
        assert!(energy_proxy_eligibility(FoodCategory::StarchGrain, 0).is_ok());
        assert!(matches!(
            energy_proxy_eligibility(FoodCategory::StarchGrain, 2),
            Err(StageRejection::RawCandidatesExist { count: 2 })
        ));
    }
}
