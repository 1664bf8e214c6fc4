// ABOUTME: Lexical token-coverage scoring for branded candidate admission
// ABOUTME: Coverage score, preparation-term penalty, floors, deterministic tie-breaks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Scoring Module (Stages 3/4).
//!
//! Token coverage is the fraction of normalized query words present in a
//! candidate's normalized words, scaled to a 0–5 score. Preparation terms
//! (seasoned, prepared, with-sauce vocabulary) incur a fixed penalty before
//! the floor comparison. Ranking is fully deterministic: score, then
//! provenance tier, then lowest id.

use crate::config::{ResolverFlags, VocabTables};
use crate::models::{ProvenanceTier, ReferenceEntry};
use crate::normalize::tokenize;

/// Scale applied to the raw coverage fraction
const SCORE_SCALE: f64 = 5.0;
/// Penalty for preparation-term presence in the candidate name
const PREPARATION_PENALTY: f64 = 0.5;
/// Baseline admission floor
const SCORE_FLOOR: f64 = 2.0;
/// Raised floor for weak two-token matches in sensitive protein classes
const SENSITIVE_SCORE_FLOOR: f64 = 2.5;
/// Exact-overlap width that triggers the raised floor
const WEAK_OVERLAP: usize = 2;

/// One scored candidate
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// The candidate record
    pub entry: ReferenceEntry,
    /// Final score after penalties
    pub score: f64,
    /// Token-overlap width
    pub overlap: usize,
}

/// Raw coverage score and overlap width for two token sets
#[must_use]
pub fn coverage_score(predicted: &[String], candidate: &[String]) -> (f64, usize) {
    if predicted.is_empty() || candidate.is_empty() {
        return (0.0, 0);
    }
    let overlap = predicted
        .iter()
        .filter(|t| candidate.iter().any(|c| c == *t))
        .count();
    let denom = predicted.len().max(candidate.len()) as f64;
    (overlap as f64 / denom * SCORE_SCALE, overlap)
}

/// The admission floor in effect for a given overlap and class
#[must_use]
pub fn admission_floor(
    overlap: usize,
    core_class: &str,
    vocab: &VocabTables,
    flags: &ResolverFlags,
) -> f64 {
    if flags.raised_protein_floor
        && overlap == WEAK_OVERLAP
        && vocab.is_sensitive_protein_class(core_class)
    {
        SENSITIVE_SCORE_FLOOR
    } else {
        SCORE_FLOOR
    }
}

/// Score one candidate against the predicted tokens
#[must_use]
pub fn score_candidate(
    predicted_tokens: &[String],
    entry: &ReferenceEntry,
    vocab: &VocabTables,
) -> ScoredCandidate {
    let name_lower = entry.name.to_lowercase();
    let candidate_tokens = tokenize(&name_lower);
    let (mut score, overlap) = coverage_score(predicted_tokens, &candidate_tokens);
    if vocab.has_preparation_term(&name_lower) {
        score -= PREPARATION_PENALTY;
    }
    ScoredCandidate {
        entry: entry.clone(),
        score,
        overlap,
    }
}

/// Rank candidates and return the best one that clears its admission floor.
///
/// Ordering: score descending, then (under the `trust_detector_kcal` debug
/// flag) proximity to the predicted energy density, then provenance tier
/// preference, then lowest id.
#[must_use]
pub fn rank_candidates(
    predicted_tokens: &[String],
    core_class: &str,
    candidates: &[ReferenceEntry],
    predicted_energy_density: Option<f64>,
    vocab: &VocabTables,
    flags: &ResolverFlags,
) -> Option<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| score_candidate(predicted_tokens, c, vocab))
        .collect();

    let energy_hint = flags.trust_detector_kcal.then_some(predicted_energy_density).flatten();
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                energy_hint.map_or(std::cmp::Ordering::Equal, |hint| {
                    let da = (a.entry.per_100g.kcal - hint).abs();
                    let db = (b.entry.per_100g.kcal - hint).abs();
                    da.total_cmp(&db)
                })
            })
            .then_with(|| {
                a.entry
                    .tier
                    .trust_rank()
                    .cmp(&b.entry.tier.trust_rank())
            })
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });

    scored.into_iter().next().filter(|best| {
        best.score >= admission_floor(best.overlap, core_class, vocab, flags)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodForm, MacroProfile};

    fn entry(id: u64, name: &str, tier: ProvenanceTier, kcal: f64) -> ReferenceEntry {
        ReferenceEntry {
            id,
            core_class: "test".to_owned(),
            name: name.to_owned(),
            tier,
            form: FoodForm::Raw,
            method: None,
            per_100g: MacroProfile {
                kcal,
                ..MacroProfile::default()
            },
            brand: None,
        }
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_owned()).collect()
    }

    #[test]
    fn coverage_uses_max_cardinality_denominator() {
        let (score, overlap) = coverage_score(
            &tokens(&["greek", "yogurt"]),
            &tokens(&["greek", "yogurt", "plain", "nonfat"]),
        );
        assert_eq!(overlap, 2);
        assert!((score - 2.0 / 4.0 * 5.0).abs() < 1e-9);
    }

    #[test]
    fn preparation_term_subtracts_half_point() {
        let vocab = VocabTables::default();
        let plain = score_candidate(
            &tokens(&["chicken", "breast"]),
            &entry(1, "Chicken breast", ProvenanceTier::Branded, 165.0),
            &vocab,
        );
        let seasoned = score_candidate(
            &tokens(&["chicken", "breast"]),
            &entry(2, "Chicken breast seasoned", ProvenanceTier::Branded, 165.0),
            &vocab,
        );
        // Coverage already favors the plain record; the penalty widens the gap
        let (raw_seasoned, _) = coverage_score(
            &tokens(&["chicken", "breast"]),
            &tokens(&["chicken", "breast", "seasoned"]),
        );
        assert!((raw_seasoned - seasoned.score - PREPARATION_PENALTY).abs() < 1e-9);
        assert!(seasoned.score < plain.score);
    }

    #[test]
    fn raised_floor_applies_to_weak_protein_overlap() {
        let vocab = VocabTables::default();
        let flags = ResolverFlags::default();
        assert!(
            (admission_floor(2, "chicken_breast", &vocab, &flags) - SENSITIVE_SCORE_FLOOR).abs()
                < f64::EPSILON
        );
        assert!(
            (admission_floor(3, "chicken_breast", &vocab, &flags) - SCORE_FLOOR).abs()
                < f64::EPSILON
        );
        assert!(
            (admission_floor(2, "banana", &vocab, &flags) - SCORE_FLOOR).abs() < f64::EPSILON
        );
    }

    #[test]
    fn ties_break_by_tier_then_lowest_id() {
        let vocab = VocabTables::default();
        let flags = ResolverFlags::default();
        let candidates = vec![
            entry(30, "Apple raw", ProvenanceTier::Branded, 52.0),
            entry(20, "Apple raw", ProvenanceTier::Foundation, 52.0),
            entry(10, "Apple raw", ProvenanceTier::SrLegacy, 52.0),
        ];
        let best = rank_candidates(
            &tokens(&["apple", "raw"]),
            "apple",
            &candidates,
            None,
            &vocab,
            &flags,
        )
        .map(|s| s.entry.id);
        assert_eq!(best, Some(20));
    }

    #[test]
    fn below_floor_yields_no_admission() {
        let vocab = VocabTables::default();
        let flags = ResolverFlags::default();
        let candidates = vec![entry(
            1,
            "Completely different product name here",
            ProvenanceTier::Branded,
            100.0,
        )];
        assert!(rank_candidates(
            &tokens(&["apple"]),
            "apple",
            &candidates,
            None,
            &vocab,
            &flags
        )
        .is_none());
    }
}
