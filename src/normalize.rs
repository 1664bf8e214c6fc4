// ABOUTME: Query normalizer turning raw detector names into search keys and hints
// ABOUTME: Parenthetical collapse, peel extraction, curated substitutions, ignored vocabulary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Query Normalizer.
//!
//! Canonicalizes a raw, vision-derived food name into a search key, token
//! set, and hints. The pipeline is total: it never fails, and it returns a
//! non-empty token set for any non-ignored input. Hitting the ignored
//! vocabulary is a deliberate terminal outcome (`key = None` plus an ignored
//! class hint), not an error.

use crate::config::vocab::{IgnoredClass, VocabTables};
use crate::models::{CookMethod, FoodForm};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Parenthetical group, captured for duplicate collapse
#[allow(clippy::unwrap_used)] // literal pattern, checked by tests
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

/// Leading discrete count, e.g. "2 eggs"
#[allow(clippy::unwrap_used)] // literal pattern, checked by tests
static LEADING_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s+").unwrap());

/// Connective words dropped from token sets
const STOPWORDS: &[&str] = &["a", "an", "and", "of", "the", "in", "on"];

/// Color qualifiers recorded as hints (kept in the key: "rice white" is a
/// different class than "rice brown")
const COLOR_TERMS: &[&str] = &["red", "green", "yellow", "purple", "white", "brown", "black"];

/// Multiword method phrases that tokenization would split apart
const METHOD_PHRASES: &[(&str, CookMethod)] = &[
    ("stir fried", CookMethod::StirFried),
    ("stir fry", CookMethod::StirFried),
    ("deep fried", CookMethod::DeepFried),
    ("pan seared", CookMethod::PanSeared),
    ("pan fried", CookMethod::PanSeared),
];

/// Peel-state hint extracted from the name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeelHint {
    /// Peel/skin present
    WithPeel,
    /// Peel/skin removed
    WithoutPeel,
}

/// Hints extracted alongside the search key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryHints {
    /// Peel qualifier, removed from the key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peel: Option<PeelHint>,
    /// Color/species qualifier (kept in the key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Leading discrete count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Set when the input hit the ignored vocabulary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_class: Option<IgnoredClass>,
}

/// Output of the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    /// Underscore-joined canonical search key; `None` for ignored inputs
    pub key: Option<String>,
    /// Canonical food tokens (method/form words extracted)
    pub tokens: Vec<String>,
    /// Physical-form hint parsed from the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_hint: Option<FoodForm>,
    /// Cooking-method hint parsed from the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_hint: Option<CookMethod>,
    /// Extracted hints
    pub hints: QueryHints,
}

impl NormalizedQuery {
    /// Whether the input was in the ignored vocabulary
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.hints.ignored_class.is_some()
    }
}

/// Collapse repeated identical parenthetical qualifiers, keeping the first.
/// The detector occasionally stutters: "chicken (roasted) (roasted)".
fn collapse_duplicate_parentheticals(name: &str) -> String {
    let mut seen = Vec::new();
    let mut out = String::with_capacity(name.len());
    let mut last_end = 0;
    for caps in PARENTHETICAL.captures_iter(name) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = caps.get(1).map_or("", |m| m.as_str()).trim().to_owned();
        out.push_str(&name[last_end..whole.start()]);
        if !seen.contains(&inner) {
            out.push_str(whole.as_str());
            seen.push(inner);
        }
        last_end = whole.end();
    }
    out.push_str(&name[last_end..]);
    out
}

/// Extract a peel qualifier, returning the cleaned name and the hint
fn extract_peel(name: &str, vocab: &VocabTables) -> (String, Option<PeelHint>) {
    // "without skin" must be checked before "with skin" substring logic,
    // so without-terms run first
    for term in &vocab.peel_without_terms {
        if let Some(pos) = name.find(term.as_str()) {
            let cleaned = format!("{}{}", &name[..pos], &name[pos + term.len()..]);
            return (cleaned, Some(PeelHint::WithoutPeel));
        }
    }
    for term in &vocab.peel_with_terms {
        if let Some(pos) = name.find(term.as_str()) {
            let cleaned = format!("{}{}", &name[..pos], &name[pos + term.len()..]);
            return (cleaned, Some(PeelHint::WithPeel));
        }
    }
    (name.to_owned(), None)
}

/// Tokenize a cleaned name: split on non-alphanumeric, drop stopwords
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_owned)
        .collect()
}

/// Canonicalize a raw detector name.
///
/// Pipeline, in order: duplicate-parenthetical collapse; hyphen/space
/// unification; peel extraction; leading-count extraction; tokenization;
/// curated substitutions; method/form token extraction; ignored-vocabulary
/// short-circuit.
#[must_use]
pub fn normalize(raw_name: &str, vocab: &VocabTables) -> NormalizedQuery {
    let mut hints = QueryHints::default();

    let lowered = raw_name.trim().to_lowercase();
    let collapsed = collapse_duplicate_parentheticals(&lowered);
    let unified = collapsed.replace('-', " ");
    let (peeled, peel) = extract_peel(&unified, vocab);
    hints.peel = peel;

    let mut remainder = peeled;
    let mut phrase_method = None;
    for (phrase, method) in METHOD_PHRASES {
        if let Some(pos) = remainder.find(phrase) {
            phrase_method = Some(*method);
            remainder = format!("{}{}", &remainder[..pos], &remainder[pos + phrase.len()..]);
            break;
        }
    }

    let leading_count = LEADING_COUNT.captures(&remainder).and_then(|caps| {
        let end = caps.get(0)?.end();
        let count = caps.get(1)?.as_str().parse::<u32>().ok()?;
        Some((count, end))
    });
    if let Some((count, end)) = leading_count {
        hints.count = Some(count);
        remainder = remainder[end..].to_owned();
    }

    let raw_tokens = tokenize(&remainder);

    // Curated substitutions: the reference store is inconsistent about
    // plural vs. singular canonical names, so the table maps toward the
    // canonical side; variant expansion happens at the fallback layer.
    let mut tokens: Vec<String> = Vec::with_capacity(raw_tokens.len());
    let mut method_hint = phrase_method;
    let mut form_hint = phrase_method.map(|_| FoodForm::Cooked);
    for token in raw_tokens {
        let substituted = vocab
            .substitutions
            .iter()
            .find_map(|(from, to)| (*from == token).then(|| to.clone()))
            .unwrap_or(token);

        match substituted.as_str() {
            "cooked" => {
                form_hint = Some(FoodForm::Cooked);
                continue;
            }
            "raw" | "fresh" | "uncooked" => {
                form_hint = Some(FoodForm::Raw);
                continue;
            }
            _ => {}
        }
        if let Some(method) = CookMethod::from_token(&substituted) {
            if method_hint.is_none() {
                method_hint = Some(method);
            }
            if form_hint.is_none() {
                form_hint = Some(if method == CookMethod::Raw {
                    FoodForm::Raw
                } else {
                    FoodForm::Cooked
                });
            }
            continue;
        }
        if COLOR_TERMS.contains(&substituted.as_str()) && hints.color.is_none() {
            hints.color = Some(substituted.clone());
        }
        tokens.push(substituted);
    }

    // Total-function guarantee: any non-ignored input yields tokens
    if tokens.is_empty() {
        tokens.push("unknown".to_owned());
    }

    let key = tokens.join("_");

    // Ignored-vocabulary short-circuit: deliberate terminal outcome
    let ignored = vocab
        .ignored_class_of(&key)
        .or_else(|| tokens.iter().find_map(|t| vocab.ignored_class_of(t)));
    if let Some(class) = ignored {
        hints.ignored_class = Some(class);
        return NormalizedQuery {
            key: None,
            tokens,
            form_hint,
            method_hint,
            hints,
        };
    }

    NormalizedQuery {
        key: Some(key),
        tokens,
        form_hint,
        method_hint,
        hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> VocabTables {
        VocabTables::default()
    }

    #[test]
    fn cherry_tomatoes_normalizes_to_singular_key() {
        let q = normalize("cherry tomatoes", &vocab());
        assert_eq!(q.key.as_deref(), Some("cherry_tomato"));
        assert_eq!(q.tokens, vec!["cherry", "tomato"]);
        assert!(!q.is_ignored());
    }

    #[test]
    fn duplicate_parentheticals_collapse() {
        let q = normalize("chicken breast (roasted) (roasted)", &vocab());
        assert_eq!(q.key.as_deref(), Some("chicken_breast"));
        assert_eq!(q.method_hint, Some(CookMethod::Roasted));
        assert_eq!(q.form_hint, Some(FoodForm::Cooked));
    }

    #[test]
    fn peel_qualifier_is_extracted_not_embedded() {
        let q = normalize("apple without skin", &vocab());
        assert_eq!(q.key.as_deref(), Some("apple"));
        assert_eq!(q.hints.peel, Some(PeelHint::WithoutPeel));

        let q = normalize("potato with skin", &vocab());
        assert_eq!(q.key.as_deref(), Some("potato"));
        assert_eq!(q.hints.peel, Some(PeelHint::WithPeel));
    }

    #[test]
    fn ignored_vocabulary_short_circuits_with_class() {
        let q = normalize("beer", &vocab());
        assert!(q.key.is_none());
        assert_eq!(q.hints.ignored_class, Some(IgnoredClass::Alcohol));
        assert!(!q.tokens.is_empty());
    }

    #[test]
    fn leading_count_becomes_hint() {
        let q = normalize("2 eggs", &vocab());
        assert_eq!(q.hints.count, Some(2));
        assert_eq!(q.key.as_deref(), Some("egg"));
    }

    #[test]
    fn hyphens_unify_to_spaces() {
        let q = normalize("stir-fried vegetables", &vocab());
        assert_eq!(q.method_hint, Some(CookMethod::StirFried));
    }

    #[test]
    fn totality_on_degenerate_input() {
        let q = normalize("", &vocab());
        assert!(!q.tokens.is_empty());
        assert!(q.key.is_some());

        let q = normalize("  ()()  ", &vocab());
        assert!(!q.tokens.is_empty());
    }

    #[test]
    fn color_is_hinted_but_kept_in_key() {
        let q = normalize("white rice", &vocab());
        assert_eq!(q.hints.color.as_deref(), Some("white"));
        assert_eq!(q.key.as_deref(), Some("white_rice"));
    }
}
