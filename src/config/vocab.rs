// ABOUTME: Curated vocabularies used by the normalizer and admission gates
// ABOUTME: Ignored terms, naming-quirk substitutions, processed/raw/preparation word lists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Vocabulary tables.
//!
//! The reference store is inconsistent about singular vs. plural canonical
//! names, so substitutions are bidirectional. The ignored vocabulary is a
//! deliberate terminal outcome for the resolver (alcohol, deprecated detector
//! labels), not an error path.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Why an input term is ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredClass {
    /// Alcoholic beverages: kcal accounting handled elsewhere
    Alcohol,
    /// Deprecated detector label no longer emitted but present in replays
    Deprecated,
}

/// One ignored-vocabulary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoredTerm {
    /// Normalized term that short-circuits resolution
    pub term: String,
    /// Class recorded in telemetry
    pub class: IgnoredClass,
}

/// Vocabulary tables consumed by the normalizer, Stage 1c, and the scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabTables {
    /// Terms that short-circuit resolution entirely
    pub ignored: Vec<IgnoredTerm>,
    /// Bidirectional canonical-name substitutions (applied left→right and
    /// right→left during key building)
    pub substitutions: Vec<(String, String)>,
    /// Words marking a processed-food record (Stage 1c switches away from
    /// these when a raw/fresh sibling exists)
    pub processed_terms: Vec<String>,
    /// Words marking a raw/fresh record (Stage 1c switch target)
    pub raw_fresh_terms: Vec<String>,
    /// Preparation words that incur the branded-scoring penalty
    pub preparation_terms: Vec<String>,
    /// Core-class prefixes treated as sensitive protein categories for the
    /// raised score floor
    pub sensitive_protein_classes: Vec<String>,
    /// Peel qualifiers extracted into hints and removed from the search key
    pub peel_with_terms: Vec<String>,
    /// Peel qualifiers signaling the peel is absent
    pub peel_without_terms: Vec<String>,
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| (*t).to_owned()).collect()
}

/// Whether a term appears in a name. Single-word terms must match a whole
/// word ("oil" must not fire inside "boiled"); multiword phrases match as
/// substrings.
fn term_in_name(term: &str, name_lower: &str) -> bool {
    if term.contains(' ') {
        return name_lower.contains(term);
    }
    name_lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == term)
}

impl Default for VocabTables {
    fn default() -> Self {
        Self {
            ignored: vec![
                IgnoredTerm {
                    term: "beer".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                IgnoredTerm {
                    term: "wine".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                IgnoredTerm {
                    term: "cocktail".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                IgnoredTerm {
                    term: "whiskey".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                IgnoredTerm {
                    term: "vodka".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                IgnoredTerm {
                    term: "sake".to_owned(),
                    class: IgnoredClass::Alcohol,
                },
                // Labels retired from the detector taxonomy, still seen in replays
                IgnoredTerm {
                    term: "misc_food".to_owned(),
                    class: IgnoredClass::Deprecated,
                },
                IgnoredTerm {
                    term: "unknown_item".to_owned(),
                    class: IgnoredClass::Deprecated,
                },
                IgnoredTerm {
                    term: "garnish".to_owned(),
                    class: IgnoredClass::Deprecated,
                },
            ],
            substitutions: vec![
                ("tomatoes".to_owned(), "tomato".to_owned()),
                ("potatoes".to_owned(), "potato".to_owned()),
                ("apples".to_owned(), "apple".to_owned()),
                ("bananas".to_owned(), "banana".to_owned()),
                ("berries".to_owned(), "berry".to_owned()),
                ("eggs".to_owned(), "egg".to_owned()),
                ("noodles".to_owned(), "noodle".to_owned()),
                ("beans".to_owned(), "bean".to_owned()),
                ("lentils".to_owned(), "lentil".to_owned()),
                ("carrots".to_owned(), "carrot".to_owned()),
                ("onions".to_owned(), "onion".to_owned()),
                ("mushrooms".to_owned(), "mushroom".to_owned()),
                // Reference-store naming quirks
                ("garbanzo".to_owned(), "chickpea".to_owned()),
                ("scallion".to_owned(), "green_onion".to_owned()),
                ("aubergine".to_owned(), "eggplant".to_owned()),
                ("courgette".to_owned(), "zucchini".to_owned()),
                ("capsicum".to_owned(), "bell_pepper".to_owned()),
            ],
            processed_terms: owned(&[
                "oil", "soup", "bread", "frozen", "canned", "juice", "dried", "chips",
                "crackers", "powder", "syrup", "jam", "sauce", "battered", "breaded",
            ]),
            raw_fresh_terms: owned(&["raw", "fresh", "whole"]),
            preparation_terms: owned(&[
                "seasoned",
                "prepared",
                "marinated",
                "glazed",
                "with sauce",
                "with gravy",
                "breaded",
                "battered",
                "smoked",
            ]),
            sensitive_protein_classes: owned(&[
                "chicken", "beef", "pork", "turkey", "lamb", "fish", "salmon", "tuna",
                "shrimp",
            ]),
            peel_with_terms: owned(&["with skin", "with peel", "unpeeled", "skin on"]),
            peel_without_terms: owned(&[
                "without skin",
                "without peel",
                "peeled",
                "skinless",
                "skin off",
            ]),
        }
    }
}

impl VocabTables {
    /// Fail-fast validation: non-empty tables, no duplicate ignored terms
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a table is empty or an ignored term repeats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processed_terms.is_empty() || self.raw_fresh_terms.is_empty() {
            return Err(ConfigError::MissingField(
                "processed_terms / raw_fresh_terms",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &self.ignored {
            if !seen.insert(entry.term.as_str()) {
                return Err(ConfigError::Duplicate(format!(
                    "ignored term: {}",
                    entry.term
                )));
            }
        }
        Ok(())
    }

    /// Look up an ignored term
    #[must_use]
    pub fn ignored_class_of(&self, term: &str) -> Option<IgnoredClass> {
        self.ignored
            .iter()
            .find(|e| e.term == term)
            .map(|e| e.class)
    }

    /// Whether a record name contains any processed-food marker
    #[must_use]
    pub fn is_processed_name(&self, name_lower: &str) -> bool {
        self.processed_terms
            .iter()
            .any(|t| term_in_name(t, name_lower))
    }

    /// Whether a record name contains any raw/fresh marker
    #[must_use]
    pub fn is_raw_fresh_name(&self, name_lower: &str) -> bool {
        self.raw_fresh_terms
            .iter()
            .any(|t| term_in_name(t, name_lower))
    }

    /// Whether a record name contains any preparation marker
    #[must_use]
    pub fn has_preparation_term(&self, name_lower: &str) -> bool {
        self.preparation_terms
            .iter()
            .any(|t| term_in_name(t, name_lower))
    }

    /// Whether a core class is a sensitivity-flagged protein category
    #[must_use]
    pub fn is_sensitive_protein_class(&self, core_class: &str) -> bool {
        self.sensitive_protein_classes
            .iter()
            .any(|c| core_class.starts_with(c.as_str()))
    }
}
