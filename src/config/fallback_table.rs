// ABOUTME: Curated keyed-fallback table for Stage Z1
// ABOUTME: Normalized keys, synonym sets, plausibility ranges, reject-term blacklist
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Stage-Z1 fallback configuration.
//!
//! Each entry maps a normalized key (and its synonyms) to a primary curated
//! candidate plus ordered alternates. Candidates must pass a kcal
//! plausibility range and the reject-term blacklist before admission;
//! alternates are consulted in listed order under the same gates.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Record-name terms that disqualify a fallback candidate outright
pub const REJECT_TERMS: &[&str] = &[
    "fast food",
    "fast foods",
    "restaurant",
    "babyfood",
    "baby food",
    "school lunch",
];

/// One curated candidate inside a fallback entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackCandidate {
    /// Reference record id to fetch
    pub reference_id: u64,
    /// Expected brand, when the candidate is branded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Plausibility range the fetched record's kcal/100g must satisfy
    pub kcal_min: f64,
    /// Upper bound of the plausibility range
    pub kcal_max: f64,
}

impl FallbackCandidate {
    /// Fail-fast validation of the plausibility range
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRange` when `kcal_min >= kcal_max`.
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        if self.kcal_min >= self.kcal_max {
            return Err(ConfigError::InvalidRange(format!(
                "{context}: kcal_min {} must be < kcal_max {}",
                self.kcal_min, self.kcal_max
            )));
        }
        Ok(())
    }
}

/// One curated last-resort substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    /// Normalized key (underscore-joined singular tokens)
    pub key: String,
    /// Additional keys that resolve to this entry
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Primary candidate
    pub primary: FallbackCandidate,
    /// Ordered alternates consulted when the primary fails its gates
    #[serde(default)]
    pub alternates: Vec<FallbackCandidate>,
    /// Token that must appear in the query for the entry to apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_token: Option<String>,
    /// Mark the admission as low confidence
    #[serde(default)]
    pub low_confidence: bool,
    /// Peel hint the entry assumes (recorded in the method reason)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peel_hint: Option<String>,
}

/// The full curated fallback table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTable {
    /// All entries
    pub entries: Vec<FallbackEntry>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            entries: vec![
                FallbackEntry {
                    key: "cherry_tomato".to_owned(),
                    synonyms: vec!["tomato_cherry".to_owned()],
                    primary: FallbackCandidate {
                        reference_id: 1_103_276,
                        brand: None,
                        kcal_min: 15.0,
                        kcal_max: 30.0,
                    },
                    alternates: vec![FallbackCandidate {
                        reference_id: 2_345_551,
                        brand: Some("generic".to_owned()),
                        kcal_min: 15.0,
                        kcal_max: 35.0,
                    }],
                    required_token: Some("tomato".to_owned()),
                    low_confidence: false,
                    peel_hint: None,
                },
                FallbackEntry {
                    key: "rotisserie_chicken".to_owned(),
                    synonyms: vec!["chicken_rotisserie".to_owned()],
                    primary: FallbackCandidate {
                        reference_id: 2_646_171,
                        brand: None,
                        kcal_min: 150.0,
                        kcal_max: 260.0,
                    },
                    alternates: Vec::new(),
                    required_token: Some("chicken".to_owned()),
                    low_confidence: false,
                    peel_hint: None,
                },
                FallbackEntry {
                    key: "protein_shake".to_owned(),
                    synonyms: vec!["protein_drink".to_owned(), "shake_protein".to_owned()],
                    primary: FallbackCandidate {
                        reference_id: 1_999_631,
                        brand: Some("generic".to_owned()),
                        kcal_min: 50.0,
                        kcal_max: 160.0,
                    },
                    alternates: vec![FallbackCandidate {
                        reference_id: 2_080_001,
                        brand: Some("generic".to_owned()),
                        kcal_min: 40.0,
                        kcal_max: 200.0,
                    }],
                    required_token: None,
                    low_confidence: true,
                    peel_hint: None,
                },
                FallbackEntry {
                    key: "sweet_potato".to_owned(),
                    synonyms: vec!["potato_sweet".to_owned()],
                    primary: FallbackCandidate {
                        reference_id: 2_346_404,
                        brand: None,
                        kcal_min: 75.0,
                        kcal_max: 115.0,
                    },
                    alternates: Vec::new(),
                    required_token: None,
                    low_confidence: false,
                    peel_hint: Some("flesh only".to_owned()),
                },
            ],
        }
    }
}

impl FallbackTable {
    /// Find the entry matching a key or one of its synonyms
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&FallbackEntry> {
        self.entries
            .iter()
            .find(|e| e.key == key || e.synonyms.iter().any(|s| s == key))
    }

    /// Fail-fast validation: unique keys, valid plausibility ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for duplicate keys or inverted kcal ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(ConfigError::Duplicate(format!(
                    "fallback key: {}",
                    entry.key
                )));
            }
            entry
                .primary
                .validate(&format!("fallback {} primary", entry.key))?;
            for (i, alt) in entry.alternates.iter().enumerate() {
                alt.validate(&format!("fallback {} alternate {i}", entry.key))?;
            }
        }
        Ok(())
    }
}

/// Whether a record name trips the reject-term blacklist, returning the term
#[must_use]
pub fn matched_reject_term(name_lower: &str) -> Option<&'static str> {
    REJECT_TERMS
        .iter()
        .find(|t| name_lower.contains(*t))
        .copied()
}
