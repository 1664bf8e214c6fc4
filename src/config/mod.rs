// ABOUTME: Resolver configuration aggregate with load-once, fail-fast validation
// ABOUTME: Defaults in code, optional JSON override, env-var tweaks, immutable value
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Resolver Configuration
//!
//! All curated tables (conversion factors, energy bands, fallback entries,
//! recipe templates, vocabularies) and the feature-flag set, loaded once at
//! process start and validated before any resolution is served. Malformed
//! entries fail the load, never a request.
//!
//! The validated aggregate is an immutable value passed by reference into
//! every stage. There is no process-global configuration state.

pub mod conversion;
pub mod energy;
pub mod error;
pub mod fallback_table;
pub mod flags;
pub mod recipes;
pub mod vocab;

pub use conversion::{ConversionFactors, ConversionRule, ConversionTable};
pub use energy::{ClassBand, EnergyBand, EnergyBandTable};
pub use error::ConfigError;
pub use fallback_table::{FallbackCandidate, FallbackEntry, FallbackTable, REJECT_TERMS};
pub use flags::ResolverFlags;
pub use recipes::{ProxyFormula, RecipeCatalog, RecipeComponent, RecipeTemplate};
pub use vocab::{IgnoredClass, IgnoredTerm, VocabTables};

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Aggregate resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Feature flags (gates, floors, clamps)
    pub flags: ResolverFlags,
    /// Conversion-factor table for Stage 2
    pub conversions: ConversionTable,
    /// Energy bands for gating and clamping
    pub energy_bands: EnergyBandTable,
    /// Curated Stage-Z1 fallback table
    pub fallbacks: FallbackTable,
    /// Decomposition templates and proxy whitelist
    pub recipes: RecipeCatalog,
    /// Vocabulary tables
    pub vocab: VocabTables,
    /// Candidate pool size requested from the gateway per query
    pub candidate_limit: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            flags: ResolverFlags::default(),
            conversions: ConversionTable::default(),
            energy_bands: EnergyBandTable::default(),
            fallbacks: FallbackTable::default(),
            recipes: RecipeCatalog::default(),
            vocab: VocabTables::default(),
            candidate_limit: 25,
        }
    }
}

impl ResolverConfig {
    /// Load configuration: defaults, then environment overrides, then
    /// fail-fast validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when an environment value cannot be parsed or
    /// any table fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a full configuration from a JSON document, then validate
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and validation errors
    /// for malformed tables.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Helper to parse and apply one environment variable override
    fn apply_env_var<T: FromStr>(name: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Ok(val) = env::var(name) {
            *target = val
                .parse()
                .map_err(|_| ConfigError::Parse(format!("Invalid {name}")))?;
        }
        Ok(())
    }

    /// Apply environment variable overrides for the flag set
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        Self::apply_env_var(
            "NUTRALIGN_LENIENT_ENERGY_GATE",
            &mut self.flags.lenient_energy_gate,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_STARCH_ATWATER_FLOOR",
            &mut self.flags.starch_atwater_floor,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_ENERGY_BAND_CLAMP",
            &mut self.flags.energy_band_clamp,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_RAISED_PROTEIN_FLOOR",
            &mut self.flags.raised_protein_floor,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_SEMANTIC_RETRIEVAL",
            &mut self.flags.semantic_retrieval,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_TRUST_DETECTOR_KCAL",
            &mut self.flags.trust_detector_kcal,
        )?;
        Self::apply_env_var(
            "NUTRALIGN_MAX_DECOMPOSITION_DEPTH",
            &mut self.flags.max_decomposition_depth,
        )?;
        Self::apply_env_var("NUTRALIGN_CANDIDATE_LIMIT", &mut self.candidate_limit)?;
        Ok(())
    }

    /// Validate every table; called by both load paths before the config is
    /// handed to the resolver.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidate_limit == 0 || self.candidate_limit > 200 {
            return Err(ConfigError::ValueOutOfRange(format!(
                "candidate_limit must be in [1, 200], got {}",
                self.candidate_limit
            )));
        }
        if self.flags.max_decomposition_depth == 0 {
            return Err(ConfigError::ValueOutOfRange(
                "max_decomposition_depth must be at least 1".to_owned(),
            ));
        }
        self.conversions.validate()?;
        self.energy_bands.validate()?;
        self.fallbacks.validate()?;
        self.recipes.validate()?;
        self.vocab.validate()?;
        Ok(())
    }
}
