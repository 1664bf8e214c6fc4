// ABOUTME: Immutable feature-flag set for the resolution engine
// ABOUTME: Constructed once at startup and passed by reference into every stage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Feature flags controlling gates, floors, and clamps.
//!
//! The flag set is an immutable value built once at startup; stages receive
//! it by reference. There is deliberately no process-global flag state.

use serde::{Deserialize, Serialize};

/// Independently-togglable resolver behavior flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverFlags {
    /// Widen the Stage-1 energy-proximity gate from ±20% to ±30%.
    /// Off by default: the strict gate is the admission authority.
    pub lenient_energy_gate: bool,
    /// Skip the Atwater soft-correction for low-protein starches so the
    /// empirical band keeps final authority over grain energy
    pub starch_atwater_floor: bool,
    /// Clamp converted energy into the resolved energy band (final kernel)
    pub energy_band_clamp: bool,
    /// Raise the branded-score floor to 2.5 for weak two-token matches in
    /// sensitive protein classes
    pub raised_protein_floor: bool,
    /// Enable Stage 1S semantic retrieval (requires an injected index)
    pub semantic_retrieval: bool,
    /// Debug-only: let the detector's calorie figure break score ties.
    /// Never treated as ground truth.
    pub trust_detector_kcal: bool,
    /// Maximum decomposition recursion depth, enforced regardless of
    /// template authoring mistakes
    pub max_decomposition_depth: u8,
}

impl Default for ResolverFlags {
    fn default() -> Self {
        Self {
            lenient_energy_gate: false,
            starch_atwater_floor: true,
            energy_band_clamp: true,
            raised_protein_floor: true,
            semantic_retrieval: false,
            trust_detector_kcal: false,
            max_decomposition_depth: 2,
        }
    }
}

impl ResolverFlags {
    /// Energy-proximity tolerance in effect for Stage-1 admission
    #[must_use]
    pub const fn energy_tolerance(&self) -> f64 {
        if self.lenient_energy_gate {
            0.30
        } else {
            0.20
        }
    }
}
