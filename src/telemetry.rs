// ABOUTME: Structured per-resolution telemetry and batch-level counters
// ABOUTME: Append-only event trail, typed stage rejections, atomic stage tallies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Telemetry for the resolution engine.
//!
//! Every resolution appends tagged events to a [`ResolutionTrail`], the
//! primary tool for diagnosing match-quality regressions. The trail is
//! append-only and serialized only at the process boundary. Batch-level
//! tallies live in [`BatchCounters`], which is safe to share across an
//! unordered worker pool.

use crate::models::MatchStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Typed reason a stage declined an input. Rejections are fall-through
/// signals, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StageRejection {
    /// The stage's feature flag is off
    FlagDisabled,
    /// Candidate pool is empty for this stage's requirements
    NoCandidates,
    /// No candidate's method is compatible with the predicted method
    MethodIncompatible,
    /// Candidate energy density outside the admission tolerance
    EnergyOutOfTolerance {
        /// Predicted kcal/100g
        predicted: f64,
        /// Candidate kcal/100g
        candidate: f64,
        /// Tolerance fraction applied
        tolerance: f64,
    },
    /// No raw-form Foundation seed available for conversion
    NoRawSeed,
    /// Conversion seed guardrail: seed is not raw-form
    SeedNotRaw,
    /// Conversion seed guardrail: seed is not Foundation-sourced
    SeedNotFoundation,
    /// No conversion factors configured for the (class, method) pair
    NoConversionFactors,
    /// Best lexical score fell below the admission floor
    BelowScoreFloor {
        /// Best score observed
        score: f64,
        /// Floor in effect (raised for sensitive protein classes)
        floor: f64,
    },
    /// Input matched no decomposition template
    NoTemplateMatch,
    /// Single-item proxy requested outside the whitelist
    ProxyOutsideWhitelist,
    /// Decomposition recursion depth guard tripped
    DepthExceeded {
        /// Depth at which the guard fired
        depth: u8,
    },
    /// No curated fallback entry for any key variant
    NoFallbackKey,
    /// Fallback candidate kcal outside its plausibility range
    ImplausibleKcal {
        /// Observed kcal/100g
        kcal: f64,
        /// Range minimum
        min: f64,
        /// Range maximum
        max: f64,
    },
    /// Fallback candidate name contains a blacklisted term
    RejectTermPresent {
        /// The matched term
        term: String,
    },
    /// Category permanently barred from the energy-only proxy
    CategoryBarred {
        /// The barred category key
        category: String,
    },
    /// Raw Foundation candidates exist, so the energy-only proxy is not needed
    RawCandidatesExist {
        /// Raw Foundation candidate count
        count: usize,
    },
    /// Semantic index not injected or returned nothing admissible
    IndexUnavailable,
    /// The candidate gateway could not be reached
    GatewayUnavailable,
}

/// One tagged telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum TraceEvent {
    /// A stage began evaluating the input
    StageAttempted {
        /// The stage
        stage: MatchStage,
    },
    /// A stage declined the input with a typed reason
    StageRejected {
        /// The stage
        stage: MatchStage,
        /// Why it declined
        rejection: StageRejection,
    },
    /// A stage admitted a result
    StageAccepted {
        /// The stage
        stage: MatchStage,
        /// Admitted reference id, when one exists
        reference_id: Option<u64>,
    },
    /// A conversion kernel fired
    KernelApplied {
        /// Kernel name
        kernel: String,
        /// Human-readable numeric effect
        effect: String,
    },
    /// A guardrail or plausibility gate tripped
    GuardrailTripped {
        /// What tripped and why
        detail: String,
    },
    /// Stage 1c switched a processed pick to a raw/fresh sibling
    PreferenceSwitched {
        /// Reference id before the switch
        prior_id: u64,
        /// Reference id after the switch
        new_id: u64,
    },
    /// Input was in the ignored vocabulary; resolution is a deliberate no-op
    IgnoredInput {
        /// Ignored class (alcohol, deprecated term)
        class: String,
    },
    /// Component mass reconciliation outcome for a decomposition
    MassReconciled {
        /// Input mass
        input_g: f64,
        /// Sum of component masses
        component_sum_g: f64,
    },
}

/// Append-only, ordered event log for a single resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTrail {
    /// When resolution started
    pub started_at: Option<DateTime<Utc>>,
    /// Ordered events
    events: Vec<TraceEvent>,
}

impl ResolutionTrail {
    /// Start a new trail stamped with the current time
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            events: Vec::new(),
        }
    }

    /// Append an event
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// Record a stage attempt
    pub fn attempted(&mut self, stage: MatchStage) {
        self.push(TraceEvent::StageAttempted { stage });
    }

    /// Record a typed rejection
    pub fn rejected(&mut self, stage: MatchStage, rejection: StageRejection) {
        self.push(TraceEvent::StageRejected { stage, rejection });
    }

    /// Record an admission
    pub fn accepted(&mut self, stage: MatchStage, reference_id: Option<u64>) {
        self.push(TraceEvent::StageAccepted {
            stage,
            reference_id,
        });
    }

    /// Ordered view of the events
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Whether any event matches a predicate
    #[must_use]
    pub fn contains(&self, predicate: impl Fn(&TraceEvent) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

/// Batch-level stage tallies, safe for concurrent increments across an
/// unordered worker pool. The only shared mutable state in the engine.
#[derive(Debug, Default)]
pub struct BatchCounters {
    hits: [AtomicU64; MatchStage::COUNT],
    rejections: [AtomicU64; MatchStage::COUNT],
    gateway_unavailable: AtomicU64,
}

impl BatchCounters {
    /// Fresh zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admission at a stage
    pub fn record_hit(&self, stage: MatchStage) {
        self.hits[stage.counter_slot()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejection at a stage
    pub fn record_rejection(&self, stage: MatchStage) {
        self.rejections[stage.counter_slot()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a gateway-unavailable outcome
    pub fn record_gateway_unavailable(&self) {
        self.gateway_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// Admissions observed at a stage
    #[must_use]
    pub fn hits(&self, stage: MatchStage) -> u64 {
        self.hits[stage.counter_slot()].load(Ordering::Relaxed)
    }

    /// Rejections observed at a stage
    #[must_use]
    pub fn rejections(&self, stage: MatchStage) -> u64 {
        self.rejections[stage.counter_slot()].load(Ordering::Relaxed)
    }

    /// Gateway-unavailable outcomes observed
    #[must_use]
    pub fn gateway_unavailable(&self) -> u64 {
        self.gateway_unavailable.load(Ordering::Relaxed)
    }

    /// Fold another counter set into this one (per-worker-then-merge)
    pub fn merge(&self, other: &Self) {
        for slot in 0..MatchStage::COUNT {
            self.hits[slot].fetch_add(other.hits[slot].load(Ordering::Relaxed), Ordering::Relaxed);
            self.rejections[slot].fetch_add(
                other.rejections[slot].load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
        self.gateway_unavailable.fetch_add(
            other.gateway_unavailable.load(Ordering::Relaxed),
            Ordering::Relaxed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_preserves_order() {
        let mut trail = ResolutionTrail::start();
        trail.attempted(MatchStage::CookedExact);
        trail.rejected(MatchStage::CookedExact, StageRejection::NoCandidates);
        trail.accepted(MatchStage::RawDirect, Some(7));
        let events = trail.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TraceEvent::StageAttempted { .. }));
        assert!(matches!(
            events[2],
            TraceEvent::StageAccepted {
                reference_id: Some(7),
                ..
            }
        ));
    }

    #[test]
    fn counters_merge_adds() {
        let a = BatchCounters::new();
        let b = BatchCounters::new();
        a.record_hit(MatchStage::CookedExact);
        b.record_hit(MatchStage::CookedExact);
        b.record_rejection(MatchStage::RawConverted);
        a.merge(&b);
        assert_eq!(a.hits(MatchStage::CookedExact), 2);
        assert_eq!(a.rejections(MatchStage::RawConverted), 1);
    }
}
