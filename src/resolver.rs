// ABOUTME: Stage orchestrator sequencing the alignment priority chain
// ABOUTME: Stages 1/1b/1c/1S/2/3-4/5/Z1/Z2/0 with short-circuit at first admission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Stage Orchestrator.
//!
//! A state machine over a fixed, numbered priority chain. Each stage
//! consumes the normalized query, the candidate pool, and the configuration,
//! and either admits a result or records a typed rejection; the orchestrator
//! falls through to the next stage on rejection and stops at the first
//! admission.
//!
//! Priority order: Stage 1 cooked-exact → 1b raw-direct → 1c raw-preference
//! correction → 1S semantic (flag + injected index) → 2 raw→cooked
//! conversion → 3/4 branded scoring → 5 decomposition/proxy → Z1 keyed
//! fallback → Z2 energy-only → 0 terminal no-match.
//!
//! A failing item never aborts a batch: gateway unavailability and internal
//! rejections degrade to the lowest-confidence terminal stage with the
//! reason in the trail.

use crate::config::recipes::RecipeComponent;
use crate::config::ResolverConfig;
use crate::convert::convert_raw_seed;
use crate::decompose::{
    component_admits, component_search_keys, masses_reconcile, plan_components,
};
use crate::fallback::{energy_proxy_eligibility, find_entry, gate_candidate};
use crate::gateway::CandidateGateway;
use crate::models::{
    AlignmentResult, DetectedItem, FoodCategory, FoodForm, MacroProfile, MatchStage,
    NutrientEstimate, ProvenanceTier, ReferenceEntry,
};
use crate::normalize::{normalize, NormalizedQuery};
use crate::scoring::rank_candidates;
use crate::semantic::SemanticIndex;
use crate::telemetry::{BatchCounters, ResolutionTrail, StageRejection, TraceEvent};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence attributed per admitting stage
const CONF_COOKED_EXACT: f64 = 0.95;
const CONF_RAW_DIRECT: f64 = 0.9;
const CONF_RAW_PREFERENCE: f64 = 0.85;
const CONF_SEMANTIC: f64 = 0.7;
const CONF_KEYED_FALLBACK: f64 = 0.5;
const CONF_KEYED_FALLBACK_LOW: f64 = 0.35;
const CONF_ENERGY_ONLY: f64 = 0.25;
/// Scored admissions scale confidence with the lexical score (max 0.8)
const CONF_SCORED_CEILING: f64 = 0.8;

/// Semantic retrieval fan-out
const SEMANTIC_TOP_K: usize = 5;

/// The alignment resolver
pub struct Resolver<G> {
    gateway: G,
    config: Arc<ResolverConfig>,
    semantic: Option<SemanticIndex>,
    counters: Arc<BatchCounters>,
}

impl<G: CandidateGateway> Resolver<G> {
    /// Build a resolver over a gateway and validated configuration
    #[must_use]
    pub fn new(gateway: G, config: Arc<ResolverConfig>) -> Self {
        Self {
            gateway,
            config,
            semantic: None,
            counters: Arc::new(BatchCounters::new()),
        }
    }

    /// Inject the optional semantic index. Its absence is a fully valid
    /// configuration; Stage 1S simply never admits.
    #[must_use]
    pub fn with_semantic_index(mut self, index: SemanticIndex) -> Self {
        self.semantic = Some(index);
        self
    }

    /// Batch-level stage counters
    #[must_use]
    pub fn counters(&self) -> Arc<BatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Resolve one detected item to an alignment result
    pub async fn resolve(&self, item: &DetectedItem) -> AlignmentResult {
        self.resolve_constrained(item.clone(), 0, None).await
    }

    /// Recursive entry point with an explicit depth counter and optional
    /// component constraints. Boxed so decomposition can re-enter.
    fn resolve_constrained<'a>(
        &'a self,
        item: DetectedItem,
        depth: u8,
        constraint: Option<&'a RecipeComponent>,
    ) -> Pin<Box<dyn Future<Output = AlignmentResult> + Send + 'a>> {
        Box::pin(async move {
            let result = self.resolve_inner(&item, depth, constraint).await;
            self.counters.record_hit(result.stage);
            result
        })
    }

    async fn resolve_inner(
        &self,
        item: &DetectedItem,
        depth: u8,
        constraint: Option<&RecipeComponent>,
    ) -> AlignmentResult {
        let config = &self.config;
        let mut trail = ResolutionTrail::start();

        let query = normalize(&item.name, &config.vocab);

        // Ignored vocabulary: deterministic no-op, not a failure
        if let Some(class) = query.hints.ignored_class {
            trail.push(TraceEvent::IgnoredInput {
                class: format!("{class:?}").to_lowercase(),
            });
            let mut result = AlignmentResult::no_match(query.tokens.join(" "), item.mass_g, trail);
            result.method_reason = Some("ignored vocabulary".to_owned());
            return result;
        }

        // Key is always present for non-ignored input (normalizer totality)
        let Some(key) = query.key.clone() else {
            return AlignmentResult::no_match(item.name.clone(), item.mass_g, trail);
        };
        let search_text = key.replace('_', " ");
        // Template/proxy triggers match against the full name: method words
        // ("fried rice") are part of the composite identity even though the
        // normalizer lifts them out of the key
        let full_name = item.name.trim().to_lowercase().replace('-', " ");

        // Pinned component references bypass the chain entirely
        if let Some(c) = constraint {
            if let Some(pinned) = c.pinned_id {
                if let Some(result) = self.resolve_pinned(pinned, item, &mut trail).await {
                    return result;
                }
            }
        }

        // Candidate pool fetch: the one boundary where unavailability is
        // a distinguishable outcome rather than a fall-through
        let mut candidates = match self
            .gateway
            .search(&search_text, None, config.candidate_limit)
            .await
        {
            Ok(pool) => pool,
            Err(e) if e.is_unavailable() => {
                self.counters.record_gateway_unavailable();
                trail.rejected(MatchStage::NoMatch, StageRejection::GatewayUnavailable);
                let mut result = AlignmentResult::no_match(item.name.clone(), item.mass_g, trail);
                result.method_reason = Some("gateway unavailable".to_owned());
                return result;
            }
            Err(e) => {
                debug!(error = %e, "candidate fetch failed; degrading to terminal stages");
                trail.rejected(MatchStage::NoMatch, StageRejection::GatewayUnavailable);
                Vec::new()
            }
        };

        // Deterministic pool order: tier trust, then id
        candidates.sort_by(|a, b| {
            a.tier
                .trust_rank()
                .cmp(&b.tier.trust_rank())
                .then_with(|| a.id.cmp(&b.id))
        });

        // Component constraints prune the pool before any stage sees it
        if let Some(c) = constraint {
            candidates.retain(|cand| component_admits(c, cand));
        }

        // Stage 1: cooked-exact admission
        trail.attempted(MatchStage::CookedExact);
        if let Some(result) =
            self.stage_cooked_exact(item, &query, &key, &candidates, &mut trail)
        {
            return result;
        }

        // Stage 1b: raw-direct admission
        trail.attempted(MatchStage::RawDirect);
        if let Some(result) = self.stage_raw_direct(item, &query, &key, &candidates, &mut trail) {
            return result;
        }

        // Stage 1S: optional semantic retrieval
        trail.attempted(MatchStage::Semantic);
        if let Some(result) = self
            .stage_semantic(item, &search_text, &mut trail)
            .await
        {
            return result;
        }

        // Stage 2: raw→cooked conversion
        trail.attempted(MatchStage::RawConverted);
        if let Some(result) = self.stage_convert(item, &query, &key, &candidates, &mut trail) {
            return result;
        }

        // Stages 3/4: branded scoring
        trail.attempted(MatchStage::BrandedScored);
        if let Some(result) = self.stage_scored(item, &query, &key, &candidates, &mut trail) {
            return result;
        }

        // Stage 5: decomposition / single-item proxy
        trail.attempted(MatchStage::Decomposed);
        if let Some(result) = self
            .stage_decompose(item, &full_name, depth, &mut trail)
            .await
        {
            return result;
        }

        // Stage Z1: keyed curated fallback
        trail.attempted(MatchStage::KeyedFallback);
        if let Some(result) = self
            .stage_keyed_fallback(item, &query, &key, &mut trail)
            .await
        {
            return result;
        }

        // Stage Z2: energy-only last resort
        trail.attempted(MatchStage::EnergyOnly);
        if let Some(result) = self.stage_energy_only(item, &key, &candidates, &mut trail) {
            return result;
        }

        // Stage 0: terminal no-match
        trail.accepted(MatchStage::NoMatch, None);
        AlignmentResult::no_match(item.name.clone(), item.mass_g, trail)
    }

    /// Direct admission of a pinned component reference
    async fn resolve_pinned(
        &self,
        pinned: u64,
        item: &DetectedItem,
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        match self.gateway.get_by_id(pinned).await {
            Ok(Some(record)) => {
                let stage = if record.form == FoodForm::Cooked {
                    MatchStage::CookedExact
                } else {
                    MatchStage::RawDirect
                };
                trail.accepted(stage, Some(record.id));
                let mut result = self.admit(
                    item,
                    &record,
                    stage,
                    CONF_RAW_DIRECT,
                    0.0,
                    std::mem::take(trail),
                );
                result.method_reason = Some("pinned component reference".to_owned());
                Some(result)
            }
            Ok(None) => {
                trail.push(TraceEvent::GuardrailTripped {
                    detail: format!("pinned reference {pinned} not found"),
                });
                None
            }
            Err(_) => {
                trail.rejected(MatchStage::RawDirect, StageRejection::GatewayUnavailable);
                None
            }
        }
    }

    /// Shared admission builder
    fn admit(
        &self,
        item: &DetectedItem,
        record: &ReferenceEntry,
        stage: MatchStage,
        confidence: f64,
        match_score: f64,
        trail: ResolutionTrail,
    ) -> AlignmentResult {
        info!(
            stage = stage.code(),
            reference_id = record.id,
            name = %record.name,
            "admitted"
        );
        AlignmentResult {
            reference_id: Some(record.id),
            name: record.name.clone(),
            tier: Some(record.tier),
            nutrients: NutrientEstimate::Full {
                per_100g: record.per_100g,
            },
            match_score,
            confidence,
            stage,
            method: record.method,
            method_reason: record
                .method
                .map(|m| format!("reference record method {m:?}")),
            conversion_applied: false,
            mass_g: item.mass_g,
            components: Vec::new(),
            trail,
        }
    }

    /// Stage 1: admit a cooked candidate whose method is compatible with the
    /// predicted method and whose energy density sits inside the proximity
    /// tolerance of the predicted energy.
    fn stage_cooked_exact(
        &self,
        item: &DetectedItem,
        query: &NormalizedQuery,
        key: &str,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::CookedExact;
        if candidates.is_empty() {
            trail.rejected(stage, StageRejection::NoCandidates);
            return None;
        }
        let Some(predicted_method) = query.method_hint else {
            trail.rejected(stage, StageRejection::MethodIncompatible);
            return None;
        };

        let tolerance = self.config.flags.energy_tolerance();
        let predicted_energy = item.predicted_energy_density();
        let mut energy_rejection = None;

        for cand in candidates {
            if cand.form != FoodForm::Cooked {
                continue;
            }
            // Lexical relevance: the pool is query-ranked but can carry
            // adjacent foods
            if cand.core_class != key && !covers_all_tokens(&query.tokens, &cand.name) {
                continue;
            }
            let Some(method) = cand.method else {
                continue;
            };
            if !method.is_compatible_with(predicted_method) {
                continue;
            }
            if let Some(pred) = predicted_energy {
                let deviation = (cand.per_100g.kcal - pred).abs() / pred.max(1.0);
                if deviation > tolerance {
                    energy_rejection = Some(StageRejection::EnergyOutOfTolerance {
                        predicted: pred,
                        candidate: cand.per_100g.kcal,
                        tolerance,
                    });
                    continue;
                }
            }
            // Stage 1c correction runs on the accepted pick
            let (record, stage, confidence) =
                self.apply_raw_preference(cand, candidates, trail);
            trail.accepted(stage, Some(record.id));
            return Some(self.admit(
                item,
                &record,
                stage,
                confidence,
                0.0,
                std::mem::take(trail),
            ));
        }

        trail.rejected(
            stage,
            energy_rejection.unwrap_or(StageRejection::MethodIncompatible),
        );
        None
    }

    /// Stage 1b: direct raw admission for raw-form predictions
    fn stage_raw_direct(
        &self,
        item: &DetectedItem,
        query: &NormalizedQuery,
        key: &str,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::RawDirect;
        if candidates.is_empty() {
            trail.rejected(stage, StageRejection::NoCandidates);
            return None;
        }
        if query.form_hint == Some(FoodForm::Cooked) {
            trail.rejected(stage, StageRejection::MethodIncompatible);
            return None;
        }

        let direct = candidates.iter().find(|c| {
            c.form == FoodForm::Raw
                && c.tier != ProvenanceTier::Branded
                && (c.core_class == key || covers_all_tokens(&query.tokens, &c.name))
        });
        let Some(cand) = direct else {
            trail.rejected(stage, StageRejection::NoCandidates);
            return None;
        };

        let (record, stage, confidence) = {
            let (record, switched_stage, conf) =
                self.apply_raw_preference(cand, candidates, trail);
            if switched_stage == MatchStage::RawPreference {
                (record, switched_stage, conf)
            } else {
                (record, MatchStage::RawDirect, CONF_RAW_DIRECT)
            }
        };
        trail.accepted(stage, Some(record.id));
        Some(self.admit(item, &record, stage, confidence, 0.0, std::mem::take(trail)))
    }

    /// Stage 1c: if the initial pick matches the processed-food vocabulary
    /// and a raw/fresh sibling exists, switch to it. Absent alternative
    /// keeps the original unchanged; never throws on empty input.
    fn apply_raw_preference(
        &self,
        picked: &ReferenceEntry,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> (ReferenceEntry, MatchStage, f64) {
        let vocab = &self.config.vocab;
        let picked_lower = picked.name.to_lowercase();
        if !vocab.is_processed_name(&picked_lower) {
            return (picked.clone(), MatchStage::CookedExact, CONF_COOKED_EXACT);
        }
        let sibling = candidates.iter().find(|c| {
            c.id != picked.id && vocab.is_raw_fresh_name(&c.name.to_lowercase())
        });
        sibling.map_or_else(
            || (picked.clone(), MatchStage::CookedExact, CONF_COOKED_EXACT),
            |s| {
                trail.push(TraceEvent::PreferenceSwitched {
                    prior_id: picked.id,
                    new_id: s.id,
                });
                (s.clone(), MatchStage::RawPreference, CONF_RAW_PREFERENCE)
            },
        )
    }

    /// Stage 1S: semantic retrieval over the injected index
    async fn stage_semantic(
        &self,
        item: &DetectedItem,
        search_text: &str,
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::Semantic;
        if !self.config.flags.semantic_retrieval {
            trail.rejected(stage, StageRejection::FlagDisabled);
            return None;
        }
        let Some(index) = &self.semantic else {
            trail.rejected(stage, StageRejection::IndexUnavailable);
            return None;
        };

        for hit in index.query(search_text, SEMANTIC_TOP_K) {
            let Ok(Some(record)) = self.gateway.get_by_id(hit.id).await else {
                continue;
            };
            // Energy-band filter keeps the index from surfacing implausible
            // neighbors
            let band = self
                .config
                .energy_bands
                .lookup(&record.core_class, record.method);
            if let Some(b) = band {
                if !b.contains(record.per_100g.kcal) {
                    continue;
                }
            }
            trail.accepted(stage, Some(record.id));
            return Some(self.admit(
                item,
                &record,
                stage,
                CONF_SEMANTIC,
                f64::from(hit.similarity),
                std::mem::take(trail),
            ));
        }
        trail.rejected(stage, StageRejection::IndexUnavailable);
        None
    }

    /// Stage 2: convert a raw Foundation seed through the physical kernels
    fn stage_convert(
        &self,
        item: &DetectedItem,
        query: &NormalizedQuery,
        key: &str,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::RawConverted;
        let config = &self.config;

        let Some(method) = query
            .method_hint
            .or_else(|| config.conversions.default_method_for(key))
        else {
            trail.rejected(stage, StageRejection::NoConversionFactors);
            return None;
        };

        let seed = candidates.iter().find(|c| {
            c.form == FoodForm::Raw
                && c.tier == ProvenanceTier::Foundation
                && (c.core_class == key || covers_all_tokens(&query.tokens, &c.name))
        });
        let Some(seed) = seed else {
            trail.rejected(stage, StageRejection::NoRawSeed);
            return None;
        };

        let Some(factors) = config.conversions.lookup(key, method) else {
            trail.rejected(stage, StageRejection::NoConversionFactors);
            return None;
        };
        let band = config.energy_bands.lookup(key, Some(method));

        match convert_raw_seed(seed, factors, band, &config.flags) {
            Ok(converted) => {
                for line in &converted.provenance {
                    trail.push(TraceEvent::KernelApplied {
                        kernel: line
                            .split([' ', ':'])
                            .next()
                            .unwrap_or("kernel")
                            .to_owned(),
                        effect: line.clone(),
                    });
                }
                trail.accepted(stage, Some(seed.id));
                let mut result = self.admit(
                    item,
                    seed,
                    stage,
                    converted.confidence,
                    0.0,
                    std::mem::take(trail),
                );
                result.nutrients = NutrientEstimate::Full {
                    per_100g: converted.per_100g,
                };
                result.method = Some(method);
                result.method_reason = Some(format!(
                    "converted raw seed toward {method:?} ({} kernels)",
                    converted.provenance.len()
                ));
                result.conversion_applied = true;
                Some(result)
            }
            Err(rejection) => {
                trail.push(TraceEvent::GuardrailTripped {
                    detail: format!("conversion seed guardrail: {rejection:?}"),
                });
                trail.rejected(stage, rejection);
                None
            }
        }
    }

    /// Stages 3/4: lexical token-coverage admission
    fn stage_scored(
        &self,
        item: &DetectedItem,
        query: &NormalizedQuery,
        key: &str,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::BrandedScored;
        if candidates.is_empty() {
            trail.rejected(stage, StageRejection::NoCandidates);
            return None;
        }
        let best = rank_candidates(
            &query.tokens,
            key,
            candidates,
            item.predicted_energy_density(),
            &self.config.vocab,
            &self.config.flags,
        );
        let Some(best) = best else {
            trail.rejected(
                stage,
                StageRejection::BelowScoreFloor {
                    score: 0.0,
                    floor: 2.0,
                },
            );
            return None;
        };
        trail.accepted(stage, Some(best.entry.id));
        let confidence = (best.score / 5.0 * CONF_SCORED_CEILING).clamp(0.0, CONF_SCORED_CEILING);
        Some(self.admit(
            item,
            &best.entry,
            stage,
            confidence,
            best.score,
            std::mem::take(trail),
        ))
    }

    /// Stage 5: single-item proxy, then template decomposition with
    /// recursive component resolution under the depth guard
    async fn stage_decompose(
        &self,
        item: &DetectedItem,
        full_name: &str,
        depth: u8,
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::Decomposed;
        let config = &self.config;

        // Single-item proxy: whitelisted formulas only
        if let Some(proxy) = config.recipes.match_proxy(full_name) {
            if config.recipes.is_whitelisted_proxy_class(&proxy.class) {
                trail.accepted(stage, None);
                return Some(AlignmentResult {
                    reference_id: None,
                    name: proxy.class.clone(),
                    tier: None,
                    nutrients: NutrientEstimate::Full {
                        per_100g: proxy.per_100g,
                    },
                    match_score: 0.0,
                    confidence: CONF_RAW_PREFERENCE,
                    stage,
                    method: None,
                    method_reason: Some("single-item proxy formula".to_owned()),
                    conversion_applied: false,
                    mass_g: item.mass_g,
                    components: Vec::new(),
                    trail: std::mem::take(trail),
                });
            }
            // Outside the whitelist: flagged violation, never silent
            trail.push(TraceEvent::GuardrailTripped {
                detail: format!("proxy class {} outside whitelist", proxy.class),
            });
            trail.rejected(stage, StageRejection::ProxyOutsideWhitelist);
            return None;
        }

        let Some(template) = config.recipes.match_template(full_name) else {
            trail.rejected(stage, StageRejection::NoTemplateMatch);
            return None;
        };

        if depth >= config.flags.max_decomposition_depth {
            trail.rejected(stage, StageRejection::DepthExceeded { depth });
            return None;
        }

        let plans = plan_components(template, item.mass_g);
        let mut components = Vec::with_capacity(plans.len());
        for plan in &plans {
            let mut resolved = None;
            for search_key in component_search_keys(plan.component) {
                let child = DetectedItem {
                    name: search_key.to_owned(),
                    form: None,
                    mass_g: plan.mass_g,
                    count: None,
                    confidence: item.confidence,
                    kcal_hint: None,
                };
                let child_result = self
                    .resolve_constrained(child, depth + 1, Some(plan.component))
                    .await;
                if child_result.stage != MatchStage::NoMatch {
                    resolved = Some(child_result);
                    break;
                }
                resolved = Some(child_result);
            }
            if let Some(r) = resolved {
                components.push(r);
            }
        }

        let component_masses: Vec<f64> = components.iter().map(|c| c.mass_g).collect();
        trail.push(TraceEvent::MassReconciled {
            input_g: item.mass_g,
            component_sum_g: component_masses.iter().sum(),
        });
        if !masses_reconcile(item.mass_g, &component_masses) {
            trail.push(TraceEvent::GuardrailTripped {
                detail: "component masses do not reconcile with input mass".to_owned(),
            });
        }

        // Parent macros: mass-weighted blend, only when every component is
        // fully estimated, never a partial aggregate
        let nutrients = blend_components(&components, item.mass_g);
        let confidence = components
            .iter()
            .map(|c| c.confidence)
            .fold(1.0f64, f64::min);

        trail.accepted(stage, None);
        Some(AlignmentResult {
            reference_id: None,
            name: template.name.clone(),
            tier: None,
            nutrients,
            match_score: 0.0,
            confidence,
            stage,
            method: None,
            method_reason: Some(format!(
                "decomposed via template {} into {} components",
                template.name,
                components.len()
            )),
            conversion_applied: false,
            mass_g: item.mass_g,
            components,
            trail: std::mem::take(trail),
        })
    }

    /// Stage Z1: curated keyed fallback, alternates in listed order under
    /// the same gates
    async fn stage_keyed_fallback(
        &self,
        item: &DetectedItem,
        query: &NormalizedQuery,
        key: &str,
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::KeyedFallback;
        let Some((entry, variant)) = find_entry(&self.config.fallbacks, key, &query.tokens)
        else {
            trail.rejected(stage, StageRejection::NoFallbackKey);
            return None;
        };
        debug!(key, variant = %variant, "fallback entry matched");

        let candidates = std::iter::once(&entry.primary).chain(entry.alternates.iter());
        for curated in candidates {
            let record = match self.gateway.get_by_id(curated.reference_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    trail.push(TraceEvent::GuardrailTripped {
                        detail: format!(
                            "fallback reference {} not found",
                            curated.reference_id
                        ),
                    });
                    continue;
                }
                Err(_) => {
                    trail.rejected(stage, StageRejection::GatewayUnavailable);
                    return None;
                }
            };
            match gate_candidate(curated, &record) {
                Ok(()) => {
                    let confidence = if entry.low_confidence {
                        CONF_KEYED_FALLBACK_LOW
                    } else {
                        CONF_KEYED_FALLBACK
                    };
                    trail.accepted(stage, Some(record.id));
                    let mut result = self.admit(
                        item,
                        &record,
                        stage,
                        confidence,
                        0.0,
                        std::mem::take(trail),
                    );
                    result.method_reason = entry
                        .peel_hint
                        .clone()
                        .map(|p| format!("curated fallback ({p})"))
                        .or(Some("curated fallback".to_owned()));
                    return Some(result);
                }
                Err(rejection) => {
                    trail.rejected(stage, rejection);
                }
            }
        }
        // Primary and every alternate failed: the entry is discarded for
        // this call
        None
    }

    /// Stage Z2: strictly-gated energy-only proxy
    fn stage_energy_only(
        &self,
        item: &DetectedItem,
        key: &str,
        candidates: &[ReferenceEntry],
        trail: &mut ResolutionTrail,
    ) -> Option<AlignmentResult> {
        let stage = MatchStage::EnergyOnly;
        let category = FoodCategory::classify(key);
        let raw_foundation_count = candidates
            .iter()
            .filter(|c| c.form == FoodForm::Raw && c.tier == ProvenanceTier::Foundation)
            .count();

        if let Err(rejection) = energy_proxy_eligibility(category, raw_foundation_count) {
            trail.rejected(stage, rejection);
            return None;
        }
        let Some(band) = self.config.energy_bands.category_band(category) else {
            trail.rejected(stage, StageRejection::NoCandidates);
            return None;
        };

        // Clamp the detector hint into the band when present; otherwise the
        // band midpoint stands in
        let kcal = item
            .predicted_energy_density()
            .map_or_else(|| band.midpoint(), |d| band.clamp(d));

        trail.accepted(stage, None);
        Some(AlignmentResult {
            reference_id: None,
            name: key.to_owned(),
            tier: None,
            nutrients: NutrientEstimate::EnergyOnly { kcal_per_100g: kcal },
            match_score: 0.0,
            confidence: CONF_ENERGY_ONLY,
            stage,
            method: None,
            method_reason: Some(format!(
                "energy-only proxy for category {category:?}"
            )),
            conversion_applied: false,
            mass_g: item.mass_g,
            components: Vec::new(),
            trail: std::mem::take(trail),
        })
    }
}

impl<G: CandidateGateway + 'static> Resolver<G> {
    /// Resolve a batch across the worker pool. Items are independent; a
    /// failing item degrades to its terminal stage without affecting the
    /// rest. Results come back in input order.
    pub async fn resolve_batch(
        self: &Arc<Self>,
        items: Vec<DetectedItem>,
    ) -> Vec<AlignmentResult> {
        let mut set = tokio::task::JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let resolver = Arc::clone(self);
            set.spawn(async move { (index, resolver.resolve(&item).await) });
        }
        let mut slots: Vec<Option<AlignmentResult>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((index, result)) = joined {
                if slots.len() <= index {
                    slots.resize_with(index + 1, || None);
                }
                slots[index] = Some(result);
            }
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    AlignmentResult::no_match("unresolved", 0.0, ResolutionTrail::start())
                })
            })
            .collect()
    }
}

/// Whether every query token appears in a candidate name
fn covers_all_tokens(tokens: &[String], candidate_name: &str) -> bool {
    let name_lower = candidate_name.to_lowercase();
    !tokens.is_empty() && tokens.iter().all(|t| name_lower.contains(t.as_str()))
}

/// Mass-weighted per-100g blend across fully-estimated components; Unknown
/// when any component lacks a full profile
fn blend_components(
    components: &[AlignmentResult],
    total_mass_g: f64,
) -> NutrientEstimate {
    if components.is_empty() || total_mass_g <= 0.0 {
        return NutrientEstimate::Unknown;
    }
    let mut blended = MacroProfile::default();
    for c in components {
        let Some(p) = c.nutrients.per_100g() else {
            return NutrientEstimate::Unknown;
        };
        let weight = c.mass_g / total_mass_g;
        blended.protein_g += p.protein_g * weight;
        blended.carbs_g += p.carbs_g * weight;
        blended.fat_g += p.fat_g * weight;
        blended.kcal += p.kcal * weight;
        blended.fiber_g += p.fiber_g * weight;
    }
    NutrientEstimate::Full { per_100g: blended }
}
