// ABOUTME: Library entry point for the nutralign alignment engine
// ABOUTME: Resolves vision-derived food descriptions to nutrition reference records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # nutralign
//!
//! An alignment-and-conversion engine that resolves an imprecise,
//! vision-derived food description (name, preparation form, mass, optional
//! energy hint) to a specific entry in a structured nutrition reference
//! database, producing a trustworthy per-100g macro/energy profile with
//! full provenance.
//!
//! ## Resolution chain
//!
//! The resolver runs a fixed, numbered priority chain and stops at the
//! first admission:
//!
//! 1. **Stage 1**: cooked-exact admission (method-compatible, energy-gated)
//! 2. **Stage 1b**: raw-direct admission
//! 3. **Stage 1c**: processed pick corrected to a raw/fresh sibling
//! 4. **Stage 1S**: optional semantic retrieval over a checksum-gated index
//! 5. **Stage 2**: raw→cooked physical conversion (hydration, shrinkage,
//!    fat rendering, oil uptake, retention, Atwater check, band clamp)
//! 6. **Stages 3/4**: lexical token-coverage scoring for branded records
//! 7. **Stage 5**: compositional decomposition with recursive resolution
//! 8. **Stage Z1**: curated keyed fallback
//! 9. **Stage Z2**: strictly-gated energy-only proxy
//! 10. **Stage 0**: terminal no-match
//!
//! Every resolution emits a structured accept/reject trail sufficient to
//! explain the outcome without re-running it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nutralign::config::ResolverConfig;
//! use nutralign::gateway::{FdcGateway, FdcGatewayConfig};
//! use nutralign::models::DetectedItem;
//! use nutralign::resolver::Resolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ResolverConfig::load()?);
//! let gateway = FdcGateway::new(FdcGatewayConfig::default());
//! let resolver = Resolver::new(gateway, config);
//!
//! let item = DetectedItem::new("grilled chicken breast", 150.0);
//! let result = resolver.resolve(&item).await;
//! println!("{} via stage {}", result.name, result.stage.code());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod decompose;
pub mod errors;
pub mod fallback;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod scoring;
pub mod semantic;
pub mod telemetry;

pub use errors::{AppError, ErrorCode};
pub use models::{
    AlignmentResult, CookMethod, DetectedItem, FoodCategory, FoodForm, MacroProfile, MatchStage,
    NutrientEstimate, ProvenanceTier, ReferenceEntry,
};
pub use resolver::Resolver;
