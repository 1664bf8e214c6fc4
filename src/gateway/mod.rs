// ABOUTME: Candidate gateway trait over the external nutrition reference store
// ABOUTME: Async search/get_by_id plus an in-memory implementation for tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Candidate Gateway.
//!
//! The reference database is an external, read-only, possibly stale
//! collaborator. The resolver only ever calls [`CandidateGateway::search`]
//! and [`CandidateGateway::get_by_id`]; it never writes back. Transport
//! failures surface as `AppError` with an unavailable code so the
//! orchestrator can emit a distinguishable outcome instead of a false match.

pub mod fdc;

pub use fdc::{FdcGateway, FdcGatewayConfig};

use crate::errors::AppError;
use crate::models::{ProvenanceTier, ReferenceEntry};
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only access to the nutrition reference store
#[async_trait]
pub trait CandidateGateway: Send + Sync {
    /// Ranked candidate records for a query string
    ///
    /// # Errors
    ///
    /// Returns `AppError` with an unavailable code when the store cannot be
    /// reached; an empty vector is a definite negative answer.
    async fn search(
        &self,
        query: &str,
        tier_filter: Option<ProvenanceTier>,
        limit: u32,
    ) -> Result<Vec<ReferenceEntry>, AppError>;

    /// Fetch one record by id; `Ok(None)` means the id does not exist
    ///
    /// # Errors
    ///
    /// Returns `AppError` with an unavailable code when the store cannot be
    /// reached.
    async fn get_by_id(&self, id: u64) -> Result<Option<ReferenceEntry>, AppError>;
}

/// In-memory gateway over a fixed corpus. Search is token-containment over
/// record names, ordered by provenance tier then id, deterministic for
/// tests and offline replays.
#[derive(Debug, Default)]
pub struct StaticGateway {
    records: HashMap<u64, ReferenceEntry>,
}

impl StaticGateway {
    /// Build a gateway over a record corpus
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Number of records in the corpus
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CandidateGateway for StaticGateway {
    async fn search(
        &self,
        query: &str,
        tier_filter: Option<ProvenanceTier>,
        limit: u32,
    ) -> Result<Vec<ReferenceEntry>, AppError> {
        if query.is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        let needle_tokens: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();

        let mut hits: Vec<ReferenceEntry> = self
            .records
            .values()
            .filter(|r| tier_filter.is_none_or(|t| r.tier == t))
            .filter(|r| {
                let name = r.name.to_lowercase();
                let class = r.core_class.as_str();
                needle_tokens
                    .iter()
                    .any(|t| name.contains(t.as_str()) || class.contains(t.as_str()))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            a.tier
                .trust_rank()
                .cmp(&b.tier.trust_rank())
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<ReferenceEntry>, AppError> {
        Ok(self.records.get(&id).cloned())
    }
}

/// Gateway that always fails with an unavailable error; exercises the
/// orchestrator's degraded path in tests
#[derive(Debug, Default)]
pub struct UnavailableGateway;

#[async_trait]
impl CandidateGateway for UnavailableGateway {
    async fn search(
        &self,
        _query: &str,
        _tier_filter: Option<ProvenanceTier>,
        _limit: u32,
    ) -> Result<Vec<ReferenceEntry>, AppError> {
        Err(AppError::unavailable("reference store", "connection refused"))
    }

    async fn get_by_id(&self, _id: u64) -> Result<Option<ReferenceEntry>, AppError> {
        Err(AppError::unavailable("reference store", "connection refused"))
    }
}
