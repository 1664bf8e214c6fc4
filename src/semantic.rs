// ABOUTME: Optional semantic retrieval index for Stage 1S
// ABOUTME: Checksum-gated load, feature-hash embeddings, brute-force cosine top-k
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Semantic retrieval (Stage 1S).
//!
//! An optional, injected capability: the orchestrator consults the index
//! only when it is present and the `semantic_retrieval` flag is on. Its
//! absence is a fully valid configuration.
//!
//! Index files are JSON records built offline from reference-record
//! descriptions, protected by a sibling `.sha256` checksum validated on
//! load: a corrupted index is rejected outright rather than silently
//! degrading matches. Embeddings use deterministic token feature-hashing so
//! the offline builder and the query path stay in lockstep without a model
//! runtime.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Embedding dimensionality for the feature-hash space
pub const EMBEDDING_DIM: usize = 256;

/// One indexed reference record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Reference record id
    pub id: u64,
    /// Record description the embedding was built from
    pub description: String,
    /// Embedding vector, l2-normalized
    pub embedding: Vec<f32>,
}

/// A semantic match with its cosine similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticHit {
    /// Reference record id
    pub id: u64,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Brute-force cosine index over reference-record descriptions
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    records: Vec<IndexRecord>,
}

/// Deterministic feature-hash embedding of a text, l2-normalized.
/// Shared by the offline builder and the query path.
#[must_use]
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();
        let slot = (h % EMBEDDING_DIM as u64) as usize;
        // Sign bit from a higher hash bit spreads collisions
        let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        v[slot] += sign;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

impl SemanticIndex {
    /// Build an index in memory from (id, description) pairs
    #[must_use]
    pub fn build(entries: impl IntoIterator<Item = (u64, String)>) -> Self {
        let records = entries
            .into_iter()
            .map(|(id, description)| {
                let embedding = hash_embedding(&description);
                IndexRecord {
                    id,
                    description,
                    embedding,
                }
            })
            .collect();
        Self { records }
    }

    /// Load an index file, validating its sibling `.sha256` checksum.
    ///
    /// # Errors
    ///
    /// Returns `AppError::artifact_corrupted` on checksum mismatch or a
    /// malformed payload, and an IO-wrapped error when either file is
    /// unreadable. A corrupted index never loads.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::not_found(format!("semantic index {}: {e}", path.display())))?;

        let checksum_path = path.with_extension("json.sha256");
        let expected = std::fs::read_to_string(&checksum_path).map_err(|e| {
            AppError::not_found(format!(
                "semantic index checksum {}: {e}",
                checksum_path.display()
            ))
        })?;
        let actual = sha256_hex(&bytes);
        if expected.trim() != actual {
            return Err(AppError::artifact_corrupted(format!(
                "semantic index checksum mismatch: expected {}, got {actual}",
                expected.trim()
            )));
        }

        let records: Vec<IndexRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::artifact_corrupted(format!("semantic index payload: {e}")))?;
        for r in &records {
            if r.embedding.len() != EMBEDDING_DIM {
                return Err(AppError::artifact_corrupted(format!(
                    "record {} embedding has dimension {}, expected {EMBEDDING_DIM}",
                    r.id,
                    r.embedding.len()
                )));
            }
        }
        Ok(Self { records })
    }

    /// Write the index and its checksum sidecar
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or either write fails.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(&self.records)
            .map_err(|e| AppError::internal(format!("serialize semantic index: {e}")))?;
        std::fs::write(path, &bytes)
            .map_err(|e| AppError::internal(format!("write semantic index: {e}")))?;
        let checksum_path = path.with_extension("json.sha256");
        std::fs::write(&checksum_path, sha256_hex(&bytes))
            .map_err(|e| AppError::internal(format!("write semantic index checksum: {e}")))?;
        Ok(())
    }

    /// Number of indexed records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Top-k records by cosine similarity to the query text.
    /// Deterministic: similarity descending, then lowest id.
    #[must_use]
    pub fn query(&self, text: &str, top_k: usize) -> Vec<SemanticHit> {
        let query_vec = hash_embedding(text);
        let mut hits: Vec<SemanticHit> = self
            .records
            .iter()
            .map(|r| SemanticHit {
                id: r.id,
                similarity: cosine(&query_vec, &r.embedding),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        hits
    }
}
