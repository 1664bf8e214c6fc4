// ABOUTME: Configuration error types for fail-fast load-time validation
// ABOUTME: Malformed tables are rejected before any resolution is served
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A bound pair is inverted or degenerate
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Component weights do not satisfy their sum invariant
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// A scalar is outside its documented physical range
    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    /// A required field is missing
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A key appears more than once where uniqueness is required
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// Override file or environment value could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}
