// SPDX-License-Identifier: MIT

//! Typed error handling for verity-rs
//!
//! One taxonomy for the whole crate: oracle and search failures propagate
//! unchanged to the caller of the workflow, wiring mistakes are fatal, and
//! the engine's step bound has its own variant so callers can tell a
//! runaway grading loop apart from an outage.

use thiserror::Error;

/// Top-level error type for verity-rs
#[derive(Debug, Error)]
pub enum VerityError {
    /// An oracle-backed call (router, grader, rewriter, generator) failed
    /// to return a parseable result
    #[error("Oracle call failed in {stage}: {message}")]
    OracleUnavailable { stage: String, message: String },

    /// Web search or local corpus lookup failed
    #[error("Search failed via {provider}: {message}")]
    SearchUnavailable { provider: String, message: String },

    /// A conditional edge produced a label the transition table does not map.
    /// Contract mismatch between a decision and the graph wiring; never retried.
    #[error("Decision '{decision}' returned unmapped label '{label}'")]
    UnroutableDecision { decision: String, label: String },

    /// Invalid graph wiring (missing edge, unreachable terminal)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The run exceeded the configured node-execution bound
    #[error("Workflow exceeded {limit} node executions")]
    MaxIterationsExceeded { limit: u32 },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl VerityError {
    /// Create an oracle failure for a named adapter stage
    pub fn oracle(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a search failure for a named source
    pub fn search(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SearchUnavailable {
            provider: source.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
