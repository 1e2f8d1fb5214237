//! Retrieval module - document providers
//!
//! Two interchangeable sources, both "given a question, produce text":
//! - [corpus] - the local indexed corpus (similarity search)
//! - [web] - live web search
//!
//! The engine consumes them through the [CorpusSearch] and [WebSearch]
//! traits and never sees how documents are stored or fetched.

pub mod corpus;
pub mod web;

pub use corpus::InMemoryCorpus;
pub use web::BraveSearch;

use crate::error::VerityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved text document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document body
    pub content: String,
    /// Provenance (file path, URL, or "web" for joined search results)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: Some(source.into()),
        }
    }
}

/// Local indexed corpus lookup
#[async_trait]
pub trait CorpusSearch: Send + Sync {
    /// Return candidate documents for a question, best match first
    async fn search(&self, question: &str) -> Result<Vec<Document>, VerityError>;
}

/// Live web search
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Return result snippets for a question, best match first
    async fn search(&self, question: &str) -> Result<Vec<String>, VerityError>;
}
