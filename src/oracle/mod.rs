// SPDX-License-Identifier: MIT

//! Oracle module - the reasoning-service seam
//!
//! This module provides the low-level [ChatOracle] trait and the narrow
//! adapters built on top of it:
//! - [openai] - OpenAI chat-completions implementation
//! - [adapters] - router, graders, rewriter and generator contracts
//!
//! The oracle is consumed as a black-box function with a typed contract;
//! everything that knows about prompts or output shapes lives in the
//! adapters, not in the engine.

pub mod adapters;
pub mod openai;

pub use adapters::{
    AnswerGrader, BinaryGrade, Datasource, Generator, HallucinationGrader, LlmAnswerGrader,
    LlmGenerator, LlmHallucinationGrader, LlmQuestionRewriter, LlmRetrievalGrader, LlmRouter,
    QuestionRewriter, QuestionRouter, RetrievalGrader, RouteDecision, YesNo,
};
pub use openai::OpenAiOracle;

use crate::error::VerityError;
use async_trait::async_trait;
use serde_json::Value;

/// Core trait for the external reasoning service.
///
/// Both methods are blocking request/response calls from the engine's point
/// of view; implementations own their transport, timeout and retry policy.
#[async_trait]
pub trait ChatOracle: Send + Sync {
    /// Free-text completion for a system + user prompt pair
    async fn complete(&self, system: &str, user: &str) -> Result<String, VerityError>;

    /// Completion constrained to a JSON schema; returns the parsed value
    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, VerityError>;
}
