// SPDX-License-Identifier: MIT

//! Narrow oracle adapters
//!
//! Each adapter wraps the reasoning oracle behind a single-purpose contract
//! with a fixed output shape:
//! - [QuestionRouter] - pick the datasource for a question
//! - [RetrievalGrader] - per-document relevance check
//! - [HallucinationGrader] - is the generation grounded in the documents
//! - [AnswerGrader] - does the generation resolve the question
//! - [QuestionRewriter] - reformulate a question for retrieval
//! - [Generator] - produce an answer from context + question
//!
//! The `Llm*` implementations own their prompts and structured-output
//! schemas; the engine only sees the traits.

use super::ChatOracle;
use crate::error::VerityError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The router's choice of retrieval path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Datasource {
    Vectorstore,
    WebSearch,
}

/// Routing decision produced once per incoming question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RouteDecision {
    /// Route the question to web search or the local vectorstore
    pub datasource: Datasource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

/// Binary grade shared by the retrieval, hallucination and answer graders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BinaryGrade {
    /// 'yes' or 'no'
    pub binary_score: YesNo,
}

impl BinaryGrade {
    pub fn is_yes(&self) -> bool {
        self.binary_score == YesNo::Yes
    }
}

// --- Static schemas ---

static ROUTE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::to_value(schema_for!(RouteDecision)).expect("route schema serializes")
});

static GRADE_SCHEMA: Lazy<Value> =
    Lazy::new(|| serde_json::to_value(schema_for!(BinaryGrade)).expect("grade schema serializes"));

// --- Contracts ---

#[async_trait]
pub trait QuestionRouter: Send + Sync {
    async fn route(&self, question: &str) -> Result<RouteDecision, VerityError>;
}

#[async_trait]
pub trait RetrievalGrader: Send + Sync {
    async fn grade(&self, document: &str, question: &str) -> Result<BinaryGrade, VerityError>;
}

#[async_trait]
pub trait HallucinationGrader: Send + Sync {
    async fn grade(&self, documents: &str, generation: &str) -> Result<BinaryGrade, VerityError>;
}

#[async_trait]
pub trait AnswerGrader: Send + Sync {
    async fn grade(&self, question: &str, generation: &str) -> Result<BinaryGrade, VerityError>;
}

#[async_trait]
pub trait QuestionRewriter: Send + Sync {
    async fn rewrite(&self, question: &str) -> Result<String, VerityError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, context: &str, question: &str) -> Result<String, VerityError>;
}

fn decode<T: serde::de::DeserializeOwned>(stage: &str, value: Value) -> Result<T, VerityError> {
    serde_json::from_value(value).map_err(|e| VerityError::oracle(stage, e.to_string()))
}

// --- Router ---

/// LLM-backed question router
pub struct LlmRouter {
    oracle: Arc<dyn ChatOracle>,
    system: String,
}

impl LlmRouter {
    /// `corpus_description` tells the router what the local corpus covers,
    /// e.g. "agents, prompt engineering, and adversarial attacks".
    pub fn new(oracle: Arc<dyn ChatOracle>, corpus_description: &str) -> Self {
        let system = format!(
            "You are an expert at routing a user question to a vectorstore or web search. \
             The vectorstore contains documents related to {}. \
             Use the vectorstore for questions on these topics. Otherwise, use web-search.",
            corpus_description
        );
        Self { oracle, system }
    }
}

#[async_trait]
impl QuestionRouter for LlmRouter {
    async fn route(&self, question: &str) -> Result<RouteDecision, VerityError> {
        let value = self
            .oracle
            .complete_structured(&self.system, question, "route_query", &ROUTE_SCHEMA)
            .await?;
        decode("router", value)
    }
}

// --- Retrieval grader ---

const RETRIEVAL_GRADER_SYSTEM: &str =
    "You are a grader assessing relevance of a retrieved document to a user question. \
     If the document contains keyword(s) or semantic meaning related to the user question, \
     grade it as relevant. It does not need to be a stringent test. The goal is to filter \
     out erroneous retrievals. Give a binary score 'yes' or 'no' to indicate whether the \
     document is relevant to the question.";

/// LLM-backed per-document relevance grader
pub struct LlmRetrievalGrader {
    oracle: Arc<dyn ChatOracle>,
}

impl LlmRetrievalGrader {
    pub fn new(oracle: Arc<dyn ChatOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl RetrievalGrader for LlmRetrievalGrader {
    async fn grade(&self, document: &str, question: &str) -> Result<BinaryGrade, VerityError> {
        let user = format!(
            "Retrieved document: \n\n {} \n\n User question: {}",
            document, question
        );
        let value = self
            .oracle
            .complete_structured(RETRIEVAL_GRADER_SYSTEM, &user, "grade_documents", &GRADE_SCHEMA)
            .await?;
        decode("retrieval-grader", value)
    }
}

// --- Hallucination grader ---

const HALLUCINATION_GRADER_SYSTEM: &str =
    "You are a grader assessing whether an LLM generation is grounded in / supported by a \
     set of retrieved facts. Give a binary score 'yes' or 'no'. 'Yes' means that the answer \
     is grounded in / supported by the set of facts.";

/// LLM-backed groundedness grader
pub struct LlmHallucinationGrader {
    oracle: Arc<dyn ChatOracle>,
}

impl LlmHallucinationGrader {
    pub fn new(oracle: Arc<dyn ChatOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl HallucinationGrader for LlmHallucinationGrader {
    async fn grade(&self, documents: &str, generation: &str) -> Result<BinaryGrade, VerityError> {
        let user = format!(
            "Set of facts: \n\n {} \n\n LLM generation: {}",
            documents, generation
        );
        let value = self
            .oracle
            .complete_structured(
                HALLUCINATION_GRADER_SYSTEM,
                &user,
                "grade_hallucinations",
                &GRADE_SCHEMA,
            )
            .await?;
        decode("hallucination-grader", value)
    }
}

// --- Answer grader ---

const ANSWER_GRADER_SYSTEM: &str =
    "You are a grader assessing whether an answer addresses / resolves a question. \
     Give a binary score 'yes' or 'no'. 'Yes' means that the answer resolves the question.";

/// LLM-backed usefulness grader
pub struct LlmAnswerGrader {
    oracle: Arc<dyn ChatOracle>,
}

impl LlmAnswerGrader {
    pub fn new(oracle: Arc<dyn ChatOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl AnswerGrader for LlmAnswerGrader {
    async fn grade(&self, question: &str, generation: &str) -> Result<BinaryGrade, VerityError> {
        let user = format!(
            "User question: \n\n {} \n\n LLM generation: {}",
            question, generation
        );
        let value = self
            .oracle
            .complete_structured(ANSWER_GRADER_SYSTEM, &user, "grade_answer", &GRADE_SCHEMA)
            .await?;
        decode("answer-grader", value)
    }
}

// --- Question rewriter ---

const REWRITER_SYSTEM: &str =
    "You are a question re-writer that converts an input question to a better version that \
     is optimized for vectorstore retrieval. Look at the input and try to reason about the \
     underlying semantic intent / meaning.";

/// LLM-backed question rewriter
pub struct LlmQuestionRewriter {
    oracle: Arc<dyn ChatOracle>,
}

impl LlmQuestionRewriter {
    pub fn new(oracle: Arc<dyn ChatOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl QuestionRewriter for LlmQuestionRewriter {
    async fn rewrite(&self, question: &str) -> Result<String, VerityError> {
        let user = format!(
            "Here is the initial question: \n\n {} \n Formulate an improved question.",
            question
        );
        let rewritten = self.oracle.complete(REWRITER_SYSTEM, &user).await?;
        let rewritten = rewritten.trim().to_string();
        if rewritten.is_empty() {
            return Err(VerityError::oracle("rewriter", "empty rewritten question"));
        }
        Ok(rewritten)
    }
}

// --- Generator ---

const GENERATOR_SYSTEM: &str =
    "You are an assistant for question-answering tasks. Use the following pieces of \
     retrieved context to answer the question. If you don't know the answer, just say \
     that you don't know. Use three sentences maximum and keep the answer concise.";

/// LLM-backed answer generator
pub struct LlmGenerator {
    oracle: Arc<dyn ChatOracle>,
}

impl LlmGenerator {
    pub fn new(oracle: Arc<dyn ChatOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String, VerityError> {
        let user = format!("Question: {} \n\nContext: {} \n\nAnswer:", question, context);
        self.oracle.complete(GENERATOR_SYSTEM, &user).await
    }
}
