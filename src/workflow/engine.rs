// SPDX-License-Identifier: MIT

//! Workflow executor and node logic
//!
//! The engine owns one [TransitionTable] and the injected collaborators,
//! and drives a run from START to END: resolve the next step, execute the
//! node, merge its partial update, repeat. All external calls happen inside
//! nodes and decisions; the engine itself only mutates state and logs.
//!
//! Failed external calls are never retried here. The loops in the graph
//! are semantic retries driven by grading outcomes, and a configurable
//! step bound cuts them off when grading stays negative.

use crate::error::VerityError;
use crate::oracle::{
    AnswerGrader, Datasource, Generator, HallucinationGrader, QuestionRewriter, QuestionRouter,
    RetrievalGrader,
};
use crate::retrieval::{CorpusSearch, Document, WebSearch};
use crate::workflow::graph::{
    DecisionId, Edge, NodeId, Step, TransitionTable, LABEL_GENERATE, LABEL_NOT_SUPPORTED,
    LABEL_NOT_USEFUL, LABEL_TRANSFORM_QUERY, LABEL_USEFUL, LABEL_VECTORSTORE, LABEL_WEB_SEARCH,
};
use crate::workflow::state::{StateUpdate, WorkflowState};
use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

/// Default bound on node executions per run. Covers the deepest sane path
/// (route, two full rewrite loops, a couple of generation retries) while
/// cutting off persistently negative grading.
pub const DEFAULT_MAX_STEPS: u32 = 25;

/// Engine tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Abort the run with [VerityError::MaxIterationsExceeded] once this
    /// many node executions have happened
    pub max_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// The collaborators a workflow run calls out to
pub struct Dependencies {
    pub router: Arc<dyn QuestionRouter>,
    pub retrieval_grader: Arc<dyn RetrievalGrader>,
    pub hallucination_grader: Arc<dyn HallucinationGrader>,
    pub answer_grader: Arc<dyn AnswerGrader>,
    pub rewriter: Arc<dyn QuestionRewriter>,
    pub generator: Arc<dyn Generator>,
    pub corpus: Arc<dyn CorpusSearch>,
    pub web: Arc<dyn WebSearch>,
}

/// Workflow engine: one instance serves any number of concurrent runs
pub struct Engine {
    deps: Dependencies,
    table: TransitionTable,
    config: EngineConfig,
}

impl Engine {
    pub fn new(deps: Dependencies, table: TransitionTable, config: EngineConfig) -> Self {
        Self {
            deps,
            table,
            config,
        }
    }

    /// Drive one question from START to END and return the final state
    pub async fn run(&self, question: &str) -> Result<WorkflowState, VerityError> {
        self.table.validate()?;

        let mut state = WorkflowState::new(question);
        if state.question.is_empty() {
            return Err(VerityError::config("question must be a non-empty string"));
        }

        let run_id = Uuid::new_v4();
        log::info!("run {}: question '{}'", run_id, state.question);

        let mut step = self.resolve(run_id, self.table.entry(), &state).await?;
        let mut steps_taken = 0u32;

        loop {
            let node = match step {
                Step::End => break,
                Step::To(node) => node,
            };

            steps_taken += 1;
            if steps_taken > self.config.max_steps {
                log::error!(
                    "run {}: exceeded {} node executions",
                    run_id,
                    self.config.max_steps
                );
                return Err(VerityError::MaxIterationsExceeded {
                    limit: self.config.max_steps,
                });
            }

            log::info!("run {}: executing node {}", run_id, node);
            let update = self.execute(node, &state).await?;
            state.apply(update);

            step = self.resolve(run_id, self.table.edge(node)?, &state).await?;
        }

        log::info!("run {}: finished after {} node executions", run_id, steps_taken);
        Ok(state)
    }

    /// Resolve an edge to the next step, evaluating its decision if any
    async fn resolve(
        &self,
        run_id: Uuid,
        edge: &Edge,
        state: &WorkflowState,
    ) -> Result<Step, VerityError> {
        match edge {
            Edge::Fixed(step) => Ok(*step),
            Edge::Conditional { decision, .. } => {
                let label = self.decide(*decision, state).await?;
                log::info!("run {}: decision {} -> '{}'", run_id, decision, label);
                edge.branch(label)
            }
        }
    }

    async fn execute(&self, node: NodeId, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        match node {
            NodeId::Retrieve => self.retrieve(state).await,
            NodeId::WebSearch => self.web_search(state).await,
            NodeId::GradeDocuments => self.grade_documents(state).await,
            NodeId::Generate => self.generate(state).await,
            NodeId::TransformQuery => self.transform_query(state).await,
        }
    }

    async fn decide(
        &self,
        decision: DecisionId,
        state: &WorkflowState,
    ) -> Result<&'static str, VerityError> {
        match decision {
            DecisionId::RouteQuestion => self.route_question(state).await,
            DecisionId::DecideToGenerate => Ok(decide_to_generate(&state.documents)),
            DecisionId::GradeGeneration => self.grade_generation(state).await,
        }
    }

    // --- Nodes ---

    /// Similarity search against the local corpus
    async fn retrieve(&self, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        let documents = self.deps.corpus.search(&state.question).await?;
        log::info!("retrieve: {} candidates", documents.len());
        Ok(StateUpdate::documents(documents))
    }

    /// Web search; all snippets joined into a single document
    async fn web_search(&self, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        let snippets = self.deps.web.search(&state.question).await?;
        log::info!("web_search: {} snippets", snippets.len());

        let documents = if snippets.is_empty() {
            Vec::new()
        } else {
            vec![Document::with_source(snippets.join("\n"), "web")]
        };
        Ok(StateUpdate::documents(documents))
    }

    /// Keep only documents the grader marks relevant, preserving order.
    /// Grades are independent, so they run concurrently and are consumed
    /// in document order.
    async fn grade_documents(&self, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        let grades = join_all(state.documents.iter().map(|doc| {
            self.deps
                .retrieval_grader
                .grade(&doc.content, &state.question)
        }))
        .await;

        let mut kept = Vec::new();
        for (doc, grade) in state.documents.iter().zip(grades) {
            if grade?.is_yes() {
                kept.push(doc.clone());
            } else {
                log::info!("grade_documents: dropping irrelevant document");
            }
        }

        log::info!(
            "grade_documents: kept {}/{} documents",
            kept.len(),
            state.documents.len()
        );
        Ok(StateUpdate::documents(kept))
    }

    /// Produce an answer from the current documents and question
    async fn generate(&self, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        let context = join_documents(&state.documents);
        let generation = self
            .deps
            .generator
            .generate(&context, &state.question)
            .await?;
        Ok(StateUpdate::generation(generation))
    }

    /// Rewrite the question for better retrieval
    async fn transform_query(&self, state: &WorkflowState) -> Result<StateUpdate, VerityError> {
        let better = self.deps.rewriter.rewrite(&state.question).await?;
        log::info!("transform_query: '{}' -> '{}'", state.question, better);
        Ok(StateUpdate::question(better))
    }

    // --- Decisions ---

    async fn route_question(&self, state: &WorkflowState) -> Result<&'static str, VerityError> {
        let decision = self.deps.router.route(&state.question).await?;
        Ok(match decision.datasource {
            Datasource::WebSearch => LABEL_WEB_SEARCH,
            Datasource::Vectorstore => LABEL_VECTORSTORE,
        })
    }

    /// Hallucination check first; only a grounded generation is graded for
    /// usefulness
    async fn grade_generation(&self, state: &WorkflowState) -> Result<&'static str, VerityError> {
        let generation = state
            .generation
            .as_deref()
            .ok_or_else(|| VerityError::config("grade_generation ran before generate"))?;

        let facts = join_documents(&state.documents);
        let grounded = self
            .deps
            .hallucination_grader
            .grade(&facts, generation)
            .await?;
        if !grounded.is_yes() {
            return Ok(LABEL_NOT_SUPPORTED);
        }

        let useful = self
            .deps
            .answer_grader
            .grade(&state.question, generation)
            .await?;
        Ok(if useful.is_yes() {
            LABEL_USEFUL
        } else {
            LABEL_NOT_USEFUL
        })
    }
}

/// Context string for generation and groundedness grading
fn join_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generate when any graded documents survived, otherwise rewrite the
/// question. Pure function of the document list.
pub fn decide_to_generate(documents: &[Document]) -> &'static str {
    if documents.is_empty() {
        LABEL_TRANSFORM_QUERY
    } else {
        LABEL_GENERATE
    }
}
