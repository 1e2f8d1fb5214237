// SPDX-License-Identifier: MIT

//! Workflow state
//!
//! One mutable record threaded through every node. Nodes take a snapshot
//! and return a [StateUpdate] naming only the fields they changed; the
//! engine merges updates by shallow overwrite. Nodes never alias the live
//! state.

use crate::retrieval::Document;

/// The state record for one workflow run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    /// Current text of the question; may be overwritten by query rewriting
    pub question: String,
    /// Retrieved documents; replaced by retrieval, filtered by grading
    pub documents: Vec<Document>,
    /// Answer text; absent until the generate node runs
    pub generation: Option<String>,
}

impl WorkflowState {
    /// Initial state: trimmed question, no documents, no generation
    pub fn new(question: &str) -> Self {
        Self {
            question: question.trim().to_string(),
            documents: Vec::new(),
            generation: None,
        }
    }

    /// Merge a partial update: `Some` overwrites, `None` leaves untouched
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(question) = update.question {
            self.question = question;
        }
        if let Some(documents) = update.documents {
            self.documents = documents;
        }
        if let Some(generation) = update.generation {
            self.generation = Some(generation);
        }
    }
}

/// Partial update returned by one node execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub question: Option<String>,
    pub documents: Option<Vec<Document>>,
    pub generation: Option<String>,
}

impl StateUpdate {
    pub fn question(question: String) -> Self {
        Self {
            question: Some(question),
            ..Self::default()
        }
    }

    pub fn documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Some(documents),
            ..Self::default()
        }
    }

    pub fn generation(generation: String) -> Self {
        Self {
            generation: Some(generation),
            ..Self::default()
        }
    }
}
