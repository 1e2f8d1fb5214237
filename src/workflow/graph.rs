//! Graph wiring: node identifiers and the transition table
//!
//! The graph is a closed enum of nodes plus a table mapping each node to
//! either a fixed successor or a decision with a label → successor map.
//! The table is data so tests can rewire it; [TransitionTable::standard]
//! is the canonical self-correcting pipeline:
//!
//! ```text
//! START --route_question--> { web_search -> generate ; retrieve -> grade_documents }
//! grade_documents --decide_to_generate--> { transform_query ; generate }
//! transform_query --> retrieve
//! generate --grade_generation--> { generate ; END ; transform_query }
//! ```

use crate::error::VerityError;
use std::collections::HashMap;
use std::fmt;

/// Decision labels, shared between the decision functions and the table
pub const LABEL_VECTORSTORE: &str = "vectorstore";
pub const LABEL_WEB_SEARCH: &str = "web_search";
pub const LABEL_GENERATE: &str = "generate";
pub const LABEL_TRANSFORM_QUERY: &str = "transform_query";
pub const LABEL_USEFUL: &str = "useful";
pub const LABEL_NOT_USEFUL: &str = "not useful";
pub const LABEL_NOT_SUPPORTED: &str = "not supported";

/// The workflow's nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Retrieve,
    WebSearch,
    GradeDocuments,
    Generate,
    TransformQuery,
}

impl NodeId {
    pub const ALL: [NodeId; 5] = [
        NodeId::Retrieve,
        NodeId::WebSearch,
        NodeId::GradeDocuments,
        NodeId::Generate,
        NodeId::TransformQuery,
    ];
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeId::Retrieve => "retrieve",
            NodeId::WebSearch => "web_search",
            NodeId::GradeDocuments => "grade_documents",
            NodeId::Generate => "generate",
            NodeId::TransformQuery => "transform_query",
        };
        f.write_str(name)
    }
}

/// The workflow's decision points (routers for conditional edges)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionId {
    RouteQuestion,
    DecideToGenerate,
    GradeGeneration,
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionId::RouteQuestion => "route_question",
            DecisionId::DecideToGenerate => "decide_to_generate",
            DecisionId::GradeGeneration => "grade_generation",
        };
        f.write_str(name)
    }
}

/// Where an edge leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    To(NodeId),
    End,
}

/// Outgoing edge of a node (or of START)
#[derive(Debug, Clone)]
pub enum Edge {
    /// Unconditional successor
    Fixed(Step),
    /// Successor chosen by a decision's label
    Conditional {
        decision: DecisionId,
        branches: HashMap<&'static str, Step>,
    },
}

impl Edge {
    /// Resolve a decision label against this edge's branch map
    pub fn branch(&self, label: &str) -> Result<Step, VerityError> {
        match self {
            Edge::Fixed(step) => Ok(*step),
            Edge::Conditional { decision, branches } => {
                branches
                    .get(label)
                    .copied()
                    .ok_or_else(|| VerityError::UnroutableDecision {
                        decision: decision.to_string(),
                        label: label.to_string(),
                    })
            }
        }
    }
}

/// The graph: entry edge from START plus one outgoing edge per node
#[derive(Debug, Clone)]
pub struct TransitionTable {
    entry: Edge,
    edges: HashMap<NodeId, Edge>,
}

impl TransitionTable {
    pub fn new(entry: Edge, edges: HashMap<NodeId, Edge>) -> Self {
        Self { entry, edges }
    }

    /// The reference wiring of the self-correcting pipeline
    pub fn standard() -> Self {
        let entry = Edge::Conditional {
            decision: DecisionId::RouteQuestion,
            branches: HashMap::from([
                (LABEL_WEB_SEARCH, Step::To(NodeId::WebSearch)),
                (LABEL_VECTORSTORE, Step::To(NodeId::Retrieve)),
            ]),
        };

        let edges = HashMap::from([
            (NodeId::WebSearch, Edge::Fixed(Step::To(NodeId::Generate))),
            (
                NodeId::Retrieve,
                Edge::Fixed(Step::To(NodeId::GradeDocuments)),
            ),
            (
                NodeId::GradeDocuments,
                Edge::Conditional {
                    decision: DecisionId::DecideToGenerate,
                    branches: HashMap::from([
                        (LABEL_TRANSFORM_QUERY, Step::To(NodeId::TransformQuery)),
                        (LABEL_GENERATE, Step::To(NodeId::Generate)),
                    ]),
                },
            ),
            (
                NodeId::TransformQuery,
                Edge::Fixed(Step::To(NodeId::Retrieve)),
            ),
            (
                NodeId::Generate,
                Edge::Conditional {
                    decision: DecisionId::GradeGeneration,
                    branches: HashMap::from([
                        (LABEL_NOT_SUPPORTED, Step::To(NodeId::Generate)),
                        (LABEL_USEFUL, Step::End),
                        (LABEL_NOT_USEFUL, Step::To(NodeId::TransformQuery)),
                    ]),
                },
            ),
        ]);

        Self::new(entry, edges)
    }

    pub fn entry(&self) -> &Edge {
        &self.entry
    }

    /// Outgoing edge of a node; missing edges are a wiring error
    pub fn edge(&self, node: NodeId) -> Result<&Edge, VerityError> {
        self.edges
            .get(&node)
            .ok_or_else(|| VerityError::config(format!("node '{}' has no outgoing edge", node)))
    }

    /// Check the wiring before the first node runs: every node reachable
    /// from START must have an outgoing edge, and END must be reachable.
    pub fn validate(&self) -> Result<(), VerityError> {
        let mut visited: Vec<NodeId> = Vec::new();
        let mut pending: Vec<Step> = successors(&self.entry);
        let mut end_reachable = false;

        while let Some(step) = pending.pop() {
            match step {
                Step::End => end_reachable = true,
                Step::To(node) => {
                    if visited.contains(&node) {
                        continue;
                    }
                    visited.push(node);
                    pending.extend(successors(self.edge(node)?));
                }
            }
        }

        if !end_reachable {
            return Err(VerityError::config("no path from START to END"));
        }
        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn successors(edge: &Edge) -> Vec<Step> {
    match edge {
        Edge::Fixed(step) => vec![*step],
        Edge::Conditional { branches, .. } => branches.values().copied().collect(),
    }
}
