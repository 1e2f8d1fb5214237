// SPDX-License-Identifier: MIT

pub mod engine;
pub mod graph;
pub mod state;

pub use engine::{decide_to_generate, Dependencies, Engine, EngineConfig, DEFAULT_MAX_STEPS};
pub use graph::{DecisionId, Edge, NodeId, Step, TransitionTable};
pub use state::{StateUpdate, WorkflowState};
