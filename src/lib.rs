// SPDX-License-Identifier: MIT

//! verity-rs - self-correcting question answering
//!
//! A question is routed to either a local document corpus or live web
//! search, the retrievals and the generated answer are graded by a
//! reasoning oracle, and the workflow loops back (regenerate, or rewrite
//! the question and re-retrieve) until the answer is judged grounded and
//! useful.
//!
//! Module map:
//! - [error] - crate-wide error taxonomy
//! - [oracle] - reasoning-oracle seam and the narrow adapters on top of it
//! - [retrieval] - local corpus and web search document providers
//! - [workflow] - state model, graph wiring and the executor
//! - [server] - HTTP façade

pub mod error;
pub mod oracle;
pub mod retrieval;
pub mod server;
pub mod workflow;
