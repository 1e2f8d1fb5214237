// SPDX-License-Identifier: MIT

//! HTTP façade
//!
//! Accepts a question, drives the workflow engine to completion and returns
//! the final answer. Malformed input is rejected here, before the engine is
//! invoked; engine errors surface as 5xx with a structured body.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::VerityError;
use crate::workflow::Engine;

/// Answer returned when the workflow finished without a generation
pub const FALLBACK_ANSWER: &str = "Sorry, I don't know the answer to that question.";

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
}

/// Build the router; separate from [serve] so tests can drive it directly
pub fn app(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/rest/v1/question", post(submit_question))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

pub async fn serve(port: u16, engine: Arc<Engine>) -> Result<(), VerityError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(engine))
        .await
        .map_err(VerityError::Io)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit_question(
    State(engine): State<Arc<Engine>>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "question must be a non-empty string",
        ));
    }

    log::info!("Question: {}", question);
    let state = engine.run(&question).await?;

    let answer = state
        .generation
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string());
    Ok(Json(AnswerResponse { question, answer }))
}

/// Error shape returned to HTTP callers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn body(&self) -> Value {
        json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "status": self.status.as_u16(),
            "error": self.status.canonical_reason().unwrap_or("error"),
            "message": self.message,
        })
    }
}

impl From<VerityError> for ApiError {
    fn from(err: VerityError) -> Self {
        let status = match err {
            VerityError::OracleUnavailable { .. } | VerityError::SearchUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log::error!("Workflow failed: {}", err);
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}
