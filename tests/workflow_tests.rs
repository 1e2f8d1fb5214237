//! Integration tests for the self-correcting answer workflow
//!
//! These tests drive the engine and the HTTP façade end-to-end using stub
//! implementations of the oracle and retrieval seams; no network involved.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use verity_rs::error::VerityError;
use verity_rs::oracle::{
    AnswerGrader, BinaryGrade, Datasource, Generator, HallucinationGrader, QuestionRewriter,
    QuestionRouter, RetrievalGrader, RouteDecision, YesNo,
};
use verity_rs::retrieval::{CorpusSearch, Document, WebSearch};
use verity_rs::workflow::graph::{DecisionId, Edge, NodeId, Step};
use verity_rs::workflow::{Dependencies, Engine, EngineConfig, TransitionTable};

// ============================================================================
// Stub Components
// ============================================================================

/// Router that always picks the same datasource
struct StubRouter {
    datasource: Datasource,
}

#[async_trait]
impl QuestionRouter for StubRouter {
    async fn route(&self, _question: &str) -> Result<RouteDecision, VerityError> {
        Ok(RouteDecision {
            datasource: self.datasource,
        })
    }
}

/// Router whose oracle is down
struct FailingRouter;

#[async_trait]
impl QuestionRouter for FailingRouter {
    async fn route(&self, _question: &str) -> Result<RouteDecision, VerityError> {
        Err(VerityError::oracle("router", "connection refused"))
    }
}

fn grade(score: YesNo) -> BinaryGrade {
    BinaryGrade {
        binary_score: score,
    }
}

/// Retrieval grader with a fixed verdict
struct FixedRetrievalGrader {
    score: YesNo,
}

#[async_trait]
impl RetrievalGrader for FixedRetrievalGrader {
    async fn grade(&self, _document: &str, _question: &str) -> Result<BinaryGrade, VerityError> {
        Ok(grade(self.score))
    }
}

/// Retrieval grader keyed by document content
struct ContentKeyedGrader {
    relevant: Vec<&'static str>,
}

#[async_trait]
impl RetrievalGrader for ContentKeyedGrader {
    async fn grade(&self, document: &str, _question: &str) -> Result<BinaryGrade, VerityError> {
        let score = if self.relevant.contains(&document) {
            YesNo::Yes
        } else {
            YesNo::No
        };
        Ok(grade(score))
    }
}

/// Retrieval grader that only accepts documents retrieved for one question
struct QuestionKeyedGrader {
    accept_question: String,
}

#[async_trait]
impl RetrievalGrader for QuestionKeyedGrader {
    async fn grade(&self, _document: &str, question: &str) -> Result<BinaryGrade, VerityError> {
        let score = if question == self.accept_question {
            YesNo::Yes
        } else {
            YesNo::No
        };
        Ok(grade(score))
    }
}

/// Hallucination grader with a fixed verdict
struct FixedHallucinationGrader {
    score: YesNo,
}

#[async_trait]
impl HallucinationGrader for FixedHallucinationGrader {
    async fn grade(&self, _documents: &str, _generation: &str) -> Result<BinaryGrade, VerityError> {
        Ok(grade(self.score))
    }
}

/// Answer grader that replays a script of verdicts and counts its calls
struct ScriptedAnswerGrader {
    script: Vec<YesNo>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAnswerGrader {
    fn new(script: Vec<YesNo>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl AnswerGrader for ScriptedAnswerGrader {
    async fn grade(&self, _question: &str, _generation: &str) -> Result<BinaryGrade, VerityError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let score = self.script.get(idx).copied().unwrap_or(YesNo::Yes);
        Ok(grade(score))
    }
}

/// Rewriter that returns a fixed reformulation
struct StubRewriter {
    output: String,
}

#[async_trait]
impl QuestionRewriter for StubRewriter {
    async fn rewrite(&self, _question: &str) -> Result<String, VerityError> {
        Ok(self.output.clone())
    }
}

/// Generator with a fixed answer
struct StubGenerator {
    output: String,
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _context: &str, _question: &str) -> Result<String, VerityError> {
        Ok(self.output.clone())
    }
}

/// Corpus that returns the same documents for every question
struct FixedCorpus {
    documents: Vec<Document>,
}

#[async_trait]
impl CorpusSearch for FixedCorpus {
    async fn search(&self, _question: &str) -> Result<Vec<Document>, VerityError> {
        Ok(self.documents.clone())
    }
}

/// Corpus keyed by question text; unknown questions get nothing
struct QuestionKeyedCorpus {
    by_question: HashMap<String, Vec<Document>>,
}

#[async_trait]
impl CorpusSearch for QuestionKeyedCorpus {
    async fn search(&self, question: &str) -> Result<Vec<Document>, VerityError> {
        Ok(self.by_question.get(question).cloned().unwrap_or_default())
    }
}

/// Web search with fixed snippets, counting its calls
struct StubWebSearch {
    snippets: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl StubWebSearch {
    fn new(snippets: Vec<&str>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                snippets: snippets.iter().map(|s| s.to_string()).collect(),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl WebSearch for StubWebSearch {
    async fn search(&self, _question: &str) -> Result<Vec<String>, VerityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snippets.clone())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Everything graded "yes" on the first attempt, vectorstore route
fn happy_deps() -> Dependencies {
    Dependencies {
        router: Arc::new(StubRouter {
            datasource: Datasource::Vectorstore,
        }),
        retrieval_grader: Arc::new(FixedRetrievalGrader { score: YesNo::Yes }),
        hallucination_grader: Arc::new(FixedHallucinationGrader { score: YesNo::Yes }),
        answer_grader: Arc::new(ScriptedAnswerGrader::new(vec![]).0),
        rewriter: Arc::new(StubRewriter {
            output: "rewritten question".to_string(),
        }),
        generator: Arc::new(StubGenerator {
            output: "stub answer".to_string(),
        }),
        corpus: Arc::new(FixedCorpus {
            documents: vec![Document::new("a relevant chunk")],
        }),
        web: Arc::new(StubWebSearch::new(vec!["a snippet"]).0),
    }
}

fn engine(deps: Dependencies) -> Engine {
    Engine::new(deps, TransitionTable::standard(), EngineConfig::default())
}

fn engine_with_max_steps(deps: Dependencies, max_steps: u32) -> Engine {
    Engine::new(
        deps,
        TransitionTable::standard(),
        EngineConfig { max_steps },
    )
}

// ============================================================================
// Engine scenarios
// ============================================================================

#[tokio::test]
async fn test_web_route_happy_path() {
    // "What is the capital of France?" routed to web search; the snippets
    // come back as exactly one joined document and the answer survives both
    // grades.
    let (web, web_calls) = StubWebSearch::new(vec![
        "Paris is the capital of France.",
        "France's capital city is Paris.",
        "The capital is Paris.",
    ]);

    let mut deps = happy_deps();
    deps.router = Arc::new(StubRouter {
        datasource: Datasource::WebSearch,
    });
    deps.web = Arc::new(web);
    deps.generator = Arc::new(StubGenerator {
        output: "Paris.".to_string(),
    });

    let state = engine(deps)
        .run("What is the capital of France?")
        .await
        .unwrap();

    assert_eq!(state.question, "What is the capital of France?");
    assert_eq!(state.generation.as_deref(), Some("Paris."));
    assert_eq!(web_calls.load(Ordering::SeqCst), 1);

    // Three snippets, one document
    assert_eq!(state.documents.len(), 1);
    assert_eq!(
        state.documents[0].content,
        "Paris is the capital of France.\nFrance's capital city is Paris.\nThe capital is Paris."
    );
}

#[tokio::test]
async fn test_vectorstore_route_happy_path() {
    let mut deps = happy_deps();
    deps.corpus = Arc::new(FixedCorpus {
        documents: vec![Document::new("first chunk"), Document::new("second chunk")],
    });

    let state = engine(deps).run("what is agent memory?").await.unwrap();

    assert_eq!(state.generation.as_deref(), Some("stub answer"));
    assert_eq!(state.documents.len(), 2);
    assert_eq!(state.documents[0].content, "first chunk");
    assert_eq!(state.documents[1].content, "second chunk");
}

#[tokio::test]
async fn test_grade_documents_is_order_preserving_subset() {
    let mut deps = happy_deps();
    deps.corpus = Arc::new(FixedCorpus {
        documents: vec![
            Document::new("alpha"),
            Document::new("beta"),
            Document::new("gamma"),
        ],
    });
    deps.retrieval_grader = Arc::new(ContentKeyedGrader {
        relevant: vec!["alpha", "gamma"],
    });

    let state = engine(deps).run("subset question").await.unwrap();

    let contents: Vec<&str> = state.documents.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["alpha", "gamma"]);
}

#[tokio::test]
async fn test_all_irrelevant_documents_trigger_rewrite_loop() {
    // First retrieval is graded away entirely, the question gets rewritten,
    // and the second retrieval (under the new question) succeeds.
    let original = "what about memory";
    let rewritten = "what are the types of agent memory?";

    let mut by_question = HashMap::new();
    by_question.insert(
        original.to_string(),
        vec![Document::new("off-topic chunk"), Document::new("noise")],
    );
    by_question.insert(
        rewritten.to_string(),
        vec![Document::new("agent memory explained")],
    );

    let mut deps = happy_deps();
    deps.corpus = Arc::new(QuestionKeyedCorpus { by_question });
    deps.retrieval_grader = Arc::new(QuestionKeyedGrader {
        accept_question: rewritten.to_string(),
    });
    deps.rewriter = Arc::new(StubRewriter {
        output: rewritten.to_string(),
    });

    let state = engine(deps).run(original).await.unwrap();

    assert_ne!(state.question, original);
    assert_eq!(state.question, rewritten);
    assert_eq!(state.documents.len(), 1);
    assert_eq!(state.generation.as_deref(), Some("stub answer"));
}

#[tokio::test]
async fn test_hallucination_grade_shadows_answer_grade() {
    // The hallucination check comes first: with a permanently ungrounded
    // generation the workflow keeps retrying generate and never consults
    // the answer grader, even though it would say yes.
    let (answer_grader, answer_calls) = ScriptedAnswerGrader::new(vec![YesNo::Yes]);

    let mut deps = happy_deps();
    deps.hallucination_grader = Arc::new(FixedHallucinationGrader { score: YesNo::No });
    deps.answer_grader = Arc::new(answer_grader);

    let err = engine_with_max_steps(deps, 6)
        .run("any question")
        .await
        .unwrap_err();

    assert!(matches!(err, VerityError::MaxIterationsExceeded { limit: 6 }));
    assert_eq!(answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_not_useful_generation_rewrites_and_retries() {
    // First generation is grounded but not useful; the question is rewritten
    // and the second pass succeeds.
    let (answer_grader, answer_calls) = ScriptedAnswerGrader::new(vec![YesNo::No, YesNo::Yes]);

    let mut deps = happy_deps();
    deps.answer_grader = Arc::new(answer_grader);

    let state = engine(deps).run("original question").await.unwrap();

    assert_eq!(state.question, "rewritten question");
    assert_eq!(state.generation.as_deref(), Some("stub answer"));
    assert_eq!(answer_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_deterministic_stubs_give_identical_final_states() {
    let first = engine(happy_deps())
        .run("What is the capital of France?")
        .await
        .unwrap();
    let second = engine(happy_deps())
        .run("What is the capital of France?")
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_persistently_negative_grading_hits_step_bound() {
    // Retrieval grading never passes, so the run cycles
    // retrieve -> grade -> transform forever until the bound trips.
    let mut deps = happy_deps();
    deps.retrieval_grader = Arc::new(FixedRetrievalGrader { score: YesNo::No });

    let err = engine_with_max_steps(deps, 10)
        .run("hopeless question")
        .await
        .unwrap_err();

    assert!(matches!(err, VerityError::MaxIterationsExceeded { limit: 10 }));
}

#[tokio::test]
async fn test_oracle_failure_propagates_without_retry() {
    let mut deps = happy_deps();
    deps.router = Arc::new(FailingRouter);

    let err = engine(deps).run("any question").await.unwrap_err();

    match err {
        VerityError::OracleUnavailable { stage, .. } => assert_eq!(stage, "router"),
        other => panic!("expected OracleUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unmapped_route_label_is_unroutable() {
    // Entry mapping knows only the vectorstore branch; a web_search decision
    // has nowhere to go.
    let entry = Edge::Conditional {
        decision: DecisionId::RouteQuestion,
        branches: HashMap::from([("vectorstore", Step::To(NodeId::Retrieve))]),
    };
    let standard = TransitionTable::standard();
    let table = TransitionTable::new(
        entry,
        NodeId::ALL
            .iter()
            .map(|&n| (n, standard.edge(n).unwrap().clone()))
            .collect(),
    );

    let mut deps = happy_deps();
    deps.router = Arc::new(StubRouter {
        datasource: Datasource::WebSearch,
    });

    let err = Engine::new(deps, table, EngineConfig::default())
        .run("any question")
        .await
        .unwrap_err();

    match err {
        VerityError::UnroutableDecision { decision, label } => {
            assert_eq!(decision, "route_question");
            assert_eq!(label, "web_search");
        }
        other => panic!("expected UnroutableDecision, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_wiring_fails_before_any_node_runs() {
    // No END anywhere: generate loops back to itself unconditionally.
    let entry = Edge::Conditional {
        decision: DecisionId::RouteQuestion,
        branches: HashMap::from([("vectorstore", Step::To(NodeId::Generate))]),
    };
    let edges = HashMap::from([(NodeId::Generate, Edge::Fixed(Step::To(NodeId::Generate)))]);
    let table = TransitionTable::new(entry, edges);

    let (web, web_calls) = StubWebSearch::new(vec!["unused"]);
    let mut deps = happy_deps();
    deps.web = Arc::new(web);

    let err = Engine::new(deps, table, EngineConfig::default())
        .run("any question")
        .await
        .unwrap_err();

    assert!(matches!(err, VerityError::Configuration(_)));
    assert_eq!(web_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let err = engine(happy_deps()).run("   ").await.unwrap_err();
    assert!(matches!(err, VerityError::Configuration(_)));
}

// ============================================================================
// HTTP façade
// ============================================================================

mod facade {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use verity_rs::server::{app, AnswerResponse, FALLBACK_ANSWER};

    fn question_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/rest/v1/question")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app(Arc::new(engine(happy_deps())));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_question_round_trip() {
        let mut deps = happy_deps();
        deps.generator = Arc::new(StubGenerator {
            output: "Paris.".to_string(),
        });
        let app = app(Arc::new(engine(deps)));

        let response = app
            .oneshot(question_request(
                json!({ "question": " What is the capital of France? " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let answer: AnswerResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(answer.question, "What is the capital of France?");
        assert_eq!(answer.answer, "Paris.");
    }

    #[tokio::test]
    async fn test_blank_question_is_bad_request() {
        let app = app(Arc::new(engine(happy_deps())));

        let response = app
            .oneshot(question_request(json!({ "question": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], 400);
        assert!(body["message"].as_str().unwrap().contains("non-empty"));
    }

    #[tokio::test]
    async fn test_oracle_outage_is_bad_gateway() {
        let mut deps = happy_deps();
        deps.router = Arc::new(FailingRouter);
        let app = app(Arc::new(engine(deps)));

        let response = app
            .oneshot(question_request(json!({ "question": "anything" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["status"], 502);
        assert!(body["timestamp"].is_string());
        assert!(body["message"].as_str().unwrap().contains("router"));
    }

    #[tokio::test]
    async fn test_missing_generation_falls_back() {
        // A table whose entry goes straight to END finishes with no
        // generation; the façade answers with the fixed fallback.
        let table = TransitionTable::new(Edge::Fixed(Step::End), HashMap::new());
        let app = app(Arc::new(Engine::new(
            happy_deps(),
            table,
            EngineConfig::default(),
        )));

        let response = app
            .oneshot(question_request(json!({ "question": "anything" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let answer: AnswerResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(answer.answer, FALLBACK_ANSWER);
    }
}
