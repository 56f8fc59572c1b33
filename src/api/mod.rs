use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use validator::Validate;

use crate::config::Settings;
use crate::llm::prompt::NO_GUIDANCE_ANSWER;
use crate::llm::RagEngine;
use crate::providers::extractive::truncate_chars;

const SNIPPET_CHARS: usize = 200;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<RagEngine>,
    settings: Arc<Settings>,
}

#[derive(Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    question: String,
    /// e.g. "new employee", "manager". Accepted for compatibility, not used in retrieval.
    #[serde(default)]
    #[allow(dead_code)]
    user_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicySource {
    pub filename: String,
    pub content_snippet: String,
    pub similarity_score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub model_used: String,
    pub sources: Vec<PolicySource>,
    pub ambiguity_detected: bool,
    pub is_sensitive: bool,
    pub warning_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_status: String,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

/// Create and configure the API router
pub fn create_api(engine: Arc<RagEngine>, settings: Arc<Settings>) -> Router {
    let origin = match settings.frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(
                "Invalid frontend origin '{}', allowing any origin",
                settings.frontend_origin
            );
            AllowOrigin::any()
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let state = AppState { engine, settings };

    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let index_status = if state.engine.is_loaded() { "loaded" } else { "empty" };
    Json(HealthResponse {
        status: "ok".to_string(),
        index_status: index_status.to_string(),
    })
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse { status: format!("Invalid request: {}", e) }),
        )
            .into_response();
    }
    let question = request.question.trim();
    if question.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse { status: "Question must not be blank".to_string() }),
        )
            .into_response();
    }

    let outcome = state.engine.query(question).await;

    let sources = outcome
        .hits
        .iter()
        .map(|hit| PolicySource {
            filename: hit.entry.source.clone(),
            content_snippet: format!("{}...", truncate_chars(&hit.entry.text, SNIPPET_CHARS)),
            similarity_score: hit.relevance(),
        })
        .collect();

    let sensitive = state.settings.sensitive_match(question).map(str::to_string);
    let warning_message = sensitive.as_ref().map(|keyword| {
        format!(
            "This question touches on '{}'. Please confirm with HR before acting on this answer.",
            keyword
        )
    });

    let ambiguity_detected = outcome.answer.is_unanswerable()
        || outcome.answer.answer_text.contains(NO_GUIDANCE_ANSWER);

    Json(QueryResponse {
        answer: outcome.answer.answer_text,
        model_used: outcome.answer.backend_name,
        sources,
        ambiguity_detected,
        is_sensitive: sensitive.is_some(),
        warning_message,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{FlatL2Index, IndexEntry, IndexPair};
    use crate::error::Result;
    use crate::llm::{AnswerOrchestrator, EmbeddingProvider, OrchestratorConfig};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn model_id(&self) -> &str {
            "constant"
        }
    }

    fn engine(loaded: bool) -> Arc<RagEngine> {
        let engine = RagEngine::new(
            Arc::new(ConstantEmbedder),
            AnswerOrchestrator::new(Vec::new(), OrchestratorConfig::default()),
            "unused",
            5,
        );
        if loaded {
            let mut index = FlatL2Index::new(2).unwrap();
            index.add(&[1.0, 1.0]).unwrap();
            let entry = IndexEntry {
                chunk_id: "chunk_000001".to_string(),
                source: "termination.md".to_string(),
                path: "people/termination.md".to_string(),
                heading: "Notice".to_string(),
                text: "x".repeat(300),
            };
            engine.install(IndexPair::new(index, vec![entry]).unwrap());
        }
        Arc::new(engine)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn query(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_index_status() {
        for (loaded, expected) in [(true, "loaded"), (false, "empty")] {
            let app = create_api(engine(loaded), Arc::new(Settings::default()));
            let response = app
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let health: HealthResponse = body_json(response).await;
            assert_eq!(health.index_status, expected);
        }
    }

    #[tokio::test]
    async fn test_query_returns_sources_and_sensitivity() {
        let app = create_api(engine(true), Arc::new(Settings::default()));
        let response = app.oneshot(query("What is the termination notice?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: QueryResponse = body_json(response).await;
        assert_eq!(body.model_used, "extractive-only");
        assert_eq!(body.sources.len(), 1);
        assert_eq!(body.sources[0].filename, "termination.md");
        assert_eq!(body.sources[0].content_snippet.len(), SNIPPET_CHARS + 3);
        assert_eq!(body.sources[0].similarity_score, 0.5);
        assert!(body.is_sensitive);
        assert!(body.warning_message.is_some());
        assert!(!body.ambiguity_detected);
    }

    #[tokio::test]
    async fn test_query_without_index_answers_with_sentinel() {
        let app = create_api(engine(false), Arc::new(Settings::default()));
        let response = app.oneshot(query("How much leave?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: QueryResponse = body_json(response).await;
        assert_eq!(body.model_used, "none");
        assert_eq!(body.answer, "Unable to answer the question.");
        assert!(body.sources.is_empty());
        assert!(body.ambiguity_detected);
        assert!(!body.is_sensitive);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let app = create_api(engine(true), Arc::new(Settings::default()));
        let response = app.oneshot(query("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let app = create_api(engine(true), Arc::new(Settings::default()));
        let response = app.oneshot(query("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
