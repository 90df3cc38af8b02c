//! HTTP surface for the question-answering engine.
//!
//! Three routes: the chat page at `/`, the JSON question endpoint at
//! `/chat`, and `/health`. Languages without a usable corpus answer with
//! the fallback text rather than an error, matching what the chat widget
//! expects to render.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sahayak_core::config::ServerConfig;
use sahayak_core::engine::{FALLBACK_ANSWER, QueryEngine};
use sahayak_core::error::{CorpusError, SahayakError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

/// Body of a `POST /chat` request.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub question: String,
    pub language: String,
}

/// Body of a successful `POST /chat` response.
#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let languages: Vec<String> = state
        .engine
        .corpus()
        .language_keys()
        .map(str::to_string)
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "languages": languages,
    }))
}

/// Answer a question against the corpus of the requested language.
///
/// Malformed bodies are a client error. A language the corpus cannot serve
/// still answers 200 with the fallback text, so the widget always has
/// something to show.
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> Response {
    let Json(query) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed /chat body");
            let body = ErrorResponse {
                error: format!("invalid request body: {}", rejection.body_text()),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let request_id = Uuid::new_v4();
    info!(%request_id, language = %query.language, "Answering question");

    match state.engine.answer(&query.language, &query.question).await {
        Ok(answer) => {
            debug!(%request_id, "Question answered");
            (StatusCode::OK, Json(ChatAnswer { answer })).into_response()
        }
        Err(SahayakError::Corpus(
            CorpusError::UnknownLanguage { language } | CorpusError::NoDocuments { language },
        )) => {
            warn!(%request_id, %language, "No corpus for language, returning fallback");
            let body = ChatAnswer {
                answer: FALLBACK_ANSWER.to_string(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(SahayakError::Provider(e)) => {
            error!(%request_id, error = %e, "Model provider call failed");
            let body = ErrorResponse {
                error: "upstream model request failed".to_string(),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
        Err(e) => {
            error!(%request_id, error = %e, "Failed to answer question");
            let body = ErrorResponse {
                error: "internal server error".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Bind and serve until the process is stopped.
pub async fn run(state: AppState, server: &ServerConfig) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Sahayak server listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use sahayak_core::chunk::Chunk;
    use sahayak_core::config::{AppConfig, DEFAULT_LANGUAGES};
    use sahayak_core::error::ProviderError;
    use sahayak_core::index::{IndexMetadata, index_path};
    use sahayak_core::{
        ChatModel, ChatRequest, ChatResponse, Corpus, Embedder, LocalEmbedder, MockChatModel,
        VectorIndex,
    };
    use std::path::Path;
    use tower::ServiceExt;

    struct FailingChatModel;

    #[async_trait]
    impl ChatModel for FailingChatModel {
        async fn complete(
            &self,
            _request: ChatRequest,
        ) -> std::result::Result<ChatResponse, ProviderError> {
            Err(ProviderError::ApiRequest {
                message: "boom".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "failing"
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn test_config(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.corpus.pdf_dir = root.join("pdfs");
        config.corpus.languages = [
            ("english".to_string(), vec!["english1.pdf".into()]),
            ("hindi".to_string(), vec!["hindi1.pdf".into()]),
        ]
        .into_iter()
        .collect();
        config.index.dir = root.join("index");
        config
    }

    /// Persist an index for `language` so the engine can serve it from disk.
    async fn seed_index(
        config: &AppConfig,
        embedder: &LocalEmbedder,
        language: &str,
        texts: &[&str],
    ) {
        let corpus = Corpus::new(&config.corpus);
        let fingerprint = corpus.source_fingerprint(language).unwrap();
        let metadata = IndexMetadata {
            language: language.to_string(),
            embedding_model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            source_fingerprint: fingerprint,
            built_at: Utc::now(),
        };
        let mut index = VectorIndex::new(metadata);
        for (i, text) in texts.iter().enumerate() {
            let chunk = Chunk {
                id: format!("{language}1-{i}"),
                document_id: format!("{language}1"),
                text: text.to_string(),
                chunk_index: i,
            };
            let embedding = embedder.embed(text).await.unwrap();
            index.insert(chunk, embedding).unwrap();
        }
        index
            .save(&index_path(&config.index.dir, language))
            .unwrap();
    }

    /// An app with a persisted English index and the given chat model.
    async fn seeded_app(chat: Arc<dyn ChatModel>) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let embedder = Arc::new(LocalEmbedder::new(64));
        seed_index(
            &config,
            &embedder,
            "english",
            &[
                "Sow wheat in early November after the first rain.",
                "Irrigate sugarcane every ten days in summer.",
            ],
        )
        .await;
        let engine = Arc::new(QueryEngine::new(&config, embedder, chat));
        (dir, router(AppState { engine }))
    }

    async fn post_chat(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(app, request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 100_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_chat_answers_question() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::with_response(
            "Sow in early November.",
        )))
        .await;

        let (status, json) = post_chat(
            app,
            r#"{"question": "When should wheat be sown?", "language": "English"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "Sow in early November.");
    }

    #[tokio::test]
    async fn test_chat_answers_every_supported_language() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.corpus.pdf_dir = dir.path().join("pdfs");
        config.index.dir = dir.path().join("index");

        let embedder = Arc::new(LocalEmbedder::new(64));
        for language in DEFAULT_LANGUAGES {
            seed_index(&config, &embedder, language, &["Crop guidance text."]).await;
        }
        let chat: Arc<dyn ChatModel> = Arc::new(MockChatModel::with_response("guidance"));
        let engine = Arc::new(QueryEngine::new(&config, embedder, chat));
        let app = router(AppState { engine });

        for language in DEFAULT_LANGUAGES {
            let body = format!(r#"{{"question": "What to sow?", "language": "{language}"}}"#);
            let (status, json) = post_chat(app.clone(), &body).await;
            assert_eq!(status, StatusCode::OK, "language {language}");
            assert_eq!(json["answer"], "guidance", "language {language}");
        }
    }

    #[tokio::test]
    async fn test_chat_unknown_language_returns_fallback() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::with_response("ok"))).await;

        let (status, json) = post_chat(
            app,
            r#"{"question": "anything", "language": "German"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_chat_missing_documents_returns_fallback() {
        // Hindi is configured but has no PDFs and no persisted index.
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::with_response("ok"))).await;

        let (status, json) = post_chat(
            app,
            r#"{"question": "anything", "language": "Hindi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_chat_malformed_json_is_client_error() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::with_response("ok"))).await;

        let (status, json) = post_chat(app, r#"{"question": "truncated"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn test_chat_missing_field_is_client_error() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::with_response("ok"))).await;

        let (status, json) = post_chat(app, r#"{"question": "no language"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!json["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_provider_failure_maps_to_bad_gateway() {
        let (_dir, app) = seeded_app(Arc::new(FailingChatModel)).await;

        let (status, json) = post_chat(
            app,
            r#"{"question": "anything", "language": "english"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "upstream model request failed");
    }

    #[tokio::test]
    async fn test_health_reports_languages() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::new())).await;

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(app, request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 100_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        let languages = json["languages"].as_array().unwrap();
        assert!(languages.contains(&serde_json::json!("english")));
        assert!(languages.contains(&serde_json::json!("hindi")));
    }

    #[tokio::test]
    async fn test_index_page_served() {
        let (_dir, app) = seeded_app(Arc::new(MockChatModel::new())).await;

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(app, request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1_000_000)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("languageSelect"));
        assert!(page.contains("/chat"));
    }
}
