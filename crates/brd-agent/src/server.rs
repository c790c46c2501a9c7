//! JSON HTTP API.
//!
//! Exposes document submission, analysis orchestration, status polling,
//! result retrieval, and retrieval-augmented chat.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/documents` | Register pasted text or a meeting URL |
//! | `POST` | `/api/analyze/{doc_id}` | Start an analysis job |
//! | `GET`  | `/api/analysis/{job_id}/status` | Poll job progress |
//! | `GET`  | `/api/results` | List result summaries |
//! | `GET`  | `/api/results/{id}` | Full analysis result |
//! | `GET`  | `/api/results/{id}/insights` | Insights only |
//! | `POST` | `/api/results/{id}/chat` | Ask a question about a result |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "result abc not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `upstream_unavailable` (502), `internal` (500). Analysis itself never
//! surfaces upstream failures — the pipeline degrades to fallback content —
//! so `upstream_unavailable` only appears on the chat path.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use brd_agent_core::models::InputKind;
use brd_agent_core::store::Store;

use crate::analyze::{build_document, transcript_for_url, Analyzer, ANALYSIS_STEPS};
use crate::chat::Responder;
use crate::config::Config;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    analyzer: Analyzer,
    responder: Responder,
}

/// Start the HTTP server.
///
/// Binds to `[server].bind` and serves until the process terminates. The
/// store and model adapters are shared with the orchestrator and chat
/// responder constructed by the caller.
pub async fn run_server(
    config: &Config,
    store: Arc<dyn Store>,
    analyzer: Analyzer,
    responder: Responder,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        analyzer,
        responder,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/documents", post(handle_submit_document))
        .route("/api/analyze/{doc_id}", post(handle_start_analysis))
        .route("/api/analysis/{job_id}/status", get(handle_job_status))
        .route("/api/results", get(handle_list_results))
        .route("/api/results/{id}", get(handle_get_result))
        .route("/api/results/{id}/insights", get(handle_get_insights))
        .route("/api/results/{id}/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("BRD Agent listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn upstream_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_unavailable".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map a pipeline/chat error to the most appropriate status code, so
/// handlers can stay on plain `anyhow` errors internally.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") {
        not_found(msg)
    } else if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(msg)
    } else if msg.contains("disabled")
        || msg.contains("GEMINI_API_KEY")
        || msg.contains("Gemini")
        || msg.contains("request failed")
    {
        upstream_unavailable(msg)
    } else {
        internal(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/documents ============

/// Submission body: exactly one of `content` (pasted text) or `url`
/// (meeting link) must be present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitDocumentRequest {
    content: Option<String>,
    url: Option<String>,
    #[serde(default = "default_channel")]
    channel: String,
    file_name: Option<String>,
}

fn default_channel() -> String {
    "email".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitDocumentResponse {
    document_id: String,
    file_name: String,
    channel: String,
    message: String,
}

async fn handle_submit_document(
    State(state): State<AppState>,
    Json(req): Json<SubmitDocumentRequest>,
) -> Result<Json<SubmitDocumentResponse>, AppError> {
    let max_chars = state.config.analysis.max_content_chars;

    let doc = match (req.content, req.url) {
        (Some(content), None) => {
            if content.trim().is_empty() {
                return Err(bad_request("content must not be empty"));
            }
            let file_name = req
                .file_name
                .unwrap_or_else(|| "Pasted Text Snippet".to_string());
            build_document(file_name, req.channel, InputKind::Text, &content, max_chars)
        }
        (None, Some(url)) => {
            if url.trim().is_empty() {
                return Err(bad_request("url must not be empty"));
            }
            let transcript = transcript_for_url(&url);
            build_document(url, req.channel, InputKind::Url, &transcript, max_chars)
        }
        _ => return Err(bad_request("exactly one of content or url is required")),
    };

    state
        .store
        .put_document(&doc)
        .await
        .map_err(classify_error)?;

    Ok(Json(SubmitDocumentResponse {
        document_id: doc.id,
        file_name: doc.file_name,
        channel: doc.channel,
        message: "Data uploaded successfully. Ready for AI analysis.".to_string(),
    }))
}

// ============ POST /api/analyze/{doc_id} ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartAnalysisResponse {
    analysis_id: String,
    steps: Vec<String>,
    status: String,
}

async fn handle_start_analysis(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<StartAnalysisResponse>, AppError> {
    let doc = state
        .store
        .get_document(&doc_id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("document {} not found", doc_id)))?;

    let job_id = state.analyzer.submit(&doc).await.map_err(classify_error)?;

    Ok(Json(StartAnalysisResponse {
        analysis_id: job_id,
        steps: ANALYSIS_STEPS.iter().map(|s| s.to_string()).collect(),
        status: "processing".to_string(),
    }))
}

// ============ GET /api/analysis/{job_id}/status ============

async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let job = state
        .store
        .get_job(&job_id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("analysis {} not found", job_id)))?;

    serde_json::to_value(&job)
        .map(Json)
        .map_err(|e| internal(e.to_string()))
}

// ============ GET /api/results ============

async fn handle_list_results(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let summaries = state.store.list_results().await.map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "results": summaries })))
}

// ============ GET /api/results/{id} ============

async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = state
        .store
        .get_result(&id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("result {} not found", id)))?;

    serde_json::to_value(&result)
        .map(Json)
        .map_err(|e| internal(e.to_string()))
}

// ============ GET /api/results/{id}/insights ============

async fn handle_get_insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = state
        .store
        .get_result(&id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("result {} not found", id)))?;

    serde_json::to_value(&result.insights)
        .map(Json)
        .map_err(|e| internal(e.to_string()))
}

// ============ POST /api/results/{id}/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let reply = state
        .responder
        .answer(&id, &req.message)
        .await
        .map_err(classify_error)?;

    Ok(Json(ChatResponse { reply }))
}
