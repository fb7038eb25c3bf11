//! HTTP API for Mnemograph
//!
//! ## Endpoint Map
//!
//! | Method   | Path                   | Description                              |
//! |----------|------------------------|------------------------------------------|
//! | `GET`    | `/health`              | Health probe                             |
//! | `POST`   | `/api/v1/chat`         | Run one memory-augmented turn            |
//! | `GET`    | `/api/v1/memories`     | List a user's memories                   |
//! | `POST`   | `/api/v1/memories`     | Ingest a text document                   |
//! | `DELETE` | `/api/v1/memories`     | Clear a user's memories                  |
//! | `GET`    | `/api/v1/graph`        | Rendered knowledge graph (HTML)          |
//! | `GET`    | `/api/v1/graph/status` | Graph store connectivity                 |
//!
//! Every endpoint taking a user accepts an optional `userId`; the configured
//! default user is used when it is absent.

use crate::agent::MemoryAgent;
use crate::error::Error;
use crate::graph::GraphService;
use crate::memory::MemoryRecord;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<MemoryAgent>,
    pub graph: Arc<GraphService>,
    /// User assumed when a request names none
    pub default_user_id: String,
    /// Chunk size used when an ingest request names none
    pub max_chunk_size: usize,
}

impl AppState {
    fn user<'a>(&'a self, requested: &'a Option<String>) -> &'a str {
        requested
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.default_user_id)
    }
}

/// Build the complete HTTP application
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/chat", post(chat))
        .route(
            "/api/v1/memories",
            get(list_memories).post(ingest_memories).delete(clear_memories),
        )
        .route("/api/v1/graph", get(graph_document))
        .route("/api/v1/graph/status", get(graph_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message.into()}})),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
    status: &'static str,
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "message is empty");
    }
    let user_id = state.user(&request.user_id);
    let outcome = state.agent.chat(user_id, &request.message).await;
    Json(ChatResponse {
        answer: outcome.text().to_string(),
        status: outcome.status(),
    })
    .into_response()
}

#[derive(Debug, Serialize)]
struct MemoriesResponse {
    count: usize,
    memories: Vec<MemoryRecord>,
}

async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let memories = state.agent.memories(state.user(&query.user_id)).await;
    Json(MemoriesResponse {
        count: memories.len(),
        memories,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    text: String,
    user_id: Option<String>,
    metadata: Option<Map<String, Value>>,
    max_chunk_size: Option<usize>,
}

async fn ingest_memories(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> impl IntoResponse {
    let user_id = state.user(&request.user_id);
    let report = state
        .agent
        .ingest(
            user_id,
            &request.text,
            request.metadata.as_ref(),
            request.max_chunk_size.unwrap_or(state.max_chunk_size),
        )
        .await;
    Json(report)
}

async fn clear_memories(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    state.agent.clear(state.user(&query.user_id)).await;
    Json(json!({"status": "cleared"}))
}

async fn graph_document(State(state): State<AppState>, Query(query): Query<UserQuery>) -> Response {
    match state.graph.document(state.user(&query.user_id)).await {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ Error::GraphStore(_)) => {
            tracing::warn!("Graph query failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "GRAPH_STORE_UNAVAILABLE", e.to_string())
        }
        Err(e) => {
            tracing::error!("Graph rendering failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "GRAPH_RENDER_FAILED", e.to_string())
        }
    }
}

async fn graph_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"connected": state.graph.test_connection().await}))
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
