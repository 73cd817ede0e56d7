//! HTTP server exposing the retrieval-augmented answer flow.
//!
//! Two endpoints, matching the knowledge-base contract:
//! - `GET /ask?question=...&user=...` answers a question from the store
//! - `POST /documents` submits a new profile document for a user


use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::Result;
use crate::answer::{Answer, AnswerService};
use crate::database::lancedb::VectorStore;
use crate::embeddings::OllamaClient;
use crate::ingest::append_user_document;

/// Process-wide collaborator handles, established once at startup and
/// treated as read-only for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub answer_service: Arc<AnswerService>,
    pub store: Arc<VectorStore>,
    pub embeddings: Arc<OllamaClient>,
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub question: String,
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentSubmission {
    pub user_name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub message: String,
    pub user_name: String,
    pub chunks_added: usize,
}

/// Error returned by the HTTP handlers.
///
/// Collaborator failures surface as a 5xx with the error message; input
/// problems the extractors can't catch surface as a 4xx.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: &anyhow::Error) -> Self {
        error!("Request failed: {:#}", error);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", error),
        }
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the application router around shared state
#[inline]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ask", get(ask))
        .route("/documents", post(add_document))
        .with_state(state)
}

/// Bind to the configured address and serve requests until shutdown
#[inline]
pub async fn run(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| crate::ProfileRagError::Server(format!("Failed to read local addr: {}", e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| crate::ProfileRagError::Server(format!("Server error: {}", e)))?;

    Ok(())
}

async fn ask(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> std::result::Result<Json<Answer>, ApiError> {
    info!(
        "Answering question (user filter: {:?})",
        params.user.as_deref()
    );

    let answer = state
        .answer_service
        .answer(&params.question, params.user.as_deref())
        .await
        .map_err(|e| ApiError::internal(&e))?;

    Ok(Json(answer))
}

async fn add_document(
    State(state): State<AppState>,
    Json(submission): Json<DocumentSubmission>,
) -> std::result::Result<Json<DocumentResponse>, ApiError> {
    let user_name = submission.user_name.trim();
    if user_name.is_empty() {
        return Err(ApiError::bad_request("user_name must not be empty"));
    }

    info!("Adding document for user '{}'", user_name);

    let chunks_added = append_user_document(
        &state.store,
        &state.embeddings,
        user_name,
        &submission.content,
    )
    .await
    .map_err(|e| ApiError::internal(&e))?;

    Ok(Json(DocumentResponse {
        message: format!("Added {} chunks for user '{}'.", chunks_added, user_name),
        user_name: user_name.to_string(),
        chunks_added,
    }))
}
