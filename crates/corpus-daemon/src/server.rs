//! HTTP API of the corpus daemon.
//!
//! Clients create a session, set its query, fetch pages and close it.
//! Every request goes through the shared `SessionManager`; closed and idle
//! sessions are removed by its sweeper.
//!
//! | Method | Path                      | Body              | Response          |
//! |--------|---------------------------|-------------------|-------------------|
//! | GET    | `/health`                 |                   | 200               |
//! | GET    | `/v1/sessions`            |                   | `[SessionSummary]`|
//! | POST   | `/v1/sessions`            | `{search_type}`   | 201 `SessionSummary` |
//! | GET    | `/v1/sessions/{id}`       |                   | `SessionSummary`  |
//! | DELETE | `/v1/sessions/{id}`       |                   | 204               |
//! | PUT    | `/v1/sessions/{id}/query` | `SearchParams`    | `SessionSummary`  |
//! | POST   | `/v1/sessions/{id}/page`  |                   | `SearchReport`    |

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use corpus_search::{SearchError, SearchExecutor, SearchType, SessionId, SessionSummary};
use corpus_session::{SessionError, SessionManager};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::commands::{build_report, SearchParams, SearchReport};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub executor: Arc<dyn SearchExecutor>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, executor: Arc<dyn SearchExecutor>) -> Self {
        Self { manager, executor }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", get(list_sessions).post(create_session))
        .route(
            "/v1/sessions/{id}",
            get(get_session).delete(close_session),
        )
        .route("/v1/sessions/{id}/query", put(set_query))
        .route("/v1/sessions/{id}/page", post(fetch_page))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn run_server_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub search_type: SearchType,
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.manager.summaries().await)
}

async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let id = state.manager.create_session(payload.search_type)?;
    let summary = state.manager.with_session(id, |s| s.summary()).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = state.manager.with_session(id, |s| s.summary()).await?;
    Ok(Json(summary))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state.manager.mark_for_cleanup(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_query(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(params): Json<SearchParams>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = state
        .manager
        .with_session(id, |s| params.apply(s).map(|()| s.summary()))
        .await??;
    Ok(Json(summary))
}

async fn fetch_page(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SearchReport>, ApiError> {
    let summary = state
        .manager
        .execute_page(id, state.executor.as_ref())
        .await?;
    let report = build_report(&state.manager, id, summary).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: &'static str,
    message: String,
}

/// Error response of the API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: &'static str,
    message: String,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let (status, error_code) = match &err {
            SessionError::NotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            SessionError::CapacityExceeded(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "capacity_exceeded")
            }
            SessionError::InvalidConfig(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_config")
            }
            SessionError::Search(SearchError::InvalidConfiguration(_))
            | SessionError::Search(SearchError::MisalignedPage { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            SessionError::Search(SearchError::Provider(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "provider_failed")
            }
            SessionError::Search(SearchError::Executor(_)) => {
                (StatusCode::BAD_GATEWAY, "executor_failed")
            }
        };
        if status.is_server_error() {
            warn!(error = %err, "Request failed");
        }
        Self {
            status,
            error_code,
            message: err.to_string(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        SessionError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
