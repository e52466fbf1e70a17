//! REST API over the journey tracker.
//!
//! Endpoints:
//! - `POST /api/journeys/status` or `POST /update_status` — record a transition
//! - `GET /api/journeys/:journey_key/status` or `GET /get_status?pickup_id=` — current status
//! - `GET /api/journeys/:journey_key/history` — ordered event log
//! - `GET /api/journeys/:journey_key` — journey summary
//! - `GET /api/journeys` — all journey summaries
//! - `POST /api/guardians/push-token` — register a guardian's device token
//! - `GET /api/health` — health check

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::interfaces::GuardianDirectory;
use crate::journey::{
    status_name, JourneyEvent, JourneyStatus, JourneySummary, JourneyTracker, TrackerError,
    TransitionPayload,
};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<JourneyTracker>,
    pub directory: Arc<dyn GuardianDirectory>,
}

impl AppState {
    pub fn new(tracker: Arc<JourneyTracker>, directory: Arc<dyn GuardianDirectory>) -> Self {
        Self { tracker, directory }
    }
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let local = listener.local_addr()?;
    info!(address = %local, "journey API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/journeys", get(list_journeys))
        .route("/api/journeys/status", post(update_status))
        .route("/api/journeys/:journey_key", get(journey_summary))
        .route("/api/journeys/:journey_key/status", get(journey_status))
        .route("/api/journeys/:journey_key/history", get(journey_history))
        .route("/api/guardians/push-token", post(register_push_token))
        .route("/update_status", post(update_status))
        .route("/get_status", get(legacy_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Tracker error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(TrackerError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(TrackerError::InvalidInput(rejection.body_text()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_next_status: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            TrackerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TrackerError::IllegalTransition { .. }
            | TrackerError::Finalized { .. }
            | TrackerError::Conflict { .. } => StatusCode::CONFLICT,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Storage(e) => {
                error!(error = %e, "storage failure while serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error_kind: err.kind().to_string(),
            message: err.to_string(),
            current_status: err.current_status().map(|s| status_name(s).to_string()),
            expected_next_status: err.expected_next().map(|s| s.as_str().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(alias = "pickup_id")]
    pub journey_key: String,
    pub status: String,
    #[serde(default)]
    pub guardian_ref: Option<String>,
    #[serde(default)]
    pub child_ref: Option<String>,
    #[serde(default)]
    pub escort_ref: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub journey_key: String,
    pub status: JourneyStatus,
    pub sequence: u32,
    pub timestamp: DateTime<Utc>,
}

impl From<JourneyEvent> for UpdateStatusResponse {
    fn from(event: JourneyEvent) -> Self {
        Self {
            journey_key: event.journey_key,
            status: event.status,
            sequence: event.sequence,
            timestamp: event.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub journey_key: String,
    /// `"none"` for a journey with no events.
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyStatusQuery {
    pub pickup_id: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub journey_key: String,
    pub events: Vec<JourneyEvent>,
}

#[derive(Debug, Serialize)]
pub struct JourneyListResponse {
    pub journeys: Vec<JourneySummary>,
}

#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub guardian_ref: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushTokenResponse {
    pub guardian_ref: String,
    pub registered: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn update_status(
    State(state): State<AppState>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<UpdateStatusResponse> {
    let Json(req) = body?;
    let status: JourneyStatus = req.status.parse().map_err(TrackerError::from)?;

    let payload = TransitionPayload {
        guardian_ref: req.guardian_ref,
        child_ref: req.child_ref,
        escort_ref: req.escort_ref,
        location: req.location,
    };

    let event = state
        .tracker
        .record_transition(&req.journey_key, status, payload)
        .await?;

    Ok(Json(event.into()))
}

async fn journey_status(
    State(state): State<AppState>,
    Path(journey_key): Path<String>,
) -> ApiResult<StatusResponse> {
    status_of(&state, journey_key).await
}

async fn legacy_status(
    State(state): State<AppState>,
    query: Result<Query<LegacyStatusQuery>, QueryRejection>,
) -> ApiResult<StatusResponse> {
    let Query(query) = query?;
    status_of(&state, query.pickup_id).await
}

async fn status_of(state: &AppState, journey_key: String) -> ApiResult<StatusResponse> {
    let latest = state.tracker.latest_event(&journey_key).await?;
    Ok(Json(StatusResponse {
        journey_key,
        status: status_name(latest.as_ref().map(|e| e.status)).to_string(),
        timestamp: latest.map(|e| e.recorded_at),
    }))
}

async fn journey_history(
    State(state): State<AppState>,
    Path(journey_key): Path<String>,
) -> ApiResult<HistoryResponse> {
    let history = state.tracker.history(&journey_key).await?;
    Ok(Json(HistoryResponse {
        journey_key,
        events: history.into_events(),
    }))
}

async fn journey_summary(
    State(state): State<AppState>,
    Path(journey_key): Path<String>,
) -> ApiResult<JourneySummary> {
    Ok(Json(state.tracker.journey(&journey_key).await?))
}

async fn list_journeys(State(state): State<AppState>) -> ApiResult<JourneyListResponse> {
    let journeys = state.tracker.list_journeys().await?;
    Ok(Json(JourneyListResponse { journeys }))
}

async fn register_push_token(
    State(state): State<AppState>,
    body: Result<Json<PushTokenRequest>, JsonRejection>,
) -> ApiResult<PushTokenResponse> {
    let Json(req) = body?;
    let guardian_ref = req.guardian_ref.trim();
    let token = req.token.trim();
    if guardian_ref.is_empty() || token.is_empty() {
        return Err(TrackerError::InvalidInput(
            "guardian_ref and token are required".to_string(),
        )
        .into());
    }

    state
        .directory
        .register_push_token(guardian_ref, token)
        .await
        .map_err(TrackerError::from)?;

    info!(guardian_ref, "push token registered");
    Ok(Json(PushTokenResponse {
        guardian_ref: guardian_ref.to_string(),
        registered: true,
    }))
}
