//! Investigation REST endpoints.
//!
//! - `POST   /investigate`              — create an investigation
//! - `GET    /investigations/{id}`      — lifecycle state
//! - `GET    /investigations/{id}/logs` — replay retained events
//! - `DELETE /investigations/{id}`      — request cancellation

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use oats_domain::event::Event;
use oats_domain::investigation::InvestigationState;

use crate::runtime::launcher::{self, CreateError, CreateRequest};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Standardized JSON error body: `{ "error": ..., "detail": ... }`.
fn api_error(status: StatusCode, error: &str, detail: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": error, "detail": detail.into() })),
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /investigate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct InvestigateBody {
    /// Optional here so a missing goal maps to 400, not a 422 from the
    /// extractor.
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub target_namespace: Option<String>,
    #[serde(default)]
    pub turn_budget: Option<u32>,
}

#[derive(Debug, Serialize)]
struct InvestigateResponse {
    investigation_id: String,
    job_name: String,
    log_stream_hint: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<InvestigateBody>,
) -> Response {
    let request = CreateRequest {
        goal: body.goal.unwrap_or_default(),
        namespace: body.target_namespace,
        turn_budget: body.turn_budget,
    };
    match launcher::create_investigation(&state, request).await {
        Ok(investigation) => Json(InvestigateResponse {
            investigation_id: investigation.id.clone(),
            job_name: investigation.job_name.clone(),
            log_stream_hint: launcher::log_stream_hint(&investigation),
        })
        .into_response(),
        Err(CreateError::Invalid(detail)) => {
            api_error(StatusCode::BAD_REQUEST, "invalid request", detail)
        }
        Err(CreateError::Rejected(detail)) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "orchestrator unavailable",
            detail,
        ),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /investigations/{id}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.investigations.get(&id) {
        Some(investigation) => Json(serde_json::json!({
            "state": investigation.state,
            "created_at": investigation.created_at,
            "terminal_at": investigation.terminal_at,
        }))
        .into_response(),
        None => api_error(
            StatusCode::NOT_FOUND,
            "not found",
            format!("no investigation '{id}'"),
        ),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /investigations/{id}/logs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replay the retained event sequence from the orchestrator's log
/// store. Non-event log lines are filtered out; availability is bounded
/// by the orchestrator's terminal-state TTL.
pub async fn get_logs(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let investigation = match state.investigations.get(&id) {
        Some(investigation) => investigation,
        None => {
            return api_error(
                StatusCode::NOT_FOUND,
                "not found",
                format!("no investigation '{id}'"),
            )
        }
    };

    match state.orchestrator.read_logs(&investigation.job_name).await {
        Ok(logs) => {
            let events: Vec<Event> = logs.lines().filter_map(Event::parse_line).collect();
            Json(serde_json::json!({
                "investigation_id": id,
                "state": investigation.state,
                "events": events,
            }))
            .into_response()
        }
        Err(e) => api_error(
            StatusCode::NOT_FOUND,
            "logs unavailable",
            format!("log retention expired or job unknown: {e}"),
        ),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /investigations/{id}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Best-effort cancellation: the worker may finish an in-flight tool
/// call before termination lands, so tool side effects can outlive the
/// cancel. Idempotent: terminal investigations return 204 untouched.
pub async fn cancel(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let investigation = match state.investigations.get(&id) {
        Some(investigation) => investigation,
        None => {
            return api_error(
                StatusCode::NOT_FOUND,
                "not found",
                format!("no investigation '{id}'"),
            )
        }
    };

    if investigation.state.is_terminal() {
        return StatusCode::NO_CONTENT.into_response();
    }

    if let Err(e) = state
        .orchestrator
        .delete_job(&investigation.job_name)
        .await
    {
        tracing::warn!(%id, error = %e, "job deletion failed during cancel");
    }
    state
        .investigations
        .transition(&id, InvestigationState::Cancelled);
    StatusCode::NO_CONTENT.into_response()
}
