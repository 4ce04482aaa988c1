//! Command execution handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::error::{api_error, bad_payload, ApiError, ApiResult, ErrorResponse};
use super::state::AppState;
use crate::models::DeploymentStatus;
use crate::supervisor::{ExecuteOutcome, ExecuteRequest, KillOutcome, SessionInfo};

/// Result of `/bash/execute`
///
/// Process failures are reported here with `success: false`, never as an
/// HTTP error.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ExecuteOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ExecuteOutcome> for ExecuteResponse {
    fn from(outcome: ExecuteOutcome) -> Self {
        let message = (outcome.status == DeploymentStatus::Running)
            .then(|| "Command started in background".to_string());
        Self {
            success: outcome.success(),
            outcome,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KillResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResponse {
    pub session_id: String,
    pub output: String,
}

fn unknown_session(session_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "No running process for session '{}'",
            session_id
        ))),
    )
}

/// POST /bash/execute
pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<ExecuteResponse> {
    let Json(request) = payload.map_err(bad_payload)?;
    let outcome = state.supervisor.execute(request).await.map_err(api_error)?;
    Ok(Json(ExecuteResponse::from(outcome)))
}

/// POST /bash/kill/{session_id}
pub async fn kill(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<KillResponse> {
    match state.supervisor.kill(&session_id).await {
        KillOutcome::Killed => Ok(Json(KillResponse { success: true })),
        KillOutcome::NotFound => Err(unknown_session(&session_id)),
    }
}

/// GET /bash/sessions
pub async fn sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.supervisor.running_sessions().await,
    })
}

/// Output accumulated so far by a running session
/// GET /bash/output/{session_id}
pub async fn output(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<OutputResponse> {
    let output = state
        .supervisor
        .live_output(&session_id)
        .await
        .ok_or_else(|| unknown_session(&session_id))?;
    Ok(Json(OutputResponse { session_id, output }))
}
