//! Changelog ledger handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;

use super::error::{api_error, bad_payload, ApiResult};
use super::state::AppState;
use crate::models::{ChangelogEntry, NewChangelogEntry};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogResponse {
    pub entries: Vec<ChangelogEntry>,
    pub uncommitted_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub success: bool,
    pub entry: ChangelogEntry,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub count: usize,
}

/// GET /changelog/{session_id}
pub async fn list_entries(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ChangelogResponse> {
    let entries = state.ledger.list(&session_id).map_err(api_error)?;
    let uncommitted_count = entries.iter().filter(|e| !e.committed).count();
    Ok(Json(ChangelogResponse {
        entries,
        uncommitted_count,
    }))
}

/// POST /changelog/{session_id}
pub async fn record_entry(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<NewChangelogEntry>, JsonRejection>,
) -> ApiResult<EntryResponse> {
    let Json(entry) = payload.map_err(bad_payload)?;
    let entry = state
        .ledger
        .record(&session_id, entry)
        .map_err(api_error)?;
    Ok(Json(EntryResponse {
        success: true,
        entry,
    }))
}

/// DELETE /changelog/{session_id}
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<CountResponse> {
    let count = state.ledger.clear(&session_id).map_err(api_error)?;
    Ok(Json(CountResponse {
        success: true,
        count,
    }))
}

/// POST /changelog/{session_id}/commit
pub async fn commit_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<CountResponse> {
    let count = state.ledger.commit(&session_id).map_err(api_error)?;
    Ok(Json(CountResponse {
        success: true,
        count,
    }))
}

/// DELETE /changelog/{session_id}/{entry_id}
pub async fn delete_entry(
    State(state): State<AppState>,
    Path((session_id, entry_id)): Path<(String, String)>,
) -> ApiResult<EntryResponse> {
    let entry = state
        .ledger
        .delete_entry(&session_id, &entry_id)
        .map_err(api_error)?;
    Ok(Json(EntryResponse {
        success: true,
        entry,
    }))
}
