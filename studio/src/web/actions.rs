//! Action overlay handlers
//!
//! Reads go through the overlay resolver; writes only touch drafts in the
//! store. The changelog is written by the client separately, except for the
//! optional `sessionId`/`entryId` shortcuts on revert and mark-deployed.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{api_error, bad_payload, ApiResult};
use super::state::AppState;
use crate::error::StudioError;
use crate::models::{Action, WidgetResource};
use crate::overlay::{DeployedDrafts, DiscoverySummary};

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MergedActionsResponse {
    pub tools: Vec<Action>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub action: Action,
}

/// Changelog entry to drop together with a reverted draft
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertParams {
    pub session_id: Option<String>,
    pub entry_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkDeployedParams {
    /// Commit this session's changelog as well
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkDeployedResponse {
    pub success: bool,
    pub deployed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DeployDraftsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub drafts: DeployedDrafts,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResponse {
    pub result: Value,
}

/// Remove the changelog entry of a reverted edit, if the client named one
pub(crate) fn drop_reverted_entry(state: &AppState, params: &RevertParams) {
    let (Some(session_id), Some(entry_id)) = (&params.session_id, &params.entry_id) else {
        return;
    };
    match state.ledger.delete_entry(session_id, entry_id) {
        Ok(_) => {}
        Err(StudioError::NotFound(_)) => {
            tracing::debug!("Reverted edit had no changelog entry {}", entry_id);
        }
        Err(e) => tracing::warn!("Failed to drop changelog entry {}: {}", entry_id, e),
    }
}

/// Commit a session's changelog after a deploy, if the client named one
pub(crate) fn commit_session(state: &AppState, session_id: Option<&str>) -> Option<usize> {
    let session_id = session_id?;
    match state.ledger.commit(session_id) {
        Ok(committed) => Some(committed),
        Err(e) => {
            tracing::warn!("Failed to commit changelog for {}: {}", session_id, e);
            None
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Merged live + draft actions
/// GET /actions/{server_id}/merged
pub async fn merged_actions(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<MergedActionsResponse> {
    let tools = state
        .resolver
        .merged_actions(&server_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MergedActionsResponse { tools }))
}

/// Sync the live server's tools and resources into the store
/// POST /actions/{server_id}/discover
pub async fn discover(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<DiscoverySummary> {
    let summary = state.resolver.discover(&server_id).await.map_err(api_error)?;
    Ok(Json(summary))
}

/// Save an action draft
/// POST /actions/{server_id}/drafts/{name}
pub async fn upsert_draft(
    State(state): State<AppState>,
    Path((server_id, name)): Path<(String, String)>,
    payload: Result<Json<Action>, JsonRejection>,
) -> ApiResult<ActionResponse> {
    let Json(action) = payload.map_err(bad_payload)?;
    if action.name != name {
        return Err(api_error(StudioError::validation(format!(
            "Body names action '{}' but the path names '{}'",
            action.name, name
        ))));
    }

    let action = state
        .resolver
        .upsert_action_draft(&server_id, action)
        .map_err(api_error)?;
    Ok(Json(ActionResponse {
        success: true,
        action,
    }))
}

/// Revert an action draft
/// DELETE /actions/{server_id}/drafts/{name}
pub async fn revert_draft(
    State(state): State<AppState>,
    Path((server_id, name)): Path<(String, String)>,
    Query(params): Query<RevertParams>,
) -> ApiResult<ActionResponse> {
    let action = state
        .resolver
        .revert_action_draft(&server_id, &name)
        .map_err(api_error)?;
    drop_reverted_entry(&state, &params);
    Ok(Json(ActionResponse {
        success: true,
        action,
    }))
}

/// Delete an action (soft delete until the next deploy)
/// DELETE /actions/{server_id}/{name}
pub async fn delete_action(
    State(state): State<AppState>,
    Path((server_id, name)): Path<(String, String)>,
) -> ApiResult<ActionResponse> {
    let action = state
        .resolver
        .delete_action(&server_id, &name)
        .await
        .map_err(api_error)?;
    Ok(Json(ActionResponse {
        success: true,
        action,
    }))
}

/// Widget rendered for an action, `null` when it has none
/// GET /actions/{server_id}/{name}/widget
pub async fn action_widget(
    State(state): State<AppState>,
    Path((server_id, name)): Path<(String, String)>,
) -> ApiResult<Option<WidgetResource>> {
    let widget = state
        .resolver
        .widget_for_action(&server_id, &name)
        .await
        .map_err(api_error)?;
    Ok(Json(widget))
}

/// Call a tool on the live server
/// POST /actions/{server_id}/{name}/call
pub async fn call_action(
    State(state): State<AppState>,
    Path((server_id, name)): Path<(String, String)>,
    payload: Result<Json<CallToolRequest>, JsonRejection>,
) -> ApiResult<CallToolResponse> {
    let Json(request) = payload.map_err(bad_payload)?;
    let result = state
        .resolver
        .call_tool(&server_id, &name, request.arguments)
        .await
        .map_err(api_error)?;
    Ok(Json(CallToolResponse { result }))
}

/// Write every dirty action and resource to the export directory
/// POST /actions/{server_id}/drafts/deploy
pub async fn deploy_drafts(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<DeployDraftsResponse> {
    let drafts = state
        .resolver
        .deploy_drafts(&server_id)
        .await
        .map_err(api_error)?;
    Ok(Json(DeployDraftsResponse {
        success: true,
        drafts,
    }))
}

/// Settle dirty actions after a successful external deploy
/// POST /actions/{server_id}/mark-deployed
pub async fn mark_deployed(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    Query(params): Query<MarkDeployedParams>,
) -> ApiResult<MarkDeployedResponse> {
    let deployed = state
        .resolver
        .mark_actions_deployed(&server_id)
        .map_err(api_error)?;
    let committed = commit_session(&state, params.session_id.as_deref());
    Ok(Json(MarkDeployedResponse {
        success: true,
        deployed,
        committed,
    }))
}
