//! Widget resource overlay handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::actions::{
    commit_session, drop_reverted_entry, MarkDeployedParams, MarkDeployedResponse, RevertParams,
};
use super::error::{api_error, bad_payload, ApiResult};
use super::state::AppState;
use crate::models::WidgetResource;

#[derive(Debug, Serialize)]
pub struct MergedResourcesResponse {
    pub resources: Vec<WidgetResource>,
}

#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub success: bool,
    pub resource: WidgetResource,
}

/// Resources are addressed by uri in the query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceParams {
    pub uri: String,
    #[serde(flatten)]
    pub revert: RevertParams,
}

/// GET /resources/{server_id}/merged
pub async fn merged_resources(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<MergedResourcesResponse> {
    let resources = state
        .resolver
        .merged_resources(&server_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MergedResourcesResponse { resources }))
}

/// POST /resources/{server_id}/drafts
pub async fn upsert_draft(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    payload: Result<Json<WidgetResource>, JsonRejection>,
) -> ApiResult<ResourceResponse> {
    let Json(resource) = payload.map_err(bad_payload)?;
    let resource = state
        .resolver
        .upsert_resource_draft(&server_id, resource)
        .await
        .map_err(api_error)?;
    Ok(Json(ResourceResponse {
        success: true,
        resource,
    }))
}

/// DELETE /resources/{server_id}/drafts?uri=
pub async fn revert_draft(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<ResourceResponse> {
    let resource = state
        .resolver
        .revert_resource_draft(&server_id, &params.uri)
        .map_err(api_error)?;
    drop_reverted_entry(&state, &params.revert);
    Ok(Json(ResourceResponse {
        success: true,
        resource,
    }))
}

/// DELETE /resources/{server_id}?uri=
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<ResourceResponse> {
    let resource = state
        .resolver
        .delete_resource(&server_id, &params.uri)
        .await
        .map_err(api_error)?;
    Ok(Json(ResourceResponse {
        success: true,
        resource,
    }))
}

/// POST /resources/{server_id}/mark-deployed
pub async fn mark_deployed(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    Query(params): Query<MarkDeployedParams>,
) -> ApiResult<MarkDeployedResponse> {
    let deployed = state
        .resolver
        .mark_resources_deployed(&server_id)
        .map_err(api_error)?;
    let committed = commit_session(&state, params.session_id.as_deref());
    Ok(Json(MarkDeployedResponse {
        success: true,
        deployed,
        committed,
    }))
}
