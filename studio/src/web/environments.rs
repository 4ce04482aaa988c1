//! Environment and deployment record handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::bash::ExecuteResponse;
use super::error::{api_error, bad_payload, ApiResult};
use super::state::AppState;
use crate::error::StudioError;
use crate::models::{Deployment, Environment, NewEnvironment};
use crate::supervisor::ExecuteRequest;

#[derive(Debug, Serialize)]
pub struct EnvironmentsListResponse {
    pub environments: Vec<Environment>,
}

#[derive(Debug, Serialize)]
pub struct DeploymentsListResponse {
    pub deployments: Vec<Deployment>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeployParams {
    #[serde(default)]
    pub background: bool,
}

// ============================================================================
// Environments
// ============================================================================

/// GET /environments/{server_id}
pub async fn list_environments(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<EnvironmentsListResponse> {
    let environments = state
        .store
        .read(|doc| {
            doc.server(&server_id)
                .map(|_| doc.environments(&server_id).to_vec())
        })
        .map_err(|e| api_error(e.into()))?
        .ok_or_else(|| {
            api_error(StudioError::not_found(format!(
                "Server '{}' not found",
                server_id
            )))
        })?;
    Ok(Json(EnvironmentsListResponse { environments }))
}

/// POST /environments/{server_id}
pub async fn create_environment(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    payload: Result<Json<NewEnvironment>, JsonRejection>,
) -> ApiResult<Environment> {
    let Json(request) = payload.map_err(bad_payload)?;
    if request.name.trim().is_empty() {
        return Err(api_error(StudioError::validation(
            "Environment name must not be empty",
        )));
    }

    let environment = state
        .store
        .update(|doc| {
            if doc.server(&server_id).is_none() {
                return Err(StudioError::not_found(format!(
                    "Server '{}' not found",
                    server_id
                )));
            }
            let environment = request.into_environment(&server_id);
            if doc.environment_by_id(&environment.id).is_some() {
                return Err(StudioError::Conflict(format!(
                    "Environment '{}' already exists",
                    environment.id
                )));
            }
            doc.environments
                .entry(server_id.clone())
                .or_default()
                .push(environment.clone());
            Ok(environment)
        })
        .map_err(api_error)?;

    tracing::info!("Created environment {} for {}", environment.id, server_id);
    Ok(Json(environment))
}

/// Remove an environment and its deployment history
/// DELETE /environments/{server_id}/{environment_id}
pub async fn delete_environment(
    State(state): State<AppState>,
    Path((server_id, environment_id)): Path<(String, String)>,
) -> ApiResult<Environment> {
    let removed = state
        .store
        .update(|doc| {
            let not_found = || {
                StudioError::not_found(format!(
                    "Environment '{}' not found",
                    environment_id
                ))
            };

            if doc
                .deployments(&environment_id)
                .iter()
                .any(|d| !d.status.is_terminal())
            {
                return Err(StudioError::Conflict(format!(
                    "Environment '{}' has a running deployment",
                    environment_id
                )));
            }

            let environments = doc.environments.get_mut(&server_id).ok_or_else(not_found)?;
            let pos = environments
                .iter()
                .position(|e| e.id == environment_id)
                .ok_or_else(not_found)?;
            let removed = environments.remove(pos);
            if environments.is_empty() {
                doc.environments.remove(&server_id);
            }
            doc.deployments.remove(&environment_id);
            Ok(removed)
        })
        .map_err(api_error)?;

    Ok(Json(removed))
}

/// Run the environment's deploy command
/// POST /environments/{server_id}/{environment_id}/deploy?background=
pub async fn deploy_environment(
    State(state): State<AppState>,
    Path((server_id, environment_id)): Path<(String, String)>,
    Query(params): Query<DeployParams>,
) -> ApiResult<ExecuteResponse> {
    let environment = state
        .store
        .read(|doc| doc.environment(&server_id, &environment_id).cloned())
        .map_err(|e| api_error(e.into()))?
        .ok_or_else(|| {
            api_error(StudioError::not_found(format!(
                "Environment '{}' not found",
                environment_id
            )))
        })?;

    let mut request = ExecuteRequest::for_environment(&environment).map_err(api_error)?;
    request.background = params.background;

    let outcome = state.supervisor.execute(request).await.map_err(api_error)?;
    Ok(Json(ExecuteResponse::from(outcome)))
}

// ============================================================================
// Deployments
// ============================================================================

/// Deployment history of an environment, newest first
/// GET /deployments/{environment_id}
pub async fn list_deployments(
    State(state): State<AppState>,
    Path(environment_id): Path<String>,
) -> ApiResult<DeploymentsListResponse> {
    let mut deployments = state
        .store
        .read(|doc| doc.deployments(&environment_id).to_vec())
        .map_err(|e| api_error(e.into()))?;
    deployments.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    let total = deployments.len();
    Ok(Json(DeploymentsListResponse { deployments, total }))
}

/// GET /deployments/{environment_id}/{deployment_id}
pub async fn get_deployment(
    State(state): State<AppState>,
    Path((environment_id, deployment_id)): Path<(String, String)>,
) -> ApiResult<Deployment> {
    state
        .store
        .read(|doc| {
            doc.deployments(&environment_id)
                .iter()
                .find(|d| d.id == deployment_id)
                .cloned()
        })
        .map_err(|e| api_error(e.into()))?
        .map(Json)
        .ok_or_else(|| {
            api_error(StudioError::not_found(format!(
                "Deployment '{}' not found",
                deployment_id
            )))
        })
}
