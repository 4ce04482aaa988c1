//! Server registry and health handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;

use super::error::{api_error, bad_payload, ApiResult};
use super::state::AppState;
use crate::error::StudioError;
use crate::models::{NewServer, ServerRecord};

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_revision: u64,
    pub running_sessions: usize,
}

/// Health check endpoint
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let store_revision = state.store.revision().map_err(|e| api_error(e.into()))?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        store_revision,
        running_sessions: state.supervisor.running_sessions().await.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ServersListResponse {
    pub servers: Vec<ServerRecord>,
    pub total: usize,
}

fn validate_server(server: &NewServer) -> Result<(), StudioError> {
    if server.id.trim().is_empty() || server.id.contains('/') {
        return Err(StudioError::validation(
            "Server id must be non-empty and must not contain '/'",
        ));
    }
    if server.command.trim().is_empty() {
        return Err(StudioError::validation("Server command must not be empty"));
    }
    Ok(())
}

/// List registered servers
/// GET /servers
pub async fn list_servers(State(state): State<AppState>) -> ApiResult<ServersListResponse> {
    let servers: Vec<ServerRecord> = state
        .store
        .read(|doc| doc.servers.values().cloned().collect())
        .map_err(|e| api_error(e.into()))?;
    let total = servers.len();
    Ok(Json(ServersListResponse { servers, total }))
}

/// Register a server; duplicate ids are rejected
/// POST /servers
pub async fn create_server(
    State(state): State<AppState>,
    payload: Result<Json<NewServer>, JsonRejection>,
) -> ApiResult<ServerRecord> {
    let Json(server) = payload.map_err(bad_payload)?;
    validate_server(&server).map_err(api_error)?;

    let record = state
        .store
        .update(|doc| {
            if doc.servers.contains_key(&server.id) {
                return Err(StudioError::Conflict(format!(
                    "Server '{}' already exists",
                    server.id
                )));
            }
            let record = ServerRecord::from(server);
            doc.servers.insert(record.id.clone(), record.clone());
            Ok(record)
        })
        .map_err(api_error)?;

    tracing::info!("Registered server {}", record.id);
    Ok(Json(record))
}

/// GET /servers/{server_id}
pub async fn get_server(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<ServerRecord> {
    state
        .store
        .read(|doc| doc.server(&server_id).cloned())
        .map_err(|e| api_error(e.into()))?
        .map(Json)
        .ok_or_else(|| {
            api_error(StudioError::not_found(format!(
                "Server '{}' not found",
                server_id
            )))
        })
}

/// Remove a server with its actions, resources, environments and deployments
/// DELETE /servers/{server_id}
pub async fn delete_server(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> ApiResult<ServerRecord> {
    let removed = state
        .store
        .update(|doc| {
            let deploying = doc.environments(&server_id).iter().any(|env| {
                doc.deployments(&env.id)
                    .iter()
                    .any(|d| !d.status.is_terminal())
            });
            if deploying {
                return Err(StudioError::Conflict(format!(
                    "Server '{}' has a running deployment",
                    server_id
                )));
            }

            doc.remove_server(&server_id).ok_or_else(|| {
                StudioError::not_found(format!("Server '{}' not found", server_id))
            })
        })
        .map_err(api_error)?;

    tracing::info!("Removed server {}", server_id);
    Ok(Json(removed))
}
