//! HTTP surface of the studio backend
//!
//! JSON REST routes over the overlay resolver, the changelog ledger and the
//! deployment supervisor.

pub mod actions;
pub mod bash;
pub mod changelog;
pub mod environments;
pub mod error;
pub mod resources;
pub mod servers;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

/// Configuration for the web server
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Start the web server
///
/// Every tracked process is killed once the server stops accepting
/// requests.
pub async fn serve(config: WebConfig, state: AppState) -> Result<()> {
    let supervisor = state.supervisor.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("Starting studio server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    supervisor.shutdown().await;
    tracing::info!("Studio server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health + servers
        .route("/health", get(servers::health_check))
        .route(
            "/servers",
            get(servers::list_servers).post(servers::create_server),
        )
        .route(
            "/servers/{server_id}",
            get(servers::get_server).delete(servers::delete_server),
        )
        // Actions
        .route("/actions/{server_id}/merged", get(actions::merged_actions))
        .route("/actions/{server_id}/discover", post(actions::discover))
        .route(
            "/actions/{server_id}/mark-deployed",
            post(actions::mark_deployed),
        )
        .route(
            "/actions/{server_id}/drafts/deploy",
            post(actions::deploy_drafts),
        )
        .route(
            "/actions/{server_id}/drafts/{name}",
            post(actions::upsert_draft).delete(actions::revert_draft),
        )
        .route("/actions/{server_id}/{name}", delete(actions::delete_action))
        .route(
            "/actions/{server_id}/{name}/widget",
            get(actions::action_widget),
        )
        .route("/actions/{server_id}/{name}/call", post(actions::call_action))
        // Widget resources
        .route(
            "/resources/{server_id}",
            delete(resources::delete_resource),
        )
        .route(
            "/resources/{server_id}/merged",
            get(resources::merged_resources),
        )
        .route(
            "/resources/{server_id}/drafts",
            post(resources::upsert_draft).delete(resources::revert_draft),
        )
        .route(
            "/resources/{server_id}/mark-deployed",
            post(resources::mark_deployed),
        )
        // Environments + deployments
        .route(
            "/environments/{server_id}",
            get(environments::list_environments).post(environments::create_environment),
        )
        .route(
            "/environments/{server_id}/{environment_id}",
            delete(environments::delete_environment),
        )
        .route(
            "/environments/{server_id}/{environment_id}/deploy",
            post(environments::deploy_environment),
        )
        .route(
            "/deployments/{environment_id}",
            get(environments::list_deployments),
        )
        .route(
            "/deployments/{environment_id}/{deployment_id}",
            get(environments::get_deployment),
        )
        // Command execution
        .route("/bash/execute", post(bash::execute))
        .route("/bash/kill/{session_id}", post(bash::kill))
        .route("/bash/sessions", get(bash::sessions))
        .route("/bash/output/{session_id}", get(bash::output))
        // Changelog
        .route(
            "/changelog/{session_id}",
            get(changelog::list_entries)
                .post(changelog::record_entry)
                .delete(changelog::clear_session),
        )
        .route(
            "/changelog/{session_id}/commit",
            post(changelog::commit_session),
        )
        .route(
            "/changelog/{session_id}/{entry_id}",
            delete(changelog::delete_entry),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
