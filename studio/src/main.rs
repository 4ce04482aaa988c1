use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use mcp_studio::config::StudioConfig;
use mcp_studio::gateway::McpGateway;
use mcp_studio::logging::init_tracing;
use mcp_studio::overlay::FileExporter;
use mcp_studio::store::Store;
use mcp_studio::web::{self, AppState, WebConfig};

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Draft overlay, changelog and deployment backend for MCP widget servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: nearest .studio.toml)
    #[arg(long, global = true, env = "STUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Store document path
    #[arg(long, global = true, env = "STUDIO_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, short, env = "STUDIO_PORT")]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },
    /// Mark deployments left running by a previous process as failed
    Reconcile,
    /// Print the merged action list of a server as JSON
    Actions {
        /// Server id
        server_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StudioConfig::load_from_path(path)?,
        None => StudioConfig::load()?,
    };

    let store_path = match cli.store.clone().or_else(|| config.store_path()) {
        Some(path) => path,
        None => Store::default_path()?,
    };
    let store = Arc::new(
        Store::open(&store_path)
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?,
    );

    let (startup_timeout, tool_timeout) = config.gateway_timeouts();
    let gateway = Arc::new(McpGateway::with_timeouts(startup_timeout, tool_timeout));
    let exporter = Arc::new(FileExporter::new(config.export_dir()?));
    let state = AppState::new(store, gateway, exporter, config.supervisor_config());

    match cli.command {
        Commands::Serve { port, host } => {
            let reconciled = state.supervisor.reconcile_orphans().await?;
            if reconciled > 0 {
                tracing::warn!("{} deployments were interrupted by a restart", reconciled);
            }

            let web_config = WebConfig {
                host: host.unwrap_or_else(|| config.server.host.clone()),
                port: port.unwrap_or(config.server.port),
            };
            web::serve(web_config, state).await?;
        }
        Commands::Reconcile => {
            let reconciled = state.supervisor.reconcile_orphans().await?;
            println!("Marked {} interrupted deployments as failed", reconciled);
        }
        Commands::Actions { server_id } => {
            let actions = state.resolver.merged_actions(&server_id).await?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
    }

    Ok(())
}
