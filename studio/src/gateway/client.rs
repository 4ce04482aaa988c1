//! Spawn-per-call MCP gateway
//!
//! Each operation launches the server command, performs the MCP handshake,
//! issues one request and shuts the connection down again.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::{
    model::CallToolRequestParam, service::RunningService, transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;

use super::LiveGateway;
use crate::models::{Action, OverlayFlags, ServerRecord, WidgetResource};

/// Default startup timeout for spawning and initializing an MCP server
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default tool call timeout
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Gateway that reaches live servers over rmcp's child-process transport
#[derive(Debug, Clone)]
pub struct McpGateway {
    startup_timeout: Duration,
    tool_timeout: Duration,
}

impl Default for McpGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl McpGateway {
    pub fn new() -> Self {
        Self {
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeouts(startup_timeout: Duration, tool_timeout: Duration) -> Self {
        Self {
            startup_timeout,
            tool_timeout,
        }
    }

    fn command(server: &ServerRecord) -> Command {
        let mut cmd = Command::new(&server.command);
        if !server.args.is_empty() {
            cmd.args(&server.args);
        }
        for (key, value) in &server.env {
            let expanded = shellexpand::env(value).unwrap_or_else(|_| value.clone().into());
            cmd.env(key, expanded.into_owned());
        }
        cmd
    }

    async fn connect(&self, server: &ServerRecord) -> Result<RunningService<RoleClient, ()>> {
        tracing::debug!("Connecting to MCP server: {}", server.id);

        let cmd = Self::command(server);

        // Wrap spawn + initialization in startup timeout
        let service = tokio::time::timeout(self.startup_timeout, async {
            let transport = TokioChildProcess::new(cmd)?;
            let svc = ().serve(transport).await?;
            Ok::<_, anyhow::Error>(svc)
        })
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "MCP server '{}' startup timed out after {:?}",
                server.id,
                self.startup_timeout
            )
        })??;

        Ok(service)
    }
}

/// Convert a protocol record into a live overlay record
///
/// Goes through JSON so every protocol field the model knows about
/// (`inputSchema`, `annotations`, `_meta`, ...) is carried over by name.
fn into_live<T, F>(record: &impl serde::Serialize, set_flags: F) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&mut T),
{
    let value = serde_json::to_value(record)?;
    let mut converted: T = serde_json::from_value(value)?;
    set_flags(&mut converted);
    Ok(converted)
}

#[async_trait]
impl LiveGateway for McpGateway {
    async fn list_tools(&self, server: &ServerRecord) -> Result<Vec<Action>> {
        let service = self.connect(server).await?;

        let response = service
            .list_tools(Default::default())
            .await
            .context("Failed to list tools")?;

        let tools = response
            .tools
            .iter()
            .map(|t| into_live(t, |a: &mut Action| a.flags = OverlayFlags::live()))
            .collect::<Result<Vec<_>>>()?;

        service.cancel().await?;

        tracing::info!("Server '{}': {} live tools", server.id, tools.len());
        Ok(tools)
    }

    async fn list_resources(&self, server: &ServerRecord) -> Result<Vec<WidgetResource>> {
        let service = self.connect(server).await?;

        let response = service
            .list_resources(Default::default())
            .await
            .context("Failed to list resources")?;

        let resources = response
            .resources
            .iter()
            .map(|r| into_live(r, |w: &mut WidgetResource| w.flags = OverlayFlags::live()))
            .collect::<Result<Vec<_>>>()?;

        service.cancel().await?;

        tracing::info!("Server '{}': {} live resources", server.id, resources.len());
        Ok(resources)
    }

    async fn call_tool(
        &self,
        server: &ServerRecord,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> Result<Value> {
        tracing::debug!("Calling {} on MCP server {}", tool_name, server.id);

        let service = self.connect(server).await?;

        let args = arguments.and_then(|v| v.as_object().cloned());
        let result = tokio::time::timeout(
            self.tool_timeout,
            service.call_tool(CallToolRequestParam {
                name: tool_name.to_string().into(),
                arguments: args,
                task: None,
            }),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "Tool '{}' timed out after {:?}",
                tool_name,
                self.tool_timeout
            )
        })?
        .context("Failed to call tool")?;

        service.cancel().await?;
        Ok(serde_json::to_value(result)?)
    }
}
