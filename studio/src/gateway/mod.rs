//! Live server gateway
//!
//! The gateway supplies "deployed truth": the tools and resources a running
//! MCP server reports right now. The overlay resolver only depends on the
//! [`LiveGateway`] trait so it can be driven by a fake in tests.

mod client;

pub use client::McpGateway;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Action, ServerRecord, WidgetResource};

/// Read access to a live MCP server
///
/// Returned records always carry live overlay flags (`deployed`, not draft,
/// not deleted).
#[async_trait]
pub trait LiveGateway: Send + Sync {
    /// List the tools the server currently exposes
    async fn list_tools(&self, server: &ServerRecord) -> Result<Vec<Action>>;

    /// List the resources the server currently exposes
    async fn list_resources(&self, server: &ServerRecord) -> Result<Vec<WidgetResource>>;

    /// Call a tool and return the raw MCP result
    async fn call_tool(
        &self,
        server: &ServerRecord,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> Result<Value>;
}
