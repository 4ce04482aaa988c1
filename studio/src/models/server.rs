//! Registered MCP servers

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed MCP server and how to reach its live instance
///
/// The launch fields mirror an `.mcp.json` server entry: the gateway spawns
/// `command args...` and speaks MCP over its stdio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl From<NewServer> for ServerRecord {
    fn from(server: NewServer) -> Self {
        Self {
            id: server.id,
            name: server.name,
            description: server.description,
            command: server.command,
            args: server.args,
            env: server.env,
            created_at: Utc::now(),
        }
    }
}
