//! Deployment environments of a server

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named target (preview, live, ...) a server can be deployed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub server_id: String,
    pub name: String,
    /// Command run by `POST /environments/{serverId}/{environmentId}/deploy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Extra variables passed to the deploy command
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an environment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnvironment {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub deploy_command: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl NewEnvironment {
    pub fn into_environment(self, server_id: &str) -> Environment {
        Environment {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            server_id: server_id.to_string(),
            name: self.name,
            deploy_command: self.deploy_command,
            working_dir: self.working_dir,
            env: self.env,
            created_at: Utc::now(),
        }
    }
}
