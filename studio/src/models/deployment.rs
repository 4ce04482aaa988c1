//! Deployment records and their status lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment status
///
/// `Running` is the only non-terminal state; a record never leaves a
/// terminal state once it reached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Running,
    Success,
    Failed,
    Killed,
}

impl DeploymentStatus {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, DeploymentStatus::Running)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::Running => write!(f, "running"),
            DeploymentStatus::Success => write!(f, "success"),
            DeploymentStatus::Failed => write!(f, "failed"),
            DeploymentStatus::Killed => write!(f, "killed"),
        }
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(DeploymentStatus::Running),
            "success" => Ok(DeploymentStatus::Success),
            "failed" => Ok(DeploymentStatus::Failed),
            "killed" => Ok(DeploymentStatus::Killed),
            _ => Err(anyhow::anyhow!("Unknown deployment status: {}", s)),
        }
    }
}

/// A build/deploy command run against an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub environment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub status: DeploymentStatus,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accumulated stdout and stderr
    #[serde(default)]
    pub output: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Deployment {
    /// Start a new running deployment
    pub fn start(environment_id: &str, command: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            environment_id: environment_id.to_string(),
            server_id: None,
            status: DeploymentStatus::Running,
            command: command.to_string(),
            description: None,
            output: String::new(),
            started_at: Utc::now(),
            completed_at: None,
            exit_code: None,
            session_id: None,
        }
    }

    /// Move a running deployment into a terminal status
    ///
    /// Returns false and leaves the record untouched when it is already
    /// terminal or `status` is not a terminal status.
    pub fn finish(&mut self, status: DeploymentStatus, exit_code: Option<i32>, output: String) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.exit_code = exit_code;
        self.output = output;
        self.completed_at = Some(Utc::now());
        true
    }
}
