//! Deployment supervisor
//!
//! Spawns build/deploy commands, tracks them in a process table keyed by
//! session id, and persists the lifecycle of the associated Deployment.
//!
//! The process table is the single source of truth for "still running".
//! An entry is inserted on spawn and removed exactly once, either by the
//! monitor when the child exits or by [`DeploymentSupervisor::kill`]. The
//! side that removes the entry decides the terminal status, so an exited
//! process is never killed and a record is never finalised twice.

mod output;

pub use output::{OutputBuffer, TRUNCATION_MARKER};

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};

use crate::error::{Result, StudioError};
use crate::models::{Deployment, DeploymentStatus, Environment};
use crate::store::Store;

use output::spawn_reader;

/// How long to wait for pipe readers after the child is gone
///
/// Grandchildren can keep a pipe open long after the shell exited.
const READER_GRACE: Duration = Duration::from_secs(2);

const INTERRUPTED_NOTE: &str = "[interrupted: supervisor restarted before the command finished]";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Shell used as `<shell> -c <command>`
    pub shell: String,
    /// Default working directory when a request has no `cwd`
    pub working_dir: Option<PathBuf>,
    /// Output kept per process before truncation
    pub max_output_bytes: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
            max_output_bytes: 1024 * 1024,
        }
    }
}

// ============================================================================
// Requests and outcomes
// ============================================================================

/// A command to run, as posted to `/bash/execute`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub command: String,
    #[serde(default)]
    pub description: Option<String>,
    /// When set, a Deployment record tracks the run
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    /// Added on top of the inherited environment
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub background: bool,
}

impl ExecuteRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Request running an environment's deploy command
    pub fn for_environment(environment: &Environment) -> Result<Self> {
        let command = environment
            .deploy_command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                StudioError::validation(format!(
                    "Environment '{}' has no deploy command",
                    environment.name
                ))
            })?;

        Ok(Self {
            command,
            description: Some(format!("Deploy to {}", environment.name)),
            environment_id: Some(environment.id.clone()),
            server_id: Some(environment.server_id.clone()),
            cwd: environment.working_dir.clone(),
            env: environment.env.clone(),
            background: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// `running` for background runs, the terminal status otherwise
    pub status: DeploymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecuteOutcome {
    /// Background runs count as successful once started
    pub fn success(&self) -> bool {
        matches!(
            self.status,
            DeploymentStatus::Running | DeploymentStatus::Success
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Killed,
    /// Nothing tracked under that session: already exited or never existed
    NotFound,
}

/// A tracked process as listed by `/bash/sessions`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    pub command: String,
    pub started_at: DateTime<Utc>,
}

// ============================================================================
// Process table
// ============================================================================

/// Sent by `kill` to the monitor; the monitor answers once the record is final
type KillSignal = oneshot::Sender<()>;

struct TrackedProcess {
    kill_tx: oneshot::Sender<KillSignal>,
    deployment_id: Option<String>,
    output: OutputBuffer,
    command: String,
    started_at: DateTime<Utc>,
}

type ProcessTable = Arc<Mutex<HashMap<String, TrackedProcess>>>;

struct Completion {
    status: DeploymentStatus,
    exit_code: Option<i32>,
    output: String,
}

/// Move a deployment to its terminal status
fn finalize(
    store: &Store,
    deployment_id: &str,
    status: DeploymentStatus,
    exit_code: Option<i32>,
    output: String,
) -> Result<()> {
    store.update(|doc| {
        let deployment = doc.find_deployment_mut(deployment_id).ok_or_else(|| {
            StudioError::not_found(format!("Deployment '{}' not found", deployment_id))
        })?;
        if !deployment.finish(status, exit_code, output) {
            tracing::warn!(
                "Deployment {} already {}, not moving to {}",
                deployment_id,
                deployment.status,
                status
            );
        }
        Ok(())
    })
}

/// Watches one child until it exits or is killed
struct Monitor {
    store: Arc<Store>,
    processes: ProcessTable,
    session_id: String,
    deployment_id: Option<String>,
    output: OutputBuffer,
}

impl Monitor {
    async fn run(self, mut child: Child, mut kill_rx: oneshot::Receiver<KillSignal>) -> Completion {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, self.output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, self.output.clone()));
        }

        let (status, exit_code, ack) = tokio::select! {
            waited = child.wait() => {
                let claimed = self.processes.lock().await.remove(&self.session_id).is_some();
                if claimed {
                    match waited {
                        Ok(exit) if exit.success() => (DeploymentStatus::Success, exit.code(), None),
                        Ok(exit) => (DeploymentStatus::Failed, exit.code(), None),
                        Err(e) => {
                            self.output.push_line(&format!("Failed to wait for process: {}", e)).await;
                            (DeploymentStatus::Failed, None, None)
                        }
                    }
                } else {
                    // kill() removed the entry first and owns the transition
                    let ack = kill_rx.await.ok();
                    (DeploymentStatus::Killed, waited.ok().and_then(|exit| exit.code()), ack)
                }
            }
            ack = &mut kill_rx => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill session {}: {}", self.session_id, e);
                }
                (DeploymentStatus::Killed, None, ack.ok())
            }
        };

        for reader in readers {
            let abort = reader.abort_handle();
            if tokio::time::timeout(READER_GRACE, reader).await.is_err() {
                abort.abort();
            }
        }

        let output = self.output.snapshot().await;
        if let Some(deployment_id) = &self.deployment_id {
            if let Err(e) = finalize(&self.store, deployment_id, status, exit_code, output.clone()) {
                tracing::error!("Failed to record deployment {} as {}: {}", deployment_id, status, e);
            }
        }
        tracing::info!(
            "Session {} finished: {} (exit code {:?})",
            self.session_id,
            status,
            exit_code
        );

        if let Some(ack) = ack {
            let _ = ack.send(());
        }

        Completion {
            status,
            exit_code,
            output,
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

pub struct DeploymentSupervisor {
    store: Arc<Store>,
    config: SupervisorConfig,
    processes: ProcessTable,
}

impl DeploymentSupervisor {
    pub fn new(store: Arc<Store>, config: SupervisorConfig) -> Self {
        Self {
            store,
            config,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run a command
    ///
    /// Foreground runs return once the process is done and the Deployment
    /// record (if any) is final. Background runs return right after spawn.
    /// A command that fails to spawn is reported as a failed run, not as an
    /// error.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteOutcome> {
        if request.command.trim().is_empty() {
            return Err(StudioError::validation("Command must not be empty"));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let deployment_id = match &request.environment_id {
            Some(environment_id) => {
                let mut deployment = Deployment::start(environment_id, &request.command);
                deployment.description = request.description.clone();
                deployment.session_id = Some(session_id.clone());
                let id = deployment.id.clone();

                self.store.update(|doc| {
                    let environment = doc.environment_by_id(environment_id).ok_or_else(|| {
                        StudioError::not_found(format!(
                            "Environment '{}' not found",
                            environment_id
                        ))
                    })?;
                    deployment.server_id = request
                        .server_id
                        .clone()
                        .or_else(|| Some(environment.server_id.clone()));
                    doc.insert_deployment(deployment);
                    Ok::<_, StudioError>(())
                })?;
                Some(id)
            }
            None => None,
        };

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(&request.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let cwd = request
            .cwd
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
            .or_else(|| self.config.working_dir.clone());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let output = format!("Failed to spawn '{}': {}", request.command, e);
                tracing::warn!("{}", output);
                if let Some(id) = &deployment_id {
                    finalize(&self.store, id, DeploymentStatus::Failed, None, output.clone())?;
                }
                return Ok(ExecuteOutcome {
                    session_id,
                    deployment_id,
                    status: DeploymentStatus::Failed,
                    output: Some(output),
                    exit_code: None,
                });
            }
        };

        let output = OutputBuffer::new(self.config.max_output_bytes);
        let (kill_tx, kill_rx) = oneshot::channel();
        self.processes.lock().await.insert(
            session_id.clone(),
            TrackedProcess {
                kill_tx,
                deployment_id: deployment_id.clone(),
                output: output.clone(),
                command: request.command.clone(),
                started_at: Utc::now(),
            },
        );
        tracing::info!(
            "Session {} started: {}{}",
            session_id,
            request.command,
            if request.background { " (background)" } else { "" }
        );

        let monitor = Monitor {
            store: self.store.clone(),
            processes: self.processes.clone(),
            session_id: session_id.clone(),
            deployment_id: deployment_id.clone(),
            output,
        };
        let handle = tokio::spawn(monitor.run(child, kill_rx));

        if request.background {
            return Ok(ExecuteOutcome {
                session_id,
                deployment_id,
                status: DeploymentStatus::Running,
                output: None,
                exit_code: None,
            });
        }

        let completion = match handle.await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!("Monitor for session {} failed: {}", session_id, e);
                Completion {
                    status: DeploymentStatus::Failed,
                    exit_code: None,
                    output: format!("Process monitor failed: {}", e),
                }
            }
        };

        Ok(ExecuteOutcome {
            session_id,
            deployment_id,
            status: completion.status,
            output: Some(completion.output),
            exit_code: completion.exit_code,
        })
    }

    /// Forcefully terminate a tracked process
    ///
    /// Returns once the process is gone and its Deployment is `killed`.
    pub async fn kill(&self, session_id: &str) -> KillOutcome {
        let Some(tracked) = self.processes.lock().await.remove(session_id) else {
            return KillOutcome::NotFound;
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if tracked.kill_tx.send(ack_tx).is_err() {
            tracing::warn!("Monitor for session {} is gone", session_id);
            return KillOutcome::NotFound;
        }
        let _ = ack_rx.await;

        tracing::info!("Session {} killed", session_id);
        KillOutcome::Killed
    }

    /// Output accumulated so far by a running session
    pub async fn live_output(&self, session_id: &str) -> Option<String> {
        let buffer = self
            .processes
            .lock()
            .await
            .get(session_id)
            .map(|p| p.output.clone())?;
        Some(buffer.snapshot().await)
    }

    /// Tracked sessions, oldest first
    pub async fn running_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .processes
            .lock()
            .await
            .iter()
            .map(|(session_id, p)| SessionInfo {
                session_id: session_id.clone(),
                deployment_id: p.deployment_id.clone(),
                command: p.command.clone(),
                started_at: p.started_at,
            })
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    /// Kill every tracked process; returns how many were killed
    pub async fn shutdown(&self) -> usize {
        let session_ids: Vec<String> = self.processes.lock().await.keys().cloned().collect();
        let mut killed = 0;
        for session_id in session_ids {
            if self.kill(&session_id).await == KillOutcome::Killed {
                killed += 1;
            }
        }
        if killed > 0 {
            tracing::info!("Killed {} running sessions on shutdown", killed);
        }
        killed
    }

    /// Fail `running` deployments that no tracked process belongs to
    ///
    /// Run at boot, where such records are left over from a previous
    /// process that exited before they finished.
    pub async fn reconcile_orphans(&self) -> Result<usize> {
        let tracked: Vec<String> = self
            .processes
            .lock()
            .await
            .values()
            .filter_map(|p| p.deployment_id.clone())
            .collect();

        let reconciled = self.store.update(|doc| {
            let mut count = 0;
            for deployment in doc.running_deployments_mut() {
                if tracked.contains(&deployment.id) {
                    continue;
                }
                let output = if deployment.output.is_empty() {
                    INTERRUPTED_NOTE.to_string()
                } else {
                    format!("{}\n{}", deployment.output, INTERRUPTED_NOTE)
                };
                if deployment.finish(DeploymentStatus::Failed, None, output) {
                    count += 1;
                }
            }
            Ok::<_, StudioError>(count)
        })?;

        if reconciled > 0 {
            tracing::warn!("Marked {} interrupted deployments as failed", reconciled);
        }
        Ok(reconciled)
    }
}
