//! Shared application state

use std::sync::Arc;

use crate::changelog::ChangelogLedger;
use crate::gateway::LiveGateway;
use crate::overlay::{DraftExporter, OverlayResolver};
use crate::store::Store;
use crate::supervisor::{DeploymentSupervisor, SupervisorConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub resolver: Arc<OverlayResolver>,
    pub ledger: Arc<ChangelogLedger>,
    pub supervisor: Arc<DeploymentSupervisor>,
}

impl AppState {
    /// Wire every service around one store
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn LiveGateway>,
        exporter: Arc<dyn DraftExporter>,
        supervisor_config: SupervisorConfig,
    ) -> Self {
        Self {
            resolver: Arc::new(OverlayResolver::new(store.clone(), gateway, exporter)),
            ledger: Arc::new(ChangelogLedger::new(store.clone())),
            supervisor: Arc::new(DeploymentSupervisor::new(store.clone(), supervisor_config)),
            store,
        }
    }
}
