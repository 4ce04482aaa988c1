//! The persisted JSON document and its collection helpers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    Action, ChangelogEntry, Deployment, DeploymentStatus, Environment, ServerRecord,
    WidgetResource,
};

/// Which sub-collection an action lives in
///
/// Origin is bookkeeping only; overlay logic never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    /// Came from the live server
    Discovered,
    /// Created locally and possibly never deployed
    Custom,
}

/// Actions of one server, split by origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSets {
    #[serde(default)]
    pub discovered: Vec<Action>,
    #[serde(default)]
    pub custom: Vec<Action>,
}

impl ActionSets {
    /// All actions in store order: discovered first, then custom
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.discovered.iter().chain(self.custom.iter())
    }

    pub fn find(&self, name: &str) -> Option<(ActionOrigin, &Action)> {
        if let Some(action) = self.discovered.iter().find(|a| a.name == name) {
            return Some((ActionOrigin::Discovered, action));
        }
        self.custom
            .iter()
            .find(|a| a.name == name)
            .map(|a| (ActionOrigin::Custom, a))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.discovered
            .iter_mut()
            .chain(self.custom.iter_mut())
            .find(|a| a.name == name)
    }

    /// Insert or replace by name, keeping names unique across both collections
    ///
    /// An existing entry is replaced in place and keeps its origin.
    pub fn upsert(&mut self, origin: ActionOrigin, action: Action) {
        if let Some(existing) = self.find_mut(&action.name) {
            *existing = action;
            return;
        }
        match origin {
            ActionOrigin::Discovered => self.discovered.push(action),
            ActionOrigin::Custom => self.custom.push(action),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Action> {
        if let Some(pos) = self.discovered.iter().position(|a| a.name == name) {
            return Some(self.discovered.remove(pos));
        }
        let pos = self.custom.iter().position(|a| a.name == name)?;
        Some(self.custom.remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty() && self.custom.is_empty()
    }
}

/// The whole persisted state
///
/// Maps are keyed by server id except `deployments` (environment id) and
/// `changelogs` (session id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Incremented on every persisted write
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerRecord>,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionSets>,
    #[serde(default)]
    pub widget_resources: BTreeMap<String, Vec<WidgetResource>>,
    #[serde(default)]
    pub environments: BTreeMap<String, Vec<Environment>>,
    #[serde(default)]
    pub deployments: BTreeMap<String, Vec<Deployment>>,
    #[serde(default)]
    pub changelogs: BTreeMap<String, Vec<ChangelogEntry>>,
}

impl Document {
    // ------------------------------------------------------------------------
    // Servers
    // ------------------------------------------------------------------------

    pub fn server(&self, id: &str) -> Option<&ServerRecord> {
        self.servers.get(id)
    }

    /// Remove a server together with everything scoped to it
    pub fn remove_server(&mut self, id: &str) -> Option<ServerRecord> {
        let server = self.servers.remove(id)?;
        self.actions.remove(id);
        self.widget_resources.remove(id);
        if let Some(environments) = self.environments.remove(id) {
            for env in environments {
                self.deployments.remove(&env.id);
            }
        }
        Some(server)
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Stored actions of a server in store order
    pub fn actions(&self, server_id: &str) -> Vec<Action> {
        self.actions
            .get(server_id)
            .map(|sets| sets.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn action_sets(&self, server_id: &str) -> Option<&ActionSets> {
        self.actions.get(server_id)
    }

    /// Mutable action sets, created on first use
    pub fn action_sets_mut(&mut self, server_id: &str) -> &mut ActionSets {
        self.actions.entry(server_id.to_string()).or_default()
    }

    /// Remove a stored action, dropping the server entry once it is empty
    pub fn remove_action(&mut self, server_id: &str, name: &str) -> Option<Action> {
        let sets = self.actions.get_mut(server_id)?;
        let removed = sets.remove(name);
        if sets.is_empty() {
            self.actions.remove(server_id);
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Widget resources
    // ------------------------------------------------------------------------

    pub fn resources(&self, server_id: &str) -> &[WidgetResource] {
        self.widget_resources
            .get(server_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn resources_mut(&mut self, server_id: &str) -> &mut Vec<WidgetResource> {
        self.widget_resources
            .entry(server_id.to_string())
            .or_default()
    }

    pub fn find_resource(&self, server_id: &str, uri: &str) -> Option<&WidgetResource> {
        self.resources(server_id).iter().find(|r| r.uri == uri)
    }

    /// Insert or replace a resource by uri
    pub fn upsert_resource(&mut self, server_id: &str, resource: WidgetResource) {
        let resources = self.resources_mut(server_id);
        match resources.iter_mut().find(|r| r.uri == resource.uri) {
            Some(existing) => *existing = resource,
            None => resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, server_id: &str, uri: &str) -> Option<WidgetResource> {
        let resources = self.widget_resources.get_mut(server_id)?;
        let pos = resources.iter().position(|r| r.uri == uri)?;
        let removed = resources.remove(pos);
        if resources.is_empty() {
            self.widget_resources.remove(server_id);
        }
        Some(removed)
    }

    // ------------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------------

    pub fn environments(&self, server_id: &str) -> &[Environment] {
        self.environments
            .get(server_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn environment(&self, server_id: &str, environment_id: &str) -> Option<&Environment> {
        self.environments(server_id)
            .iter()
            .find(|e| e.id == environment_id)
    }

    /// Find an environment by id across all servers
    pub fn environment_by_id(&self, environment_id: &str) -> Option<&Environment> {
        self.environments
            .values()
            .flatten()
            .find(|e| e.id == environment_id)
    }

    // ------------------------------------------------------------------------
    // Deployments
    // ------------------------------------------------------------------------

    pub fn deployments(&self, environment_id: &str) -> &[Deployment] {
        self.deployments
            .get(environment_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn insert_deployment(&mut self, deployment: Deployment) {
        self.deployments
            .entry(deployment.environment_id.clone())
            .or_default()
            .push(deployment);
    }

    pub fn find_deployment(&self, id: &str) -> Option<&Deployment> {
        self.deployments.values().flatten().find(|d| d.id == id)
    }

    pub fn find_deployment_mut(&mut self, id: &str) -> Option<&mut Deployment> {
        self.deployments
            .values_mut()
            .flatten()
            .find(|d| d.id == id)
    }

    pub fn running_deployments_mut(&mut self) -> impl Iterator<Item = &mut Deployment> {
        self.deployments
            .values_mut()
            .flatten()
            .filter(|d| d.status == DeploymentStatus::Running)
    }

    // ------------------------------------------------------------------------
    // Changelogs
    // ------------------------------------------------------------------------

    pub fn changelog(&self, session_id: &str) -> &[ChangelogEntry] {
        self.changelogs
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
