//! Overlay resolver service
//!
//! Combines the live gateway with the persistent store. Reads degrade to
//! store-only data when the live server cannot be reached; writes only ever
//! touch the store (and, for deploys, the draft exporter).

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{correlate_widget, link_resources, merge_actions, merge_resources, settle_deployed};
use super::DraftExporter;
use crate::error::{Result, StudioError};
use crate::gateway::LiveGateway;
use crate::models::{Action, Overlaid, OverlayFlags, ServerRecord, WidgetResource};
use crate::store::{ActionOrigin, Document, Store};

/// Names handed to the exporter by a drafts deploy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployedDrafts {
    /// Action names
    pub written: Vec<String>,
    /// Resource uris
    pub resources: Vec<String>,
}

/// Outcome of a discovery sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoverySummary {
    pub tools: usize,
    pub resources: usize,
    /// Live records not stored because a dirty local copy exists
    pub skipped: Vec<String>,
}

/// Action names taken by fixed segments of the `/actions/{serverId}/...`
/// routes; an action with one of these names could not be addressed
pub const RESERVED_ACTION_NAMES: [&str; 4] = ["deploy", "discover", "mark-deployed", "merged"];

fn require_server<'a>(doc: &'a Document, server_id: &str) -> Result<&'a ServerRecord> {
    doc.server(server_id)
        .ok_or_else(|| StudioError::not_found(format!("Server '{}' not found", server_id)))
}

pub struct OverlayResolver {
    store: Arc<Store>,
    gateway: Arc<dyn LiveGateway>,
    exporter: Arc<dyn DraftExporter>,
}

impl OverlayResolver {
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn LiveGateway>,
        exporter: Arc<dyn DraftExporter>,
    ) -> Self {
        Self {
            store,
            gateway,
            exporter,
        }
    }

    fn server(&self, server_id: &str) -> Result<ServerRecord> {
        self.store
            .read(|doc| require_server(doc, server_id).cloned())?
    }

    // ------------------------------------------------------------------------
    // Live reads (never fail)
    // ------------------------------------------------------------------------

    async fn live_actions(&self, server: &ServerRecord) -> Vec<Action> {
        match self.gateway.list_tools(server).await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!(
                    "Live server '{}' unavailable, using stored actions only: {:#}",
                    server.id,
                    e
                );
                Vec::new()
            }
        }
    }

    async fn live_resources(&self, server: &ServerRecord) -> Vec<WidgetResource> {
        match self.gateway.list_resources(server).await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(
                    "Live server '{}' unavailable, using stored resources only: {:#}",
                    server.id,
                    e
                );
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Merged views
    // ------------------------------------------------------------------------

    /// Actions a client should see for `server_id`
    pub async fn merged_actions(&self, server_id: &str) -> Result<Vec<Action>> {
        let server = self.server(server_id)?;
        let live = self.live_actions(&server).await;
        let stored = self.store.read(|doc| doc.actions(server_id))?;
        Ok(merge_actions(&live, &stored))
    }

    /// Widget resources a client should see, with `actionName` filled in
    /// where it can be derived
    pub async fn merged_resources(&self, server_id: &str) -> Result<Vec<WidgetResource>> {
        let server = self.server(server_id)?;
        let (live_actions, live_resources) =
            tokio::join!(self.live_actions(&server), self.live_resources(&server));

        let (stored_actions, stored_resources) = self
            .store
            .read(|doc| (doc.actions(server_id), doc.resources(server_id).to_vec()))?;

        let actions = merge_actions(&live_actions, &stored_actions);
        let mut resources = merge_resources(&live_resources, &stored_resources);
        link_resources(&mut resources, &actions);
        Ok(resources)
    }

    /// Widget rendered for one action, `None` when it has no widget
    pub async fn widget_for_action(
        &self,
        server_id: &str,
        name: &str,
    ) -> Result<Option<WidgetResource>> {
        let server = self.server(server_id)?;
        let (live_actions, live_resources) =
            tokio::join!(self.live_actions(&server), self.live_resources(&server));

        let (stored_actions, stored_resources) = self
            .store
            .read(|doc| (doc.actions(server_id), doc.resources(server_id).to_vec()))?;

        let actions = merge_actions(&live_actions, &stored_actions);
        let action = actions
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| StudioError::not_found(format!("Action '{}' not found", name)))?;

        let resources = merge_resources(&live_resources, &stored_resources);
        Ok(correlate_widget(action, &resources).cloned())
    }

    // ------------------------------------------------------------------------
    // Action drafts
    // ------------------------------------------------------------------------

    /// Store `action` as a draft
    ///
    /// An existing stored copy is replaced in place and keeps its `deployed`
    /// flag. A new copy goes to `discovered` when it mirrors a deployed live
    /// action, otherwise to `custom`.
    pub fn upsert_action_draft(&self, server_id: &str, mut action: Action) -> Result<Action> {
        if action.name.trim().is_empty() {
            return Err(StudioError::validation("Action name must not be empty"));
        }
        if RESERVED_ACTION_NAMES.contains(&action.name.as_str()) {
            return Err(StudioError::validation(format!(
                "Action name '{}' is reserved",
                action.name
            )));
        }

        self.store.update(|doc| {
            require_server(doc, server_id)?;

            let sets = doc.action_sets_mut(server_id);
            let origin = match sets.find(&action.name) {
                Some((origin, existing)) => {
                    action.flags.deployed = existing.flags.deployed;
                    origin
                }
                None if action.flags.deployed => ActionOrigin::Discovered,
                None => ActionOrigin::Custom,
            };
            action.flags.draft = true;

            sets.upsert(origin, action.clone());
            tracing::info!("Draft saved for action {}/{}", server_id, action.name);
            Ok(action)
        })
    }

    /// Drop the stored copy of an action, reverting to the live copy
    pub fn revert_action_draft(&self, server_id: &str, name: &str) -> Result<Action> {
        self.store.update(|doc| {
            require_server(doc, server_id)?;
            let removed = doc.remove_action(server_id, name).ok_or_else(|| {
                StudioError::not_found(format!("No draft for action '{}'", name))
            })?;
            tracing::info!("Draft reverted for action {}/{}", server_id, name);
            Ok(removed)
        })
    }

    /// Delete an action
    ///
    /// A never-deployed action is removed outright. Anything else is
    /// soft-deleted until the next deploy, using the live copy as the
    /// tombstone when nothing is stored yet.
    pub async fn delete_action(&self, server_id: &str, name: &str) -> Result<Action> {
        let server = self.server(server_id)?;
        let stored = self
            .store
            .read(|doc| doc.action_sets(server_id).and_then(|s| s.find(name)).is_some())?;

        let live_copy = if stored {
            None
        } else {
            self.live_actions(&server)
                .await
                .into_iter()
                .find(|a| a.name == name)
        };

        self.store.update(|doc| {
            require_server(doc, server_id)?;

            let existing = doc
                .action_sets(server_id)
                .and_then(|s| s.find(name))
                .map(|(_, a)| a.flags.deployed);

            match (existing, live_copy) {
                (Some(false), _) => {
                    let removed = doc.remove_action(server_id, name).ok_or_else(|| {
                        StudioError::not_found(format!("Action '{}' not found", name))
                    })?;
                    tracing::info!("Removed undeployed action {}/{}", server_id, name);
                    Ok(removed)
                }
                (Some(true), _) => {
                    let action = doc
                        .action_sets_mut(server_id)
                        .find_mut(name)
                        .ok_or_else(|| {
                            StudioError::not_found(format!("Action '{}' not found", name))
                        })?;
                    action.flags.deleted = true;
                    action.flags.draft = true;
                    tracing::info!("Soft-deleted action {}/{}", server_id, name);
                    Ok(action.clone())
                }
                (None, Some(mut live)) => {
                    live.flags.deleted = true;
                    live.flags.draft = true;
                    doc.action_sets_mut(server_id)
                        .upsert(ActionOrigin::Discovered, live.clone());
                    tracing::info!("Soft-deleted live action {}/{}", server_id, name);
                    Ok(live)
                }
                (None, None) => Err(StudioError::not_found(format!(
                    "Action '{}' not found",
                    name
                ))),
            }
        })
    }

    /// Settle every pending action after a successful external deploy
    ///
    /// Soft-deleted actions stay stored as deployed tombstones. Returns the
    /// names that changed; settled actions are not touched and nothing is
    /// written when no action was pending.
    pub fn mark_actions_deployed(&self, server_id: &str) -> Result<Vec<String>> {
        self.store.update(|doc| {
            require_server(doc, server_id)?;

            let Some(sets) = doc.actions.get_mut(server_id) else {
                return Ok(Vec::new());
            };
            let mut changed = settle_deployed(&mut sets.discovered);
            changed.extend(settle_deployed(&mut sets.custom));

            if !changed.is_empty() {
                tracing::info!("Marked {} actions deployed on {}", changed.len(), server_id);
            }
            Ok(changed)
        })
    }

    // ------------------------------------------------------------------------
    // Resource drafts
    // ------------------------------------------------------------------------

    /// Store `resource` as a draft
    ///
    /// A present `actionName` must reference an action known to the store or
    /// the live server.
    pub async fn upsert_resource_draft(
        &self,
        server_id: &str,
        mut resource: WidgetResource,
    ) -> Result<WidgetResource> {
        if resource.uri.trim().is_empty() {
            return Err(StudioError::validation("Resource uri must not be empty"));
        }
        if resource.name.trim().is_empty() {
            return Err(StudioError::validation("Resource name must not be empty"));
        }

        let server = self.server(server_id)?;

        if let Some(action_name) = resource.action_name.clone() {
            let stored = self.store.read(|doc| {
                doc.action_sets(server_id)
                    .and_then(|s| s.find(&action_name))
                    .is_some()
            })?;
            let known = stored
                || self
                    .live_actions(&server)
                    .await
                    .iter()
                    .any(|a| a.name == action_name);
            if !known {
                return Err(StudioError::validation(format!(
                    "Resource references unknown action '{}'",
                    action_name
                )));
            }
        }

        self.store.update(|doc| {
            require_server(doc, server_id)?;

            if let Some(existing) = doc.find_resource(server_id, &resource.uri) {
                resource.flags.deployed = existing.flags.deployed;
            }
            resource.flags.draft = true;

            doc.upsert_resource(server_id, resource.clone());
            tracing::info!("Draft saved for widget {}/{}", server_id, resource.uri);
            Ok(resource)
        })
    }

    pub fn revert_resource_draft(&self, server_id: &str, uri: &str) -> Result<WidgetResource> {
        self.store.update(|doc| {
            require_server(doc, server_id)?;
            let removed = doc.remove_resource(server_id, uri).ok_or_else(|| {
                StudioError::not_found(format!("No draft for resource '{}'", uri))
            })?;
            tracing::info!("Draft reverted for widget {}/{}", server_id, uri);
            Ok(removed)
        })
    }

    /// Delete a widget resource, same rules as [`Self::delete_action`]
    pub async fn delete_resource(&self, server_id: &str, uri: &str) -> Result<WidgetResource> {
        let server = self.server(server_id)?;
        let stored = self
            .store
            .read(|doc| doc.find_resource(server_id, uri).is_some())?;

        let live_copy = if stored {
            None
        } else {
            self.live_resources(&server)
                .await
                .into_iter()
                .find(|r| r.uri == uri)
        };

        self.store.update(|doc| {
            require_server(doc, server_id)?;

            let existing = doc.find_resource(server_id, uri).map(|r| r.flags.deployed);
            match (existing, live_copy) {
                (Some(false), _) => doc.remove_resource(server_id, uri).ok_or_else(|| {
                    StudioError::not_found(format!("Resource '{}' not found", uri))
                }),
                (Some(true), _) => {
                    let resource = doc
                        .resources_mut(server_id)
                        .iter_mut()
                        .find(|r| r.uri == uri)
                        .ok_or_else(|| {
                            StudioError::not_found(format!("Resource '{}' not found", uri))
                        })?;
                    resource.flags.deleted = true;
                    resource.flags.draft = true;
                    Ok(resource.clone())
                }
                (None, Some(mut live)) => {
                    live.flags.deleted = true;
                    live.flags.draft = true;
                    doc.upsert_resource(server_id, live.clone());
                    Ok(live)
                }
                (None, None) => Err(StudioError::not_found(format!(
                    "Resource '{}' not found",
                    uri
                ))),
            }
        })
    }

    pub fn mark_resources_deployed(&self, server_id: &str) -> Result<Vec<String>> {
        self.store.update(|doc| {
            require_server(doc, server_id)?;

            let Some(resources) = doc.widget_resources.get_mut(server_id) else {
                return Ok(Vec::new());
            };
            Ok(settle_deployed(resources))
        })
    }

    // ------------------------------------------------------------------------
    // Deploy + discovery
    // ------------------------------------------------------------------------

    /// Hand every dirty action and resource to the exporter
    ///
    /// Flags are not changed here; `mark_*_deployed` settles them once the
    /// external deploy succeeded.
    pub async fn deploy_drafts(&self, server_id: &str) -> Result<DeployedDrafts> {
        let (actions, resources) = self.store.read(|doc| {
            require_server(doc, server_id).map(|_| {
                let actions: Vec<Action> = doc
                    .actions(server_id)
                    .into_iter()
                    .filter(|a| a.flags.is_dirty())
                    .collect();
                let resources: Vec<WidgetResource> = doc
                    .resources(server_id)
                    .iter()
                    .filter(|r| r.flags.is_dirty())
                    .cloned()
                    .collect();
                (actions, resources)
            })
        })??;

        let written = self
            .exporter
            .export_actions(server_id, &actions)
            .await
            .map_err(|e| StudioError::Export(format!("{:#}", e)))?;
        let resources = self
            .exporter
            .export_resources(server_id, &resources)
            .await
            .map_err(|e| StudioError::Export(format!("{:#}", e)))?;

        Ok(DeployedDrafts { written, resources })
    }

    /// Store the live server's tools and resources as discovered records
    ///
    /// Dirty local copies are kept; the live server must be reachable.
    pub async fn discover(&self, server_id: &str) -> Result<DiscoverySummary> {
        let server = self.server(server_id)?;

        let tools = self
            .gateway
            .list_tools(&server)
            .await
            .map_err(|e| StudioError::Upstream(format!("{:#}", e)))?;
        let resources = self
            .gateway
            .list_resources(&server)
            .await
            .map_err(|e| StudioError::Upstream(format!("{:#}", e)))?;

        self.store.update(|doc| {
            require_server(doc, server_id)?;
            let mut summary = DiscoverySummary::default();

            for mut tool in tools {
                let dirty = doc
                    .action_sets(server_id)
                    .and_then(|s| s.find(&tool.name))
                    .is_some_and(|(_, a)| a.flags.is_dirty());
                if dirty {
                    summary.skipped.push(tool.name);
                    continue;
                }
                tool.flags = OverlayFlags::live();
                doc.action_sets_mut(server_id)
                    .upsert(ActionOrigin::Discovered, tool);
                summary.tools += 1;
            }

            for mut resource in resources {
                let dirty = doc
                    .find_resource(server_id, &resource.uri)
                    .is_some_and(|r| r.flags().is_dirty());
                if dirty {
                    summary.skipped.push(resource.uri);
                    continue;
                }
                resource.flags = OverlayFlags::live();
                doc.upsert_resource(server_id, resource);
                summary.resources += 1;
            }

            tracing::info!(
                "Discovered {} tools and {} resources on {}",
                summary.tools,
                summary.resources,
                server_id
            );
            Ok(summary)
        })
    }

    /// Call a tool on the live server
    pub async fn call_tool(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> Result<Value> {
        let server = self.server(server_id)?;
        self.gateway
            .call_tool(&server, tool_name, arguments)
            .await
            .map_err(|e| StudioError::Upstream(format!("{:#}", e)))
    }
}
