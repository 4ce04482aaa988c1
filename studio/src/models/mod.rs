//! Data model shared by the store, the overlay resolver and the web layer
//!
//! Every type serializes with the camelCase field names used on the wire and
//! in the persisted JSON document.

pub mod action;
pub mod changelog;
pub mod deployment;
pub mod environment;
pub mod meta;
pub mod resource;
pub mod server;

pub use action::{Action, ActionAnnotations};
pub use changelog::{ChangeType, ChangelogEntry, NewChangelogEntry};
pub use deployment::{Deployment, DeploymentStatus};
pub use environment::{Environment, NewEnvironment};
pub use meta::{ActionMeta, ResourceMeta, WidgetCsp};
pub use resource::{WidgetResource, DEFAULT_WIDGET_MIME_TYPE};
pub use server::{NewServer, ServerRecord};

use serde::{Deserialize, Serialize};

/// Overlay flags carried by every action and widget resource
///
/// A record is "dirty" when it holds local state the live server does not
/// reflect yet: a pending edit, a creation that was never deployed, or a
/// soft deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayFlags {
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub deployed: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl OverlayFlags {
    /// Flags of a record reported by the live server
    pub const fn live() -> Self {
        Self {
            draft: false,
            deployed: true,
            deleted: false,
        }
    }

    pub const fn is_dirty(&self) -> bool {
        self.draft || !self.deployed || self.deleted
    }

    /// Still waiting for a deploy: an unsettled edit or creation
    ///
    /// A settled tombstone (`deleted`, deployed, no draft) is dirty but not
    /// pending.
    pub const fn is_pending(&self) -> bool {
        self.draft || !self.deployed
    }
}

/// A keyed record that participates in the draft overlay
pub trait Overlaid {
    /// Identity of the record within one server scope (action name, resource uri)
    fn key(&self) -> &str;

    fn flags(&self) -> &OverlayFlags;

    fn flags_mut(&mut self) -> &mut OverlayFlags;
}
