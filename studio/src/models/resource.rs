//! Widget resources (MCP resources rendered as UI widgets)

use serde::{Deserialize, Serialize};

use super::{OverlayFlags, Overlaid, ResourceMeta};

/// Mime type the Apps SDK expects for widget templates
pub const DEFAULT_WIDGET_MIME_TYPE: &str = "text/html+skybridge";

fn default_mime_type() -> String {
    DEFAULT_WIDGET_MIME_TYPE.to_string()
}

/// A widget resource, keyed by `uri` within a server scope
///
/// `action_name` is a back-reference used for correlation only; the resource
/// is not owned by the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetResource {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResourceMeta>,
    #[serde(flatten)]
    pub flags: OverlayFlags,
}

impl WidgetResource {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: String::new(),
            mime_type: default_mime_type(),
            action_name: None,
            meta: None,
            flags: OverlayFlags::default(),
        }
    }
}

impl Overlaid for WidgetResource {
    fn key(&self) -> &str {
        &self.uri
    }

    fn flags(&self) -> &OverlayFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut OverlayFlags {
        &mut self.flags
    }
}
