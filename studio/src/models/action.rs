//! Actions (MCP tools) as stored and served by the studio

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ActionMeta, OverlayFlags, Overlaid};

/// Behavioral hints of a tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// An action exposed by an MCP server, keyed by `name` within a server scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ActionAnnotations>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ActionMeta>,
    #[serde(flatten)]
    pub flags: OverlayFlags,
}

impl Action {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: description.into(),
            input_schema: None,
            annotations: None,
            meta: None,
            flags: OverlayFlags::default(),
        }
    }

    /// Output template URI from `_meta`, if any
    pub fn output_template(&self) -> Option<&str> {
        self.meta.as_ref()?.output_template.as_deref()
    }
}

impl Overlaid for Action {
    fn key(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> &OverlayFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut OverlayFlags {
        &mut self.flags
    }
}
