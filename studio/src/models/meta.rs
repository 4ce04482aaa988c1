//! Typed `_meta` namespaces
//!
//! MCP tools and resources carry a free-form `_meta` object. The keys this
//! backend reads are modelled as explicit fields; anything else is kept
//! verbatim in `extra` so unknown keys survive a store round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `_meta` of an action (tool)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMeta {
    /// URI of the widget resource rendered for this tool's output
    #[serde(
        rename = "openai/outputTemplate",
        alias = "outputTemplate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_template: Option<String>,

    #[serde(
        rename = "openai/widgetAccessible",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_accessible: Option<bool>,

    /// Status text shown while the tool runs
    #[serde(
        rename = "openai/toolInvocation/invoking",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub invoking: Option<String>,

    /// Status text shown once the tool returned
    #[serde(
        rename = "openai/toolInvocation/invoked",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub invoked: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content security policy domains of a widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetCsp {
    #[serde(default)]
    pub connect_domains: Vec<String>,
    #[serde(default)]
    pub resource_domains: Vec<String>,
}

/// `_meta` of a widget resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    #[serde(
        rename = "openai/widgetCSP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_csp: Option<WidgetCsp>,

    #[serde(
        rename = "openai/widgetDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_description: Option<String>,

    #[serde(
        rename = "openai/widgetDomain",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_domain: Option<String>,

    #[serde(
        rename = "openai/widgetPrefersBorder",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prefers_border: Option<bool>,

    /// Page the widget embeds
    #[serde(rename = "embedUrl", default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
