//! Changelog entries recorded per editing session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of change a changelog entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    ActionAdded,
    ActionModified,
    ActionDeleted,
    ResourceAdded,
    ResourceModified,
    ResourceDeleted,
    NameChanged,
    DescriptionChanged,
    FieldAdded,
    FieldChanged,
    FieldRemoved,
    SchemaChanged,
    AnnotationsChanged,
    MetaChanged,
    UriChanged,
    MimetypeChanged,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeType::ActionAdded => "action_added",
            ChangeType::ActionModified => "action_modified",
            ChangeType::ActionDeleted => "action_deleted",
            ChangeType::ResourceAdded => "resource_added",
            ChangeType::ResourceModified => "resource_modified",
            ChangeType::ResourceDeleted => "resource_deleted",
            ChangeType::NameChanged => "name_changed",
            ChangeType::DescriptionChanged => "description_changed",
            ChangeType::FieldAdded => "field_added",
            ChangeType::FieldChanged => "field_changed",
            ChangeType::FieldRemoved => "field_removed",
            ChangeType::SchemaChanged => "schema_changed",
            ChangeType::AnnotationsChanged => "annotations_changed",
            ChangeType::MetaChanged => "meta_changed",
            ChangeType::UriChanged => "uri_changed",
            ChangeType::MimetypeChanged => "mimetype_changed",
        };
        f.write_str(s)
    }
}

/// A stored changelog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    /// Creation time of the first edit this row represents
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub description: String,
    #[serde(default)]
    pub committed: bool,
    pub session_id: String,
}

impl ChangelogEntry {
    /// Whether `other` describes the same subject and field as this entry
    ///
    /// The subject is the action name when present, otherwise the resource
    /// uri. Entries without either never match.
    pub fn same_subject(&self, other: &NewChangelogEntry) -> bool {
        if self.change_type != other.change_type || self.field_name != other.field_name {
            return false;
        }
        match (&other.action_name, &other.resource_uri) {
            (Some(name), _) => self.action_name.as_ref() == Some(name),
            (None, Some(uri)) => {
                self.action_name.is_none() && self.resource_uri.as_ref() == Some(uri)
            }
            (None, None) => false,
        }
    }
}

/// Changelog entry as submitted by a client
///
/// `id` and `timestamp` are filled in by the ledger when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangelogEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
    pub description: String,
}

impl NewChangelogEntry {
    pub fn new(change_type: ChangeType, description: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            change_type,
            action_name: None,
            resource_uri: None,
            field_name: None,
            old_value: None,
            new_value: None,
            description: description.into(),
        }
    }

    pub fn for_action(mut self, name: impl Into<String>) -> Self {
        self.action_name = Some(name.into());
        self
    }

    pub fn for_resource(mut self, uri: impl Into<String>) -> Self {
        self.resource_uri = Some(uri.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field_name = Some(field.into());
        self
    }

    pub fn values(mut self, old: Option<Value>, new: Option<Value>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }
}
