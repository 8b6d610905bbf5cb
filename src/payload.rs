//! Typed payloads accepted by the convenience logging wrappers.
//!
//! Each struct serializes to the JSON object stored in
//! [`crate::op::Operation::payload`], with camelCase keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of `NOTE_CREATED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreated {
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// Containing notebook, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<String>,
    /// Tags attached at creation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
}

/// Payload of `NOTEBOOK_CREATED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookCreated {
    /// Display name.
    pub name: String,
    /// Parent notebook, if nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Payload of `TAG_CREATED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCreated {
    /// Display name.
    pub name: String,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Parent tag, if nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Payload of the `*_UPDATED` kinds: changed values and their field names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Updated {
    /// Names of the changed fields.
    pub fields: Vec<String>,
    /// New value per changed field.
    pub changes: Map<String, Value>,
}

impl Updated {
    /// Builds the payload from new values; `fields` follows the key order.
    pub fn from_changes(changes: Map<String, Value>) -> Self {
        Self {
            fields: changes.keys().cloned().collect(),
            changes,
        }
    }
}

/// Payload of the `*_DELETED` kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    /// True for permanent removal, false for moving to trash.
    pub permanent: bool,
}

/// Payload of the `*_RESTORED` kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restored {
    /// Parent the entity was restored into, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Payload of `NOTE_MOVED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMoved {
    /// Notebook before the move.
    pub old_notebook_id: Option<String>,
    /// Notebook after the move.
    pub new_notebook_id: Option<String>,
}

/// Payload of `NOTEBOOK_MOVED` and `TAG_MOVED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentMoved {
    /// Parent before the move.
    pub old_parent_id: Option<String>,
    /// Parent after the move.
    pub new_parent_id: Option<String>,
}

/// Payload of `NOTE_TAG_ADDED` and `NOTE_TAG_REMOVED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    /// Tag attached or detached.
    pub tag_id: String,
}

/// Payload of `NOTE_STATUS_CHANGED`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
    /// Status before the change.
    pub old_status: Option<String>,
    /// Status after the change.
    pub new_status: String,
}
