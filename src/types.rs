//! Shared primitive IDs and operation-kind enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Locally generated, globally unique operation identifier.
pub type OperationId = String;
/// Note, notebook or tag identifier.
pub type EntityId = String;
/// Sequence number assigned by the remote sync authority.
pub type ServerSeq = u64;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Domain object an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A single note.
    Note,
    /// A notebook (folder) of notes.
    Notebook,
    /// A tag attached to notes.
    Tag,
}

impl EntityType {
    /// Stable storage/wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Notebook => "notebook",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Self::Note),
            "notebook" => Ok(Self::Notebook),
            "tag" => Ok(Self::Tag),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

/// Kind of mutation recorded by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Note created.
    NoteCreated,
    /// Note fields changed.
    NoteUpdated,
    /// Note moved to trash or removed.
    NoteDeleted,
    /// Note restored from trash.
    NoteRestored,
    /// Note moved between notebooks.
    NoteMoved,
    /// Tag attached to a note.
    NoteTagAdded,
    /// Tag detached from a note.
    NoteTagRemoved,
    /// Note pinned.
    NotePinned,
    /// Note unpinned.
    NoteUnpinned,
    /// Note workflow status changed.
    NoteStatusChanged,
    /// Notebook created.
    NotebookCreated,
    /// Notebook fields changed.
    NotebookUpdated,
    /// Notebook deleted.
    NotebookDeleted,
    /// Notebook restored.
    NotebookRestored,
    /// Notebook moved under another parent.
    NotebookMoved,
    /// Tag created.
    TagCreated,
    /// Tag fields changed.
    TagUpdated,
    /// Tag deleted.
    TagDeleted,
    /// Tag restored.
    TagRestored,
    /// Tag moved under another parent.
    TagMoved,
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: [Self; 20] = [
        Self::NoteCreated,
        Self::NoteUpdated,
        Self::NoteDeleted,
        Self::NoteRestored,
        Self::NoteMoved,
        Self::NoteTagAdded,
        Self::NoteTagRemoved,
        Self::NotePinned,
        Self::NoteUnpinned,
        Self::NoteStatusChanged,
        Self::NotebookCreated,
        Self::NotebookUpdated,
        Self::NotebookDeleted,
        Self::NotebookRestored,
        Self::NotebookMoved,
        Self::TagCreated,
        Self::TagUpdated,
        Self::TagDeleted,
        Self::TagRestored,
        Self::TagMoved,
    ];

    /// The entity type this operation kind is always paired with.
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::NoteCreated
            | Self::NoteUpdated
            | Self::NoteDeleted
            | Self::NoteRestored
            | Self::NoteMoved
            | Self::NoteTagAdded
            | Self::NoteTagRemoved
            | Self::NotePinned
            | Self::NoteUnpinned
            | Self::NoteStatusChanged => EntityType::Note,
            Self::NotebookCreated
            | Self::NotebookUpdated
            | Self::NotebookDeleted
            | Self::NotebookRestored
            | Self::NotebookMoved => EntityType::Notebook,
            Self::TagCreated
            | Self::TagUpdated
            | Self::TagDeleted
            | Self::TagRestored
            | Self::TagMoved => EntityType::Tag,
        }
    }

    /// Stable storage/wire name, e.g. `NOTE_CREATED`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoteCreated => "NOTE_CREATED",
            Self::NoteUpdated => "NOTE_UPDATED",
            Self::NoteDeleted => "NOTE_DELETED",
            Self::NoteRestored => "NOTE_RESTORED",
            Self::NoteMoved => "NOTE_MOVED",
            Self::NoteTagAdded => "NOTE_TAG_ADDED",
            Self::NoteTagRemoved => "NOTE_TAG_REMOVED",
            Self::NotePinned => "NOTE_PINNED",
            Self::NoteUnpinned => "NOTE_UNPINNED",
            Self::NoteStatusChanged => "NOTE_STATUS_CHANGED",
            Self::NotebookCreated => "NOTEBOOK_CREATED",
            Self::NotebookUpdated => "NOTEBOOK_UPDATED",
            Self::NotebookDeleted => "NOTEBOOK_DELETED",
            Self::NotebookRestored => "NOTEBOOK_RESTORED",
            Self::NotebookMoved => "NOTEBOOK_MOVED",
            Self::TagCreated => "TAG_CREATED",
            Self::TagUpdated => "TAG_UPDATED",
            Self::TagDeleted => "TAG_DELETED",
            Self::TagRestored => "TAG_RESTORED",
            Self::TagMoved => "TAG_MOVED",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown operation type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_names_match_serde() {
        for t in OperationType::ALL {
            let json = serde_json::to_string(&t).expect("serialize");
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(t.as_str().parse::<OperationType>(), Ok(t));
        }
    }

    #[test]
    fn entity_pairing_follows_prefix() {
        assert_eq!(OperationType::NoteTagAdded.entity_type(), EntityType::Note);
        assert_eq!(OperationType::NotebookMoved.entity_type(), EntityType::Notebook);
        assert_eq!(OperationType::TagRestored.entity_type(), EntityType::Tag);
        assert!("folder".parse::<EntityType>().is_err());
    }
}
