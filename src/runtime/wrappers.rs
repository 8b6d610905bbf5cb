//! Typed logging helpers, one per operation type.
//!
//! Each helper fixes the operation type and its entity type so call sites
//! cannot pair them wrongly.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    op::Operation,
    payload::{
        Deleted, NoteCreated, NoteMoved, NoteTag, NotebookCreated, ParentMoved, Restored,
        StatusChanged, TagCreated, Updated,
    },
    types::{EntityId, OperationType},
};

use super::handle::{OpLogHandle, RuntimeError};

impl OpLogHandle {
    async fn log_typed<P: Serialize>(
        &self,
        op_type: OperationType,
        entity_id: impl Into<EntityId>,
        payload: &P,
    ) -> Result<Operation, RuntimeError> {
        let payload = serde_json::to_value(payload)?;
        self.log_operation(op_type, op_type.entity_type(), entity_id, payload)
            .await
    }

    async fn log_empty(
        &self,
        op_type: OperationType,
        entity_id: impl Into<EntityId>,
    ) -> Result<Operation, RuntimeError> {
        self.log_operation(
            op_type,
            op_type.entity_type(),
            entity_id,
            Value::Object(Map::new()),
        )
        .await
    }

    pub async fn log_note_created(
        &self,
        note_id: impl Into<EntityId>,
        payload: NoteCreated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteCreated, note_id, &payload)
            .await
    }

    pub async fn log_note_updated(
        &self,
        note_id: impl Into<EntityId>,
        payload: Updated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteUpdated, note_id, &payload)
            .await
    }

    pub async fn log_note_deleted(
        &self,
        note_id: impl Into<EntityId>,
        payload: Deleted,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteDeleted, note_id, &payload)
            .await
    }

    pub async fn log_note_restored(
        &self,
        note_id: impl Into<EntityId>,
        payload: Restored,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteRestored, note_id, &payload)
            .await
    }

    pub async fn log_note_moved(
        &self,
        note_id: impl Into<EntityId>,
        payload: NoteMoved,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteMoved, note_id, &payload)
            .await
    }

    pub async fn log_note_tag_added(
        &self,
        note_id: impl Into<EntityId>,
        payload: NoteTag,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteTagAdded, note_id, &payload)
            .await
    }

    pub async fn log_note_tag_removed(
        &self,
        note_id: impl Into<EntityId>,
        payload: NoteTag,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteTagRemoved, note_id, &payload)
            .await
    }

    pub async fn log_note_pinned(
        &self,
        note_id: impl Into<EntityId>,
    ) -> Result<Operation, RuntimeError> {
        self.log_empty(OperationType::NotePinned, note_id).await
    }

    pub async fn log_note_unpinned(
        &self,
        note_id: impl Into<EntityId>,
    ) -> Result<Operation, RuntimeError> {
        self.log_empty(OperationType::NoteUnpinned, note_id).await
    }

    pub async fn log_note_status_changed(
        &self,
        note_id: impl Into<EntityId>,
        payload: StatusChanged,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NoteStatusChanged, note_id, &payload)
            .await
    }

    pub async fn log_notebook_created(
        &self,
        notebook_id: impl Into<EntityId>,
        payload: NotebookCreated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NotebookCreated, notebook_id, &payload)
            .await
    }

    pub async fn log_notebook_updated(
        &self,
        notebook_id: impl Into<EntityId>,
        payload: Updated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NotebookUpdated, notebook_id, &payload)
            .await
    }

    pub async fn log_notebook_deleted(
        &self,
        notebook_id: impl Into<EntityId>,
        payload: Deleted,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NotebookDeleted, notebook_id, &payload)
            .await
    }

    pub async fn log_notebook_restored(
        &self,
        notebook_id: impl Into<EntityId>,
        payload: Restored,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NotebookRestored, notebook_id, &payload)
            .await
    }

    pub async fn log_notebook_moved(
        &self,
        notebook_id: impl Into<EntityId>,
        payload: ParentMoved,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::NotebookMoved, notebook_id, &payload)
            .await
    }

    pub async fn log_tag_created(
        &self,
        tag_id: impl Into<EntityId>,
        payload: TagCreated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::TagCreated, tag_id, &payload)
            .await
    }

    pub async fn log_tag_updated(
        &self,
        tag_id: impl Into<EntityId>,
        payload: Updated,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::TagUpdated, tag_id, &payload)
            .await
    }

    pub async fn log_tag_deleted(
        &self,
        tag_id: impl Into<EntityId>,
        payload: Deleted,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::TagDeleted, tag_id, &payload)
            .await
    }

    pub async fn log_tag_restored(
        &self,
        tag_id: impl Into<EntityId>,
        payload: Restored,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::TagRestored, tag_id, &payload)
            .await
    }

    pub async fn log_tag_moved(
        &self,
        tag_id: impl Into<EntityId>,
        payload: ParentMoved,
    ) -> Result<Operation, RuntimeError> {
        self.log_typed(OperationType::TagMoved, tag_id, &payload)
            .await
    }
}
