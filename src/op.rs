//! Operation record model and sync-state transition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    checksum::{self, ChecksumAlgorithm},
    identity::DeviceIdentity,
    types::{EntityId, EntityType, OperationId, OperationType, ServerSeq, TimestampMs},
};

/// Version number for persisted operation rows.
pub const OP_FORMAT_VERSION: u16 = 1;

/// Immutable record of one domain mutation.
///
/// Only [`Operation::synced_at`] and [`Operation::server_seq`] change after
/// append, through [`Operation::acknowledge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation id.
    pub id: OperationId,
    /// Mutation kind.
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Kind of entity touched.
    pub entity_type: EntityType,
    /// Entity touched.
    pub entity_id: EntityId,
    /// Type-specific description of the change.
    pub payload: Value,
    /// Append time in milliseconds.
    pub timestamp: TimestampMs,
    /// Originating device.
    pub device_id: String,
    /// Originating owner.
    pub owner_id: String,
    /// Sequence assigned by the remote authority once synced.
    pub server_seq: Option<ServerSeq>,
    /// Acknowledgment time; `None` while pending.
    pub synced_at: Option<TimestampMs>,
    /// Digest of `payload`, see [`crate::checksum`].
    pub checksum: String,
}

impl Operation {
    /// Builds a fresh pending operation with a new id and a payload checksum.
    pub fn new(
        op_type: OperationType,
        entity_type: EntityType,
        entity_id: impl Into<EntityId>,
        payload: Value,
        identity: &DeviceIdentity,
        algorithm: ChecksumAlgorithm,
        timestamp: TimestampMs,
    ) -> Self {
        let checksum = checksum::compute(&payload, algorithm);
        Self {
            id: Uuid::now_v7().to_string(),
            op_type,
            entity_type,
            entity_id: entity_id.into(),
            payload,
            timestamp,
            device_id: identity.device_id.clone(),
            owner_id: identity.owner_id.clone(),
            server_seq: None,
            synced_at: None,
            checksum,
        }
    }

    /// True while no remote acknowledgment has been recorded.
    pub fn is_pending(&self) -> bool {
        self.synced_at.is_none()
    }

    /// Records a remote acknowledgment. Calling again overwrites.
    pub fn acknowledge(&mut self, synced_at: TimestampMs, server_seq: Option<ServerSeq>) {
        self.synced_at = Some(synced_at);
        self.server_seq = server_seq;
    }

    /// Recomputes the payload checksum and compares it to the stored one.
    pub fn verify_checksum(&self) -> bool {
        checksum::verify(&self.payload, &self.checksum)
    }
}

/// One acknowledgment as applied to the log and the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAck {
    /// Operation being acknowledged.
    pub operation_id: OperationId,
    /// Server sequence, if the authority sent one.
    pub server_seq: Option<ServerSeq>,
    /// Acknowledgment time.
    pub synced_at: TimestampMs,
}
