//! Runtime event stream payloads.

use crate::types::{EntityId, OperationId, OperationType};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpLogEvent {
    /// The log finished loading.
    Initialized {
        /// Operations loaded.
        operations: usize,
        /// True when loading failed and the log started empty.
        degraded: bool,
    },
    /// A new operation was durably appended.
    Appended {
        /// New operation id.
        id: OperationId,
        /// Its kind.
        op_type: OperationType,
        /// Entity it touches.
        entity_id: EntityId,
    },
    /// A batch of operations was acknowledged.
    Acknowledged {
        /// Acknowledged ids.
        ids: Vec<OperationId>,
    },
    /// The log was cleared.
    Cleared {
        /// Operations removed from the backend.
        removed: usize,
    },
    /// The number of unsynced operations changed.
    PendingChanged {
        /// New pending count.
        pending: usize,
    },
}
