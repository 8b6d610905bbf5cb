pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::{
    identity::DeviceIdentity,
    op::{Operation, SyncAck},
    types::OperationId,
};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Stored operations in insertion order plus ids of rows that could not be
/// decoded. An unreadable row does not fail the whole load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    pub operations: Vec<Operation>,
    pub unreadable: Vec<OperationId>,
}

/// Durable storage port for the operation log.
///
/// Implementations must keep operations in insertion order and apply each
/// `mark_synced` batch atomically.
pub trait OpBackend: Send {
    fn load_all(&mut self) -> PersistResult<Replay>;
    fn append(&mut self, op: &Operation) -> PersistResult<()>;
    /// Applies every ack in one transaction. Returns rows updated; ids the
    /// backend does not hold are ignored.
    fn mark_synced(&mut self, acks: &[SyncAck]) -> PersistResult<usize>;
    fn clear(&mut self) -> PersistResult<usize>;
    fn load_identity(&mut self) -> PersistResult<Option<DeviceIdentity>>;
    fn store_identity(&mut self, identity: &DeviceIdentity) -> PersistResult<()>;
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
