use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};

use crate::{
    checksum::ChecksumAlgorithm,
    core::store::{OperationLog, StoreError},
    identity::{self, DeviceIdentity},
    op::Operation,
    persist::{OpBackend, PersistError, PersistResult},
    types::{EntityId, EntityType, OperationId, OperationType, ServerSeq, TimestampMs},
};

use super::events::OpLogEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("operation log task is not running")]
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Digest for newly appended operations.
    pub checksum: ChecksumAlgorithm,
    /// Re-check payload checksums when the log is loaded.
    pub verify_on_load: bool,
    pub command_queue_bound: usize,
    pub event_capacity: usize,
    /// Operations per `SyncRemote::push` call.
    pub sync_batch_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            checksum: ChecksumAlgorithm::Sha256,
            verify_on_load: true,
            command_queue_bound: 256,
            event_capacity: 1024,
            sync_batch_size: 100,
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Whether the log loaded cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogHealth {
    #[default]
    Healthy,
    /// Loading failed; the log started empty so note-taking is not blocked.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogStatus {
    pub initialized: bool,
    pub health: LogHealth,
    pub operations: usize,
    pub pending: usize,
    /// Operations whose checksum failed verification on load.
    pub corrupted: usize,
}

/// Outcome of one `mark_as_synced` batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub acknowledged: Vec<OperationId>,
    /// Ids not present in the log; skipped without error.
    pub missing: Vec<OperationId>,
}

#[derive(Clone)]
pub struct OpLogHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<OpLogEvent>,
}

enum Command {
    Initialize {
        resp: oneshot::Sender<LogStatus>,
    },
    Log {
        op_type: OperationType,
        entity_type: EntityType,
        entity_id: EntityId,
        payload: Value,
        resp: oneshot::Sender<Result<Operation, RuntimeError>>,
    },
    MarkSynced {
        ids: Vec<OperationId>,
        server_seqs: HashMap<OperationId, ServerSeq>,
        resp: oneshot::Sender<Result<SyncReport, RuntimeError>>,
    },
    ByEntity {
        entity_id: EntityId,
        resp: oneshot::Sender<Vec<Operation>>,
    },
    Pending {
        resp: oneshot::Sender<Vec<Operation>>,
    },
    All {
        resp: oneshot::Sender<Vec<Operation>>,
    },
    Get {
        id: OperationId,
        resp: oneshot::Sender<Option<Operation>>,
    },
    PendingCount {
        resp: oneshot::Sender<usize>,
    },
    Status {
        resp: oneshot::Sender<LogStatus>,
    },
    Identity {
        resp: oneshot::Sender<Result<DeviceIdentity, RuntimeError>>,
    },
    Clear {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

type SharedBackend = Arc<Mutex<Box<dyn OpBackend>>>;

/// Opens an operation log over `backend` and returns its handle.
///
/// The log is loaded by the first command or by an explicit
/// [`OpLogHandle::initialize`]. Must be called inside a tokio runtime.
pub fn spawn_oplog(backend: Box<dyn OpBackend>, config: RuntimeConfig) -> OpLogHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<OpLogEvent>(config.event_capacity.max(1));

    let mut writer = Writer {
        backend: Arc::new(Mutex::new(backend)),
        log: OperationLog::new(),
        identity: None,
        initialized: false,
        health: LogHealth::Healthy,
        config,
        events_tx: events_tx.clone(),
    };

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if writer.handle_command(cmd).await {
                break;
            }
        }
    });

    OpLogHandle { cmd_tx, events_tx }
}

impl OpLogHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<OpLogEvent> {
        self.events_tx.subscribe()
    }

    /// Loads the log. Idempotent, and never fails: a backend error leaves the
    /// log empty with [`LogHealth::Degraded`].
    pub async fn initialize(&self) -> Result<LogStatus, RuntimeError> {
        self.call(|resp| Command::Initialize { resp }).await
    }

    /// Persists a new operation, then adds it to the in-memory log.
    pub async fn log_operation(
        &self,
        op_type: OperationType,
        entity_type: EntityType,
        entity_id: impl Into<EntityId>,
        payload: Value,
    ) -> Result<Operation, RuntimeError> {
        let entity_id = entity_id.into();
        self.call(|resp| Command::Log {
            op_type,
            entity_type,
            entity_id,
            payload,
            resp,
        })
        .await?
    }

    /// Acknowledges `operation_ids` in one backend transaction. Unknown ids
    /// are reported in [`SyncReport::missing`].
    pub async fn mark_as_synced(
        &self,
        operation_ids: Vec<OperationId>,
        server_seqs: HashMap<OperationId, ServerSeq>,
    ) -> Result<SyncReport, RuntimeError> {
        self.call(|resp| Command::MarkSynced {
            ids: operation_ids,
            server_seqs,
            resp,
        })
        .await?
    }

    pub async fn get_operations_by_entity(
        &self,
        entity_id: impl Into<EntityId>,
    ) -> Result<Vec<Operation>, RuntimeError> {
        let entity_id = entity_id.into();
        self.call(|resp| Command::ByEntity { entity_id, resp }).await
    }

    pub async fn get_pending_operations(&self) -> Result<Vec<Operation>, RuntimeError> {
        self.call(|resp| Command::Pending { resp }).await
    }

    pub async fn all_operations(&self) -> Result<Vec<Operation>, RuntimeError> {
        self.call(|resp| Command::All { resp }).await
    }

    pub async fn get_operation(
        &self,
        id: impl Into<OperationId>,
    ) -> Result<Option<Operation>, RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::Get { id, resp }).await
    }

    pub async fn pending_count(&self) -> Result<usize, RuntimeError> {
        self.call(|resp| Command::PendingCount { resp }).await
    }

    /// Current status. Does not trigger initialization.
    pub async fn status(&self) -> Result<LogStatus, RuntimeError> {
        self.call(|resp| Command::Status { resp }).await
    }

    pub async fn device_identity(&self) -> Result<DeviceIdentity, RuntimeError> {
        self.call(|resp| Command::Identity { resp }).await?
    }

    /// Removes every operation from the backend and memory.
    pub async fn clear_all_operations(&self) -> Result<usize, RuntimeError> {
        self.call(|resp| Command::Clear { resp }).await?
    }

    /// Flushes the backend and stops the writer task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Shutdown { resp }).await?
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

struct Writer {
    backend: SharedBackend,
    log: OperationLog,
    identity: Option<DeviceIdentity>,
    initialized: bool,
    health: LogHealth,
    config: RuntimeConfig,
    events_tx: broadcast::Sender<OpLogEvent>,
}

impl Writer {
    async fn handle_command(&mut self, cmd: Command) -> bool {
        if !self.initialized && !matches!(cmd, Command::Status { .. } | Command::Shutdown { .. }) {
            self.initialize().await;
        }

        match cmd {
            Command::Initialize { resp } => {
                let _ = resp.send(self.status());
            }
            Command::Log {
                op_type,
                entity_type,
                entity_id,
                payload,
                resp,
            } => {
                let res = self
                    .log_operation(op_type, entity_type, entity_id, payload)
                    .await;
                if let Err(err) = &res {
                    tracing::error!(%err, %op_type, "failed to log operation");
                }
                let _ = resp.send(res);
            }
            Command::MarkSynced {
                ids,
                server_seqs,
                resp,
            } => {
                let res = self.mark_as_synced(ids, server_seqs).await;
                let _ = resp.send(res);
            }
            Command::ByEntity { entity_id, resp } => {
                let _ = resp.send(self.log.by_entity_cloned(&entity_id));
            }
            Command::Pending { resp } => {
                let _ = resp.send(self.log.pending_cloned());
            }
            Command::All { resp } => {
                let _ = resp.send(self.log.operations().to_vec());
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.log.get(&id).cloned());
            }
            Command::PendingCount { resp } => {
                let _ = resp.send(self.log.pending_count());
            }
            Command::Status { resp } => {
                let _ = resp.send(self.status());
            }
            Command::Identity { resp } => {
                let _ = resp.send(self.ensure_identity().await);
            }
            Command::Clear { resp } => {
                let res = self.clear().await;
                let _ = resp.send(res);
            }
            Command::Shutdown { resp } => {
                let res = with_backend(&self.backend, |backend| backend.flush())
                    .await
                    .map_err(RuntimeError::from);
                tracing::debug!("operation log shut down");
                let _ = resp.send(res);
                return true;
            }
        }
        false
    }

    async fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        let verify = self.config.verify_on_load;
        let loaded = with_backend(&self.backend, |backend| {
            let identity = identity::provision(backend)?;
            let replay = backend.load_all()?;
            Ok((identity, replay))
        })
        .await;

        match loaded {
            Ok((identity, replay)) => {
                self.log = OperationLog::from_operations(replay.operations, verify);
                self.log.record_unreadable(replay.unreadable);
                self.identity = Some(identity);
                tracing::info!(
                    operations = self.log.len(),
                    pending = self.log.pending_count(),
                    corrupted = self.log.corrupted().len(),
                    "operation log loaded"
                );
            }
            Err(err) => {
                tracing::error!(%err, "failed to load operation log, continuing with an empty log");
                self.log = OperationLog::new();
                self.health = LogHealth::Degraded {
                    reason: err.to_string(),
                };
            }
        }
        self.initialized = true;

        let _ = self.events_tx.send(OpLogEvent::Initialized {
            operations: self.log.len(),
            degraded: self.health != LogHealth::Healthy,
        });
        self.emit_pending();
    }

    async fn log_operation(
        &mut self,
        op_type: OperationType,
        entity_type: EntityType,
        entity_id: EntityId,
        payload: Value,
    ) -> Result<Operation, RuntimeError> {
        let identity = self.ensure_identity().await?;
        let op = Operation::new(
            op_type,
            entity_type,
            entity_id,
            payload,
            &identity,
            self.config.checksum,
            now_ms(),
        );
        self.log.check_append(&op)?;

        let stored = op.clone();
        with_backend(&self.backend, move |backend| backend.append(&stored)).await?;
        self.log.append(op.clone())?;

        tracing::debug!(operation_id = %op.id, %op_type, entity_id = %op.entity_id, "operation logged");
        let _ = self.events_tx.send(OpLogEvent::Appended {
            id: op.id.clone(),
            op_type,
            entity_id: op.entity_id.clone(),
        });
        self.emit_pending();
        Ok(op)
    }

    async fn mark_as_synced(
        &mut self,
        ids: Vec<OperationId>,
        server_seqs: HashMap<OperationId, ServerSeq>,
    ) -> Result<SyncReport, RuntimeError> {
        let plan = self.log.plan_acks(&ids, &server_seqs, now_ms());
        for id in &plan.missing {
            tracing::debug!(operation_id = %id, "skipping ack for unknown operation");
        }

        if !plan.acks.is_empty() {
            let acks = plan.acks.clone();
            with_backend(&self.backend, move |backend| backend.mark_synced(&acks)).await?;
        }

        let before = self.log.pending_count();
        self.log.apply_acks(&plan.acks);
        let acknowledged: Vec<OperationId> =
            plan.acks.into_iter().map(|ack| ack.operation_id).collect();

        if !acknowledged.is_empty() {
            tracing::info!(count = acknowledged.len(), "operations acknowledged");
            let _ = self.events_tx.send(OpLogEvent::Acknowledged {
                ids: acknowledged.clone(),
            });
        }
        if before != self.log.pending_count() {
            self.emit_pending();
        }

        Ok(SyncReport {
            acknowledged,
            missing: plan.missing,
        })
    }

    async fn clear(&mut self) -> Result<usize, RuntimeError> {
        let removed = with_backend(&self.backend, |backend| backend.clear()).await?;
        self.log.clear();
        tracing::info!(removed, "operation log cleared");
        let _ = self.events_tx.send(OpLogEvent::Cleared { removed });
        self.emit_pending();
        Ok(removed)
    }

    async fn ensure_identity(&mut self) -> Result<DeviceIdentity, RuntimeError> {
        if let Some(existing) = &self.identity {
            return Ok(existing.clone());
        }
        let provisioned = with_backend(&self.backend, |backend| identity::provision(backend)).await?;
        self.identity = Some(provisioned.clone());
        Ok(provisioned)
    }

    fn status(&self) -> LogStatus {
        LogStatus {
            initialized: self.initialized,
            health: self.health.clone(),
            operations: self.log.len(),
            pending: self.log.pending_count(),
            corrupted: self.log.corrupted().len(),
        }
    }

    fn emit_pending(&self) {
        let _ = self.events_tx.send(OpLogEvent::PendingChanged {
            pending: self.log.pending_count(),
        });
    }
}

async fn with_backend<T, F>(backend: &SharedBackend, f: F) -> PersistResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn OpBackend) -> PersistResult<T> + Send + 'static,
{
    let backend = Arc::clone(backend);
    tokio::task::spawn_blocking(move || {
        let mut guard = backend.blocking_lock();
        f(&mut **guard)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?
}

fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
