//! In-memory backend with failure injection.
//!
//! Clones share the same state, so a test can keep one clone to inspect or
//! reconfigure the backend after handing another to the runtime, and can
//! hand a second clone to a fresh runtime to simulate a reload.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    identity::DeviceIdentity,
    op::{Operation, SyncAck},
};

use super::{OpBackend, PersistError, PersistResult, Replay};

/// Which backend calls should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePlan {
    pub load: bool,
    pub append: bool,
    pub mark_synced: bool,
    pub clear: bool,
    pub identity: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    ops: Vec<Operation>,
    identity: Option<DeviceIdentity>,
    fail: FailurePlan,
}

/// Shared in-memory implementation of [`OpBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the failure plan for all clones.
    pub fn set_failures(&self, plan: FailurePlan) {
        if let Ok(mut state) = self.state.lock() {
            state.fail = plan;
        }
    }

    /// Copy of the stored operations in insertion order.
    pub fn stored_ops(&self) -> Vec<Operation> {
        self.state
            .lock()
            .map(|state| state.ops.clone())
            .unwrap_or_default()
    }

    /// Overwrites a stored operation in place, bypassing the log. Used to
    /// simulate on-disk corruption.
    pub fn tamper(&self, id: &str, f: impl FnOnce(&mut Operation)) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(op) = state.ops.iter_mut().find(|op| op.id == id) {
                f(op);
            }
        }
    }

    fn lock(&self) -> PersistResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| PersistError::Message("memory backend poisoned".to_string()))
    }
}

fn injected(call: &str) -> PersistError {
    PersistError::Message(format!("injected {call} failure"))
}

impl OpBackend for MemoryBackend {
    fn load_all(&mut self) -> PersistResult<Replay> {
        let state = self.lock()?;
        if state.fail.load {
            return Err(injected("load"));
        }
        Ok(Replay {
            operations: state.ops.clone(),
            unreadable: Vec::new(),
        })
    }

    fn append(&mut self, op: &Operation) -> PersistResult<()> {
        let mut state = self.lock()?;
        if state.fail.append {
            return Err(injected("append"));
        }
        if state.ops.iter().any(|existing| existing.id == op.id) {
            return Err(PersistError::Message(format!(
                "duplicate operation id: {}",
                op.id
            )));
        }
        state.ops.push(op.clone());
        Ok(())
    }

    fn mark_synced(&mut self, acks: &[SyncAck]) -> PersistResult<usize> {
        let mut state = self.lock()?;
        if state.fail.mark_synced {
            return Err(injected("mark_synced"));
        }
        let mut updated = 0;
        for ack in acks {
            if let Some(op) = state.ops.iter_mut().find(|op| op.id == ack.operation_id) {
                op.acknowledge(ack.synced_at, ack.server_seq);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn clear(&mut self) -> PersistResult<usize> {
        let mut state = self.lock()?;
        if state.fail.clear {
            return Err(injected("clear"));
        }
        let removed = state.ops.len();
        state.ops.clear();
        Ok(removed)
    }

    fn load_identity(&mut self) -> PersistResult<Option<DeviceIdentity>> {
        let state = self.lock()?;
        if state.fail.identity {
            return Err(injected("identity"));
        }
        Ok(state.identity.clone())
    }

    fn store_identity(&mut self, identity: &DeviceIdentity) -> PersistResult<()> {
        let mut state = self.lock()?;
        if state.fail.identity {
            return Err(injected("identity"));
        }
        state.identity = Some(identity.clone());
        Ok(())
    }
}
