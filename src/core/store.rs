use std::collections::HashMap as StdHashMap;

use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    op::{Operation, SyncAck},
    types::{EntityId, EntityType, OperationId, OperationType, ServerSeq, TimestampMs},
};

use super::indices::PosIndex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{op_type} operations apply to {expected} entities, got {actual}")]
    EntityTypeMismatch {
        op_type: OperationType,
        expected: EntityType,
        actual: EntityType,
    },
    #[error("operation already in log: {0}")]
    DuplicateOperation(OperationId),
}

/// Acks planned for a batch plus the ids the log does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AckPlan {
    pub acks: Vec<SyncAck>,
    pub missing: Vec<OperationId>,
}

/// Append-only in-memory log. Insertion order is storage order.
#[derive(Debug, Default)]
pub struct OperationLog {
    ops: Vec<Operation>,
    pos: HashMap<OperationId, usize>,
    by_entity: PosIndex<EntityId>,
    pending: usize,
    corrupted: Vec<OperationId>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the log from persisted operations.
    ///
    /// Every operation is kept. Operations whose type does not match their
    /// entity type, or (with `verify` set) whose checksum does not match
    /// their payload, are recorded in [`OperationLog::corrupted`]. A repeated
    /// id is recorded there too and only its first row is kept.
    pub fn from_operations(ops: Vec<Operation>, verify: bool) -> Self {
        let mut log = Self::new();
        for op in ops {
            if log.pos.contains_key(&op.id) {
                tracing::warn!(operation_id = %op.id, "duplicate operation on load");
                log.corrupted.push(op.id);
                continue;
            }
            let mismatched = op.op_type.entity_type() != op.entity_type;
            let bad_checksum = verify && !op.verify_checksum();
            if mismatched || bad_checksum {
                tracing::warn!(operation_id = %op.id, mismatched, bad_checksum, "corrupt operation on load");
                log.corrupted.push(op.id.clone());
            }
            log.insert(op);
        }
        log
    }

    /// Records ids of stored rows that could not be decoded at all.
    pub fn record_unreadable(&mut self, ids: impl IntoIterator<Item = OperationId>) {
        self.corrupted.extend(ids);
    }

    /// Checks that `op` could be appended without mutating the log.
    pub fn check_append(&self, op: &Operation) -> Result<(), StoreError> {
        let expected = op.op_type.entity_type();
        if expected != op.entity_type {
            return Err(StoreError::EntityTypeMismatch {
                op_type: op.op_type,
                expected,
                actual: op.entity_type,
            });
        }
        if self.pos.contains_key(&op.id) {
            return Err(StoreError::DuplicateOperation(op.id.clone()));
        }
        Ok(())
    }

    pub fn append(&mut self, op: Operation) -> Result<(), StoreError> {
        self.check_append(&op)?;
        self.insert(op);
        Ok(())
    }

    fn insert(&mut self, op: Operation) {
        let idx = self.ops.len();
        self.pos.insert(op.id.clone(), idx);
        self.by_entity
            .entry(op.entity_id.clone())
            .or_default()
            .push(idx);
        if op.is_pending() {
            self.pending += 1;
        }
        self.ops.push(op);
    }

    /// Builds acks for `ids`, pairing each with its entry in `server_seqs`.
    /// Ids not in the log land in [`AckPlan::missing`].
    pub fn plan_acks(
        &self,
        ids: &[OperationId],
        server_seqs: &StdHashMap<OperationId, ServerSeq>,
        synced_at: TimestampMs,
    ) -> AckPlan {
        let mut plan = AckPlan::default();
        for id in ids {
            if self.pos.contains_key(id) {
                plan.acks.push(SyncAck {
                    operation_id: id.clone(),
                    server_seq: server_seqs.get(id).copied(),
                    synced_at,
                });
            } else {
                plan.missing.push(id.clone());
            }
        }
        plan
    }

    /// Applies acks and recomputes the pending count. Returns how many acks
    /// matched an operation.
    pub fn apply_acks(&mut self, acks: &[SyncAck]) -> usize {
        let mut applied = 0;
        for ack in acks {
            let Some(&idx) = self.pos.get(&ack.operation_id) else {
                continue;
            };
            self.ops[idx].acknowledge(ack.synced_at, ack.server_seq);
            applied += 1;
        }
        self.recount_pending();
        applied
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.pos.get(id).map(|&idx| &self.ops[idx])
    }

    pub fn by_entity(&self, entity_id: &str) -> Vec<&Operation> {
        self.by_entity
            .get(entity_id)
            .into_iter()
            .flat_map(|idxs| idxs.iter())
            .map(|&idx| &self.ops[idx])
            .collect()
    }

    pub fn by_entity_cloned(&self, entity_id: &str) -> Vec<Operation> {
        self.by_entity(entity_id).into_iter().cloned().collect()
    }

    pub fn pending(&self) -> Vec<&Operation> {
        self.ops.iter().filter(|op| op.is_pending()).collect()
    }

    pub fn pending_cloned(&self) -> Vec<Operation> {
        self.pending().into_iter().cloned().collect()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Ids flagged when the log was rebuilt: checksum mismatches, type
    /// mismatches, repeated ids and undecodable rows.
    pub fn corrupted(&self) -> &[OperationId] {
        &self.corrupted
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn recount_pending(&mut self) {
        self.pending = self.ops.iter().filter(|op| op.is_pending()).count();
    }
}
