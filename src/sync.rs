//! Boundary to a remote sync authority.
//!
//! A remote accepts a batch of operations and answers with a server
//! sequence number for each one it accepted. No wire protocol is defined
//! here; implementors own transport and encoding.

use std::{collections::HashMap, future::Future};

use thiserror::Error;

use crate::{
    op::Operation,
    runtime::handle::{OpLogHandle, RuntimeError, SyncReport},
    types::{OperationId, ServerSeq},
};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("batch rejected: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Server acknowledgment of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAck {
    pub operation_id: OperationId,
    pub server_seq: ServerSeq,
}

pub trait SyncRemote {
    fn push(
        &mut self,
        batch: &[Operation],
    ) -> impl Future<Output = Result<Vec<ServerAck>, RemoteError>> + Send;
}

/// Pushes every pending operation to `remote` in chunks of `batch_size` and
/// records the acknowledgments.
///
/// Chunks acknowledged before a failure stay synced; the failing chunk and
/// the rest stay pending and are picked up by the next call.
pub async fn push_pending<R: SyncRemote>(
    handle: &OpLogHandle,
    remote: &mut R,
    batch_size: usize,
) -> Result<SyncReport, SyncError> {
    let pending = handle.get_pending_operations().await?;
    let mut report = SyncReport::default();

    for chunk in pending.chunks(batch_size.max(1)) {
        let acks = remote.push(chunk).await?;
        if acks.len() < chunk.len() {
            tracing::warn!(
                sent = chunk.len(),
                acknowledged = acks.len(),
                "remote acknowledged part of a batch"
            );
        }

        let ids: Vec<OperationId> = acks.iter().map(|ack| ack.operation_id.clone()).collect();
        let seqs: HashMap<OperationId, ServerSeq> = acks
            .into_iter()
            .map(|ack| (ack.operation_id, ack.server_seq))
            .collect();

        let chunk_report = handle.mark_as_synced(ids, seqs).await?;
        report.acknowledged.extend(chunk_report.acknowledged);
        report.missing.extend(chunk_report.missing);
    }

    tracing::info!(
        acknowledged = report.acknowledged.len(),
        "pending operations pushed"
    );
    Ok(report)
}
