//! Append-only, per-device operation log for local-first notes, with SQLite
//! persistence and sync-state tracking.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::OperationLog`]:
//! ```
//! use oplog::{
//!     checksum::ChecksumAlgorithm,
//!     core::store::OperationLog,
//!     identity::DeviceIdentity,
//!     op::Operation,
//!     types::{EntityType, OperationType},
//! };
//!
//! let identity = DeviceIdentity::generate();
//! let mut log = OperationLog::new();
//! let op = Operation::new(
//!     OperationType::NoteCreated,
//!     EntityType::Note,
//!     "n1",
//!     serde_json::json!({"title": "A", "content": ""}),
//!     &identity,
//!     ChecksumAlgorithm::Sha256,
//!     1,
//! );
//! log.append(op).expect("append");
//! assert_eq!(log.pending_count(), 1);
//! ```
//!
//! Runtime usage with the SQLite backend:
//! ```no_run
//! use std::collections::HashMap;
//!
//! use oplog::{
//!     payload::NoteCreated,
//!     persist::sqlite::SqliteBackend,
//!     runtime::handle::{spawn_oplog, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = SqliteBackend::open("oplog.db").expect("open sqlite");
//! let handle = spawn_oplog(Box::new(backend), RuntimeConfig::default());
//! handle.initialize().await.expect("initialize");
//!
//! let op = handle
//!     .log_note_created("n1", NoteCreated { title: "A".into(), ..NoteCreated::default() })
//!     .await
//!     .expect("log");
//! let seqs = HashMap::from([(op.id.clone(), 42)]);
//! handle.mark_as_synced(vec![op.id], seqs).await.expect("ack");
//! assert_eq!(handle.pending_count().await.expect("count"), 0);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Payload digests.
pub mod checksum;
/// In-memory log and index helpers.
pub mod core;
/// Per-installation identity provisioning.
pub mod identity;
/// Operation record model.
pub mod op;
/// Typed payloads for the logging helpers.
pub mod payload;
/// Persistence port and its SQLite and in-memory backends.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Remote sync boundary.
pub mod sync;
/// Shared primitive types and enums.
pub mod types;
