//! SQLite-backed operation store.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    identity::DeviceIdentity,
    op::{OP_FORMAT_VERSION, Operation, SyncAck},
    types::{EntityType, OperationType, ServerSeq},
};

use super::{OpBackend, PersistError, PersistResult, Replay};

const SELECT_COLUMNS: &str = "SELECT id, type, entity_type, entity_id, payload, timestamp, \
     device_id, owner_id, server_seq, synced_at, checksum, format_version FROM operations";

const DEVICE_SLOT: &str = "device_id";
const OWNER_SLOT: &str = "owner_id";

/// SQLite implementation of [`crate::persist::OpBackend`].
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens or creates a SQLite-backed log at `path`.
    ///
    /// Creates the schema and indices if missing, enables WAL mode and sets
    /// `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite log.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Diagnostic read of the operations touching `entity_id` straight from
    /// disk. The runtime serves queries from memory and never calls this.
    pub fn load_by_entity(&self, entity_id: &str) -> PersistResult<Replay> {
        let sql = format!("{SELECT_COLUMNS} WHERE entity_id = ?1 ORDER BY rowid ASC");
        self.query_ops(&sql, params![entity_id])
    }

    /// Diagnostic count of rows with no acknowledgment, read from disk.
    pub fn count_pending(&self) -> PersistResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM operations WHERE synced_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn query_ops(&self, sql: &str, params: impl rusqlite::Params) -> PersistResult<Replay> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRow::from_row)?;

        let mut replay = Replay::default();
        for row in rows {
            let raw = row?;
            let id = raw.id.clone();
            match raw.decode() {
                Ok(op) => replay.operations.push(op),
                Err(err) => {
                    tracing::warn!(operation_id = %id, %err, "skipping unreadable row");
                    replay.unreadable.push(id);
                }
            }
        }
        Ok(replay)
    }

    fn read_slot(&self, slot: &str) -> PersistResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM identity WHERE slot = ?1",
                params![slot],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl OpBackend for SqliteBackend {
    fn load_all(&mut self) -> PersistResult<Replay> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY rowid ASC");
        self.query_ops(&sql, [])
    }

    fn append(&mut self, op: &Operation) -> PersistResult<()> {
        let payload = serde_json::to_string(&op.payload)?;
        let server_seq = seq_to_sql(op.server_seq)?;
        self.conn.execute(
            "INSERT INTO operations(id, type, entity_type, entity_id, payload, timestamp, \
             device_id, owner_id, server_seq, synced_at, checksum, format_version) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                op.id,
                op.op_type.as_str(),
                op.entity_type.as_str(),
                op.entity_id,
                payload,
                op.timestamp,
                op.device_id,
                op.owner_id,
                server_seq,
                op.synced_at,
                op.checksum,
                OP_FORMAT_VERSION,
            ],
        )?;
        Ok(())
    }

    fn mark_synced(&mut self, acks: &[SyncAck]) -> PersistResult<usize> {
        if acks.is_empty() {
            return Ok(0);
        }

        let seqs = acks
            .iter()
            .map(|ack| seq_to_sql(ack.server_seq))
            .collect::<PersistResult<Vec<_>>>()?;

        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE operations SET synced_at = ?1, server_seq = ?2 WHERE id = ?3")?;
            for (ack, seq) in acks.iter().zip(seqs) {
                updated += stmt.execute(params![ack.synced_at, seq, ack.operation_id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    fn clear(&mut self) -> PersistResult<usize> {
        let removed = self.conn.execute("DELETE FROM operations", [])?;
        Ok(removed)
    }

    fn load_identity(&mut self) -> PersistResult<Option<DeviceIdentity>> {
        let device_id = self.read_slot(DEVICE_SLOT)?;
        let owner_id = self.read_slot(OWNER_SLOT)?;
        Ok(match (device_id, owner_id) {
            (Some(device_id), Some(owner_id)) => Some(DeviceIdentity {
                device_id,
                owner_id,
            }),
            _ => None,
        })
    }

    fn store_identity(&mut self, identity: &DeviceIdentity) -> PersistResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO identity(slot, value) VALUES (?1, ?2)",
            params![DEVICE_SLOT, identity.device_id],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO identity(slot, value) VALUES (?1, ?2)",
            params![OWNER_SLOT, identity.owner_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn seq_to_sql(seq: Option<ServerSeq>) -> PersistResult<Option<i64>> {
    seq.map(|v| {
        i64::try_from(v)
            .map_err(|_| PersistError::Corrupt(format!("server sequence {v} exceeds i64 range")))
    })
    .transpose()
}

struct RawRow {
    id: String,
    op_type: String,
    entity_type: String,
    entity_id: String,
    payload: String,
    timestamp: i64,
    device_id: String,
    owner_id: String,
    server_seq: Option<i64>,
    synced_at: Option<i64>,
    checksum: String,
    format_version: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            op_type: row.get(1)?,
            entity_type: row.get(2)?,
            entity_id: row.get(3)?,
            payload: row.get(4)?,
            timestamp: row.get(5)?,
            device_id: row.get(6)?,
            owner_id: row.get(7)?,
            server_seq: row.get(8)?,
            synced_at: row.get(9)?,
            checksum: row.get(10)?,
            format_version: row.get(11)?,
        })
    }

    fn decode(self) -> PersistResult<Operation> {
        if self.format_version != i64::from(OP_FORMAT_VERSION) {
            return Err(PersistError::Corrupt(format!(
                "operation {}: unsupported format version {}",
                self.id, self.format_version
            )));
        }
        let op_type: OperationType = self
            .op_type
            .parse()
            .map_err(|e| PersistError::Corrupt(format!("operation {}: {e}", self.id)))?;
        let entity_type: EntityType = self
            .entity_type
            .parse()
            .map_err(|e| PersistError::Corrupt(format!("operation {}: {e}", self.id)))?;
        let payload = serde_json::from_str(&self.payload)?;
        let server_seq = self
            .server_seq
            .map(|v| {
                u64::try_from(v).map_err(|_| {
                    PersistError::Corrupt(format!("operation {}: negative server sequence {v}", self.id))
                })
            })
            .transpose()?;

        Ok(Operation {
            id: self.id,
            op_type,
            entity_type,
            entity_id: self.entity_id,
            payload,
            timestamp: self.timestamp,
            device_id: self.device_id,
            owner_id: self.owner_id,
            server_seq,
            synced_at: self.synced_at,
            checksum: self.checksum,
        })
    }
}
