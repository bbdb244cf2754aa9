//! SQLite implementation of the Backend trait.
//!
//! This is the primary storage backend. Every process sharing a store opens
//! the same database file in WAL mode:
//!
//! - writers take `BEGIN IMMEDIATE`, SQLite's reserved lock, so commits are
//!   serialized across processes;
//! - readers never block writers;
//! - `PRAGMA data_version` tells a connection whether anybody else committed.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};

use confstore_core::{Value, ValueKind};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Backend, Snapshot, Transform};

/// SQLite-based backend.
///
/// Thread-safe via internal Mutex; the mutex also serializes writers within
/// the process before SQLite serializes them across processes.
pub struct SqliteBackend {
    db: Mutex<Db>,
    path: Option<PathBuf>,
}

struct Db {
    conn: Connection,
    /// `PRAGMA data_version` as of our last load or commit.
    data_version: i64,
}

impl SqliteBackend {
    /// Open the store database at `path`.
    ///
    /// Creates the file and runs schema migrations if needed. A file that is
    /// not a database, or rows that cannot be decoded, are replaced by an
    /// empty store instead of failing.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = match open_connection(path, busy_timeout) {
            Ok(conn) => conn,
            Err(e) if is_corruption(&e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "store database is corrupt, replacing it with an empty one"
                );
                remove_database_files(path)?;
                open_connection(path, busy_timeout)?
            }
            Err(e) => return Err(e),
        };

        let backend = Self {
            db: Mutex::new(Db {
                conn,
                data_version: 0,
            }),
            path: Some(path.to_path_buf()),
        };
        backend.discard_corrupt_rows()?;
        Ok(backend)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            db: Mutex::new(Db {
                conn,
                data_version: 0,
            }),
            path: None,
        })
    }

    /// The database file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a blocking operation on the connection.
    fn with_db<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Db) -> Result<T>,
    {
        // An unwinding transaction is rolled back on drop, so the connection
        // is still consistent after a panic.
        let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut db)
    }

    fn discard_corrupt_rows(&self) -> Result<()> {
        self.with_db(|db| {
            if let Err(StoreError::Corrupt(reason)) = read_all(&db.conn) {
                tracing::warn!(%reason, "discarding undecodable preferences");
                let tx = db
                    .conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute("DELETE FROM preferences", [])?;
                tx.commit()?;
            }
            Ok(())
        })
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::debug!(%mode, "WAL journal unavailable, using fallback journal mode");
    }
    conn.pragma_update(None, "synchronous", "FULL")?;
    migration::migrate(&mut conn)?;
    Ok(conn)
}

fn is_corruption(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::NotADatabase || e.code == ErrorCode::DatabaseCorrupt
    )
}

fn remove_database_files(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        match fs::remove_file(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn data_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}

// Helper to read every row into a snapshot
fn read_all(conn: &Connection) -> Result<Snapshot> {
    let mut stmt = conn.prepare_cached("SELECT key, kind, value FROM preferences")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, SqlValue>(2)?,
        ))
    })?;

    let mut snapshot = Snapshot::new();
    for row in rows {
        let (key, kind, raw) = row.map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let value = decode_value(kind, raw)
            .ok_or_else(|| StoreError::Corrupt(format!("undecodable value for key {}", key)))?;
        snapshot.insert(key, value);
    }
    Ok(snapshot)
}

fn write_diff(conn: &Connection, before: &Snapshot, after: &Snapshot) -> Result<()> {
    let mut delete = conn.prepare_cached("DELETE FROM preferences WHERE key = ?1")?;
    for key in before.keys().filter(|key| !after.contains_key(*key)) {
        delete.execute(params![key])?;
    }

    let mut upsert = conn.prepare_cached(
        "INSERT OR REPLACE INTO preferences (key, kind, value) VALUES (?1, ?2, ?3)",
    )?;
    for (key, value) in after {
        if before.get(key) != Some(value) {
            upsert.execute(params![key, value.kind().code(), encode_value(value)])?;
        }
    }
    Ok(())
}

fn encode_value(value: &Value) -> SqlValue {
    match value {
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Float(f) => SqlValue::Real(f64::from(*f)),
        Value::Int(i) => SqlValue::Integer(i64::from(*i)),
        Value::Long(l) => SqlValue::Integer(*l),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::StringSet(_) => SqlValue::Text(value.to_json().to_string()),
    }
}

fn decode_value(kind: i64, raw: SqlValue) -> Option<Value> {
    match (ValueKind::from_code(kind)?, raw) {
        (ValueKind::Boolean, SqlValue::Integer(i)) => Some(Value::Boolean(i != 0)),
        (ValueKind::Float, SqlValue::Real(f)) => Some(Value::Float(f as f32)),
        (ValueKind::Float, SqlValue::Integer(i)) => Some(Value::Float(i as f32)),
        (ValueKind::Int, SqlValue::Integer(i)) => i32::try_from(i).ok().map(Value::Int),
        (ValueKind::Long, SqlValue::Integer(i)) => Some(Value::Long(i)),
        (ValueKind::String, SqlValue::Text(s)) => Some(Value::String(s)),
        (ValueKind::StringSet, SqlValue::Text(s)) => serde_json::from_str::<BTreeSet<String>>(&s)
            .ok()
            .map(Value::StringSet),
        _ => None,
    }
}

impl Backend for SqliteBackend {
    fn load(&self) -> Result<Snapshot> {
        self.with_db(|db| {
            let version = data_version(&db.conn)?;
            let snapshot = match read_all(&db.conn) {
                Ok(snapshot) => snapshot,
                Err(StoreError::Corrupt(reason)) => {
                    tracing::warn!(%reason, "store contents are corrupt, using an empty snapshot");
                    Snapshot::new()
                }
                Err(e) => return Err(e),
            };
            db.data_version = version;
            Ok(snapshot)
        })
    }

    fn transact(&self, transform: &mut Transform<'_>) -> Result<Snapshot> {
        self.with_db(|db| {
            let tx = db
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?;

            let before = match read_all(&tx) {
                Ok(snapshot) => snapshot,
                Err(StoreError::Corrupt(reason)) => {
                    tracing::warn!(%reason, "store contents are corrupt, rewriting from empty");
                    tx.execute("DELETE FROM preferences", [])?;
                    Snapshot::new()
                }
                Err(e) => return Err(e),
            };

            // Nobody else can commit while we hold the reserved lock, and our
            // own commit does not bump data_version.
            let version = data_version(&tx)?;

            let mut after = before.clone();
            // Dropping `tx` on error rolls back.
            transform(&mut after)?;
            write_diff(&tx, &before, &after)?;
            tx.commit()?;

            db.data_version = version;
            Ok(after)
        })
    }

    fn changed_externally(&self) -> Result<bool> {
        self.with_db(|db| Ok(data_version(&db.conn)? != db.data_version))
    }
}
