//! The legacy `KeyValuePair` database.
//!
//! Older installations kept preferences in a single SQLite table with one
//! nullable column per value type. This module reads those rows and turns
//! them into [`Value`]s; [`migrate`](crate::migrate) and
//! [`BackupExt::import_legacy_pairs`](crate::BackupExt::import_legacy_pairs)
//! decide what to do with them.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};

use confstore_core::{Value, ValueKind};

use crate::error::{Error, Result};

/// Type code of a Boolean record.
pub const TYPE_BOOLEAN: i64 = 0;
/// Type code of a Float record.
pub const TYPE_FLOAT: i64 = 1;
/// Type code of an Integer record. Stored in the `long` column.
pub const TYPE_INT: i64 = 2;
/// Type code of a Long record.
pub const TYPE_LONG: i64 = 3;
/// Type code of a String record.
pub const TYPE_STRING: i64 = 4;
/// Type code of a String-Set record. Stored as a JSON array of strings.
pub const TYPE_STRING_SET: i64 = 5;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS KeyValuePair (
    "key" TEXT PRIMARY KEY NOT NULL,
    "valueType" INTEGER NOT NULL,
    "boolean" INTEGER,
    "float" REAL,
    "long" INTEGER,
    "string" TEXT,
    "stringSet" TEXT
);
"#;

/// One row of the legacy table. At most one value column is populated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyRecord {
    pub key: String,
    pub value_type: i64,
    pub boolean: Option<bool>,
    pub float: Option<f32>,
    pub long: Option<i64>,
    pub string: Option<String>,
    pub string_set: Option<BTreeSet<String>>,
}

impl LegacyRecord {
    /// A well-formed record holding `value`.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        match value {
            Value::Boolean(b) => Self {
                key,
                value_type: TYPE_BOOLEAN,
                boolean: Some(b),
                ..Self::default()
            },
            Value::Float(f) => Self {
                key,
                value_type: TYPE_FLOAT,
                float: Some(f),
                ..Self::default()
            },
            Value::Int(i) => Self {
                key,
                value_type: TYPE_INT,
                long: Some(i64::from(i)),
                ..Self::default()
            },
            Value::Long(l) => Self {
                key,
                value_type: TYPE_LONG,
                long: Some(l),
                ..Self::default()
            },
            Value::String(s) => Self {
                key,
                value_type: TYPE_STRING,
                string: Some(s),
                ..Self::default()
            },
            Value::StringSet(set) => Self {
                key,
                value_type: TYPE_STRING_SET,
                string_set: Some(set),
                ..Self::default()
            },
        }
    }

    /// The declared kind. Integer records are reported as Long, which is how
    /// they are stored.
    pub fn kind(&self) -> Result<ValueKind> {
        match self.value_type {
            TYPE_BOOLEAN => Ok(ValueKind::Boolean),
            TYPE_FLOAT => Ok(ValueKind::Float),
            TYPE_INT | TYPE_LONG => Ok(ValueKind::Long),
            TYPE_STRING => Ok(ValueKind::String),
            TYPE_STRING_SET => Ok(ValueKind::StringSet),
            code => Err(Error::UnknownLegacyType {
                key: self.key.clone(),
                code,
            }),
        }
    }

    /// The value for the declared type.
    pub fn decode(&self) -> Result<Value> {
        let kind = self.kind()?;
        let value = match kind {
            ValueKind::Boolean => self.boolean.map(Value::Boolean),
            ValueKind::Float => self.float.map(Value::Float),
            ValueKind::Int | ValueKind::Long => self.long.map(Value::Long),
            ValueKind::String => self.string.clone().map(Value::String),
            ValueKind::StringSet => self.string_set.clone().map(Value::StringSet),
        };
        value.ok_or_else(|| Error::MissingLegacyValue {
            key: self.key.clone(),
            kind,
        })
    }
}

/// A handle on a legacy database file.
pub struct LegacyDatabase {
    conn: Connection,
}

impl LegacyDatabase {
    /// Open an existing legacy database for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Create (or open) a legacy database with its table, for writing.
    ///
    /// Used by fixtures and tools that need to produce legacy files.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: &LegacyRecord) -> Result<()> {
        let string_set = record
            .string_set
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            r#"INSERT OR REPLACE INTO KeyValuePair
               ("key", "valueType", "boolean", "float", "long", "string", "stringSet")
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                record.key,
                record.value_type,
                record.boolean,
                record.float.map(f64::from),
                record.long,
                record.string,
                string_set,
            ],
        )?;
        Ok(())
    }

    /// Every row of the table.
    ///
    /// The outer error means the table could not be read at all. Each row
    /// carries its own result so one bad row does not hide the others.
    pub fn records(&self) -> Result<Vec<Result<LegacyRecord>>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "key", "valueType", "boolean", "float", "long", "string", "stringSet"
               FROM KeyValuePair"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawRow {
                key: row.get(0)?,
                value_type: row.get(1)?,
                boolean: row.get(2)?,
                float: row.get(3)?,
                long: row.get(4)?,
                string: row.get(5)?,
                string_set: row.get(6)?,
            })
        })?;

        let records = rows
            .map(|row| row.map_err(Error::from).and_then(RawRow::into_record))
            .collect();
        Ok(records)
    }
}

struct RawRow {
    key: String,
    value_type: i64,
    boolean: Option<bool>,
    float: Option<f64>,
    long: Option<i64>,
    string: Option<String>,
    string_set: Option<String>,
}

impl RawRow {
    fn into_record(self) -> Result<LegacyRecord> {
        let string_set = self
            .string_set
            .as_deref()
            .map(serde_json::from_str::<BTreeSet<String>>)
            .transpose()?;
        Ok(LegacyRecord {
            key: self.key,
            value_type: self.value_type,
            boolean: self.boolean,
            float: self.float.map(|f| f as f32),
            long: self.long,
            string: self.string,
            string_set,
        })
    }
}
