//! SQLite document store: schemaless JSON bodies grouped into named collections.
//!
//! Uses Write-Ahead Logging so the CLI can read while the server writes, and
//! prepared statements for the hot insert/list paths.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use serde_json::Value;

use crate::core::errors::{AgdError, Result};

/// A stored document with its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub collection: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-collection document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    pub name: String,
    pub documents: u64,
}

/// SQLite-backed document store with WAL mode.
pub struct DocumentStore {
    conn: Connection,
    path: PathBuf,
}

impl DocumentStore {
    /// Open (or create) the database at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AgdError::io(parent, source))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        apply_pragmas(&conn)?;
        apply_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ──────────────────── writes ────────────────────

    /// Insert `body` under a freshly generated id.
    pub fn insert(&self, collection: &str, body: &Value) -> Result<StoredDocument> {
        self.insert_with_id(collection, &new_document_id(), body)
    }

    /// Insert `body` under a caller-chosen id (imports keep their original ids).
    pub fn insert_with_id(&self, collection: &str, id: &str, body: &Value) -> Result<StoredDocument> {
        require_object(body)?;
        if id.trim().is_empty() {
            return Err(AgdError::InvalidDocument {
                details: "document id must not be empty".to_string(),
            });
        }
        let now = Utc::now();
        let stamp = format_timestamp(&now);
        self.conn
            .prepare_cached(
                "INSERT INTO documents (id, collection, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
            )?
            .execute(params![id, collection, serde_json::to_string(body)?, stamp])?;
        Ok(StoredDocument {
            id: id.to_string(),
            collection: collection.to_string(),
            body: body.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the body of an existing document.
    pub fn replace(&self, collection: &str, id: &str, body: &Value) -> Result<StoredDocument> {
        require_object(body)?;
        let stamp = format_timestamp(&Utc::now());
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE documents SET body = ?3, updated_at = ?4
                 WHERE collection = ?1 AND id = ?2",
            )?
            .execute(params![collection, id, serde_json::to_string(body)?, stamp])?;
        if changed == 0 {
            return Err(AgdError::not_found(collection, id));
        }
        self.get(collection, id)?
            .ok_or_else(|| AgdError::not_found(collection, id))
    }

    /// Delete one document.
    pub fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let changed = self
            .conn
            .prepare_cached("DELETE FROM documents WHERE collection = ?1 AND id = ?2")?
            .execute(params![collection, id])?;
        if changed == 0 {
            return Err(AgdError::not_found(collection, id));
        }
        Ok(())
    }

    // ──────────────────── reads ────────────────────

    pub fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let row = self
            .conn
            .prepare_cached(
                "SELECT id, collection, body, created_at, updated_at
                 FROM documents WHERE collection = ?1 AND id = ?2",
            )?
            .query_row(params![collection, id], DocumentRow::from_row)
            .optional()?;
        row.map(DocumentRow::into_document).transpose()
    }

    /// Most recent documents first, at most `limit`.
    pub fn list_recent(&self, collection: &str, limit: u32) -> Result<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, collection, body, created_at, updated_at
             FROM documents WHERE collection = ?1
             ORDER BY created_at DESC, seq DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![collection, limit], DocumentRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    #[allow(clippy::cast_sign_loss)]
    pub fn count(&self, collection: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM documents WHERE collection = ?1")?
            .query_row(params![collection], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Every non-empty collection with its document count, by name.
    #[allow(clippy::cast_sign_loss)]
    pub fn collections(&self) -> Result<Vec<CollectionCount>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let documents: i64 = row.get(1)?;
                Ok(CollectionCount {
                    name: row.get(0)?,
                    documents: documents.max(0) as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Check that WAL mode is active (for diagnostics).
    pub fn is_wal_mode(&self) -> bool {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))
            .map(|mode| mode.eq_ignore_ascii_case("wal"))
            .unwrap_or(false)
    }
}

// ──────────────────── row decoding ────────────────────

/// Raw column values; JSON and timestamps are decoded after the query.
struct DocumentRow {
    id: String,
    collection: String,
    body: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            collection: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_document(self) -> Result<StoredDocument> {
        Ok(StoredDocument {
            body: serde_json::from_str(&self.body)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            collection: self.collection,
        })
    }
}

/// Fixed-width UTC form so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| AgdError::Serialization {
            context: "documents timestamp",
            details: format!("{raw:?}: {error}"),
        })
}

fn require_object(body: &Value) -> Result<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(AgdError::InvalidDocument {
            details: "document body must be a JSON object".to_string(),
        })
    }
}

/// 24 hex chars: creation seconds (4 bytes) then 8 random bytes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn new_document_id() -> String {
    let seconds = Utc::now().timestamp().max(0) as u32;
    let suffix: u64 = rand::random();
    format!("{seconds:08x}{suffix:016x}")
}

// ──────────────────── schema & pragmas ────────────────────

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;
         PRAGMA temp_store = MEMORY;
         PRAGMA busy_timeout = 5000;",
    )?;
    let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(%mode, "requested WAL journal mode but sqlite kept another");
    }
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL,
            collection TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection_created
            ON documents(collection, created_at);",
    )?;
    Ok(())
}

// ──────────────────── tests ────────────────────
