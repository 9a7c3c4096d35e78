use std::path::Path;

use rusqlite::Connection;

use crate::errors::{Result, ScripRefError};

/// Verse and meta tables, applied by [`Database::initialize`].
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite database holding imported verse records.
pub struct Database {
    conn: Connection,
    /// When set, every lookup is restricted to this translation tag.
    translation: Option<String>,
}

impl Database {
    /// Creates an empty verse store at `db_path`. Missing parent directories
    /// are created. Running it against an existing store is harmless.
    pub fn initialize(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScripRefError::Database {
                message: format!("failed to create database directory: {e}"),
                operation: "initialize".to_string(),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| ScripRefError::Database {
            message: format!("failed to open database: {e}"),
            operation: "initialize".to_string(),
        })?;

        Self::apply_pragmas(&conn)?;

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to apply schema: {e}"),
                operation: "initialize".to_string(),
            })?;

        Ok(Self {
            conn,
            translation: None,
        })
    }

    /// Opens a store created by [`initialize`](Self::initialize).
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| ScripRefError::Database {
            message: format!("failed to open database: {e}"),
            operation: "open".to_string(),
        })?;

        Self::apply_pragmas(&conn)?;

        Ok(Self {
            conn,
            translation: None,
        })
    }

    /// Restricts all lookups to rows tagged with `translation`.
    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    /// The translation lookups are restricted to, if any.
    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Raw connection, for queries the typed API does not cover.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Compacts the file and refreshes index statistics after a bulk import.
    pub fn optimize(&self) -> Result<()> {
        self.conn
            .execute_batch("VACUUM; ANALYZE;")
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to optimize database: {e}"),
                operation: "optimize".to_string(),
            })
    }

    /// Bytes used by the store, as reported by `status`.
    pub fn size(&self) -> Result<u64> {
        let size: i64 = self
            .conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to get database size: {e}"),
                operation: "size".to_string(),
            })?;
        Ok(size as u64)
    }

    /// Journal, locking, and cache settings for a read-mostly store.
    fn apply_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 30000;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16384;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(|e| ScripRefError::Database {
            message: format!("failed to apply pragmas: {e}"),
            operation: "apply_pragmas".to_string(),
        })
    }
}
