use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};

use super::connection::Database;
use super::{InterruptHook, VerseStore};
use crate::errors::{Result, ScripRefError};
use crate::types::*;

/// Upper bound on OR-ed conditions per statement. SQLite parses an `OR`
/// chain left-deep, so the chain length counts against its expression-depth
/// limit of 1000; each condition also nests its own `AND` terms.
pub const MAX_CONDITIONS_PER_QUERY: usize = 500;

const VERSE_COLUMNS: &str =
    "book, book_index, chapter, verse, storage_verse_id, text, translation";

// ---------------------------------------------------------------------------
// Helper: map a rusqlite row to domain types
// ---------------------------------------------------------------------------

/// Maps a row from the `verses` table to a `VerseRecord`.
fn row_to_verse(row: &rusqlite::Row) -> rusqlite::Result<VerseRecord> {
    Ok(VerseRecord {
        book: row.get("book")?,
        book_index: row.get::<_, i64>("book_index")? as usize,
        chapter: row.get("chapter")?,
        verse_number: row.get("verse")?,
        storage_verse_id: row.get("storage_verse_id")?,
        text: row.get("text")?,
        translation: row.get("translation")?,
    })
}

/// Renders one condition as a parenthesised SQL predicate, pushing its
/// parameters onto `params` in placeholder order.
fn condition_sql(condition: &VerseCondition, params: &mut Vec<Value>) -> &'static str {
    match condition {
        VerseCondition::Point {
            book: BookFilter::Name(name),
            chapter,
            verse,
        } => {
            params.push(Value::Text(name.clone()));
            params.push(Value::Integer(i64::from(*chapter)));
            params.push(Value::Integer(i64::from(*verse)));
            "(book = ? AND chapter = ? AND verse = ?)"
        }
        VerseCondition::Point {
            book: BookFilter::Index(index),
            chapter,
            verse,
        } => {
            params.push(Value::Integer(*index as i64));
            params.push(Value::Integer(i64::from(*chapter)));
            params.push(Value::Integer(i64::from(*verse)));
            "(book_index = ? AND chapter = ? AND verse = ?)"
        }
        VerseCondition::IdRange {
            book,
            chapter,
            start_id,
            end_id,
        } => {
            params.push(Value::Text(book.clone()));
            params.push(Value::Integer(i64::from(*chapter)));
            params.push(Value::Integer(*start_id));
            params.push(Value::Integer(*end_id));
            "(book = ? AND chapter = ? AND storage_verse_id BETWEEN ? AND ?)"
        }
    }
}

// ---------------------------------------------------------------------------
// Verse operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a batch of verses inside a single transaction.
    ///
    /// Returns the number of rows written.
    pub fn insert_verses(&self, verses: &[VerseRecord]) -> Result<usize> {
        let tx = self.begin("insert_verses")?;
        let written = insert_rows(&tx, verses)?;
        commit(tx, "insert_verses")?;
        Ok(written)
    }

    /// Deletes every verse row.
    pub fn clear_verses(&self) -> Result<()> {
        clear_rows(self.conn())
    }

    /// Starts a write that replaces store contents all at once.
    ///
    /// Nothing is visible to readers until [`VerseWrite::commit`]; dropping
    /// the write rolls every change back.
    pub fn begin_write(&self) -> Result<VerseWrite<'_>> {
        Ok(VerseWrite {
            tx: self.begin("begin_write")?,
        })
    }

    fn begin(&self, operation: &str) -> Result<Transaction<'_>> {
        self.conn()
            .unchecked_transaction()
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to begin transaction: {e}"),
                operation: operation.to_string(),
            })
    }

    /// Runs one OR-combined query per chunk of conditions and returns every
    /// matching row.
    pub fn find_verses(&self, conditions: &[VerseCondition]) -> Result<Vec<VerseRecord>> {
        let mut verses = Vec::new();
        for chunk in conditions.chunks(MAX_CONDITIONS_PER_QUERY) {
            verses.extend(self.query_conditions(chunk, None, "find_verses")?);
        }
        Ok(verses)
    }

    /// Returns the first row matching a single condition, if any.
    pub fn find_verse(&self, condition: &VerseCondition) -> Result<Option<VerseRecord>> {
        Ok(self
            .query_conditions(std::slice::from_ref(condition), Some(1), "find_verse")?
            .into_iter()
            .next())
    }

    /// Total number of verse rows.
    pub fn count_verses(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM verses", [], |row| row.get(0))
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to count verses: {e}"),
                operation: "count_verses".to_string(),
            })?;
        Ok(count as u64)
    }

    /// Collects verse, book, chapter, and translation counts plus the file size.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let map_err = |e: rusqlite::Error| ScripRefError::Database {
            message: format!("failed to collect stats: {e}"),
            operation: "get_stats".to_string(),
        };

        let (verse_count, book_count, chapter_count): (i64, i64, i64) = self
            .conn()
            .query_row(
                "SELECT COUNT(*),
                        COUNT(DISTINCT book),
                        COUNT(DISTINCT book || char(31) || chapter)
                 FROM verses",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(map_err)?;

        let mut stmt = self
            .conn()
            .prepare("SELECT DISTINCT translation FROM verses ORDER BY translation")
            .map_err(map_err)?;
        let translations = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;

        Ok(StoreStats {
            verse_count: verse_count as u64,
            book_count: book_count as u64,
            chapter_count: chapter_count as u64,
            translations,
            db_size_bytes: self.size()?,
        })
    }

    /// Reads a bookkeeping value from the `meta` table.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| ScripRefError::Database {
                message: format!("failed to read meta '{key}': {e}"),
                operation: "get_meta".to_string(),
            })
    }

    /// Writes a bookkeeping value to the `meta` table.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        write_meta(self.conn(), key, value)
    }

    fn query_conditions(
        &self,
        conditions: &[VerseCondition],
        limit: Option<usize>,
        operation: &str,
    ) -> Result<Vec<VerseRecord>> {
        if conditions.is_empty() {
            return Ok(Vec::new());
        }

        let mut bound = Vec::with_capacity(conditions.len() * 4 + 1);
        let predicates: Vec<&str> = conditions
            .iter()
            .map(|c| condition_sql(c, &mut bound))
            .collect();

        let mut sql = format!(
            "SELECT {VERSE_COLUMNS} FROM verses WHERE ({})",
            predicates.join(" OR ")
        );
        if let Some(translation) = self.translation() {
            sql.push_str(" AND translation = ?");
            bound.push(Value::Text(translation.to_string()));
        }
        sql.push_str(" ORDER BY book_index, chapter, storage_verse_id");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let map_err = |e: rusqlite::Error| ScripRefError::Database {
            message: format!("failed to query verses: {e}"),
            operation: operation.to_string(),
        };

        let mut stmt = self.conn().prepare(&sql).map_err(map_err)?;
        let rows = stmt
            .query_map(params_from_iter(bound.iter()), row_to_verse)
            .map_err(map_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)
    }
}

/// An open write transaction on the verse store. See [`Database::begin_write`].
pub struct VerseWrite<'a> {
    tx: Transaction<'a>,
}

impl VerseWrite<'_> {
    pub fn clear_verses(&self) -> Result<()> {
        clear_rows(&self.tx)
    }

    pub fn insert_verses(&self, verses: &[VerseRecord]) -> Result<usize> {
        insert_rows(&self.tx, verses)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        write_meta(&self.tx, key, value)
    }

    /// Makes every change visible.
    pub fn commit(self) -> Result<()> {
        commit(self.tx, "commit_write")
    }
}

fn commit(tx: Transaction<'_>, operation: &str) -> Result<()> {
    tx.commit().map_err(|e| ScripRefError::Database {
        message: format!("failed to commit transaction: {e}"),
        operation: operation.to_string(),
    })
}

fn insert_rows(conn: &Connection, verses: &[VerseRecord]) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR REPLACE INTO verses
                (book, book_index, chapter, verse, storage_verse_id, text, translation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| ScripRefError::Database {
            message: format!("failed to prepare statement: {e}"),
            operation: "insert_verses".to_string(),
        })?;

    for verse in verses {
        stmt.execute(params![
            verse.book,
            verse.book_index as i64,
            verse.chapter,
            verse.verse_number,
            verse.storage_verse_id,
            verse.text,
            verse.translation,
        ])
        .map_err(|e| ScripRefError::Database {
            message: format!("failed to insert verse: {e}"),
            operation: "insert_verses".to_string(),
        })?;
    }
    Ok(verses.len())
}

fn clear_rows(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM verses", [])
        .map_err(|e| ScripRefError::Database {
            message: format!("failed to clear verses: {e}"),
            operation: "clear_verses".to_string(),
        })?;
    Ok(())
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| ScripRefError::Database {
        message: format!("failed to write meta '{key}': {e}"),
        operation: "set_meta".to_string(),
    })?;
    Ok(())
}

impl VerseStore for Database {
    fn find_matching(&self, conditions: &[VerseCondition]) -> Result<Vec<VerseRecord>> {
        self.find_verses(conditions)
    }

    fn find_first(&self, condition: &VerseCondition) -> Result<Option<VerseRecord>> {
        self.find_verse(condition)
    }

    fn interrupt_hook(&self) -> Option<InterruptHook> {
        let handle = self.conn().get_interrupt_handle();
        Some(Box::new(move || handle.interrupt()))
    }
}
