//! SQLite Relational Store
//!
//! Separate reader/writer connections for interior mutability. All methods
//! take `&self`, making the store `Send + Sync` so pipelines can share it
//! behind an `Arc` without an outer lock.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use super::migrations;
use super::{RelationalStore, SEARCH_RESULT_CAP};
use crate::error::StoreError;
use crate::model::{MemoryRecord, StoreStats};
use crate::policy::Category;

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed relational store
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = Connection::open(path)?;
        Self::configure_connection(&writer)?;
        migrations::apply_migrations(&writer)?;

        let reader = Connection::open(path)?;
        Self::configure_connection(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    pub(crate) fn writer(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn reader(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.reader.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn map_record(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
        let category_raw: String = row.get("category")?;
        let category = Category::parse_name(&category_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown category: {category_raw}").into(),
            )
        })?;
        let created_raw: String = row.get("created_at")?;
        let created_at = parse_timestamp(&created_raw)?;
        Ok(MemoryRecord {
            id: row.get("id")?,
            category,
            topic: row.get("topic")?,
            content: row.get("content")?,
            date: row.get("date")?,
            created_at,
        })
    }
}

/// Stable, lexicographically ordered timestamp encoding
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("bad timestamp {raw}: {e}").into(),
            )
        })
}

/// Escape LIKE wildcards in user-supplied query text
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ============================================================================
// RELATIONAL STORE IMPL
// ============================================================================

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn insert(
        &self,
        category: Category,
        topic: &str,
        content: &str,
        date: NaiveDate,
    ) -> Result<i64, StoreError> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO memories (date, category, topic, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date,
                category.as_str(),
                topic,
                content,
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Option<MemoryRecord>, StoreError> {
        let conn = self.reader();
        let record = conn
            .query_row(
                "SELECT id, date, category, topic, content, created_at
                 FROM memories WHERE id = ?1",
                [id],
                Self::map_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.writer();
        let changed = conn.execute("DELETE FROM memories WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    async fn relocate(&self, id: i64, new_category: Category) -> Result<bool, StoreError> {
        let conn = self.writer();
        let changed = conn.execute(
            "UPDATE memories SET category = ?2 WHERE id = ?1",
            params![id, new_category.as_str()],
        )?;
        Ok(changed > 0)
    }

    async fn search_basic(
        &self,
        query: &str,
        categories: Option<&[Category]>,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let pattern = like_pattern(query);
        let conn = self.reader();

        let mut records = Vec::new();
        match categories {
            Some(cats) if !cats.is_empty() => {
                let placeholders = cats.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
                let sql = format!(
                    "SELECT id, date, category, topic, content, created_at FROM memories
                     WHERE (topic LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\')
                       AND category IN ({placeholders})
                     ORDER BY created_at DESC, id DESC LIMIT {SEARCH_RESULT_CAP}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut values: Vec<&dyn rusqlite::ToSql> = vec![&pattern];
                let names: Vec<&'static str> = cats.iter().map(|c| c.as_str()).collect();
                for name in &names {
                    values.push(name);
                }
                let rows = stmt.query_map(&values[..], Self::map_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
            _ => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, date, category, topic, content, created_at FROM memories
                     WHERE topic LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'
                     ORDER BY created_at DESC, id DESC LIMIT {SEARCH_RESULT_CAP}"
                ))?;
                let rows = stmt.query_map([&pattern], Self::map_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
        }
        Ok(records)
    }

    async fn by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let conn = self.reader();
        let mut stmt = conn.prepare(
            "SELECT id, date, category, topic, content, created_at FROM memories
             WHERE category = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![category.as_str(), limit as i64], Self::map_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MemoryRecord>, StoreError> {
        let conn = self.reader();
        let mut stmt = conn.prepare(
            "SELECT id, date, category, topic, content, created_at FROM memories
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], Self::map_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.reader();
        let mut stmt =
            conn.prepare("SELECT category, COUNT(*) FROM memories GROUP BY category")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut stats = StoreStats::default();
        for row in rows {
            let (category, count) = row?;
            stats.total += count;
            stats.per_category.insert(category, count);
        }
        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
