//! Relational Store
//!
//! Durable ordered storage of memory records. The pipeline consumes the
//! `RelationalStore` contract; `SqliteStore` is the bundled implementation.

mod migrations;
mod sqlite;

pub use migrations::{apply_migrations, MIGRATIONS};
pub use sqlite::SqliteStore;
pub(crate) use sqlite::{format_timestamp, parse_timestamp};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::model::{MemoryRecord, StoreStats};
use crate::policy::Category;

/// Default ceiling on substring-search results
pub const SEARCH_RESULT_CAP: usize = 50;

/// Contract for the relational store adapter
///
/// Failures surface as `StoreError`; pipelines treat them as hard failures
/// for the affected branch but do not abort other branches.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Insert a record, returning its new monotone id
    async fn insert(
        &self,
        category: Category,
        topic: &str,
        content: &str,
        date: NaiveDate,
    ) -> Result<i64, StoreError>;

    /// Fetch a record by id
    async fn get(&self, id: i64) -> Result<Option<MemoryRecord>, StoreError>;

    /// Delete a record; `false` when the id was absent
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Rewrite a record's category; `false` when the id was absent
    async fn relocate(&self, id: i64, new_category: Category) -> Result<bool, StoreError>;

    /// Case-insensitive substring match over topic and content, newest first,
    /// capped at `SEARCH_RESULT_CAP`
    async fn search_basic(
        &self,
        query: &str,
        categories: Option<&[Category]>,
    ) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Records in a category, newest first
    async fn by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Most recent records across categories
    async fn recent(&self, limit: usize) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Per-category counts and the total
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
