//! Memory Record - the durable unit of memory
//!
//! A record is created with a tentative category, may be relocated after
//! classification, and may be deleted again if the placement decision
//! concludes "not permanent". Retrieval never mutates records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::policy::Category;

// ============================================================================
// MEMORY RECORD
// ============================================================================

/// A memory record as stored in the relational store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Monotonically increasing id, assigned at insertion
    pub id: i64,
    /// Storage category
    pub category: Category,
    /// Short label, non-empty, at most 512 chars
    pub topic: String,
    /// Full text
    pub content: String,
    /// Calendar day at ingestion time
    pub date: NaiveDate,
    /// Timestamp of the first insert
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Topic and content joined for keyword scoring
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.topic, self.content)
    }
}

// ============================================================================
// RECENCY SLOT
// ============================================================================

/// One entry in the recency cache
///
/// Keeps the record's text even though the relational row is gone by the
/// time a non-permanent record lands here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecencySlot {
    pub record_id: i64,
    pub category: Category,
    pub topic: String,
    pub content: String,
    pub inserted_at: DateTime<Utc>,
}

// ============================================================================
// STORE STATS
// ============================================================================

/// Per-category record counts from the relational store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Record count per category
    pub per_category: HashMap<String, u64>,
    /// Total record count
    pub total: u64,
}

// ============================================================================
// TESTS
// ============================================================================
