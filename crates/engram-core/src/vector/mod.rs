//! Vector Store
//!
//! Concept fragments with embeddings. Concepts are written after every
//! successfully analyzed ingest, independent of the placement decision, and
//! never rewritten. Re-storing a parent record upserts by concept id, so
//! duplicates cannot accumulate.

mod sqlite;

pub use sqlite::SqliteVectorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VectorError;
use crate::model::{Concept, MemoryRecord};
use crate::policy::Category;

/// Default number of candidates fetched for the vector search branch
pub const DEFAULT_VECTOR_K: usize = 20;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Outcome of a concept batch write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptWriteReport {
    pub success: bool,
    pub count_stored: usize,
    pub errors: Vec<String>,
}

/// A similarity hit from the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptHit {
    pub concept: Concept,
    /// Similarity in [0, 1]
    pub similarity: f64,
}

// ============================================================================
// CONTRACT
// ============================================================================

/// Contract for the vector store adapter
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and persist the enriched concepts of a record.
    /// Upserts by concept id.
    async fn store_concepts(
        &self,
        record: &MemoryRecord,
        concepts: &[Concept],
    ) -> Result<ConceptWriteReport, VectorError>;

    /// Top-k concepts similar to the query text, optionally filtered by
    /// source category
    async fn search_similar(
        &self,
        query: &str,
        k: usize,
        categories: Option<&[Category]>,
    ) -> Result<Vec<ConceptHit>, VectorError>;
}
