//! SQLite Vector Store
//!
//! Embeds concept descriptions through the injected provider and keeps the
//! vectors as little-endian blobs next to the concept metadata. Search is a
//! linear cosine scan; a bounded LRU caches query embeddings so repeated
//! queries skip the provider.

use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use rusqlite::{params, Connection, Row};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{ConceptHit, ConceptWriteReport, VectorStore};
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::error::VectorError;
use crate::model::{Concept, ConceptSource, MemoryRecord, Mood};
use crate::policy::{AnalyzedType, Category};
use crate::store::{format_timestamp, parse_timestamp};

/// Query-embedding cache capacity
const QUERY_CACHE_SIZE: usize = 100;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS concepts (
    id TEXT PRIMARY KEY,
    record_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    analyzed_type TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 0.0,
    mood TEXT NOT NULL DEFAULT 'neutral',
    keywords_json TEXT NOT NULL DEFAULT '[]',
    extracted_json TEXT NOT NULL DEFAULT '[]',
    source_category TEXT NOT NULL,
    source_topic TEXT NOT NULL,
    source_date TEXT NOT NULL,
    source_created_at TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_concepts_record ON concepts(record_id);
CREATE INDEX IF NOT EXISTS idx_concepts_category ON concepts(source_category);
"#;

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed vector store with an injected embedding provider
pub struct SqliteVectorStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl SqliteVectorStore {
    /// Open (or create) the store at the given path
    pub fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, VectorError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| VectorError::Init(e.to_string()))?;
            }
        }

        let writer = Connection::open(path)?;
        writer.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        reader.execute_batch("PRAGMA busy_timeout = 5000;")?;

        // SAFETY: QUERY_CACHE_SIZE is a non-zero constant
        let cache = LruCache::new(NonZeroUsize::new(QUERY_CACHE_SIZE).expect("non-zero"));

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            embedder,
            query_cache: Mutex::new(cache),
        })
    }

    async fn query_embedding(&self, query: &str) -> Result<Vec<f32>, VectorError> {
        if let Some(vector) = self
            .query_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(query)
        {
            return Ok(vector.clone());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        self.query_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(query.to_string(), vector.clone());
        Ok(vector)
    }

    fn map_concept(row: &Row<'_>) -> rusqlite::Result<(Concept, Vec<u8>)> {
        let type_raw: String = row.get("analyzed_type")?;
        let analyzed_type = AnalyzedType::parse_name(&type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown analyzed type: {type_raw}").into(),
            )
        })?;
        let category_raw: String = row.get("source_category")?;
        let category = Category::parse_name(&category_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown category: {category_raw}").into(),
            )
        })?;
        let mood_raw: String = row.get("mood")?;
        let keywords_json: String = row.get("keywords_json")?;
        let extracted_json: String = row.get("extracted_json")?;
        let created_raw: String = row.get("source_created_at")?;

        let concept = Concept {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            analyzed_type,
            confidence: row.get("confidence")?,
            mood: Mood::parse_name(&mood_raw),
            keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
            extracted_concepts: serde_json::from_str(&extracted_json).unwrap_or_default(),
            source: ConceptSource {
                record_id: row.get("record_id")?,
                category,
                topic: row.get("source_topic")?,
                date: row.get("source_date")?,
                created_at: parse_timestamp(&created_raw)?,
            },
        };
        let blob: Vec<u8> = row.get("embedding")?;
        Ok((concept, blob))
    }
}

// ============================================================================
// VECTOR STORE IMPL
// ============================================================================

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn store_concepts(
        &self,
        record: &MemoryRecord,
        concepts: &[Concept],
    ) -> Result<ConceptWriteReport, VectorError> {
        let mut count_stored = 0usize;
        let mut errors = Vec::new();

        for concept in concepts {
            let vector = match self.embedder.embed(&concept.description).await {
                Ok(v) => v,
                Err(e) => {
                    errors.push(format!("{}: {e}", concept.id));
                    continue;
                }
            };
            let embedding = Embedding::new(vector);

            let result = {
                let conn = self.writer.lock().unwrap_or_else(|e| e.into_inner());
                conn.execute(
                    "INSERT OR REPLACE INTO concepts
                     (id, record_id, title, description, analyzed_type, confidence, mood,
                      keywords_json, extracted_json, source_category, source_topic,
                      source_date, source_created_at, embedding, dimensions, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    params![
                        concept.id,
                        record.id,
                        concept.title,
                        concept.description,
                        concept.analyzed_type.as_str(),
                        concept.confidence,
                        concept.mood.as_str(),
                        serde_json::to_string(&concept.keywords).unwrap_or_else(|_| "[]".into()),
                        serde_json::to_string(&concept.extracted_concepts)
                            .unwrap_or_else(|_| "[]".into()),
                        concept.source.category.as_str(),
                        concept.source.topic,
                        concept.source.date,
                        format_timestamp(concept.source.created_at),
                        embedding.to_bytes(),
                        embedding.dimensions as i64,
                        format_timestamp(Utc::now()),
                    ],
                )
            };

            match result {
                Ok(_) => count_stored += 1,
                Err(e) => errors.push(format!("{}: {e}", concept.id)),
            }
        }

        Ok(ConceptWriteReport {
            success: errors.is_empty(),
            count_stored,
            errors,
        })
    }

    async fn search_similar(
        &self,
        query: &str,
        k: usize,
        categories: Option<&[Category]>,
    ) -> Result<Vec<ConceptHit>, VectorError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = Embedding::new(self.query_embedding(query).await?);

        let rows: Vec<(Concept, Vec<u8>)> = {
            let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(
                "SELECT id, record_id, title, description, analyzed_type, confidence, mood,
                        keywords_json, extracted_json, source_category, source_topic,
                        source_date, source_created_at, embedding
                 FROM concepts",
            )?;
            let mapped = stmt.query_map([], Self::map_concept)?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            rows
        };

        let mut hits: Vec<ConceptHit> = rows
            .into_iter()
            .filter(|(concept, _)| match categories {
                Some(cats) if !cats.is_empty() => cats.contains(&concept.source.category),
                _ => true,
            })
            .filter_map(|(concept, blob)| {
                let embedding = Embedding::from_bytes(&blob)?;
                let similarity = query_vector.similarity(&embedding);
                Some(ConceptHit {
                    concept,
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

// ============================================================================
// TESTS
// ============================================================================
