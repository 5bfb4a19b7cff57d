//! Test Fixtures
//!
//! Scripted collaborators for driving the engine without a language model
//! or embedding runtime: a per-topic routing analyzer, a deterministic
//! bag-of-words embedder, and a permanently failing vector store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use engram_core::{
    AnalyzedType, Analyzer, AnalyzerError, Concept, ConceptDraft, ConceptHit,
    ConceptWriteReport, EmbeddingError, EmbeddingProvider, EngineConfig, MemoryEngine,
    MemoryRecord, Mood, SignificanceJudgment, SqliteGraphStore, SqliteStore, VectorError,
    VectorStore,
};

// ============================================================================
// SCRIPTED ANALYZER
// ============================================================================

/// How the analyzer should treat one record
#[derive(Debug, Clone)]
pub struct Script {
    pub analyzed_type: AnalyzedType,
    pub significant: bool,
    pub reason: String,
    /// Number of concepts to produce; 0 simulates an empty extraction
    pub concepts: usize,
}

impl Script {
    pub fn factual() -> Self {
        Self {
            analyzed_type: AnalyzedType::Faktenwissen,
            significant: false,
            reason: "factual knowledge".to_string(),
            concepts: 2,
        }
    }

    pub fn significant(analyzed_type: AnalyzedType) -> Self {
        Self {
            analyzed_type,
            significant: true,
            reason: "first-time establishment of a pattern".to_string(),
            concepts: 2,
        }
    }

    pub fn routine(analyzed_type: AnalyzedType) -> Self {
        Self {
            analyzed_type,
            significant: false,
            reason: "routine event".to_string(),
            concepts: 2,
        }
    }

    pub fn empty() -> Self {
        Self {
            analyzed_type: AnalyzedType::Erlebnisse,
            significant: false,
            reason: "unused".to_string(),
            concepts: 0,
        }
    }
}

/// Analyzer routed per topic, with a default script
pub struct ScriptedAnalyzer {
    routes: Mutex<HashMap<String, Script>>,
    default: Script,
}

impl ScriptedAnalyzer {
    pub fn new(default: Script) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            default,
        }
    }

    pub fn route(self, topic: &str, script: Script) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(topic.to_string(), script);
        self
    }

    fn script_for(&self, topic: &str) -> Script {
        self.routes
            .lock()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn extract_and_analyze(
        &self,
        record: &MemoryRecord,
    ) -> Result<Vec<ConceptDraft>, AnalyzerError> {
        let script = self.script_for(&record.topic);
        Ok((0..script.concepts)
            .map(|index| ConceptDraft {
                title: format!("{} #{index}", record.topic),
                description: record.content.clone(),
                analyzed_type: script.analyzed_type,
                confidence: 0.9,
                mood: Mood::Neutral,
                keywords: record
                    .content
                    .split_whitespace()
                    .take(4)
                    .map(|s| s.to_lowercase())
                    .collect(),
                extracted_concepts: vec![record.topic.to_lowercase()],
            })
            .collect())
    }

    async fn judge_significance(
        &self,
        record: &MemoryRecord,
        _analyzed_type: AnalyzedType,
    ) -> Result<SignificanceJudgment, AnalyzerError> {
        let script = self.script_for(&record.topic);
        Ok(SignificanceJudgment {
            significant: script.significant,
            reason: script.reason,
        })
    }

    async fn rank_results(
        &self,
        _query: &str,
        candidates: &[String],
    ) -> Result<Vec<f64>, AnalyzerError> {
        Ok(vec![0.5; candidates.len()])
    }
}

// ============================================================================
// EMBEDDER
// ============================================================================

/// Deterministic bag-of-words embedder: tokens hash into buckets, so shared
/// vocabulary means positive cosine similarity
pub struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; 64];
        for token in text.to_lowercase().split_whitespace() {
            let mut hash = 0usize;
            for b in token.bytes() {
                hash = hash.wrapping_mul(31).wrapping_add(b as usize);
            }
            vector[hash % 64] += 1.0;
        }
        Ok(vector)
    }
}

// ============================================================================
// FAILING VECTOR STORE
// ============================================================================

/// Vector store that is permanently offline
pub struct DownVectorStore;

#[async_trait]
impl VectorStore for DownVectorStore {
    async fn store_concepts(
        &self,
        _record: &MemoryRecord,
        _concepts: &[Concept],
    ) -> Result<ConceptWriteReport, VectorError> {
        Err(VectorError::Init("vector store offline".to_string()))
    }

    async fn search_similar(
        &self,
        _query: &str,
        _k: usize,
        _categories: Option<&[engram_core::Category]>,
    ) -> Result<Vec<ConceptHit>, VectorError> {
        Err(VectorError::Init("vector store offline".to_string()))
    }
}

// ============================================================================
// ENGINE BUILDERS
// ============================================================================

/// Engine over temp-dir SQLite stores and the given analyzer
pub fn engine_with(analyzer: ScriptedAnalyzer, config: EngineConfig) -> (MemoryEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let engine = MemoryEngine::open(
        Some(dir.path().to_path_buf()),
        config,
        Arc::new(analyzer),
        Arc::new(HashEmbedder),
    )
    .unwrap();
    (engine, dir)
}

/// Engine with defaults
pub fn engine(analyzer: ScriptedAnalyzer) -> (MemoryEngine, TempDir) {
    engine_with(analyzer, EngineConfig::default())
}

/// Engine whose vector store is offline
pub fn engine_with_down_vector(analyzer: ScriptedAnalyzer) -> (MemoryEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let relational = Arc::new(SqliteStore::open(dir.path().join("memories.db")).unwrap());
    let graph = Arc::new(SqliteGraphStore::open(dir.path().join("graph.db")).unwrap());
    let engine = MemoryEngine::with_stores(
        EngineConfig::default(),
        relational.clone(),
        Arc::new(DownVectorStore),
        graph,
        relational,
        Arc::new(analyzer),
    );
    (engine, dir)
}
