//! Test Support
//!
//! Engine construction over scripted fakes for tool and server tests.

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use engram_core::{
    AnalyzedType, Analyzer, AnalyzerError, ConceptDraft, EmbeddingError, EmbeddingProvider,
    EngineConfig, IngestRequest, MemoryEngine, MemoryRecord, Mood, SignificanceJudgment,
};

/// What the scripted analyzer should answer
#[derive(Debug, Clone, Copy)]
pub struct ScriptedBehavior {
    pub analyzed_type: AnalyzedType,
    pub significant: bool,
}

impl ScriptedBehavior {
    pub fn factual() -> Self {
        Self {
            analyzed_type: AnalyzedType::Faktenwissen,
            significant: false,
        }
    }

    pub fn subjective(analyzed_type: AnalyzedType, significant: bool) -> Self {
        Self {
            analyzed_type,
            significant,
        }
    }
}

/// Analyzer returning one concept per record with fixed routing
struct ScriptedAnalyzer {
    behavior: ScriptedBehavior,
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn extract_and_analyze(
        &self,
        record: &MemoryRecord,
    ) -> Result<Vec<ConceptDraft>, AnalyzerError> {
        Ok(vec![ConceptDraft {
            title: record.topic.clone(),
            description: record.content.clone(),
            analyzed_type: self.behavior.analyzed_type,
            confidence: 0.9,
            mood: Mood::Neutral,
            keywords: record
                .content
                .split_whitespace()
                .take(3)
                .map(|s| s.to_lowercase())
                .collect(),
            extracted_concepts: vec![record.topic.to_lowercase()],
        }])
    }

    async fn judge_significance(
        &self,
        _record: &MemoryRecord,
        _analyzed_type: AnalyzedType,
    ) -> Result<SignificanceJudgment, AnalyzerError> {
        Ok(SignificanceJudgment {
            significant: self.behavior.significant,
            reason: if self.behavior.significant {
                "first-time establishment of a pattern".to_string()
            } else {
                "routine event".to_string()
            },
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

/// Deterministic bag-of-words embedder
struct HashEmbedder;

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

/// Engine over temp-dir stores and scripted fakes
pub fn test_engine(behavior: ScriptedBehavior) -> (Arc<MemoryEngine>, TempDir) {
    let dir = TempDir::new().unwrap();
    let engine = MemoryEngine::open(
        Some(dir.path().to_path_buf()),
        EngineConfig::default(),
        Arc::new(ScriptedAnalyzer { behavior }),
        Arc::new(HashEmbedder),
    )
    .unwrap();
    (Arc::new(engine), dir)
}

/// Ingest a record and return its post-finalize id (0 when not permanent)
pub async fn seed_memory(
    engine: &Arc<MemoryEngine>,
    category: &str,
    topic: &str,
    content: &str,
) -> i64 {
    engine
        .ingest(IngestRequest::new(category, topic, content))
        .await
        .unwrap()
        .memory_id
}
