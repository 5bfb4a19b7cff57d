//! Analyzer Gateway
//!
//! The language-model analyzer contract and the gateway wrapping it.
//! The gateway owns the cross-cutting behavior every provider needs:
//! requests-per-second pacing, one retry after a malformed structured
//! response, and serialized calls so request retries cannot trigger
//! duplicate analyses of the same record.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AnalyzerError;
use crate::model::{ConceptDraft, MemoryRecord, SignificanceJudgment};
use crate::policy::AnalyzedType;

// ============================================================================
// CONTRACT
// ============================================================================

/// Language-model analyzer contract
///
/// Each method is one model round-trip. Providers return structured output;
/// a response that cannot be parsed surfaces as `AnalyzerError::Malformed`.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Split a record into 2-4 self-contained concepts with per-concept
    /// classification
    async fn extract_and_analyze(
        &self,
        record: &MemoryRecord,
    ) -> Result<Vec<ConceptDraft>, AnalyzerError>;

    /// Judge whether a non-factual record is significant.
    ///
    /// Significant iff the record represents first-time establishment of a
    /// pattern, a paradigm shift, a crisis resolution, or a novel
    /// collaboration pattern. Routine, incremental, or repetitive events are
    /// not significant; the default bias is not significant.
    async fn judge_significance(
        &self,
        record: &MemoryRecord,
        analyzed_type: AnalyzedType,
    ) -> Result<SignificanceJudgment, AnalyzerError>;

    /// Score each candidate's relevance to the query in [0, 1], batched
    async fn rank_results(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<f64>, AnalyzerError>;
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Rate-limited, retrying front for an analyzer provider
pub struct AnalyzerGateway {
    inner: Arc<dyn Analyzer>,
    /// Minimum spacing between calls; also serializes them
    pacer: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl AnalyzerGateway {
    /// Wrap a provider with the given requests-per-second limit.
    /// `rps = 0` disables pacing (calls are still serialized).
    pub fn new(inner: Arc<dyn Analyzer>, rps: u32) -> Self {
        let min_interval = if rps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / f64::from(rps))
        };
        Self {
            inner,
            pacer: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait until the rate limit admits another call
    async fn pace(&self) {
        let mut last = self.pacer.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Extract concepts, retrying once after a malformed response
    pub async fn extract_and_analyze(
        &self,
        record: &MemoryRecord,
    ) -> Result<Vec<ConceptDraft>, AnalyzerError> {
        self.pace().await;
        match self.inner.extract_and_analyze(record).await {
            Err(AnalyzerError::Malformed(first)) => {
                tracing::warn!(record_id = record.id, "malformed analysis, retrying: {first}");
                self.pace().await;
                self.inner.extract_and_analyze(record).await
            }
            other => other,
        }
    }

    pub async fn judge_significance(
        &self,
        record: &MemoryRecord,
        analyzed_type: AnalyzedType,
    ) -> Result<SignificanceJudgment, AnalyzerError> {
        self.pace().await;
        self.inner.judge_significance(record, analyzed_type).await
    }

    pub async fn rank_results(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<f64>, AnalyzerError> {
        self.pace().await;
        self.inner.rank_results(query, candidates).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
