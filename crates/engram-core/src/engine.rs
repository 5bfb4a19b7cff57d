//! Memory Engine
//!
//! Composition root: wires the stores, the analyzer gateway, and both
//! pipelines behind one handle. Collaborators are constructor-injected so
//! tests can substitute fakes for any of them; there are no process-global
//! singletons.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::analyzer::{Analyzer, AnalyzerGateway};
use crate::config::EngineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{EngineError, ErrorKind, Result, Stage};
use crate::graph::{GraphStore, SqliteGraphStore};
use crate::ingest::{IngestOutcome, IngestPipeline, IngestRequest};
use crate::jobs::{AnalysisJob, AnalysisResultRecord, BatchAnalyzer, JobStore};
use crate::model::{GraphStats, MemoryRecord, RecencySlot, StoreStats};
use crate::policy::Category;
use crate::recency::RecencyCache;
use crate::retrieval::{
    GraphSearchRequest, GraphSearchResponse, RetrievalPipeline, SearchRequest, SearchResponse,
};
use crate::store::{RelationalStore, SqliteStore};
use crate::vector::{ConceptHit, SqliteVectorStore, VectorStore};

// ============================================================================
// STATS
// ============================================================================

/// Combined engine statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub records: StoreStats,
    pub graph: GraphStats,
    pub recency_count: usize,
    pub recency_capacity: usize,
}

// ============================================================================
// ENGINE
// ============================================================================

/// The memory engine facade consumed by the transport layer
pub struct MemoryEngine {
    relational: Arc<dyn RelationalStore>,
    recency: Arc<RecencyCache>,
    graph: Arc<dyn GraphStore>,
    jobs: Arc<dyn JobStore>,
    ingest: IngestPipeline,
    retrieval: RetrievalPipeline,
    batch: BatchAnalyzer,
}

impl MemoryEngine {
    /// Open the SQLite-backed stores under `data_dir` and wire the engine.
    /// `None` selects the platform data directory.
    pub fn open(
        data_dir: Option<PathBuf>,
        config: EngineConfig,
        analyzer: Arc<dyn Analyzer>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            EngineError::new(
                ErrorKind::StoreUnavailable,
                Stage::Persist,
                format!("cannot create data dir {}: {e}", dir.display()),
            )
        })?;

        let relational = Arc::new(SqliteStore::open(dir.join("memories.db")).map_err(|e| {
            EngineError::new(ErrorKind::StoreUnavailable, Stage::Persist, e.to_string())
        })?);
        let vector = Arc::new(
            SqliteVectorStore::open(dir.join("vectors.db"), embedder).map_err(|e| {
                EngineError::new(ErrorKind::VectorUnavailable, Stage::Persist, e.to_string())
            })?,
        );
        let graph = Arc::new(SqliteGraphStore::open(dir.join("graph.db")).map_err(|e| {
            EngineError::new(ErrorKind::GraphUnavailable, Stage::Persist, e.to_string())
        })?);

        Ok(Self::with_stores(
            config,
            relational.clone(),
            vector,
            graph,
            relational,
            analyzer,
        ))
    }

    /// Wire the engine over explicit store implementations
    pub fn with_stores(
        config: EngineConfig,
        relational: Arc<dyn RelationalStore>,
        vector: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        jobs: Arc<dyn JobStore>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let recency = Arc::new(RecencyCache::new(config.recency_capacity));
        let gateway = Arc::new(AnalyzerGateway::new(analyzer, config.analyzer_rps));

        let ingest = IngestPipeline::new(
            relational.clone(),
            recency.clone(),
            vector.clone(),
            graph.clone(),
            gateway.clone(),
            config.clone(),
        );
        let retrieval = RetrievalPipeline::new(
            relational.clone(),
            vector,
            graph.clone(),
            gateway.clone(),
            config,
        );
        let batch = BatchAnalyzer::new(relational.clone(), jobs.clone(), gateway);

        Self {
            relational,
            recency,
            graph,
            jobs,
            ingest,
            retrieval,
            batch,
        }
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        self.ingest.ingest(request).await
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub async fn search_intelligent(&self, request: SearchRequest) -> Result<SearchResponse> {
        self.retrieval.search_intelligent(request).await
    }

    pub async fn search_graph(&self, request: GraphSearchRequest) -> Result<GraphSearchResponse> {
        self.retrieval.search_graph(request).await
    }

    pub async fn search_concepts(
        &self,
        query: &str,
        k: usize,
        categories: Option<&[Category]>,
    ) -> Result<Vec<ConceptHit>> {
        self.retrieval.search_concepts(query, k, categories).await
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Recency cache contents, newest first
    pub fn recency_slots(&self) -> Vec<RecencySlot> {
        self.recency.dump()
    }

    /// Most recent permanent records
    pub async fn recent_records(&self, limit: usize) -> Result<Vec<MemoryRecord>> {
        self.relational
            .recent(limit)
            .await
            .map_err(|e| e.into_engine(Stage::Search))
    }

    /// Permanent records in one category, newest first
    pub async fn records_by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        self.relational
            .by_category(category, limit)
            .await
            .map_err(|e| e.into_engine(Stage::Search))
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        let records = self
            .relational
            .stats()
            .await
            .map_err(|e| e.into_engine(Stage::Search))?;
        let graph = self.graph.stats().await.map_err(|e| {
            EngineError::new(ErrorKind::GraphUnavailable, Stage::Search, e.to_string())
        })?;
        Ok(EngineStats {
            records,
            graph,
            recency_count: self.recency.len(),
            recency_capacity: self.recency.capacity(),
        })
    }

    // ------------------------------------------------------------------
    // Batch analysis
    // ------------------------------------------------------------------

    pub async fn create_analysis_job(
        &self,
        job_type: &str,
        record_ids: &[i64],
    ) -> Result<AnalysisJob> {
        self.jobs
            .create_job(job_type, record_ids)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))
    }

    pub async fn run_analysis_job(&self, job_id: &str) -> Result<AnalysisJob> {
        self.batch.run(job_id).await
    }

    pub async fn job_status(&self, job_id: &str) -> Result<Option<AnalysisJob>> {
        self.jobs
            .get_job(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))
    }

    pub async fn job_results(&self, job_id: &str) -> Result<Vec<AnalysisResultRecord>> {
        self.jobs
            .results_for_job(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))
    }
}

/// Platform data directory for the engine's databases
fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("dev", "engram", "core").ok_or_else(|| {
        EngineError::new(
            ErrorKind::Internal,
            Stage::Persist,
            "could not determine project directories",
        )
    })?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
