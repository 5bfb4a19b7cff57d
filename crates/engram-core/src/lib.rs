//! # Engram Core
//!
//! Memory-pipeline engine for AI assistants: persistent, searchable memory
//! routed across heterogeneous stores.
//!
//! - **Ingestion pipeline**: classifies each record through a language-model
//!   analyzer and decides its placement: permanent relational storage for
//!   significant experiences, a bounded recency cache for routine ones, and
//!   semantic indexes for everything successfully analyzed
//! - **Relational store**: durable ordered records (SQLite, WAL)
//! - **Vector store**: analyzer concepts embedded and searched by cosine
//!   similarity, surviving deletion of their parent record
//! - **Graph store**: one node per related record with typed edges
//!   (same-category, concept-similar, highly-similar, temporal-adjacent,
//!   caller-asserted)
//! - **Retrieval pipeline**: concurrent SQL + vector fan-out with per-branch
//!   timeouts, record-id merge, reranking (text / hybrid / llm), and bounded
//!   graph expansion
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engram_core::{EngineConfig, IngestRequest, MemoryEngine, SearchRequest};
//!
//! let engine = MemoryEngine::open(None, EngineConfig::default(), analyzer, embedder)?;
//!
//! let outcome = engine
//!     .ingest(IngestRequest::new("erlebnisse", "First deploy", "Shipped it."))
//!     .await?;
//!
//! let results = engine
//!     .search_intelligent(SearchRequest::new("deploy"))
//!     .await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings` (default): local embedding generation with fastembed
//! - `bundled-sqlite` (default): compile SQLite into the binary

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod analyzer;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod jobs;
pub mod model;
pub mod policy;
pub mod recency;
pub mod rerank;
pub mod retrieval;
pub mod store;
pub mod vector;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Policy
pub use policy::{storage_category_for, AnalyzedType, Category, VALID_CATEGORIES};

// Data model
pub use model::{
    Concept, ConceptDraft, ConceptSource, EdgeKind, ForcedRelationship, GraphEdge, GraphNode,
    GraphStats, MemoryRecord, Mood, Neighborhood, RecencySlot, RelatedCandidate,
    SignificanceJudgment, StoreStats,
};

// Errors
pub use error::{
    AnalyzerError, EngineError, ErrorKind, GraphError, Result, Stage, StoreError, VectorError,
};

// Stores
pub use graph::{GraphStore, SqliteGraphStore};
pub use store::{RelationalStore, SqliteStore, SEARCH_RESULT_CAP};
pub use vector::{ConceptHit, ConceptWriteReport, SqliteVectorStore, VectorStore};

// Recency cache
pub use recency::RecencyCache;

// Embeddings
pub use embeddings::{cosine_similarity, Embedding, EmbeddingError, EmbeddingProvider};

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub use embeddings::LocalEmbedder;

// Analyzer
pub use analyzer::{Analyzer, AnalyzerGateway};

// Pipelines
pub use ingest::{IngestOutcome, IngestPipeline, IngestRequest};
pub use rerank::RerankStrategy;
pub use retrieval::{
    GraphSearchRequest, GraphSearchResponse, ResultSource, RetrievalPipeline, SearchHit,
    SearchRequest, SearchResponse,
};

// Jobs
pub use jobs::{AnalysisJob, AnalysisResultRecord, BatchAnalyzer, JobStatus, JobStore};

// Engine
pub use config::EngineConfig;
pub use engine::{EngineStats, MemoryEngine};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Analyzer, AnalyzedType, Category, EngineConfig, EngineError, ErrorKind, IngestOutcome,
        IngestRequest, MemoryEngine, MemoryRecord, RerankStrategy, Result, SearchRequest,
        SearchResponse,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::LocalEmbedder;
}
