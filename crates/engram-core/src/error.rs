//! Error Taxonomy
//!
//! Adapter errors are converted to this taxonomy at the adapter boundary.
//! The pipelines distinguish "fatal for this request" (relational store and
//! analyzer during ingest) from "degrade and continue" (everything else);
//! partial-success results carry per-branch flags instead of errors.

use serde::{Deserialize, Serialize};

// ============================================================================
// ERROR KINDS
// ============================================================================

/// The error kinds the engine exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Category outside the closed set, empty fields, malformed request
    InvalidInput,
    /// Relational store unreachable or failing
    StoreUnavailable,
    /// Analyzer unreachable
    AnalyzerUnavailable,
    /// Analyzer returned an unparseable structured response
    AnalyzerMalformed,
    /// Vector store failure (never fatal)
    VectorUnavailable,
    /// Graph store failure (never fatal)
    GraphUnavailable,
    /// Branch-level deadline expiry
    Timeout,
    /// Catch-all
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::AnalyzerUnavailable => "analyzer_unavailable",
            ErrorKind::AnalyzerMalformed => "analyzer_malformed",
            ErrorKind::VectorUnavailable => "vector_unavailable",
            ErrorKind::GraphUnavailable => "graph_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Pipeline stage a failure was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Persist,
    Analyze,
    Judge,
    Index,
    Link,
    Finalize,
    Search,
    Expand,
    Jobs,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Persist => "persist",
            Stage::Analyze => "analyze",
            Stage::Judge => "judge",
            Stage::Index => "index",
            Stage::Link => "link",
            Stage::Finalize => "finalize",
            Stage::Search => "search",
            Stage::Expand => "expand",
            Stage::Jobs => "jobs",
        }
    }
}

// ============================================================================
// ENGINE ERROR
// ============================================================================

/// The single user-visible error envelope
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{} at {}: {message}", kind.as_str(), stage.as_str())]
pub struct EngineError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    pub fn invalid_input(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, stage, message)
    }
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// ADAPTER ERRORS
// ============================================================================

/// Relational store adapter error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Vector store adapter error
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Embedding failed: {0}")]
    Embedding(String),
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Graph store adapter error
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Node not found for record {0}")]
    NodeNotFound(i64),
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Analyzer gateway error
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("Analyzer response malformed: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Convert to the taxonomy at the given stage
    pub fn into_engine(self, stage: Stage) -> EngineError {
        EngineError::new(ErrorKind::StoreUnavailable, stage, self.to_string())
    }
}

impl AnalyzerError {
    /// Convert to the taxonomy at the given stage
    pub fn into_engine(self, stage: Stage) -> EngineError {
        let kind = match &self {
            AnalyzerError::Unavailable(_) => ErrorKind::AnalyzerUnavailable,
            AnalyzerError::Malformed(_) => ErrorKind::AnalyzerMalformed,
        };
        EngineError::new(kind, stage, self.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
