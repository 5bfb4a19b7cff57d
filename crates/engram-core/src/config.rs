//! Engine Configuration
//!
//! The enumerated settings with their defaults. Everything is plain data;
//! the engine takes a config by value at construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::rerank::RerankStrategy;

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for the memory engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Recency cache capacity; 0 disables the cache
    pub recency_capacity: usize,
    /// Default rerank strategy for intelligent search
    pub rerank_default: RerankStrategy,
    /// Default graph traversal depth (1-3)
    pub graph_depth_default: usize,
    /// Overlap cutoff above which an edge is HIGHLY_SIMILAR
    pub high_similarity_threshold: f64,
    /// Analyzer rate limit, requests per second
    pub analyzer_rps: u32,
    /// SQL search branch timeout
    pub sql_search_timeout_ms: u64,
    /// Vector search branch timeout
    pub vector_search_timeout_ms: u64,
    /// Graph search branch timeout
    pub graph_search_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recency_capacity: 10,
            rerank_default: RerankStrategy::Hybrid,
            graph_depth_default: 2,
            high_similarity_threshold: 0.8,
            analyzer_rps: 2,
            sql_search_timeout_ms: 2_000,
            vector_search_timeout_ms: 3_000,
            graph_search_timeout_ms: 3_000,
        }
    }
}

impl EngineConfig {
    pub fn sql_search_timeout(&self) -> Duration {
        Duration::from_millis(self.sql_search_timeout_ms)
    }

    pub fn vector_search_timeout(&self) -> Duration {
        Duration::from_millis(self.vector_search_timeout_ms)
    }

    pub fn graph_search_timeout(&self) -> Duration {
        Duration::from_millis(self.graph_search_timeout_ms)
    }

    /// Clamp a requested traversal depth into the supported range
    pub fn clamp_depth(depth: usize) -> usize {
        depth.clamp(1, 3)
    }
}

// ============================================================================
// TESTS
// ============================================================================
