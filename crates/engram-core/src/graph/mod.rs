//! Graph Store
//!
//! One node per related record plus typed edges. The pipeline creates the
//! strongest applicable edge per neighbor at ingest time; retrieval reads
//! only bounded neighborhoods, so cycles are expected and harmless.

mod sqlite;

pub use sqlite::SqliteGraphStore;

use async_trait::async_trait;

use crate::error::GraphError;
use crate::model::{
    EdgeKind, GraphNode, GraphStats, MemoryRecord, Neighborhood, RelatedCandidate,
};

/// Contract for the graph store adapter
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create or refresh the node for a record, returning its node id
    async fn upsert_node(
        &self,
        record: &MemoryRecord,
        concepts: &[String],
    ) -> Result<i64, GraphError>;

    /// Create a typed edge; `false` when the edge already existed.
    /// Existing edge properties win on conflict.
    async fn link(
        &self,
        from_node: i64,
        to_node: i64,
        kind: EdgeKind,
        strength: f64,
        properties: Option<serde_json::Value>,
    ) -> Result<bool, GraphError>;

    /// Candidate neighbors for edge creation, scored by concept overlap
    async fn find_related(
        &self,
        record: &MemoryRecord,
        seeds: &[String],
    ) -> Result<Vec<RelatedCandidate>, GraphError>;

    /// Nodes carrying any of the given concepts, best overlap first
    async fn search_by_concepts(
        &self,
        seeds: &[String],
        limit: usize,
    ) -> Result<Vec<GraphNode>, GraphError>;

    /// Bounded N-hop traversal around a node, depth clamped to [1, 3]
    async fn neighborhood(
        &self,
        node_id: i64,
        depth: usize,
        kinds: Option<&[EdgeKind]>,
    ) -> Result<Neighborhood, GraphError>;

    /// The node standing for a record, if any
    async fn node_for_record(&self, record_id: i64) -> Result<Option<GraphNode>, GraphError>;

    /// Node/edge counts, per-kind edge counts, most connected topics
    async fn stats(&self) -> Result<GraphStats, GraphError>;
}
