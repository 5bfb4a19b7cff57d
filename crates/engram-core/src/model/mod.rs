//! Data Model
//!
//! The durable and transient units the pipelines move around:
//! records, analyzer concepts, recency slots, and graph types.

mod concept;
mod graph;
mod record;

pub use concept::{Concept, ConceptDraft, ConceptSource, Mood, SignificanceJudgment};
pub use graph::{
    content_digest, EdgeKind, ForcedRelationship, GraphEdge, GraphNode, GraphStats,
    Neighborhood, RelatedCandidate,
};
pub use record::{MemoryRecord, RecencySlot, StoreStats};
