//! Graph Types
//!
//! Nodes, typed edges, and traversal results for the graph store.
//! Edges are undirected in semantics, stored as directed pairs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::policy::Category;

// ============================================================================
// EDGE KINDS
// ============================================================================

/// Relationship kinds between graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Same storage category
    SameCategory,
    /// Concept/keyword overlap above the base threshold
    ConceptSimilar,
    /// Overlap score above the high-similarity threshold
    HighlySimilar,
    /// Ingested on the same calendar day
    TemporalAdjacent,
    /// Caller-asserted relationship
    RelatedTo,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::SameCategory => "SAME_CATEGORY",
            EdgeKind::ConceptSimilar => "CONCEPT_SIMILAR",
            EdgeKind::HighlySimilar => "HIGHLY_SIMILAR",
            EdgeKind::TemporalAdjacent => "TEMPORAL_ADJACENT",
            EdgeKind::RelatedTo => "RELATED_TO",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SAME_CATEGORY" => Some(EdgeKind::SameCategory),
            "CONCEPT_SIMILAR" => Some(EdgeKind::ConceptSimilar),
            "HIGHLY_SIMILAR" => Some(EdgeKind::HighlySimilar),
            "TEMPORAL_ADJACENT" => Some(EdgeKind::TemporalAdjacent),
            "RELATED_TO" => Some(EdgeKind::RelatedTo),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// NODES AND EDGES
// ============================================================================

/// One graph node per related record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Graph-store node id
    pub node_id: i64,
    /// The record this node stands for
    pub record_id: i64,
    pub category: Category,
    pub topic: String,
    /// Ingestion day of the record, for temporal adjacency
    pub date: NaiveDate,
    /// SHA-256 hex digest of the record content
    pub content_digest: String,
    /// Normalized concept titles and keywords carried by this node
    pub concepts: Vec<String>,
}

/// Compute the content digest stored on a node
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A typed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from_node: i64,
    pub to_node: i64,
    pub kind: EdgeKind,
    /// Overlap score at creation time, in [0, 1]
    pub strength: f64,
}

/// Caller-asserted relationship in an ingest request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForcedRelationship {
    /// Target record id
    pub target_id: i64,
    /// Relationship kind
    pub kind: EdgeKind,
    /// Optional caller-supplied edge properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

// ============================================================================
// TRAVERSAL RESULTS
// ============================================================================

/// A candidate neighbor for edge creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedCandidate {
    pub node: GraphNode,
    /// Concept-overlap score in [0, 1]
    pub overlap: f64,
}

/// Bounded N-hop traversal around a node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighborhood {
    pub center: GraphNode,
    /// Nodes reached within the requested depth, excluding the center
    pub members: Vec<GraphNode>,
    /// Edges traversed to reach the members
    pub relationships: Vec<GraphEdge>,
    /// Depth actually traversed
    pub depth: usize,
}

/// Graph store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: u64,
    pub edge_count: u64,
    pub edges_by_type: HashMap<String, u64>,
    /// Topics of the most connected nodes, most edges first
    pub top_connected: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================
