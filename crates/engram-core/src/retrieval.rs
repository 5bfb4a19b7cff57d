//! Retrieval Pipeline
//!
//! Unified search over the relational, vector, and graph stores. The SQL
//! and vector branches run concurrently with their own timeouts; a branch
//! that fails or times out contributes an empty list and is reported
//! through the response's source counts and strategy field. Vector-only
//! hits are "concept reconstructions": their parent record may already be
//! gone from the relational store, which is an accepted divergence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::analyzer::AnalyzerGateway;
use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind, Result, Stage};
use crate::graph::GraphStore;
use crate::model::{GraphEdge, MemoryRecord};
use crate::policy::Category;
use crate::rerank::{
    self, RerankCandidate, RerankStrategy,
};
use crate::store::RelationalStore;
use crate::vector::{ConceptHit, VectorStore, DEFAULT_VECTOR_K};

/// How many seed records feed graph expansion
const SEED_RECORD_LIMIT: usize = 5;

/// Cap on concept-seed graph lookups
const GRAPH_SEARCH_LIMIT: usize = 20;

// ============================================================================
// REQUESTS
// ============================================================================

/// Intelligent search request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub categories: Option<Vec<Category>>,
    pub enable_rerank: bool,
    /// Rerank strategy; `None` uses the configured default
    pub strategy: Option<RerankStrategy>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            categories: None,
            enable_rerank: true,
            strategy: None,
        }
    }
}

/// Graph-augmented search request
#[derive(Debug, Clone)]
pub struct GraphSearchRequest {
    pub query: String,
    pub categories: Option<Vec<Category>>,
    pub include_related: bool,
    /// Traversal depth, clamped to [1, 3]; `None` uses the configured default
    pub max_depth: Option<usize>,
}

impl GraphSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            categories: None,
            include_related: true,
            max_depth: None,
        }
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Sql,
    Vector,
    Both,
    Graph,
}

/// One search result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub record_id: i64,
    pub category: Category,
    pub topic: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub source: ResultSource,
    /// Vector similarity, present when the vector branch saw this record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Rerank score
    pub score: f64,
    /// Graph connectivity to the seed set, present after graph expansion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_score: Option<f64>,
}

/// Per-branch result count
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BranchCount {
    pub count: usize,
}

/// Source counts in a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCounts {
    pub sql: BranchCount,
    pub vector: BranchCount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<BranchCount>,
}

/// Intelligent search response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub sources: SourceCounts,
    pub reranked: bool,
    /// `hybrid`, `vector_only`, or `sql_only` depending on what the
    /// branches actually contributed
    pub strategy: String,
    pub total_found: usize,
    pub elapsed_ms: u64,
}

/// Traversal summary for graph search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub nodes_traversed: usize,
    pub edge_types: Vec<String>,
}

/// Graph context block in a graph search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphContext {
    pub related_count: usize,
    pub depth: usize,
    pub cluster: ClusterInfo,
}

/// Graph-augmented search response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSearchResponse {
    pub results: Vec<SearchHit>,
    pub sources: SourceCounts,
    pub relationships: Vec<GraphEdge>,
    pub graph_context: GraphContext,
    pub total_found: usize,
    pub elapsed_ms: u64,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Merged fan-out state, kept for graph expansion
struct Merged {
    hits: Vec<SearchHit>,
    sql_records: Vec<MemoryRecord>,
    vector_hits: Vec<ConceptHit>,
    vector_failed: bool,
}

/// The retrieval pipeline over the injected collaborators
pub struct RetrievalPipeline {
    relational: Arc<dyn RelationalStore>,
    vector: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    analyzer: Arc<AnalyzerGateway>,
    config: EngineConfig,
}

impl RetrievalPipeline {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        vector: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        analyzer: Arc<AnalyzerGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            relational,
            vector,
            graph,
            analyzer,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Intelligent search
    // ------------------------------------------------------------------

    pub async fn search_intelligent(&self, request: SearchRequest) -> Result<SearchResponse> {
        let started = std::time::Instant::now();
        let mut merged = self
            .fan_out(&request.query, request.categories.as_deref())
            .await?;

        let reranked = request.enable_rerank && !merged.hits.is_empty();
        if reranked {
            let strategy = request.strategy.unwrap_or(self.config.rerank_default);
            self.rerank_hits(&request.query, &mut merged.hits, strategy, false)
                .await;
        }

        let sql_count = merged.sql_records.len();
        let vector_count = merged.vector_hits.len();
        let strategy = if sql_count == 0 && vector_count > 0 {
            "vector_only"
        } else if merged.vector_failed {
            "sql_only"
        } else {
            "hybrid"
        };

        let total_found = merged.hits.len();
        Ok(SearchResponse {
            results: merged.hits,
            sources: SourceCounts {
                sql: BranchCount { count: sql_count },
                vector: BranchCount {
                    count: vector_count,
                },
                graph: None,
            },
            reranked,
            strategy: strategy.to_string(),
            total_found,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    // ------------------------------------------------------------------
    // Graph-augmented search
    // ------------------------------------------------------------------

    pub async fn search_graph(&self, request: GraphSearchRequest) -> Result<GraphSearchResponse> {
        let started = std::time::Instant::now();
        let depth =
            EngineConfig::clamp_depth(request.max_depth.unwrap_or(self.config.graph_depth_default));

        // Seed set from the unreranked fan-out
        let mut merged = self
            .fan_out(&request.query, request.categories.as_deref())
            .await?;
        let seeds = self.extract_seeds(&merged).await;

        let mut relationships: Vec<GraphEdge> = Vec::new();
        let mut traversed: HashSet<i64> = HashSet::new();
        let mut graph_count = 0usize;
        let mut node_by_record: HashMap<i64, i64> = HashMap::new();

        if request.include_related && !seeds.is_empty() {
            let graph_nodes = match tokio::time::timeout(
                self.config.graph_search_timeout(),
                self.graph.search_by_concepts(&seeds, GRAPH_SEARCH_LIMIT),
            )
            .await
            {
                Ok(Ok(nodes)) => nodes,
                Ok(Err(e)) => {
                    warn!("graph concept search failed: {e}");
                    Vec::new()
                }
                Err(_) => {
                    warn!("graph concept search timed out");
                    Vec::new()
                }
            };

            for node in &graph_nodes {
                node_by_record.insert(node.record_id, node.node_id);
            }

            // Expand around the top seed records
            let seed_ids: Vec<i64> = merged
                .hits
                .iter()
                .take(SEED_RECORD_LIMIT)
                .map(|h| h.record_id)
                .collect();
            for record_id in &seed_ids {
                let Ok(Some(node)) = self.graph.node_for_record(*record_id).await else {
                    continue;
                };
                node_by_record.insert(node.record_id, node.node_id);
                match self.graph.neighborhood(node.node_id, depth, None).await {
                    Ok(neighborhood) => {
                        traversed.insert(neighborhood.center.node_id);
                        for member in &neighborhood.members {
                            traversed.insert(member.node_id);
                            node_by_record.insert(member.record_id, member.node_id);
                        }
                        for edge in neighborhood.relationships {
                            if !relationships.iter().any(|e| {
                                e.from_node == edge.from_node
                                    && e.to_node == edge.to_node
                                    && e.kind == edge.kind
                            }) {
                                relationships.push(edge);
                            }
                        }
                    }
                    Err(e) => debug!(record_id, "neighborhood expansion failed: {e}"),
                }
            }

            // Union graph discoveries into the result set
            let known: HashSet<i64> = merged.hits.iter().map(|h| h.record_id).collect();
            for (record_id, _node_id) in node_by_record.clone() {
                if known.contains(&record_id) {
                    continue;
                }
                graph_count += 1;
                if let Some(hit) = self.reconstruct_from_graph(record_id).await {
                    merged.hits.push(hit);
                }
            }
        }

        // Graph connectivity score: edges into the seed node set
        let seed_nodes: HashSet<i64> = merged
            .hits
            .iter()
            .take(SEED_RECORD_LIMIT)
            .filter_map(|h| node_by_record.get(&h.record_id).copied())
            .collect();
        for hit in &mut merged.hits {
            let Some(node_id) = node_by_record.get(&hit.record_id) else {
                continue;
            };
            let touching: Vec<&GraphEdge> = relationships
                .iter()
                .filter(|e| {
                    (e.from_node == *node_id && seed_nodes.contains(&e.to_node))
                        || (e.to_node == *node_id && seed_nodes.contains(&e.from_node))
                })
                .collect();
            if !touching.is_empty() {
                let strength_sum: f64 = touching.iter().map(|e| e.strength.max(0.1)).sum();
                hit.graph_score = Some((strength_sum / SEED_RECORD_LIMIT as f64).clamp(0.0, 1.0));
            }
        }

        self.rerank_hits(&request.query, &mut merged.hits, RerankStrategy::Hybrid, true)
            .await;

        // Records discovered through the graph or connected into the seed set
        let related_count = merged
            .hits
            .iter()
            .filter(|h| h.graph_score.is_some() || h.source == ResultSource::Graph)
            .count();
        let mut edge_types: Vec<String> = relationships
            .iter()
            .map(|e| e.kind.as_str().to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        edge_types.sort();

        let total_found = merged.hits.len();
        Ok(GraphSearchResponse {
            sources: SourceCounts {
                sql: BranchCount {
                    count: merged.sql_records.len(),
                },
                vector: BranchCount {
                    count: merged.vector_hits.len(),
                },
                graph: Some(BranchCount { count: graph_count }),
            },
            results: merged.hits,
            relationships,
            graph_context: GraphContext {
                related_count,
                depth,
                cluster: ClusterInfo {
                    nodes_traversed: traversed.len(),
                    edge_types,
                },
            },
            total_found,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    // ------------------------------------------------------------------
    // Concept search
    // ------------------------------------------------------------------

    /// Pass-through to the vector store
    pub async fn search_concepts(
        &self,
        query: &str,
        k: usize,
        categories: Option<&[Category]>,
    ) -> Result<Vec<ConceptHit>> {
        self.vector
            .search_similar(query, k, categories)
            .await
            .map_err(|e| EngineError::new(ErrorKind::VectorUnavailable, Stage::Search, e.to_string()))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Concurrent SQL + vector fan-out, merged by record id
    async fn fan_out(&self, query: &str, categories: Option<&[Category]>) -> Result<Merged> {
        let sql_branch = tokio::time::timeout(
            self.config.sql_search_timeout(),
            self.relational.search_basic(query, categories),
        );
        let vector_branch = tokio::time::timeout(
            self.config.vector_search_timeout(),
            self.vector.search_similar(query, DEFAULT_VECTOR_K, categories),
        );

        let (sql_result, vector_result) = tokio::join!(sql_branch, vector_branch);

        let sql_records = match sql_result {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                warn!("sql search branch failed: {e}");
                Vec::new()
            }
            Err(_) => {
                warn!("sql search branch timed out");
                Vec::new()
            }
        };
        let (vector_hits, vector_failed) = match vector_result {
            Ok(Ok(hits)) => (hits, false),
            Ok(Err(e)) => {
                warn!("vector search branch failed: {e}");
                (Vec::new(), true)
            }
            Err(_) => {
                warn!("vector search branch timed out");
                (Vec::new(), true)
            }
        };

        let mut hits: Vec<SearchHit> = Vec::new();
        let mut by_record: HashMap<i64, usize> = HashMap::new();

        for record in &sql_records {
            by_record.insert(record.id, hits.len());
            hits.push(SearchHit {
                record_id: record.id,
                category: record.category,
                topic: record.topic.clone(),
                content: record.content.clone(),
                created_at: record.created_at,
                source: ResultSource::Sql,
                similarity: None,
                score: 0.0,
                graph_score: None,
            });
        }

        for hit in &vector_hits {
            let record_id = hit.concept.source.record_id;
            match by_record.get(&record_id) {
                Some(&index) => {
                    let entry = &mut hits[index];
                    entry.source = ResultSource::Both;
                    entry.similarity = Some(
                        entry
                            .similarity
                            .map_or(hit.similarity, |s| s.max(hit.similarity)),
                    );
                }
                None => {
                    // Concept reconstruction: the parent record may have
                    // been deleted by ingest policy
                    by_record.insert(record_id, hits.len());
                    hits.push(SearchHit {
                        record_id,
                        category: hit.concept.source.category,
                        topic: hit.concept.source.topic.clone(),
                        content: hit.concept.description.clone(),
                        created_at: hit.concept.source.created_at,
                        source: ResultSource::Vector,
                        similarity: Some(hit.similarity),
                        score: 0.0,
                        graph_score: None,
                    });
                }
            }
        }

        Ok(Merged {
            hits,
            sql_records,
            vector_hits,
            vector_failed,
        })
    }

    /// Score and reorder hits in place
    async fn rerank_hits(
        &self,
        query: &str,
        hits: &mut Vec<SearchHit>,
        strategy: RerankStrategy,
        graph_weighted: bool,
    ) {
        if hits.is_empty() {
            return;
        }
        let now = Utc::now();
        let candidates: Vec<RerankCandidate> = hits
            .iter()
            .map(|h| RerankCandidate {
                text: format!("{} {}", h.topic, h.content),
                similarity: h.similarity,
                created_at: h.created_at,
                graph_score: h.graph_score,
            })
            .collect();

        let scores = if graph_weighted {
            rerank::graph_hybrid_scores(query, &candidates, now)
        } else {
            match strategy {
                RerankStrategy::Text => rerank::text_scores(query, &candidates),
                RerankStrategy::Hybrid => rerank::hybrid_scores(query, &candidates, now),
                RerankStrategy::Llm => {
                    let texts: Vec<String> =
                        candidates.iter().map(|c| c.text.clone()).collect();
                    match self.analyzer.rank_results(query, &texts).await {
                        Ok(scores) if scores.len() == candidates.len() => scores,
                        Ok(_) | Err(_) => {
                            debug!("llm rerank unavailable, falling back to text scoring");
                            rerank::text_scores(query, &candidates)
                        }
                    }
                }
            }
        };

        for (hit, score) in hits.iter_mut().zip(&scores) {
            hit.score = *score;
        }

        let created: Vec<DateTime<Utc>> = hits.iter().map(|h| h.created_at).collect();
        let ids: Vec<i64> = hits.iter().map(|h| h.record_id).collect();
        let order = rerank::rank_order(&scores, &created, &ids);
        let mut reordered = Vec::with_capacity(hits.len());
        let mut taken: Vec<Option<SearchHit>> = hits.drain(..).map(Some).collect();
        for index in order {
            if let Some(hit) = taken[index].take() {
                reordered.push(hit);
            }
        }
        *hits = reordered;
    }

    /// Seed concepts: titles and keywords of the top vector hits plus the
    /// graph-node concept lists (or topic tokens) of the top SQL hits
    async fn extract_seeds(&self, merged: &Merged) -> Vec<String> {
        let mut seeds: Vec<String> = Vec::new();

        for hit in merged.vector_hits.iter().take(SEED_RECORD_LIMIT) {
            seeds.push(hit.concept.title.clone());
            seeds.extend(hit.concept.keywords.iter().cloned());
        }

        for record in merged.sql_records.iter().take(SEED_RECORD_LIMIT) {
            match self.graph.node_for_record(record.id).await {
                Ok(Some(node)) => seeds.extend(node.concepts),
                _ => seeds.extend(
                    record
                        .topic
                        .split_whitespace()
                        .map(|t| t.to_string()),
                ),
            }
        }

        seeds.iter_mut().for_each(|s| *s = s.trim().to_lowercase());
        seeds.retain(|s| !s.is_empty());
        seeds.sort();
        seeds.dedup();
        seeds
    }

    /// Build a graph-only hit, preferring the live relational row
    async fn reconstruct_from_graph(&self, record_id: i64) -> Option<SearchHit> {
        match self.relational.get(record_id).await {
            Ok(Some(record)) => Some(SearchHit {
                record_id: record.id,
                category: record.category,
                topic: record.topic,
                content: record.content,
                created_at: record.created_at,
                source: ResultSource::Graph,
                similarity: None,
                score: 0.0,
                graph_score: None,
            }),
            Ok(None) => {
                let node = self.graph.node_for_record(record_id).await.ok().flatten()?;
                Some(SearchHit {
                    record_id,
                    category: node.category,
                    topic: node.topic,
                    content: String::new(),
                    created_at: Utc::now(),
                    source: ResultSource::Graph,
                    similarity: None,
                    score: 0.0,
                    graph_score: None,
                })
            }
            Err(e) => {
                debug!(record_id, "graph reconstruction lookup failed: {e}");
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
