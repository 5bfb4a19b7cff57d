//! Ingestion Pipeline
//!
//! The state machine deciding where each record lives:
//! `Received → Persisted(tentative) → Analyzed → Judged → Placed → Indexed →
//! Linked → Finalized`.
//!
//! Placement invariants:
//! - a record is never both permanent and in the recency cache
//! - factual types (faktenwissen, prozedurales_wissen) are never permanent
//!   and never cached; their concepts live only in the semantic indexes
//! - subjective types are permanent iff judged significant, cached otherwise
//! - concepts are indexed for every successfully analyzed ingest, and
//!   deleting the tentative relational row never rolls the indexes back
//!
//! Only two failures abort an ingest: the relational insert and the
//! analyzer. Everything downstream degrades into response flags.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::analyzer::AnalyzerGateway;
use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind, Result, Stage};
use crate::graph::GraphStore;
use crate::model::{Concept, ConceptDraft, ForcedRelationship, MemoryRecord};
use crate::policy::{AnalyzedType, Category};
use crate::recency::RecencyCache;
use crate::store::RelationalStore;
use crate::vector::VectorStore;

/// Maximum topic length in characters
const MAX_TOPIC_LEN: usize = 512;

// ============================================================================
// REQUEST / OUTCOME
// ============================================================================

/// An ingest request
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Tentative category supplied by the caller
    pub category: String,
    pub topic: String,
    pub content: String,
    /// Caller-asserted relationships, created before inferred edges
    pub forced_relationships: Vec<ForcedRelationship>,
    /// Optional request deadline; on expiry partially-applied state is
    /// accepted and reported through the flags
    pub deadline: Option<Instant>,
}

impl IngestRequest {
    pub fn new(
        category: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            topic: topic.into(),
            content: content.into(),
            forced_relationships: Vec::new(),
            deadline: None,
        }
    }
}

/// The ingest response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub success: bool,
    /// Relational id after finalize; 0 when not permanent
    pub memory_id: i64,
    pub stored_in_permanent: bool,
    pub stored_in_vector: bool,
    pub stored_in_graph: bool,
    pub stored_in_recency: bool,
    /// Inferred edges actually created plus accepted forced edges
    pub relationships_created: usize,
    /// First concept's analyzed type, or the caller category when the
    /// analyzer extracted nothing
    pub analyzed_category: String,
    pub significance_reason: String,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// The ingestion pipeline over the injected collaborators
pub struct IngestPipeline {
    relational: Arc<dyn RelationalStore>,
    recency: Arc<RecencyCache>,
    vector: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    analyzer: Arc<AnalyzerGateway>,
    config: EngineConfig,
}

/// Placement decision for one record
#[derive(Debug)]
struct Placement {
    keep_permanent: bool,
    recency_eligible: bool,
    reason: String,
}

impl IngestPipeline {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        recency: Arc<RecencyCache>,
        vector: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        analyzer: Arc<AnalyzerGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            relational,
            recency,
            vector,
            graph,
            analyzer,
            config,
        }
    }

    /// Run one record through the full state machine
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        let category = self.validate(&request)?;

        // Persist tentative: the only fatal store interaction
        let id = self
            .relational
            .insert(
                category,
                request.topic.trim(),
                &request.content,
                chrono::Utc::now().date_naive(),
            )
            .await
            .map_err(|e| e.into_engine(Stage::Persist))?;
        debug!(record_id = id, "tentative row persisted");

        let record = self
            .relational
            .get(id)
            .await
            .map_err(|e| e.into_engine(Stage::Persist))?
            .ok_or_else(|| {
                EngineError::new(
                    ErrorKind::Internal,
                    Stage::Persist,
                    format!("tentative row {id} vanished"),
                )
            })?;

        // Analyze; failure deletes the tentative row and aborts
        let drafts = match self.analyze(&record, request.deadline).await {
            Ok(drafts) => drafts,
            Err(e) => {
                self.delete_tentative(id).await;
                return Err(e);
            }
        };

        // Route on the first concept's type; empty analysis falls back to
        // the caller category and skips placement entirely
        let analyzed_type = drafts.first().map(|d| d.analyzed_type);
        let analyzed_category = analyzed_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| category.as_str().to_string());

        let placement = self.judge(&record, analyzed_type, request.deadline).await;

        let concepts: Vec<Concept> = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| Concept::from_draft(draft, &record, index))
            .collect();

        // Index and link are independent; run them concurrently
        let (stored_in_vector, (stored_in_graph, relationships_created)) = tokio::join!(
            self.index_concepts(&record, &concepts, request.deadline),
            self.link_graph(
                &record,
                &concepts,
                placement.keep_permanent,
                &request.forced_relationships,
                request.deadline,
            ),
        );

        // Finalize is total: relocate when permanent, delete otherwise
        let memory_id = if placement.keep_permanent {
            if let Some(analyzed_type) = analyzed_type {
                let mapped = analyzed_type.storage_category();
                if mapped != category {
                    match self.relational.relocate(id, mapped).await {
                        Ok(_) => debug!(record_id = id, from = %category, to = %mapped, "relocated"),
                        Err(e) => warn!(record_id = id, "relocate failed: {e}"),
                    }
                }
            }
            id
        } else {
            self.relational
                .delete(id)
                .await
                .map_err(|e| e.into_engine(Stage::Finalize))?;
            0
        };

        // Recency only for judged-insignificant subjective records
        let stored_in_recency = placement.recency_eligible && self.recency.append(&record);

        Ok(IngestOutcome {
            success: true,
            memory_id,
            stored_in_permanent: placement.keep_permanent,
            stored_in_vector,
            stored_in_graph,
            stored_in_recency,
            relationships_created,
            analyzed_category,
            significance_reason: placement.reason,
        })
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    fn validate(&self, request: &IngestRequest) -> Result<Category> {
        let category = Category::parse_name(&request.category).ok_or_else(|| {
            EngineError::invalid_input(
                Stage::Validate,
                format!("unknown category: {}", request.category),
            )
        })?;
        if request.topic.trim().is_empty() {
            return Err(EngineError::invalid_input(Stage::Validate, "empty topic"));
        }
        if request.topic.chars().count() > MAX_TOPIC_LEN {
            return Err(EngineError::invalid_input(
                Stage::Validate,
                format!("topic longer than {MAX_TOPIC_LEN} chars"),
            ));
        }
        if request.content.trim().is_empty() {
            return Err(EngineError::invalid_input(Stage::Validate, "empty content"));
        }
        Ok(category)
    }

    async fn analyze(
        &self,
        record: &MemoryRecord,
        deadline: Option<Instant>,
    ) -> Result<Vec<ConceptDraft>> {
        match with_deadline(deadline, self.analyzer.extract_and_analyze(record)).await {
            Some(Ok(drafts)) => Ok(drafts),
            Some(Err(e)) => Err(e.into_engine(Stage::Analyze)),
            None => Err(EngineError::new(
                ErrorKind::Timeout,
                Stage::Analyze,
                "analysis exceeded the request deadline",
            )),
        }
    }

    /// The placement decision. Factual types are decided by policy alone;
    /// subjective types ask the analyzer, with the not-significant default
    /// when the judgment itself fails.
    async fn judge(
        &self,
        record: &MemoryRecord,
        analyzed_type: Option<AnalyzedType>,
        deadline: Option<Instant>,
    ) -> Placement {
        let Some(analyzed_type) = analyzed_type else {
            return Placement {
                keep_permanent: false,
                recency_eligible: false,
                reason: "no concepts extracted".to_string(),
            };
        };

        if analyzed_type.is_factual() {
            return Placement {
                keep_permanent: false,
                recency_eligible: false,
                reason: "type never stored permanently".to_string(),
            };
        }

        match with_deadline(
            deadline,
            self.analyzer.judge_significance(record, analyzed_type),
        )
        .await
        {
            Some(Ok(judgment)) => Placement {
                keep_permanent: judgment.significant,
                recency_eligible: !judgment.significant,
                reason: judgment.reason,
            },
            Some(Err(e)) => {
                warn!(record_id = record.id, "significance judgment failed: {e}");
                Placement {
                    keep_permanent: false,
                    recency_eligible: true,
                    reason: format!("significance judgment unavailable: {e}"),
                }
            }
            None => Placement {
                keep_permanent: false,
                recency_eligible: true,
                reason: "significance judgment exceeded the request deadline".to_string(),
            },
        }
    }

    async fn index_concepts(
        &self,
        record: &MemoryRecord,
        concepts: &[Concept],
        deadline: Option<Instant>,
    ) -> bool {
        if concepts.is_empty() {
            return false;
        }
        match with_deadline(deadline, self.vector.store_concepts(record, concepts)).await {
            Some(Ok(report)) => {
                if !report.errors.is_empty() {
                    warn!(
                        record_id = record.id,
                        stored = report.count_stored,
                        "concept write errors: {:?}",
                        report.errors
                    );
                }
                report.count_stored > 0
            }
            Some(Err(e)) => {
                warn!(record_id = record.id, "vector store failed: {e}");
                false
            }
            None => {
                warn!(record_id = record.id, "vector write exceeded the request deadline");
                false
            }
        }
    }

    /// Upsert the node and create edges. Forced relationships come first so
    /// their properties win on conflict; then the strongest applicable
    /// inferred edge per neighbor.
    async fn link_graph(
        &self,
        record: &MemoryRecord,
        concepts: &[Concept],
        keep_permanent: bool,
        forced: &[ForcedRelationship],
        deadline: Option<Instant>,
    ) -> (bool, usize) {
        if !keep_permanent && concepts.is_empty() {
            return (false, 0);
        }

        let mut seeds: Vec<String> = concepts.iter().flat_map(|c| c.relation_seeds()).collect();
        seeds.sort();
        seeds.dedup();

        let node = match with_deadline(deadline, self.graph.upsert_node(record, &seeds)).await {
            Some(Ok(node)) => node,
            Some(Err(e)) => {
                warn!(record_id = record.id, "graph upsert failed: {e}");
                return (false, 0);
            }
            None => {
                warn!(record_id = record.id, "graph write exceeded the request deadline");
                return (false, 0);
            }
        };

        let mut created = 0usize;

        for relation in forced {
            let target = match self.graph.node_for_record(relation.target_id).await {
                Ok(Some(target)) => target,
                Ok(None) => {
                    warn!(
                        record_id = record.id,
                        target = relation.target_id,
                        "forced relationship target unknown, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(record_id = record.id, "forced relationship lookup failed: {e}");
                    continue;
                }
            };
            match self
                .graph
                .link(
                    node,
                    target.node_id,
                    relation.kind,
                    1.0,
                    relation.properties.clone(),
                )
                .await
            {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => warn!(record_id = record.id, "forced link failed: {e}"),
            }
        }

        let neighbors = match self.graph.find_related(record, &seeds).await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(record_id = record.id, "find_related failed: {e}");
                return (true, created);
            }
        };

        for neighbor in &neighbors {
            let kind = if neighbor.overlap > self.config.high_similarity_threshold {
                crate::model::EdgeKind::HighlySimilar
            } else {
                crate::model::EdgeKind::ConceptSimilar
            };
            if let Ok(true) = self
                .graph
                .link(node, neighbor.node.node_id, kind, neighbor.overlap, None)
                .await
            {
                created += 1;
            }
            if neighbor.node.category == record.category {
                if let Ok(true) = self
                    .graph
                    .link(
                        node,
                        neighbor.node.node_id,
                        crate::model::EdgeKind::SameCategory,
                        neighbor.overlap,
                        None,
                    )
                    .await
                {
                    created += 1;
                }
            }
            if neighbor.node.date == record.date {
                if let Ok(true) = self
                    .graph
                    .link(
                        node,
                        neighbor.node.node_id,
                        crate::model::EdgeKind::TemporalAdjacent,
                        neighbor.overlap,
                        None,
                    )
                    .await
                {
                    created += 1;
                }
            }
        }

        (true, created)
    }

    /// Best-effort removal of the tentative row after an analyzer failure
    async fn delete_tentative(&self, id: i64) {
        if let Err(e) = self.relational.delete(id).await {
            warn!(record_id = id, "failed to delete tentative row: {e}");
        }
    }
}

/// Run a future against an optional deadline; `None` on expiry
async fn with_deadline<T>(
    deadline: Option<Instant>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if deadline <= now {
                return None;
            }
            tokio::time::timeout(deadline - now, fut).await.ok()
        }
        None => Some(fut.await),
    }
}

// ============================================================================
// TESTS
// ============================================================================
