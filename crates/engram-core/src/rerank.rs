//! Result Reranking
//!
//! Scoring for the retrieval pipeline: token-overlap text scoring with a
//! length-normalized BM25-lite term, weighted hybrid combination with a
//! recency-decay term, and the graph-augmented weighting used by graph
//! search. Sorting is stable; ties break on newer `created_at`, then
//! higher id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// STRATEGY
// ============================================================================

/// Rerank strategy for intelligent search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankStrategy {
    /// Weighted text + vector similarity + recency decay
    #[default]
    Hybrid,
    /// Token overlap only
    Text,
    /// Analyzer-scored relevance, falling back to text on failure
    Llm,
}

impl RerankStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankStrategy::Hybrid => "hybrid",
            RerankStrategy::Text => "text",
            RerankStrategy::Llm => "llm",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hybrid" => Some(RerankStrategy::Hybrid),
            "text" => Some(RerankStrategy::Text),
            "llm" => Some(RerankStrategy::Llm),
            _ => None,
        }
    }
}

// ============================================================================
// WEIGHTS
// ============================================================================

/// Hybrid weights: text / vector / recency
pub const HYBRID_TEXT_WEIGHT: f64 = 0.4;
pub const HYBRID_VECTOR_WEIGHT: f64 = 0.4;
pub const HYBRID_RECENCY_WEIGHT: f64 = 0.2;

/// Graph-augmented weights: text / vector / recency / graph
pub const GRAPH_TEXT_WEIGHT: f64 = 0.3;
pub const GRAPH_VECTOR_WEIGHT: f64 = 0.3;
pub const GRAPH_RECENCY_WEIGHT: f64 = 0.2;
pub const GRAPH_GRAPH_WEIGHT: f64 = 0.2;

/// Recency half-life in days for the decay term
const RECENCY_HALF_LIFE_DAYS: f64 = 30.0;

/// BM25-lite saturation and length-normalization parameters
const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

// ============================================================================
// CANDIDATE
// ============================================================================

/// One candidate as seen by the scorers
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    /// Topic and content joined
    pub text: String,
    /// Vector similarity, when the candidate came through the vector branch
    pub similarity: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Graph connectivity score, when graph expansion ran
    pub graph_score: Option<f64>,
}

// ============================================================================
// SCORING
// ============================================================================

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Token-overlap Jaccard between query and document
fn jaccard(query: &[String], doc: &[String]) -> f64 {
    let q: HashSet<&str> = query.iter().map(|s| s.as_str()).collect();
    let d: HashSet<&str> = doc.iter().map(|s| s.as_str()).collect();
    if q.is_empty() || d.is_empty() {
        return 0.0;
    }
    let shared = q.intersection(&d).count();
    let union = q.union(&d).count();
    shared as f64 / union as f64
}

/// Length-normalized BM25-lite without corpus idf
fn bm25_lite(query: &[String], doc: &[String], avg_doc_len: f64) -> f64 {
    let unique_terms: HashSet<&str> = query.iter().map(|s| s.as_str()).collect();
    if unique_terms.is_empty() || doc.is_empty() {
        return 0.0;
    }
    let dl = doc.len() as f64;
    let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avg_doc_len.max(1.0));

    let mut score = 0.0;
    for term in &unique_terms {
        let tf = doc.iter().filter(|t| t.as_str() == *term).count() as f64;
        if tf > 0.0 {
            score += tf / (tf + norm);
        }
    }
    score / unique_terms.len() as f64
}

/// Exponential recency decay over `created_at`
pub fn recency_decay(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    0.5f64.powf(age_days / RECENCY_HALF_LIFE_DAYS)
}

/// Text scores for all candidates: Jaccard plus BM25-lite, averaged
pub fn text_scores(query: &str, candidates: &[RerankCandidate]) -> Vec<f64> {
    let query_tokens = tokenize(query);
    let docs: Vec<Vec<String>> = candidates.iter().map(|c| tokenize(&c.text)).collect();
    let avg_doc_len = if docs.is_empty() {
        0.0
    } else {
        docs.iter().map(|d| d.len() as f64).sum::<f64>() / docs.len() as f64
    };

    docs.iter()
        .map(|doc| {
            let j = jaccard(&query_tokens, doc);
            let b = bm25_lite(&query_tokens, doc, avg_doc_len);
            (j + b) / 2.0
        })
        .collect()
}

/// Hybrid scores: weighted text + vector similarity + recency decay
pub fn hybrid_scores(query: &str, candidates: &[RerankCandidate], now: DateTime<Utc>) -> Vec<f64> {
    let text = text_scores(query, candidates);
    candidates
        .iter()
        .zip(text)
        .map(|(c, t)| {
            HYBRID_TEXT_WEIGHT * t
                + HYBRID_VECTOR_WEIGHT * c.similarity.unwrap_or(0.0)
                + HYBRID_RECENCY_WEIGHT * recency_decay(c.created_at, now)
        })
        .collect()
}

/// Graph-augmented hybrid scores: hybrid reweighted with the graph term
pub fn graph_hybrid_scores(
    query: &str,
    candidates: &[RerankCandidate],
    now: DateTime<Utc>,
) -> Vec<f64> {
    let text = text_scores(query, candidates);
    candidates
        .iter()
        .zip(text)
        .map(|(c, t)| {
            GRAPH_TEXT_WEIGHT * t
                + GRAPH_VECTOR_WEIGHT * c.similarity.unwrap_or(0.0)
                + GRAPH_RECENCY_WEIGHT * recency_decay(c.created_at, now)
                + GRAPH_GRAPH_WEIGHT * c.graph_score.unwrap_or(0.0).clamp(0.0, 1.0)
        })
        .collect()
}

/// Sort index order for scored candidates: score descending, ties broken by
/// newer `created_at`, then higher id. The sort is stable.
pub fn rank_order(scores: &[f64], created_at: &[DateTime<Utc>], ids: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| created_at[b].cmp(&created_at[a]))
            .then_with(|| ids[b].cmp(&ids[a]))
    });
    order
}

// ============================================================================
// TESTS
// ============================================================================
