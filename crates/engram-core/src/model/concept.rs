//! Concepts - semantic fragments produced by the analyzer
//!
//! A concept is the unit stored in the vector index. The analyzer produces
//! drafts; the ingestion pipeline enriches them with back-pointer metadata
//! from the parent record before they are embedded and persisted. Concepts
//! outlive their parent record: deleting the relational row does not remove
//! the indexed fragments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{AnalyzedType, Category};
use crate::model::MemoryRecord;

// ============================================================================
// MOOD
// ============================================================================

/// Emotional tone the analyzer assigns to a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Negative => "negative",
        }
    }

    /// Parse a mood label; unknown labels read as neutral
    pub fn parse_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => Mood::Positive,
            "negative" => Mood::Negative,
            _ => Mood::Neutral,
        }
    }
}

// ============================================================================
// CONCEPT DRAFT
// ============================================================================

/// A concept as returned by the analyzer, before enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDraft {
    /// Short concept title
    pub title: String,
    /// 2-3 self-contained sentences; this is what gets embedded
    pub description: String,
    /// Semantic class of the concept
    pub analyzed_type: AnalyzedType,
    /// Classification confidence in [0, 1]
    pub confidence: f64,
    /// Emotional tone
    pub mood: Mood,
    /// 3-5 keywords
    pub keywords: Vec<String>,
    /// 2-4 extracted concept labels
    pub extracted_concepts: Vec<String>,
}

// ============================================================================
// CONCEPT
// ============================================================================

/// Back-pointer metadata copied from the parent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSource {
    pub record_id: i64,
    pub category: Category,
    pub topic: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// An enriched concept, ready for the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Derived id: `record_id:index`
    pub id: String,
    pub title: String,
    pub description: String,
    pub analyzed_type: AnalyzedType,
    pub confidence: f64,
    pub mood: Mood,
    pub keywords: Vec<String>,
    pub extracted_concepts: Vec<String>,
    /// Where this concept came from
    pub source: ConceptSource,
}

impl Concept {
    /// Enrich a draft with the parent record's back-pointer metadata
    pub fn from_draft(draft: ConceptDraft, record: &MemoryRecord, index: usize) -> Self {
        Self {
            id: format!("{}:{}", record.id, index),
            title: draft.title,
            description: draft.description,
            analyzed_type: draft.analyzed_type,
            confidence: draft.confidence.clamp(0.0, 1.0),
            mood: draft.mood,
            keywords: draft.keywords,
            extracted_concepts: draft.extracted_concepts,
            source: ConceptSource {
                record_id: record.id,
                category: record.category,
                topic: record.topic.clone(),
                date: record.date,
                created_at: record.created_at,
            },
        }
    }

    /// Title, keywords, and extracted concept labels, deduplicated.
    /// These seed graph-node relations.
    pub fn relation_seeds(&self) -> Vec<String> {
        let mut seeds = vec![self.title.clone()];
        seeds.extend(self.keywords.iter().cloned());
        seeds.extend(self.extracted_concepts.iter().cloned());
        seeds.iter_mut().for_each(|s| *s = s.trim().to_lowercase());
        seeds.retain(|s| !s.is_empty());
        seeds.sort();
        seeds.dedup();
        seeds
    }
}

// ============================================================================
// SIGNIFICANCE
// ============================================================================

/// Boolean significance judgment for non-factual records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificanceJudgment {
    pub significant: bool,
    pub reason: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_record() -> MemoryRecord {
        MemoryRecord {
            id: 42,
            category: Category::Erlebnisse,
            topic: "Graph basics".to_string(),
            content: "Learned about typed edges today.".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn sample_draft() -> ConceptDraft {
        ConceptDraft {
            title: "Typed Edges".to_string(),
            description: "Edges carry a relationship kind. Kinds drive traversal.".to_string(),
            analyzed_type: AnalyzedType::Erlebnisse,
            confidence: 0.9,
            mood: Mood::Positive,
            keywords: vec!["edges".to_string(), "graph".to_string(), "types".to_string()],
            extracted_concepts: vec!["typed edges".to_string(), "traversal".to_string()],
        }
    }

    #[test]
    fn test_concept_id_is_record_and_index() {
        let concept = Concept::from_draft(sample_draft(), &sample_record(), 0);
        assert_eq!(concept.id, "42:0");
        assert_eq!(concept.source.record_id, 42);
        assert_eq!(concept.source.topic, "Graph basics");
    }

    #[test]
    fn test_from_draft_clamps_confidence() {
        let mut draft = sample_draft();
        draft.confidence = 1.7;
        let concept = Concept::from_draft(draft, &sample_record(), 1);
        assert_eq!(concept.confidence, 1.0);
    }

    #[test]
    fn test_relation_seeds_dedupe_and_normalize() {
        let mut draft = sample_draft();
        draft.keywords.push("Typed Edges".to_string());
        let concept = Concept::from_draft(draft, &sample_record(), 0);
        let seeds = concept.relation_seeds();
        assert_eq!(
            seeds.iter().filter(|s| s.as_str() == "typed edges").count(),
            1
        );
        assert!(seeds.iter().all(|s| s.chars().all(|c| !c.is_uppercase())));
    }

    #[test]
    fn test_mood_parse_defaults_to_neutral() {
        assert_eq!(Mood::parse_name("POSITIVE"), Mood::Positive);
        assert_eq!(Mood::parse_name("weird"), Mood::Neutral);
    }
}
