//! Concept Search Tool
//!
//! Direct similarity search over the vector store. Surfaces concept
//! fragments even when their parent record was never stored permanently.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::MemoryEngine;

use super::parse_categories;

/// Input schema for search_concepts
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search text"
            },
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum concepts to return (default 10)",
                "default": 10
            },
            "categories": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Optional source-category filter"
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptArgs {
    query: String,
    limit: Option<usize>,
    categories: Option<Vec<String>>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: ConceptArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };
    if args.query.trim().is_empty() {
        return Err("Query cannot be empty".to_string());
    }

    let categories = parse_categories(args.categories)?;
    let hits = engine
        .search_concepts(&args.query, args.limit.unwrap_or(10), categories.as_deref())
        .await
        .map_err(|e| e.to_string())?;

    let total = hits.len();
    Ok(serde_json::json!({
        "results": hits,
        "totalFound": total,
    }))
}

// ============================================================================
// TESTS
// ============================================================================
