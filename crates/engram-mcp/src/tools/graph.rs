//! Graph Search Tool
//!
//! Intelligent search seeded into bounded graph expansion.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::{GraphSearchRequest, MemoryEngine};

use super::parse_categories;

/// Input schema for search_graph
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search text"
            },
            "categories": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Optional category filter"
            },
            "includeRelated": {
                "type": "boolean",
                "description": "Expand the seed set through the graph (default true)",
                "default": true
            },
            "maxDepth": {
                "type": "integer",
                "minimum": 1,
                "maximum": 3,
                "description": "Traversal depth (default 2)",
                "default": 2
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphArgs {
    query: String,
    categories: Option<Vec<String>>,
    include_related: Option<bool>,
    max_depth: Option<usize>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: GraphArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };
    if args.query.trim().is_empty() {
        return Err("Query cannot be empty".to_string());
    }

    let request = GraphSearchRequest {
        query: args.query,
        categories: parse_categories(args.categories)?,
        include_related: args.include_related.unwrap_or(true),
        max_depth: args.max_depth,
    };

    let response = engine.search_graph(request).await.map_err(|e| e.to_string())?;
    serde_json::to_value(&response).map_err(|e| e.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
