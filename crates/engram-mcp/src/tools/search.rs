//! Intelligent Search Tool
//!
//! Concurrent SQL + vector fan-out with reranking.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::{MemoryEngine, RerankStrategy, SearchRequest};

use super::parse_categories;

/// Input schema for search_intelligent
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
            "enableRerank": {
                "type": "boolean",
                "description": "Rerank merged results (default true)",
                "default": true
            },
            "strategy": {
                "type": "string",
                "enum": ["hybrid", "text", "llm"],
                "description": "Rerank strategy (default hybrid)",
                "default": "hybrid"
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query: String,
    categories: Option<Vec<String>>,
    enable_rerank: Option<bool>,
    strategy: Option<String>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: SearchArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };
    if args.query.trim().is_empty() {
        return Err("Query cannot be empty".to_string());
    }

    let strategy = match args.strategy.as_deref() {
        None => None,
        Some(raw) => Some(
            RerankStrategy::parse_name(raw)
                .ok_or_else(|| format!("Unknown rerank strategy: {raw}"))?,
        ),
    };

    let request = SearchRequest {
        query: args.query,
        categories: parse_categories(args.categories)?,
        enable_rerank: args.enable_rerank.unwrap_or(true),
        strategy,
    };

    let response = engine
        .search_intelligent(request)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::to_value(&response).map_err(|e| e.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
