//! Recall Category Tool
//!
//! Newest permanent records of one category.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::{Category, MemoryEngine};

/// Input schema for recall_category
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "category": {
                "type": "string",
                "description": "Category to recall from"
            },
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum records to return (default 20)",
                "default": 20
            }
        },
        "required": ["category"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecallArgs {
    category: String,
    limit: Option<usize>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: RecallArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };
    let category = Category::parse_name(&args.category)
        .ok_or_else(|| format!("Unknown category: {}", args.category))?;

    let records = engine
        .records_by_category(category, args.limit.unwrap_or(20))
        .await
        .map_err(|e| e.to_string())?;

    let total = records.len();
    Ok(serde_json::json!({
        "category": category.as_str(),
        "records": records,
        "totalFound": total,
    }))
}

// ============================================================================
// TESTS
// ============================================================================
