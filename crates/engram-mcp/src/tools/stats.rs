//! Memory Stats Tool
//!
//! Per-category record counts, graph metrics, and recency cache usage.

use serde_json::Value;
use std::sync::Arc;

use engram_core::MemoryEngine;

/// Input schema for memory_stats
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

pub async fn execute(engine: &Arc<MemoryEngine>, _args: Option<Value>) -> Result<Value, String> {
    let stats = engine.stats().await.map_err(|e| e.to_string())?;
    serde_json::to_value(&stats).map_err(|e| e.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
