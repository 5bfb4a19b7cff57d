//! Save Memory Tool
//!
//! Ingest a record through the placement pipeline. The response carries the
//! per-store flags: factual knowledge lands only in the semantic indexes,
//! significant experiences become permanent, the rest enters the recency
//! cache.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::{ForcedRelationship, IngestRequest, MemoryEngine};

/// Input schema for save_memory
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "category": {
                "type": "string",
                "description": "Tentative category (e.g. erlebnisse, faktenwissen, humor, programmieren)"
            },
            "topic": {
                "type": "string",
                "description": "Short label, at most 512 characters"
            },
            "content": {
                "type": "string",
                "description": "Full text of the memory"
            },
            "forcedRelationships": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "targetId": { "type": "integer" },
                        "kind": {
                            "type": "string",
                            "description": "Edge kind, e.g. RELATED_TO"
                        },
                        "properties": { "type": "object" }
                    },
                    "required": ["targetId", "kind"]
                },
                "description": "Caller-asserted edges, created before inferred ones"
            }
        },
        "required": ["category", "topic", "content"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveArgs {
    category: String,
    topic: String,
    content: String,
    #[serde(default)]
    forced_relationships: Vec<ForcedRelationship>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: SaveArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };

    let mut request = IngestRequest::new(args.category, args.topic, args.content);
    request.forced_relationships = args.forced_relationships;

    let outcome = engine.ingest(request).await.map_err(|e| e.to_string())?;
    serde_json::to_value(&outcome).map_err(|e| e.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
