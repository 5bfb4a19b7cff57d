//! Recent Memories Tool
//!
//! The newest permanent records plus the recency cache contents.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use engram_core::MemoryEngine;

/// Input schema for recent_memories
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum permanent records to return (default 10)",
                "default": 10
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentArgs {
    limit: Option<usize>,
}

pub async fn execute(engine: &Arc<MemoryEngine>, args: Option<Value>) -> Result<Value, String> {
    let args: RecentArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => RecentArgs { limit: None },
    };

    let permanent = engine
        .recent_records(args.limit.unwrap_or(10))
        .await
        .map_err(|e| e.to_string())?;
    let recency = engine.recency_slots();

    Ok(serde_json::json!({
        "permanent": permanent,
        "recencyCache": recency,
    }))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_memory, test_engine, ScriptedBehavior};
    use engram_core::AnalyzedType;

    #[tokio::test]
    async fn test_recent_splits_permanent_and_cache() {
        let (engine, _dir) = test_engine(ScriptedBehavior::subjective(
            AnalyzedType::Erlebnisse,
            false,
        ));
        seed_memory(&engine, "erlebnisse", "routine walk", "walked around the block").await;

        let value = execute(&engine, None).await.unwrap();
        // Insignificant record: cached, not permanent
        assert!(value["permanent"].as_array().unwrap().is_empty());
        let cache = value["recencyCache"].as_array().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache[0]["topic"], "routine walk");
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let (engine, _dir) = test_engine(ScriptedBehavior::subjective(
            AnalyzedType::Erlebnisse,
            true,
        ));
        for i in 0..5 {
            seed_memory(&engine, "erlebnisse", &format!("milestone {i}"), "a first").await;
        }

        let args = serde_json::json!({ "limit": 2 });
        let value = execute(&engine, Some(args)).await.unwrap();
        assert_eq!(value["permanent"].as_array().unwrap().len(), 2);
    }
}
