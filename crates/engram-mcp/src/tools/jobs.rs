//! Batch Analysis Tools
//!
//! `batch_analyze` queues stored records for re-analysis and runs the job in
//! the background; `job_status` polls progress and collected results.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use engram_core::MemoryEngine;

/// Input schema for batch_analyze
pub fn batch_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "recordIds": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "Record ids to analyze"
            },
            "jobType": {
                "type": "string",
                "description": "Job label (default batch_analysis)",
                "default": "batch_analysis"
            }
        },
        "required": ["recordIds"]
    })
}

/// Input schema for job_status
pub fn status_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "jobId": {
                "type": "string",
                "description": "Id returned by batch_analyze"
            }
        },
        "required": ["jobId"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchArgs {
    record_ids: Vec<i64>,
    job_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusArgs {
    job_id: String,
}

pub async fn execute_batch(
    engine: &Arc<MemoryEngine>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: BatchArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };
    if args.record_ids.is_empty() {
        return Err("recordIds cannot be empty".to_string());
    }

    let job = engine
        .create_analysis_job(
            args.job_type.as_deref().unwrap_or("batch_analysis"),
            &args.record_ids,
        )
        .await
        .map_err(|e| e.to_string())?;

    // Run in the background; the caller polls with job_status
    let job_id = job.id.clone();
    let engine = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.run_analysis_job(&job_id).await {
            warn!(%job_id, "batch analysis failed: {e}");
        }
    });

    serde_json::to_value(&job).map_err(|e| e.to_string())
}

pub async fn execute_status(
    engine: &Arc<MemoryEngine>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: StatusArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };

    let job = engine
        .job_status(&args.job_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Unknown job: {}", args.job_id))?;
    let results = engine
        .job_results(&args.job_id)
        .await
        .map_err(|e| e.to_string())?;

    Ok(serde_json::json!({
        "job": job,
        "results": results,
    }))
}

// ============================================================================
// TESTS
// ============================================================================
