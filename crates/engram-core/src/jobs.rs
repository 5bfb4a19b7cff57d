//! Batch Analysis Jobs
//!
//! Persisted job queue over `analysis_jobs` / `analysis_results`. A job is a
//! list of record ids fed through the analyzer gateway; progress counters
//! are updated per record so callers can poll.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer::AnalyzerGateway;
use crate::error::{EngineError, ErrorKind, Stage, StoreError};
use crate::store::{format_timestamp, parse_timestamp, RelationalStore, SqliteStore};

// ============================================================================
// TYPES
// ============================================================================

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// A batch analysis job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: String,
    pub status: JobStatus,
    pub job_type: String,
    pub record_ids: Vec<i64>,
    pub progress_current: usize,
    pub progress_total: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One per-record analysis result row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultRecord {
    pub id: i64,
    pub job_id: String,
    pub record_id: i64,
    pub analyzed_type: String,
    pub confidence: f64,
    pub extracted_concepts: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// JOB STORE
// ============================================================================

/// Persistence contract for analysis jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job_type: &str, record_ids: &[i64])
        -> Result<AnalysisJob, StoreError>;
    async fn get_job(&self, id: &str) -> Result<Option<AnalysisJob>, StoreError>;
    async fn mark_running(&self, id: &str) -> Result<(), StoreError>;
    async fn update_progress(&self, id: &str, current: usize) -> Result<(), StoreError>;
    async fn mark_completed(&self, id: &str) -> Result<(), StoreError>;
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError>;
    async fn insert_result(
        &self,
        job_id: &str,
        record_id: i64,
        analyzed_type: &str,
        confidence: f64,
        extracted_concepts: &[String],
        metadata: serde_json::Value,
    ) -> Result<i64, StoreError>;
    async fn results_for_job(&self, job_id: &str)
        -> Result<Vec<AnalysisResultRecord>, StoreError>;
}

fn map_job(row: &Row<'_>) -> rusqlite::Result<AnalysisJob> {
    let status_raw: String = row.get("status")?;
    let record_ids_json: String = row.get("record_ids_json")?;
    let created_raw: String = row.get("created_at")?;
    let started_raw: Option<String> = row.get("started_at")?;
    let completed_raw: Option<String> = row.get("completed_at")?;

    Ok(AnalysisJob {
        id: row.get("id")?,
        status: JobStatus::parse_name(&status_raw).unwrap_or(JobStatus::Failed),
        job_type: row.get("job_type")?,
        record_ids: serde_json::from_str(&record_ids_json).unwrap_or_default(),
        progress_current: row.get::<_, i64>("progress_current")? as usize,
        progress_total: row.get::<_, i64>("progress_total")? as usize,
        created_at: parse_timestamp(&created_raw)?,
        started_at: started_raw.as_deref().map(parse_timestamp).transpose()?,
        completed_at: completed_raw.as_deref().map(parse_timestamp).transpose()?,
        error_message: row.get("error_message")?,
    })
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn create_job(
        &self,
        job_type: &str,
        record_ids: &[i64],
    ) -> Result<AnalysisJob, StoreError> {
        let job = AnalysisJob {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            job_type: job_type.to_string(),
            record_ids: record_ids.to_vec(),
            progress_current: 0,
            progress_total: record_ids.len(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        };

        let conn = self.writer();
        conn.execute(
            "INSERT INTO analysis_jobs
             (id, status, job_type, record_ids_json, progress_current, progress_total, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id,
                job.status.as_str(),
                job.job_type,
                serde_json::to_string(&job.record_ids).unwrap_or_else(|_| "[]".into()),
                job.progress_current as i64,
                job.progress_total as i64,
                format_timestamp(job.created_at),
            ],
        )?;
        Ok(job)
    }

    async fn get_job(&self, id: &str) -> Result<Option<AnalysisJob>, StoreError> {
        let conn = self.reader();
        let job = conn
            .query_row(
                "SELECT id, status, job_type, record_ids_json, progress_current,
                        progress_total, created_at, started_at, completed_at, error_message
                 FROM analysis_jobs WHERE id = ?1",
                [id],
                map_job,
            )
            .optional()?;
        Ok(job)
    }

    async fn mark_running(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.writer();
        conn.execute(
            "UPDATE analysis_jobs SET status = 'running', started_at = ?2 WHERE id = ?1",
            params![id, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    async fn update_progress(&self, id: &str, current: usize) -> Result<(), StoreError> {
        let conn = self.writer();
        conn.execute(
            "UPDATE analysis_jobs SET progress_current = ?2 WHERE id = ?1",
            params![id, current as i64],
        )?;
        Ok(())
    }

    async fn mark_completed(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.writer();
        conn.execute(
            "UPDATE analysis_jobs SET status = 'completed', completed_at = ?2 WHERE id = ?1",
            params![id, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError> {
        let conn = self.writer();
        conn.execute(
            "UPDATE analysis_jobs SET status = 'failed', completed_at = ?2, error_message = ?3
             WHERE id = ?1",
            params![id, format_timestamp(Utc::now()), error],
        )?;
        Ok(())
    }

    async fn insert_result(
        &self,
        job_id: &str,
        record_id: i64,
        analyzed_type: &str,
        confidence: f64,
        extracted_concepts: &[String],
        metadata: serde_json::Value,
    ) -> Result<i64, StoreError> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO analysis_results
             (job_id, record_id, analyzed_type, confidence, extracted_concepts_json,
              metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job_id,
                record_id,
                analyzed_type,
                confidence,
                serde_json::to_string(extracted_concepts).unwrap_or_else(|_| "[]".into()),
                metadata.to_string(),
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn results_for_job(
        &self,
        job_id: &str,
    ) -> Result<Vec<AnalysisResultRecord>, StoreError> {
        let conn = self.reader();
        let mut stmt = conn.prepare(
            "SELECT id, job_id, record_id, analyzed_type, confidence,
                    extracted_concepts_json, metadata_json, created_at
             FROM analysis_results WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([job_id], |row| {
            let concepts_json: String = row.get("extracted_concepts_json")?;
            let metadata_json: String = row.get("metadata_json")?;
            let created_raw: String = row.get("created_at")?;
            Ok(AnalysisResultRecord {
                id: row.get("id")?,
                job_id: row.get("job_id")?,
                record_id: row.get("record_id")?,
                analyzed_type: row.get("analyzed_type")?,
                confidence: row.get("confidence")?,
                extracted_concepts: serde_json::from_str(&concepts_json).unwrap_or_default(),
                metadata: serde_json::from_str(&metadata_json)
                    .unwrap_or(serde_json::Value::Null),
                created_at: parse_timestamp(&created_raw)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

// ============================================================================
// BATCH RUNNER
// ============================================================================

/// Feeds a job's records through the analyzer gateway
pub struct BatchAnalyzer {
    relational: Arc<dyn RelationalStore>,
    jobs: Arc<dyn JobStore>,
    analyzer: Arc<AnalyzerGateway>,
}

impl BatchAnalyzer {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        jobs: Arc<dyn JobStore>,
        analyzer: Arc<AnalyzerGateway>,
    ) -> Self {
        Self {
            relational,
            jobs,
            analyzer,
        }
    }

    /// Run a pending job to completion. Missing records are skipped; an
    /// analyzer outage fails the whole job with the error recorded.
    pub async fn run(&self, job_id: &str) -> Result<AnalysisJob, EngineError> {
        let job = self
            .jobs
            .get_job(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))?
            .ok_or_else(|| {
                EngineError::new(
                    ErrorKind::InvalidInput,
                    Stage::Jobs,
                    format!("unknown job: {job_id}"),
                )
            })?;

        self.jobs
            .mark_running(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))?;
        info!(job_id, records = job.record_ids.len(), "batch analysis started");

        for (index, record_id) in job.record_ids.iter().enumerate() {
            let record = match self.relational.get(*record_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(job_id, record_id, "record missing, skipping");
                    self.advance(job_id, index + 1).await;
                    continue;
                }
                Err(e) => {
                    let message = format!("record lookup failed: {e}");
                    let _ = self.jobs.mark_failed(job_id, &message).await;
                    return Err(EngineError::new(
                        ErrorKind::StoreUnavailable,
                        Stage::Jobs,
                        message,
                    ));
                }
            };

            match self.analyzer.extract_and_analyze(&record).await {
                Ok(drafts) => {
                    if let Some(first) = drafts.first() {
                        let extracted: Vec<String> = drafts
                            .iter()
                            .flat_map(|d| d.extracted_concepts.iter().cloned())
                            .collect();
                        let metadata = serde_json::json!({
                            "conceptCount": drafts.len(),
                            "mood": first.mood.as_str(),
                        });
                        if let Err(e) = self
                            .jobs
                            .insert_result(
                                job_id,
                                record.id,
                                first.analyzed_type.as_str(),
                                first.confidence,
                                &extracted,
                                metadata,
                            )
                            .await
                        {
                            warn!(job_id, record_id = record.id, "result insert failed: {e}");
                        }
                    }
                }
                Err(e) => {
                    let message = format!("analysis failed for record {}: {e}", record.id);
                    let _ = self.jobs.mark_failed(job_id, &message).await;
                    return Err(e.into_engine(Stage::Jobs));
                }
            }
            self.advance(job_id, index + 1).await;
        }

        self.jobs
            .mark_completed(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))?;
        info!(job_id, "batch analysis completed");

        self.jobs
            .get_job(job_id)
            .await
            .map_err(|e| e.into_engine(Stage::Jobs))?
            .ok_or_else(|| {
                EngineError::new(ErrorKind::Internal, Stage::Jobs, "job vanished after run")
            })
    }

    async fn advance(&self, job_id: &str, current: usize) {
        if let Err(e) = self.jobs.update_progress(job_id, current).await {
            warn!(job_id, "progress update failed: {e}");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::error::AnalyzerError;
    use crate::model::{ConceptDraft, MemoryRecord, Mood, SignificanceJudgment};
    use crate::policy::{AnalyzedType, Category};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedAnalyzer {
        fail: bool,
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn extract_and_analyze(
            &self,
            record: &MemoryRecord,
        ) -> Result<Vec<ConceptDraft>, AnalyzerError> {
            if self.fail {
                return Err(AnalyzerError::Unavailable("down".to_string()));
            }
            Ok(vec![ConceptDraft {
                title: record.topic.clone(),
                description: record.content.clone(),
                analyzed_type: AnalyzedType::Faktenwissen,
                confidence: 0.7,
                mood: Mood::Neutral,
                keywords: vec!["k".to_string()],
                extracted_concepts: vec!["c".to_string()],
            }])
        }

        async fn judge_significance(
            &self,
            _record: &MemoryRecord,
            _analyzed_type: AnalyzedType,
        ) -> Result<SignificanceJudgment, AnalyzerError> {
            Ok(SignificanceJudgment {
                significant: false,
                reason: "n/a".to_string(),
            })
        }

        async fn rank_results(
            &self,
            _query: &str,
            candidates: &[String],
        ) -> Result<Vec<f64>, AnalyzerError> {
            Ok(vec![0.0; candidates.len()])
        }
    }

    async fn seeded_store() -> (Arc<SqliteStore>, Vec<i64>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("memories.db")).unwrap());
        let mut ids = Vec::new();
        for i in 0..3 {
            let id = store
                .insert(
                    Category::Faktenwissen,
                    &format!("topic {i}"),
                    &format!("content {i}"),
                    Utc::now().date_naive(),
                )
                .await
                .unwrap();
            ids.push(id);
        }
        (store, ids, dir)
    }

    #[tokio::test]
    async fn test_create_and_get_job_roundtrip() {
        let (store, ids, _dir) = seeded_store().await;
        let job = store.create_job("analyze", &ids).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress_total, 3);

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.record_ids, ids);
        assert_eq!(loaded.status, JobStatus::Pending);
        assert!(loaded.started_at.is_none());
    }

    #[tokio::test]
    async fn test_batch_run_completes_with_results() {
        let (store, ids, _dir) = seeded_store().await;
        let job = store.create_job("analyze", &ids).await.unwrap();

        let runner = BatchAnalyzer::new(
            store.clone(),
            store.clone(),
            Arc::new(AnalyzerGateway::new(
                Arc::new(FixedAnalyzer { fail: false }),
                0,
            )),
        );
        let finished = runner.run(&job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress_current, 3);
        assert!(finished.completed_at.is_some());

        let results = store.results_for_job(&job.id).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].analyzed_type, "faktenwissen");
        assert_eq!(results[0].metadata["conceptCount"], 1);
    }

    #[tokio::test]
    async fn test_missing_records_are_skipped() {
        let (store, mut ids, _dir) = seeded_store().await;
        ids.push(424242);
        let job = store.create_job("analyze", &ids).await.unwrap();

        let runner = BatchAnalyzer::new(
            store.clone(),
            store.clone(),
            Arc::new(AnalyzerGateway::new(
                Arc::new(FixedAnalyzer { fail: false }),
                0,
            )),
        );
        let finished = runner.run(&job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(store.results_for_job(&job.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_analyzer_outage_fails_job() {
        let (store, ids, _dir) = seeded_store().await;
        let job = store.create_job("analyze", &ids).await.unwrap();

        let runner = BatchAnalyzer::new(
            store.clone(),
            store.clone(),
            Arc::new(AnalyzerGateway::new(Arc::new(FixedAnalyzer { fail: true }), 0)),
        );
        let err = runner.run(&job.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AnalyzerUnavailable);

        let failed = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error_message.is_some());
    }

    #[tokio::test]
    async fn test_unknown_job_is_invalid_input() {
        let (store, _ids, _dir) = seeded_store().await;
        let runner = BatchAnalyzer::new(
            store.clone(),
            store.clone(),
            Arc::new(AnalyzerGateway::new(
                Arc::new(FixedAnalyzer { fail: false }),
                0,
            )),
        );
        let err = runner.run("no-such-job").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
