//! Batch Analysis Workflow
//!
//! Job creation, execution, progress, and result collection through the
//! engine facade.

use engram_e2e_tests::mocks::{engine, Script, ScriptedAnalyzer};
use engram_core::{AnalyzedType, IngestRequest, JobStatus};

async fn seeded_engine() -> (engram_core::MemoryEngine, tempfile::TempDir, Vec<i64>) {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, dir) = engine(analyzer);

    let mut ids = Vec::new();
    for i in 0..3 {
        let outcome = engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("milestone {i}"),
                format!("the {i}th first of its kind"),
            ))
            .await
            .unwrap();
        ids.push(outcome.memory_id);
    }
    (engine, dir, ids)
}

#[tokio::test]
async fn batch_job_runs_to_completion() {
    let (engine, _dir, ids) = seeded_engine().await;

    let job = engine.create_analysis_job("reclassify", &ids).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress_total, 3);

    let finished = engine.run_analysis_job(&job.id).await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.progress_current, 3);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());

    let results = engine.job_results(&job.id).await.unwrap();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.analyzed_type, "erlebnisse");
        assert!(ids.contains(&result.record_id));
        assert!(!result.extracted_concepts.is_empty());
    }
}

#[tokio::test]
async fn job_status_is_pollable_before_and_after_run() {
    let (engine, _dir, ids) = seeded_engine().await;
    let job = engine.create_analysis_job("reclassify", &ids).await.unwrap();

    let pending = engine.job_status(&job.id).await.unwrap().unwrap();
    assert_eq!(pending.status, JobStatus::Pending);
    assert_eq!(pending.progress_current, 0);

    engine.run_analysis_job(&job.id).await.unwrap();

    let completed = engine.job_status(&job.id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.record_ids, ids);
}

#[tokio::test]
async fn missing_records_do_not_fail_the_job() {
    let (engine, _dir, mut ids) = seeded_engine().await;
    ids.push(999_999);
    let job = engine.create_analysis_job("reclassify", &ids).await.unwrap();

    let finished = engine.run_analysis_job(&job.id).await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.progress_current, 4);
    assert_eq!(engine.job_results(&job.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_job_is_reported() {
    let (engine, _dir, _ids) = seeded_engine().await;
    assert!(engine.job_status("nope").await.unwrap().is_none());
    let err = engine.run_analysis_job("nope").await.unwrap_err();
    assert_eq!(err.kind, engram_core::ErrorKind::InvalidInput);
}
