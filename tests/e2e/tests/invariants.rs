//! Placement Invariants
//!
//! The quantified guarantees of the ingestion pipeline: mutually exclusive
//! placement, factual exclusion from permanent storage, concept survival,
//! category confinement, bounded recency, and the boundary behaviors.

use engram_e2e_tests::mocks::{engine, engine_with, Script, ScriptedAnalyzer};
use engram_core::{
    AnalyzedType, EngineConfig, GraphSearchRequest, IngestRequest, ResultSource, SearchRequest,
};

#[tokio::test]
async fn factual_types_never_reach_permanent_or_recency() {
    for analyzed_type in [AnalyzedType::Faktenwissen, AnalyzedType::ProzeduralesWissen] {
        // Even a "significant" factual record must stay out of C1 and C2
        let mut script = Script::significant(analyzed_type);
        script.significant = true;
        let analyzer = ScriptedAnalyzer::new(script);
        let (engine, _dir) = engine(analyzer);

        let outcome = engine
            .ingest(IngestRequest::new("faktenwissen", "fact", "some knowledge"))
            .await
            .unwrap();

        assert!(!outcome.stored_in_permanent, "{analyzed_type} went permanent");
        assert!(!outcome.stored_in_recency, "{analyzed_type} hit recency");
        assert_eq!(outcome.memory_id, 0);
    }
}

#[tokio::test]
async fn placement_is_mutually_exclusive() {
    let cases = [
        Script::factual(),
        Script::significant(AnalyzedType::Erlebnisse),
        Script::routine(AnalyzedType::Humor),
        Script::significant(AnalyzedType::Zusammenarbeit),
        Script::routine(AnalyzedType::Bewusstsein),
        Script::empty(),
    ];
    for (index, script) in cases.into_iter().enumerate() {
        let analyzer = ScriptedAnalyzer::new(script);
        let (engine, _dir) = engine(analyzer);
        let outcome = engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("case {index}"),
                "content",
            ))
            .await
            .unwrap();
        assert!(
            !(outcome.stored_in_permanent && outcome.stored_in_recency),
            "case {index} stored both"
        );
    }
}

#[tokio::test]
async fn concepts_survive_parent_deletion() {
    let analyzer = ScriptedAnalyzer::new(Script::routine(AnalyzedType::Humor));
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new(
            "humor",
            "borrow checker joke",
            "a joke about the borrow checker fighting back",
        ))
        .await
        .unwrap();

    // Row is gone (routine -> recency), concepts stay with back-pointers
    assert!(engine.recent_records(10).await.unwrap().is_empty());
    let concepts = engine
        .search_concepts("borrow checker", 10, None)
        .await
        .unwrap();
    assert!(!concepts.is_empty());
    assert!(concepts[0].concept.source.record_id > 0);
    assert_eq!(concepts[0].concept.source.topic, "borrow checker joke");
}

#[tokio::test]
async fn permanent_category_is_caller_or_mapped() {
    let cases = [
        (AnalyzedType::Erlebnisse, "erlebnisse", "kernerinnerungen"),
        (AnalyzedType::Humor, "humor", "humor"),
        (AnalyzedType::Bewusstsein, "bewusstsein", "philosophie"),
        (AnalyzedType::Zusammenarbeit, "erlebnisse", "zusammenarbeit"),
    ];
    for (analyzed_type, caller, expected) in cases {
        let analyzer = ScriptedAnalyzer::new(Script::significant(analyzed_type));
        let (engine, _dir) = engine(analyzer);
        let outcome = engine
            .ingest(IngestRequest::new(caller, "topic", "content"))
            .await
            .unwrap();

        let records = engine.recent_records(10).await.unwrap();
        assert_eq!(records.len(), 1);
        let stored = records[0].category.as_str();
        assert!(
            stored == caller || stored == expected,
            "{analyzed_type}: stored in {stored}"
        );
        assert_eq!(stored, expected);
        assert_eq!(outcome.analyzed_category, analyzed_type.as_str());
    }
}

#[tokio::test]
async fn recency_cache_is_bounded_and_newest_first() {
    let analyzer = ScriptedAnalyzer::new(Script::routine(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..15 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("routine {i}"),
                "another ordinary day",
            ))
            .await
            .unwrap();
    }

    let slots = engine.recency_slots();
    assert_eq!(slots.len(), 10);
    assert_eq!(slots[0].topic, "routine 14");
    assert_eq!(slots[9].topic, "routine 5");
    for pair in slots.windows(2) {
        assert!(pair[0].record_id > pair[1].record_id);
    }
}

#[tokio::test]
async fn zero_recency_capacity_disables_caching() {
    let analyzer = ScriptedAnalyzer::new(Script::routine(AnalyzedType::Erlebnisse));
    let config = EngineConfig {
        recency_capacity: 0,
        ..EngineConfig::default()
    };
    let (engine, _dir) = engine_with(analyzer, config);

    let outcome = engine
        .ingest(IngestRequest::new("erlebnisse", "routine", "a day"))
        .await
        .unwrap();
    assert!(!outcome.stored_in_recency);
    assert!(engine.recency_slots().is_empty());
}

#[tokio::test]
async fn duplicate_ingests_produce_independent_concept_groups() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    let first = engine
        .ingest(IngestRequest::new("erlebnisse", "same topic", "same content"))
        .await
        .unwrap();
    let second = engine
        .ingest(IngestRequest::new("erlebnisse", "same topic", "same content"))
        .await
        .unwrap();

    assert_ne!(first.memory_id, second.memory_id);
    assert!(first.memory_id > 0 && second.memory_id > 0);

    let concepts = engine.search_concepts("same content", 20, None).await.unwrap();
    let mut parents: Vec<i64> = concepts
        .iter()
        .map(|c| c.concept.source.record_id)
        .collect();
    parents.sort();
    parents.dedup();
    assert_eq!(parents.len(), 2);
}

#[tokio::test]
async fn search_results_have_unique_ids_and_respect_category_filter() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Humor));
    let (engine, _dir) = engine(analyzer);

    for i in 0..4 {
        engine
            .ingest(IngestRequest::new(
                "humor",
                format!("pun {i}"),
                "shared pun material here",
            ))
            .await
            .unwrap();
    }

    let mut request = SearchRequest::new("shared pun");
    request.categories = Some(vec![engram_core::Category::Humor]);
    let response = engine.search_intelligent(request).await.unwrap();

    let mut ids: Vec<i64> = response.results.iter().map(|r| r.record_id).collect();
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count, "duplicate record ids in results");

    for result in &response.results {
        assert!(
            result.category == engram_core::Category::Humor
                || result.source == ResultSource::Vector,
            "category filter violated"
        );
    }
}

#[tokio::test]
async fn zero_concepts_fall_back_to_caller_category() {
    let analyzer = ScriptedAnalyzer::new(Script::empty());
    let (engine, _dir) = engine(analyzer);

    let outcome = engine
        .ingest(IngestRequest::new("zusammenarbeit", "pairing", "we paired"))
        .await
        .unwrap();

    assert_eq!(outcome.analyzed_category, "zusammenarbeit");
    assert_eq!(outcome.significance_reason, "no concepts extracted");
    assert!(!outcome.stored_in_permanent);
    assert!(!outcome.stored_in_recency);
    assert_eq!(outcome.memory_id, 0);
}

#[tokio::test]
async fn depth_one_graph_search_reports_depth_one() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..2 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("linked {i}"),
                "records that share plenty of words",
            ))
            .await
            .unwrap();
    }

    let mut request = GraphSearchRequest::new("share plenty");
    request.max_depth = Some(1);
    let response = engine.search_graph(request).await.unwrap();
    assert_eq!(response.graph_context.depth, 1);
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let analyzer = ScriptedAnalyzer::new(Script::factual());
    let (engine, _dir) = engine(analyzer);

    for (category, topic, content) in [
        ("unknown_category", "t", "c"),
        ("humor", "", "c"),
        ("humor", "t", ""),
    ] {
        let err = engine
            .ingest(IngestRequest::new(category, topic, content))
            .await
            .unwrap_err();
        assert_eq!(err.kind, engram_core::ErrorKind::InvalidInput);
    }

    let long_topic = "x".repeat(513);
    let err = engine
        .ingest(IngestRequest::new("humor", long_topic, "c"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, engram_core::ErrorKind::InvalidInput);
}
