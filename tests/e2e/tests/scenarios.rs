//! Pipeline Scenarios
//!
//! End-to-end ingest and search flows covering the placement matrix: factual
//! knowledge, significant and routine experiences, a degraded vector store,
//! hybrid retrieval, and graph expansion.

use engram_e2e_tests::mocks::{
    engine, engine_with_down_vector, Script, ScriptedAnalyzer,
};
use engram_core::{
    AnalyzedType, GraphSearchRequest, IngestRequest, ResultSource, SearchRequest,
};

#[tokio::test]
async fn factual_ingest_goes_to_semantic_indexes_only() {
    let analyzer = ScriptedAnalyzer::new(Script::factual());
    let (engine, _dir) = engine(analyzer);

    let outcome = engine
        .ingest(IngestRequest::new(
            "programmieren",
            "Cypher basics",
            "Neo4j uses Cypher as its declarative query language",
        ))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.memory_id, 0);
    assert!(!outcome.stored_in_permanent);
    assert!(outcome.stored_in_vector);
    assert!(!outcome.stored_in_recency);
    assert!(outcome
        .significance_reason
        .contains("never stored permanently"));

    // Relational row gone...
    assert!(engine.recent_records(10).await.unwrap().is_empty());

    // ...but the concepts carry back-pointers
    let concepts = engine
        .search_concepts("cypher query language", 5, None)
        .await
        .unwrap();
    assert!(!concepts.is_empty());
    assert_eq!(concepts[0].concept.source.topic, "Cypher basics");
}

#[tokio::test]
async fn significant_experience_becomes_permanent() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    let outcome = engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "First autonomous decision",
            "Took the rollback decision without being asked",
        ))
        .await
        .unwrap();

    assert!(outcome.memory_id > 0);
    assert!(outcome.stored_in_permanent);
    assert!(!outcome.stored_in_recency);

    let records = engine.recent_records(10).await.unwrap();
    assert_eq!(records.len(), 1);
    // erlebnisse maps to kernerinnerungen
    assert_eq!(records[0].category.as_str(), "kernerinnerungen");
}

#[tokio::test]
async fn routine_experience_lands_in_recency_cache() {
    let analyzer = ScriptedAnalyzer::new(Script::routine(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    let outcome = engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "Ordinary Tuesday",
            "Read mail, answered questions, nothing new",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.memory_id, 0);
    assert!(!outcome.stored_in_permanent);
    assert!(outcome.stored_in_recency);

    let slots = engine.recency_slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].topic, "Ordinary Tuesday");
    assert_eq!(slots[0].content, "Read mail, answered questions, nothing new");
}

#[tokio::test]
async fn vector_outage_degrades_but_does_not_fail() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine_with_down_vector(analyzer);

    let outcome = engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "Deploy milestone",
            "First fully automated deploy",
        ))
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(!outcome.stored_in_vector);
    // Placement still follows policy
    assert!(outcome.stored_in_permanent);
    assert!(outcome.stored_in_graph);
    assert!(!outcome.stored_in_recency);
}

#[tokio::test]
async fn hybrid_search_reports_sources_and_strategy() {
    let analyzer = ScriptedAnalyzer::new(Script::routine(AnalyzedType::Erlebnisse))
        .route("Cypher basics", Script::factual())
        .route(
            "First autonomous decision",
            Script::significant(AnalyzedType::Erlebnisse),
        );
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new(
            "programmieren",
            "Cypher basics",
            "Neo4j uses Cypher as its query language",
        ))
        .await
        .unwrap();
    engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "First autonomous decision",
            "Made the first autonomous rollback decision",
        ))
        .await
        .unwrap();
    engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "Ordinary Tuesday",
            "Routine autonomous checks, nothing new",
        ))
        .await
        .unwrap();

    let response = engine
        .search_intelligent(SearchRequest::new("autonomous"))
        .await
        .unwrap();

    assert!(response.reranked);
    assert_eq!(response.strategy, "hybrid");
    assert!(response.sources.sql.count >= 1);
    assert!(response.sources.vector.count >= 1);

    // The permanent record surfaces through sql or both
    assert!(response
        .results
        .iter()
        .any(|r| r.topic == "First autonomous decision"
            && matches!(r.source, ResultSource::Sql | ResultSource::Both)));
    // The factual record surfaces only as a concept reconstruction
    assert!(response
        .results
        .iter()
        .any(|r| r.topic == "Cypher basics" && r.source == ResultSource::Vector));
}

#[tokio::test]
async fn graph_search_expands_shared_keyword_cluster() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..3 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("Cypher lesson {i}"),
                "learning cypher graph traversal together",
            ))
            .await
            .unwrap();
    }

    let mut request = GraphSearchRequest::new("cypher graph");
    request.max_depth = Some(2);
    let response = engine.search_graph(request).await.unwrap();

    assert_eq!(response.graph_context.depth, 2);
    assert!(response.graph_context.related_count >= 2);
    assert!(response
        .graph_context
        .cluster
        .edge_types
        .iter()
        .any(|t| t == "CONCEPT_SIMILAR" || t == "HIGHLY_SIMILAR"));
    assert!(!response.relationships.is_empty());
    assert!(response.graph_context.cluster.nodes_traversed >= 3);
}
