//! Retrieval Behaviors
//!
//! Strategy fallbacks, rerank ordering, and graph-score augmentation
//! through the full engine.

use engram_e2e_tests::mocks::{engine, Script, ScriptedAnalyzer};
use engram_core::{
    AnalyzedType, GraphSearchRequest, IngestRequest, RerankStrategy, ResultSource, SearchRequest,
};

#[tokio::test]
async fn vector_only_strategy_when_sql_is_empty() {
    // Factual records leave nothing in the relational store
    let analyzer = ScriptedAnalyzer::new(Script::factual());
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new(
            "faktenwissen",
            "ownership",
            "rust ownership rules explained",
        ))
        .await
        .unwrap();

    let response = engine
        .search_intelligent(SearchRequest::new("ownership rules"))
        .await
        .unwrap();

    assert_eq!(response.strategy, "vector_only");
    assert_eq!(response.sources.sql.count, 0);
    assert!(response.sources.vector.count >= 1);
    assert!(response.results.iter().all(|r| r.source == ResultSource::Vector));
}

#[tokio::test]
async fn text_rerank_orders_by_overlap() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "exact phrase",
            "retrograde orbit insertion burn",
        ))
        .await
        .unwrap();
    engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "loose match",
            "orbit of daily habits and other words entirely",
        ))
        .await
        .unwrap();

    let mut request = SearchRequest::new("retrograde orbit insertion");
    request.strategy = Some(RerankStrategy::Text);
    let response = engine.search_intelligent(request).await.unwrap();

    assert!(response.reranked);
    assert_eq!(response.results[0].topic, "exact phrase");
    assert!(response.results[0].score > response.results[1].score);
}

#[tokio::test]
async fn hybrid_scores_combine_similarity_and_text() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new(
            "erlebnisse",
            "about databases",
            "graph database traversal and indexes",
        ))
        .await
        .unwrap();

    let response = engine
        .search_intelligent(SearchRequest::new("graph database traversal"))
        .await
        .unwrap();

    let top = &response.results[0];
    assert_eq!(top.source, ResultSource::Both);
    assert!(top.similarity.unwrap() > 0.5);
    // Hybrid: text + vector + recency all contribute
    assert!(top.score > 0.5);
}

#[tokio::test]
async fn llm_rerank_falls_back_to_text_on_score_mismatch() {
    // The scripted analyzer returns uniform scores, which still count as a
    // successful llm rerank; the response must stay ordered and flagged
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..3 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("entry {i}"),
                "repeated content for rerank",
            ))
            .await
            .unwrap();
    }

    let mut request = SearchRequest::new("repeated content");
    request.strategy = Some(RerankStrategy::Llm);
    let response = engine.search_intelligent(request).await.unwrap();

    assert!(response.reranked);
    assert_eq!(response.results.len(), 3);
    // Uniform scores: ties break newest-first
    assert!(response.results[0].record_id > response.results[2].record_id);
}

#[tokio::test]
async fn graph_search_attaches_graph_scores_to_connected_results() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..3 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("cluster {i}"),
                "strongly overlapping cluster content",
            ))
            .await
            .unwrap();
    }

    let response = engine
        .search_graph(GraphSearchRequest::new("overlapping cluster"))
        .await
        .unwrap();

    assert!(response
        .results
        .iter()
        .any(|r| r.graph_score.is_some()),
        "no result carries a graph score");
    assert!(response.sources.graph.is_some());
    assert!(response.total_found >= 3);
}

#[tokio::test]
async fn include_related_false_skips_expansion() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Erlebnisse));
    let (engine, _dir) = engine(analyzer);

    for i in 0..2 {
        engine
            .ingest(IngestRequest::new(
                "erlebnisse",
                format!("pair {i}"),
                "related pair of records",
            ))
            .await
            .unwrap();
    }

    let mut request = GraphSearchRequest::new("related pair");
    request.include_related = false;
    let response = engine.search_graph(request).await.unwrap();

    assert!(response.relationships.is_empty());
    assert_eq!(response.graph_context.cluster.nodes_traversed, 0);
    assert_eq!(response.graph_context.related_count, 0);
}

#[tokio::test]
async fn category_filtered_search_restricts_sql_branch() {
    let analyzer = ScriptedAnalyzer::new(Script::significant(AnalyzedType::Humor));
    let (engine, _dir) = engine(analyzer);

    engine
        .ingest(IngestRequest::new("humor", "pun", "wordplay content"))
        .await
        .unwrap();

    let mut request = SearchRequest::new("wordplay");
    request.categories = Some(vec![engram_core::Category::Kernerinnerungen]);
    let response = engine.search_intelligent(request).await.unwrap();

    // The humor record is filtered out of both branches
    assert_eq!(response.sources.sql.count, 0);
    assert!(response
        .results
        .iter()
        .all(|r| r.category == engram_core::Category::Kernerinnerungen
            || r.source == ResultSource::Vector));
}
