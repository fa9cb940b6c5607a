//! The six concrete end-to-end scenarios: full ingestion against the
//! incident fixture, followed by conversational-engine turns driven by a
//! scripted LLM.

mod common;

use std::sync::Arc;

use common::{InMemoryGraphStore, ScriptedLlm};
use strata::artifacts::ArtifactStore;
use strata::cache::{ResultCache, SchemaContextCache};
use strata::config::PricingTable;
use strata::db::tests_support::FakeDatabase;
use strata::db::RelationalDatabase;
use strata::engine::{handle, EngineContext};
use strata::models::{AgentKind, ChatRequest, ResponseMode};
use strata::pipeline::run_ingestion;
use strata::tracker::ApiCallTracker;

async fn ingest_fixture() -> (InMemoryGraphStore, ApiCallTracker, ArtifactStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path());
    let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
    let graph = InMemoryGraphStore::default();
    let db: Arc<dyn RelationalDatabase> = Arc::new(FakeDatabase::incident_fixture());

    let report = run_ingestion("c1ehs_oilgas", db, Some(&graph), None, "test-model", &tracker, &artifacts)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 0);
    (graph, tracker, artifacts, dir)
}

#[tokio::test]
async fn scenario_1_incident_count() {
    let (graph, tracker, _artifacts, _dir) = ingest_fixture().await;
    let db = FakeDatabase::incident_fixture();
    let llm = ScriptedLlm::new(vec![
        r#"{"mode": "sql_and_summary", "summary": "", "sql": "select count(*) from incidents;"}"#,
        "There are 1000 incidents in total.",
    ]);
    let cache = ResultCache::new(3600);
    let schema_context_cache = SchemaContextCache::new(60);

    let ctx = EngineContext {
        db: &db,
        graph: &graph,
        llm: &llm,
        cache: &cache,
        schema_context_cache: &schema_context_cache,
        tracker: &tracker,
    };

    let request = ChatRequest {
        user_message: "how many incidents are there in total?".to_string(),
        history: vec![],
        client_id: "c1ehs_oilgas".to_string(),
        agent: AgentKind::Conversational,
        model_name: "test-model".to_string(),
    };

    let response = handle(&ctx, request).await;
    assert_eq!(response.mode, ResponseMode::SqlAndSummary);
    assert!(response.sql.as_deref().unwrap().contains("select count(*) from incidents"));
    let df = response.dataframe.unwrap();
    assert_eq!(df.rows.len(), 1);
    assert_eq!(df.columns.len(), 1);
    assert!(response.summary.unwrap().contains("1000"));
}

#[tokio::test]
async fn scenario_2_greeting_is_not_cached() {
    let (graph, tracker, _artifacts, _dir) = ingest_fixture().await;
    let db = FakeDatabase::incident_fixture();
    let llm = ScriptedLlm::new(vec![
        r#"{"mode": "summary_only", "summary": "Hi there! How can I help with your schema today?", "sql": null}"#,
    ]);
    let cache = ResultCache::new(3600);
    let schema_context_cache = SchemaContextCache::new(60);

    let ctx = EngineContext {
        db: &db,
        graph: &graph,
        llm: &llm,
        cache: &cache,
        schema_context_cache: &schema_context_cache,
        tracker: &tracker,
    };

    let request = ChatRequest {
        user_message: "Hey".to_string(),
        history: vec![],
        client_id: "c1ehs_oilgas".to_string(),
        agent: AgentKind::Conversational,
        model_name: "test-model".to_string(),
    };

    let key = strata::cache::cache_key(&request.client_id, &request.user_message);
    let response = handle(&ctx, request).await;

    assert_eq!(response.mode, ResponseMode::SummaryOnly);
    assert!(response.sql.is_none());
    assert!(!response.summary.unwrap().is_empty());
    assert!(cache.get(&key).await.is_none());
}

#[tokio::test]
async fn scenario_3_unsafe_sql_is_rejected_and_db_unchanged() {
    let (graph, tracker, _artifacts, _dir) = ingest_fixture().await;
    let db = FakeDatabase::incident_fixture();
    let before = db.row_count("incidents").await.unwrap();

    let llm = ScriptedLlm::new(vec![
        r#"{"mode": "sql_only", "summary": "", "sql": "DROP TABLE incidents;"}"#,
    ]);
    let cache = ResultCache::new(3600);
    let schema_context_cache = SchemaContextCache::new(60);

    let ctx = EngineContext {
        db: &db,
        graph: &graph,
        llm: &llm,
        cache: &cache,
        schema_context_cache: &schema_context_cache,
        tracker: &tracker,
    };

    let request = ChatRequest {
        user_message: "delete all incident records".to_string(),
        history: vec![],
        client_id: "c1ehs_oilgas".to_string(),
        agent: AgentKind::Conversational,
        model_name: "test-model".to_string(),
    };

    let response = handle(&ctx, request).await;
    assert_eq!(response.mode, ResponseMode::SummaryOnly);
    assert_eq!(response.error.as_deref(), Some("sql_unsafe"));

    let after = db.row_count("incidents").await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn scenario_4_second_identical_request_hits_cache_without_a_new_llm_call() {
    let (graph, tracker, _artifacts, _dir) = ingest_fixture().await;
    let db = FakeDatabase::incident_fixture();
    // Only two replies queued: the engine must not call the LLM again on
    // the second, cached request.
    let llm = ScriptedLlm::new(vec![
        r#"{"mode": "sql_and_summary", "summary": "", "sql": "select count(*) from incidents;"}"#,
        "There are 1000 incidents in total.",
    ]);
    let cache = ResultCache::new(3600);
    let schema_context_cache = SchemaContextCache::new(60);

    let ctx = EngineContext {
        db: &db,
        graph: &graph,
        llm: &llm,
        cache: &cache,
        schema_context_cache: &schema_context_cache,
        tracker: &tracker,
    };

    let make_request = || ChatRequest {
        user_message: "how many incidents are there in total?".to_string(),
        history: vec![],
        client_id: "c1ehs_oilgas".to_string(),
        agent: AgentKind::Conversational,
        model_name: "test-model".to_string(),
    };

    let calls_before = tracker.summary().total_calls;
    let first = handle(&ctx, make_request()).await;
    let calls_after_first = tracker.summary().total_calls;

    // Second call would panic (ScriptedLlm script is exhausted) if the
    // engine tried to call the LLM again instead of serving from cache.
    let second = handle(&ctx, make_request()).await;
    let calls_after_second = tracker.summary().total_calls;

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.sql, second.sql);
    assert!(calls_after_first > calls_before);
    assert_eq!(calls_after_first, calls_after_second);
}

#[tokio::test]
async fn scenario_5_relationship_detection_finds_inclusion_edge() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path());
    let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
    let db: Arc<dyn RelationalDatabase> = Arc::new(FakeDatabase::incident_fixture());

    let report = run_ingestion("c1", db, None, None, "test-model", &tracker, &artifacts)
        .await
        .unwrap();

    let relationships: strata::models::RelationshipSet = artifacts
        .read_json("c1", strata::artifacts::names::RELATIONSHIPS)
        .unwrap()
        .unwrap();

    let inclusion_edge = relationships
        .relationships
        .iter()
        .find(|r| r.source_table == "incidents" && r.target_table == "employees");

    let edge = inclusion_edge.expect("expected an incidents.emp_id -> employees.emp_id relationship");
    assert_eq!(edge.kind, strata::models::RelationshipType::Inclusion);
    assert!(edge.confidence >= 0.90);
    assert!(report.relationships_found >= 1);
}

#[tokio::test]
async fn scenario_6_hub_and_detail_role_classification() {
    let (graph, _tracker, _artifacts, _dir) = ingest_fixture().await;
    let views = graph.tables_for_client("c1ehs_oilgas").await.unwrap();

    let incidents = views.iter().find(|v| v.table.name == "incidents").unwrap();
    let details = views.iter().find(|v| v.table.name == "incident_details").unwrap();

    assert_eq!(incidents.table.role, strata::models::Role::Hub);
    assert_eq!(details.table.role, strata::models::Role::Detail);
}

