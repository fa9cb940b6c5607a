//! The staged schema-enrichment pipeline (spec §1-2): C1 through C7, run
//! sequentially per client with a strict happens-before between phases —
//! each phase's artifact is fully written before the next phase reads it.

pub mod assembler;
pub mod enricher;
pub mod fingerprint;
pub mod metadata_reader;
pub mod profiler;
pub mod relationships;

use std::sync::Arc;

use crate::artifacts::{names, ArtifactStore};
use crate::db::RelationalDatabase;
use crate::error::StrataError;
use crate::graph::{builder as graph_builder, portable, GraphStore};
use crate::llm::LlmClient;
use crate::models::SemanticLayer;
use crate::tracker::ApiCallTracker;

/// Outcome of a full ingestion run, enough to pick a batch-tool exit code
/// (spec §6: 0 success, 3 partial failure).
pub struct IngestionReport {
    pub client_id: String,
    pub tables_profiled: usize,
    pub relationships_found: usize,
    pub enrichment_failures: usize,
}

impl IngestionReport {
    pub fn exit_code(&self) -> i32 {
        if self.enrichment_failures > 0 {
            3
        } else {
            0
        }
    }
}

/// Run phases C1-C7 for a single client and persist every stage-boundary
/// artifact (spec §6 artifact table). Safe to call concurrently for
/// different clients; not re-entrant for the same client.
#[allow(clippy::too_many_arguments)]
pub async fn run_ingestion(
    client_id: &str,
    db: Arc<dyn RelationalDatabase>,
    graph_store: Option<&dyn GraphStore>,
    llm: Option<&dyn LlmClient>,
    llm_model: &str,
    tracker: &ApiCallTracker,
    artifacts: &ArtifactStore,
) -> Result<IngestionReport, StrataError> {
    tracing::info!("starting ingestion for client '{}'", client_id);

    let schema = metadata_reader::extract(db.as_ref()).await?;
    artifacts.write_json(client_id, names::SCHEMA_GRAPH, &schema)?;
    tracing::info!("C1 metadata reader: {} tables", schema.tables.len());

    let profiles = profiler::profile(Arc::clone(&db), &schema).await?;
    artifacts.write_json(client_id, names::DATA_PROFILE, &profiles)?;
    tracing::info!("C2 data profiler: {} tables profiled", profiles.tables.len());

    let relationship_set = relationships::detect(db.as_ref(), &schema, &profiles).await?;
    artifacts.write_json(client_id, names::RELATIONSHIPS, &relationship_set)?;
    tracing::info!(
        "C3 relationship detector: {} relationships",
        relationship_set.summary.total
    );

    let fingerprints = fingerprint::fingerprint(&schema, &relationship_set);
    artifacts.write_json(client_id, names::FINGERPRINTS, &fingerprints)?;
    tracing::info!("C4 fingerprinter: {} tables fingerprinted", fingerprints.tables.len());

    let previous_version = artifacts
        .read_json::<SemanticLayer>(client_id, names::SEMANTIC_LAYER)?
        .map(|l| l.version)
        .unwrap_or(0);
    let mut layer = assembler::assemble(
        client_id,
        previous_version,
        &schema,
        &profiles,
        &fingerprints,
        &relationship_set,
    );
    artifacts.write_json(client_id, names::SEMANTIC_LAYER, &layer)?;
    tracing::info!("C5 semantic assembler: version {}", layer.version);

    let mut enrichment_failures = 0;
    if let Some(llm) = llm {
        enrichment_failures = enricher::enrich(&mut layer, llm, llm_model, tracker, artifacts).await;
        tracing::info!(
            "C6 llm enricher: {} tables, {} failures",
            layer.tables.len(),
            enrichment_failures
        );
    } else {
        tracing::warn!("no LLM client configured; skipping C6 enrichment");
    }

    let knowledge_graph = graph_builder::build(&layer);
    let portable_bytes = portable::dump(&knowledge_graph)?;
    artifacts.write_bytes(
        client_id,
        &names::knowledge_graph_portable(portable::extension()),
        &portable_bytes,
    )?;
    let summary = knowledge_graph.summary();
    artifacts.write_json(client_id, names::KNOWLEDGE_GRAPH_SUMMARY, &summary)?;
    tracing::info!(
        "C7 graph builder: {} tables, {} edges",
        summary.table_count,
        summary.edge_count
    );

    if let Some(store) = graph_store {
        store.load(client_id, &knowledge_graph).await?;
        tracing::info!("loaded knowledge graph into queryable store");
    } else {
        tracing::warn!("no graph store configured; portable graph only");
    }

    Ok(IngestionReport {
        client_id: client_id.to_string(),
        tables_profiled: profiles.tables.len(),
        relationships_found: relationship_set.summary.total,
        enrichment_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingTable;
    use crate::db::tests_support::FakeDatabase;

    #[tokio::test]
    async fn ingestion_is_idempotent_without_llm_or_graph_store() {
        let fake: Arc<dyn RelationalDatabase> = Arc::new(FakeDatabase::incident_fixture());
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());

        let first = run_ingestion("c1", Arc::clone(&fake), None, None, "test-model", &tracker, &artifacts)
            .await
            .unwrap();
        let second = run_ingestion("c1", Arc::clone(&fake), None, None, "test-model", &tracker, &artifacts)
            .await
            .unwrap();

        assert_eq!(first.tables_profiled, second.tables_profiled);
        assert_eq!(first.relationships_found, second.relationships_found);
        assert_eq!(first.exit_code(), 0);

        let layer: SemanticLayer = artifacts
            .read_json("c1", names::SEMANTIC_LAYER)
            .unwrap()
            .unwrap();
        assert_eq!(layer.version, 2);
    }
}
