//! Batch ingestion handler — runs the C1-C7 pipeline for one client.

use anyhow::Result;

use crate::cli::output::{create_spinner, output_json, print_kv, print_section, print_success, OutputMode};
use crate::init::Context;
use crate::pipeline::run_ingestion;

pub async fn handle_ingest(ctx: &Context, client_id: &str, mode: OutputMode) -> Result<i32> {
    let client_config = ctx.load_client(client_id)?;
    let db = ctx.connect_client_database(client_id).await?;

    let spinner = create_spinner(&format!("Ingesting schema for '{}'...", client_id));

    let db: std::sync::Arc<dyn crate::db::RelationalDatabase> = std::sync::Arc::new(db);
    let report = run_ingestion(
        &client_config.client_id,
        db,
        ctx.graph.as_ref().map(|g| g as &dyn crate::graph::GraphStore),
        ctx.llm.as_ref().map(|l| l as &dyn crate::llm::LlmClient),
        &ctx.settings.groq_model,
        &ctx.tracker,
        &ctx.artifacts,
    )
    .await;

    spinner.finish_and_clear();

    let report = match report {
        Ok(r) => r,
        Err(e) => {
            crate::cli::output::print_error(&format!("Ingestion failed: {}", e));
            return Ok(2);
        }
    };

    ctx.schema_context_cache.invalidate(&report.client_id);

    if mode == OutputMode::Json {
        output_json(&serde_json::json!({
            "client_id": report.client_id,
            "tables_profiled": report.tables_profiled,
            "relationships_found": report.relationships_found,
            "enrichment_failures": report.enrichment_failures,
            "exit_code": report.exit_code(),
        }));
    } else {
        print_section("Ingestion complete", "");
        print_kv("client", &report.client_id);
        print_kv("tables profiled", &report.tables_profiled.to_string());
        print_kv("relationships found", &report.relationships_found.to_string());
        print_kv("enrichment failures", &report.enrichment_failures.to_string());
        if report.enrichment_failures == 0 {
            print_success("all tables enriched");
        }
    }

    Ok(report.exit_code())
}
