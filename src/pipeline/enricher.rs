//! LLM Enricher (C6): adds narrative table descriptions to the semantic
//! layer, one table at a time, with after-each-table checkpointing
//! (spec §4.6).

use std::sync::Arc;

use chrono::Utc;

use crate::artifacts::{names, ArtifactStore};
use crate::llm::{LlmClient, ResponseFormat};
use crate::models::{Message, SemanticLayer};
use crate::tracker::ApiCallTracker;

const ENRICH_TEMPERATURE: f32 = 0.3;
const ENRICH_MAX_TOKENS: u32 = 500;
const MAX_PROMPT_COLUMNS: usize = 10;

/// Enrich every table in `layer` that does not already carry a
/// description, persisting an atomic checkpoint after each one so an
/// interrupted run resumes from the last fully-written table set.
///
/// Returns the count of tables whose enrichment failed (used by the CLI to
/// decide between exit codes 0 and 3).
pub async fn enrich(
    layer: &mut SemanticLayer,
    llm: &dyn LlmClient,
    model: &str,
    tracker: &ApiCallTracker,
    artifacts: &ArtifactStore,
) -> usize {
    let table_names: Vec<String> = layer.tables.keys().cloned().collect();
    let mut failures = 0;

    for table_name in table_names {
        if layer
            .tables
            .get(&table_name)
            .map(|t| t.description.is_some())
            .unwrap_or(false)
        {
            continue;
        }

        let prompt = {
            let entry = &layer.tables[&table_name];
            build_prompt(&table_name, entry)
        };

        let started = std::time::Instant::now();
        let messages = vec![Message::user(prompt)];
        let outcome = llm
            .chat(
                model,
                &messages,
                ENRICH_TEMPERATURE,
                ENRICH_MAX_TOKENS,
                ResponseFormat::Text,
            )
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let entry = layer.tables.get_mut(&table_name).expect("table present");
        match outcome {
            Ok(completion) => {
                tracker.record(
                    &format!("enrich:{table_name}"),
                    model,
                    completion.input_tokens,
                    completion.output_tokens,
                    latency_ms,
                    true,
                    None,
                );
                entry.description = Some(completion.content);
                entry.description_generated_at = Some(Utc::now());
                entry.description_source = Some(model.to_string());
            }
            Err(e) => {
                failures += 1;
                tracker.record(
                    &format!("enrich:{table_name}"),
                    model,
                    0,
                    0,
                    latency_ms,
                    false,
                    Some(e.as_tag().to_string()),
                );
                entry.description = Some(format!("[Error generating description: {e}]"));
                entry.description_generated_at = Some(Utc::now());
                entry.description_source = Some(model.to_string());
            }
        }

        layer.recompute_summary();
        if let Err(e) = artifacts.write_json(&layer.client_id, names::SEMANTIC_LAYER, layer) {
            tracing::error!("failed to checkpoint semantic layer after table '{}': {}", table_name, e);
        }
    }

    failures
}

fn build_prompt(table_name: &str, entry: &crate::models::TableEntry) -> String {
    let mut lines = vec![format!("Table: {table_name}"), format!("Row count: {}", entry.row_count)];
    if !entry.primary_key.is_empty() {
        lines.push(format!("Primary key: {}", entry.primary_key.join(", ")));
    }
    lines.push("Columns:".to_string());
    for column in entry.columns.iter().take(MAX_PROMPT_COLUMNS) {
        lines.push(format!("  - {} ({})", column.name, column.sql_type));
    }

    let notable_patterns: Vec<String> = entry
        .column_profiles
        .iter()
        .filter_map(|(col, profile)| {
            if profile.patterns.enum_like {
                Some(format!("{col} is enum-like"))
            } else if profile.patterns.email_pattern {
                Some(format!("{col} looks like an email"))
            } else {
                None
            }
        })
        .collect();
    if !notable_patterns.is_empty() {
        lines.push(format!("Notable patterns: {}", notable_patterns.join("; ")));
    }

    lines.push(
        "Write a concise (2-3 sentence) natural-language description of what this table represents."
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingTable;
    use crate::llm::ChatCompletion;
    use crate::models::LayerSummary;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysFailLlm;

    #[async_trait]
    impl LlmClient for AlwaysFailLlm {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _temperature: f32,
            _max_tokens: u32,
            _response_format: ResponseFormat,
        ) -> Result<ChatCompletion, crate::error::StrataError> {
            Err(crate::error::StrataError::LlmUnavailable("down".to_string()))
        }
    }

    struct CountingLlm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for CountingLlm {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _temperature: f32,
            _max_tokens: u32,
            _response_format: ResponseFormat,
        ) -> Result<ChatCompletion, crate::error::StrataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatCompletion {
                content: "A table of incidents.".to_string(),
                input_tokens: 50,
                output_tokens: 20,
            })
        }
    }

    fn bare_layer() -> SemanticLayer {
        let mut tables = BTreeMap::new();
        tables.insert(
            "incidents".to_string(),
            crate::models::TableEntry {
                row_count: 10,
                primary_key: vec!["id".to_string()],
                columns: vec![],
                explicit_foreign_keys: vec![],
                indexes: vec![],
                unique_constraints: vec![],
                column_profiles: BTreeMap::new(),
                fingerprint: crate::models::Fingerprint {
                    role: crate::models::Role::Hub,
                    risk_profile: crate::models::RiskProfile::LowRisk,
                    redline_comments: vec![],
                    cluster_id: "orphan:incidents".to_string(),
                    has_temporal: false,
                    has_geospatial: false,
                },
                relationships: vec![],
                description: None,
                description_generated_at: None,
                description_source: None,
            },
        );
        SemanticLayer {
            client_id: "c1".to_string(),
            version: 1,
            generated_at: Utc::now(),
            tables,
            summary: LayerSummary::default(),
        }
    }

    #[tokio::test]
    async fn llm_failure_produces_error_marker_description_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
        let mut layer = bare_layer();

        let failures = enrich(&mut layer, &AlwaysFailLlm, "test-model", &tracker, &artifacts).await;

        assert_eq!(failures, 1);
        let description = layer.tables["incidents"].description.as_ref().unwrap();
        assert!(description.starts_with("[Error generating description:"));
    }

    #[tokio::test]
    async fn already_described_tables_are_skipped_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
        let mut layer = bare_layer();
        layer.tables.get_mut("incidents").unwrap().description = Some("already done".to_string());

        let llm = CountingLlm { calls: AtomicUsize::new(0) };
        let failures = enrich(&mut layer, &llm, "test-model", &tracker, &artifacts).await;

        assert_eq!(failures, 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(layer.tables["incidents"].description.as_deref(), Some("already done"));
    }
}
