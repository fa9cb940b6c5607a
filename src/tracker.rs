//! API-Call Tracker (C12, cross-cutting): an append-only ledger of every
//! LLM call made by C6 and C9, observed for cost and latency (spec §4.12).
//!
//! Tracking failures are logged, never propagated — a broken ledger must
//! not take down enrichment or conversation handling.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PricingTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallRecord {
    pub timestamp: DateTime<Utc>,
    pub caller_context: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub cost_usd: f64,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStats {
    pub calls: u64,
    pub successes: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerSummary {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub success_rate: f64,
    pub total_cost_usd: f64,
    pub per_model: std::collections::BTreeMap<String, ModelStats>,
}

impl TrackerSummary {
    pub fn from_records(records: &[ApiCallRecord]) -> Self {
        let mut summary = TrackerSummary::default();
        for r in records {
            summary.total_calls += 1;
            if r.success {
                summary.successful_calls += 1;
            }
            summary.total_cost_usd += r.cost_usd;

            let stats = summary.per_model.entry(r.model.clone()).or_default();
            stats.calls += 1;
            if r.success {
                stats.successes += 1;
            }
            stats.input_tokens += r.input_tokens as u64;
            stats.output_tokens += r.output_tokens as u64;
            stats.cost_usd += r.cost_usd;
        }
        summary.success_rate = if summary.total_calls > 0 {
            summary.successful_calls as f64 / summary.total_calls as f64
        } else {
            0.0
        };
        summary
    }
}

/// Appends every call both to a JSONL record file and a CSV side-channel,
/// and keeps an in-memory copy for cheap summary computation.
pub struct ApiCallTracker {
    jsonl_path: PathBuf,
    csv_path: PathBuf,
    pricing: PricingTable,
    records: Mutex<Vec<ApiCallRecord>>,
}

impl ApiCallTracker {
    pub fn new(artifacts_root: &Path, pricing: PricingTable) -> Self {
        Self {
            jsonl_path: artifacts_root.join("api_calls.jsonl"),
            csv_path: artifacts_root.join("api_calls.csv"),
            pricing,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Record a completed call. Never returns an error to the caller —
    /// persistence failures are logged and swallowed (spec §4.12).
    pub fn record(
        &self,
        caller_context: &str,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
        latency_ms: u64,
        success: bool,
        error: Option<String>,
    ) {
        let price = self.pricing.price_for(model);
        let cost_usd = (input_tokens as f64 / 1000.0) * price.input_per_1k
            + (output_tokens as f64 / 1000.0) * price.output_per_1k;

        let record = ApiCallRecord {
            timestamp: Utc::now(),
            caller_context: caller_context.to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            latency_ms,
            cost_usd,
            success,
            error,
        };

        if let Err(e) = self.append_jsonl(&record) {
            tracing::warn!("failed to append API call record to JSONL: {}", e);
        }
        if let Err(e) = self.append_csv(&record) {
            tracing::warn!("failed to append API call record to CSV: {}", e);
        }

        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(e) => tracing::warn!("tracker record lock poisoned: {}", e),
        }
    }

    fn append_jsonl(&self, record: &ApiCallRecord) -> std::io::Result<()> {
        use std::io::Write;
        if let Some(parent) = self.jsonl_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.jsonl_path)?;
        let line = serde_json::to_string(record)
            .unwrap_or_else(|e| format!("{{\"serialization_error\":\"{e}\"}}"));
        writeln!(file, "{line}")
    }

    fn append_csv(&self, record: &ApiCallRecord) -> std::io::Result<()> {
        if let Some(parent) = self.csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let write_header = !self.csv_path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            writer.write_record([
                "timestamp",
                "caller_context",
                "model",
                "input_tokens",
                "output_tokens",
                "latency_ms",
                "cost_usd",
                "success",
                "error",
            ])?;
        }
        writer.write_record(&[
            record.timestamp.to_rfc3339(),
            record.caller_context.clone(),
            record.model.clone(),
            record.input_tokens.to_string(),
            record.output_tokens.to_string(),
            record.latency_ms.to_string(),
            record.cost_usd.to_string(),
            record.success.to_string(),
            record.error.clone().unwrap_or_default(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    pub fn summary(&self) -> TrackerSummary {
        match self.records.lock() {
            Ok(records) => TrackerSummary::from_records(&records),
            Err(e) => {
                tracing::warn!("tracker record lock poisoned: {}", e);
                TrackerSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_into_correct_summary() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());

        tracker.record("enrich:incidents", "llama-3.1-70b-versatile", 100, 50, 120, true, None);
        tracker.record(
            "enrich:employees",
            "llama-3.1-70b-versatile",
            80,
            40,
            90,
            false,
            Some("llm_unavailable".to_string()),
        );

        let summary = tracker.summary();
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.successful_calls, 1);
        assert!((summary.success_rate - 0.5).abs() < 1e-9);
        assert!(summary.total_cost_usd > 0.0);
    }

    #[test]
    fn jsonl_and_csv_files_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
        tracker.record("chat", "llama-3.1-8b-instant", 10, 10, 50, true, None);

        assert!(dir.path().join("api_calls.jsonl").exists());
        assert!(dir.path().join("api_calls.csv").exists());
    }
}
