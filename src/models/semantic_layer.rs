//! Output of the Semantic Assembler (C5), enriched in place by the LLM
//! Enricher (C6): `SemanticLayer`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::column_profile::ColumnProfile;
use super::fingerprint::{Fingerprint, Role};
use super::raw_schema::{ColumnDef, ForeignKeyDef, IndexDef, UniqueConstraintDef};
use super::relationship::Relationship;

/// One table's fully merged view: structure + statistics + fingerprint +
/// relationships + (after C6) narrative description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub row_count: i64,
    pub primary_key: Vec<String>,
    pub columns: Vec<ColumnDef>,
    pub explicit_foreign_keys: Vec<ForeignKeyDef>,
    pub indexes: Vec<IndexDef>,
    pub unique_constraints: Vec<UniqueConstraintDef>,
    pub column_profiles: BTreeMap<String, ColumnProfile>,
    pub fingerprint: Fingerprint,
    /// Relationships whose `source_table` is this table.
    pub relationships: Vec<Relationship>,
    pub description: Option<String>,
    pub description_generated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub description_source: Option<String>,
}

impl TableEntry {
    /// `distinct_pct` per column, recomputed at assembly time from the
    /// column profile and current row count (spec §4.5): `None` when the
    /// table has zero rows.
    pub fn distinct_pct(&self, column: &str) -> Option<f64> {
        let profile = self.column_profiles.get(column)?;
        if self.row_count <= 0 {
            return None;
        }
        Some(round2(
            100.0 * profile.distinct_count as f64 / self.row_count as f64,
        ))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Aggregate counts recomputed at assembly time — never read back as an
/// authoritative source (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerSummary {
    pub total_tables: usize,
    pub hub_count: usize,
    pub dimension_count: usize,
    pub detail_count: usize,
    pub unknown_count: usize,
    pub high_risk_count: usize,
    pub orphan_count: usize,
    pub temporal_count: usize,
    pub geospatial_count: usize,
    pub total_relationships: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticLayer {
    pub client_id: String,
    /// Monotonically incremented each time this layer supersedes a prior
    /// version for the same client.
    pub version: u64,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub tables: BTreeMap<String, TableEntry>,
    pub summary: LayerSummary,
}

impl SemanticLayer {
    /// Recompute `summary` from `tables`. Called after assembly and after
    /// every enrichment checkpoint so `summary` is always derived, never
    /// stale (spec §3).
    pub fn recompute_summary(&mut self) {
        let mut summary = LayerSummary::default();
        summary.total_tables = self.tables.len();
        for entry in self.tables.values() {
            match entry.fingerprint.role {
                Role::Hub => summary.hub_count += 1,
                Role::Dimension => summary.dimension_count += 1,
                Role::Detail => summary.detail_count += 1,
                Role::Unknown => summary.unknown_count += 1,
            }
            if matches!(
                entry.fingerprint.risk_profile,
                super::fingerprint::RiskProfile::HighRisk
            ) {
                summary.high_risk_count += 1;
            }
            if entry.fingerprint.cluster_id.starts_with("orphan") {
                summary.orphan_count += 1;
            }
            if entry.fingerprint.has_temporal {
                summary.temporal_count += 1;
            }
            if entry.fingerprint.has_geospatial {
                summary.geospatial_count += 1;
            }
            summary.total_relationships += entry.relationships.len();
        }
        self.summary = summary;
    }
}
