//! Output of the Graph Builder (C7): the seven-layer `KnowledgeGraph`.

use serde::{Deserialize, Serialize};

use super::fingerprint::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessDomain {
    IncidentTracking,
    EhsCompliance,
    FacilityOperations,
    PersonnelManagement,
    General,
}

impl BusinessDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessDomain::IncidentTracking => "incident_tracking",
            BusinessDomain::EhsCompliance => "ehs_compliance",
            BusinessDomain::FacilityOperations => "facility_operations",
            BusinessDomain::PersonnelManagement => "personnel_management",
            BusinessDomain::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    PrimaryKey,
    ForeignKey,
    Temporal,
    Geospatial,
    Status,
    Audit,
    Measure,
    Text,
    Attribute,
}

/// Layer 0: exactly one per client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientNode {
    pub client_id: String,
}

/// Layer 1: a business domain tag, linked from the client root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainNode {
    pub domain: BusinessDomain,
}

/// Layer 2: one per domain, aggregating its tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub name: String,
    pub domain: BusinessDomain,
}

/// Layer 3: node id is the table name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub role: Role,
    pub row_count: i64,
    pub data_quality_score: f64,
    pub has_temporal: bool,
    pub has_geospatial: bool,
    pub domain: BusinessDomain,
}

/// Layer 4: node id is `"table:column"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnNode {
    pub table: String,
    pub column: String,
    pub sql_type: String,
    pub column_role: ColumnRole,
}

impl ColumnNode {
    pub fn node_id(&self) -> String {
        format!("{}:{}", self.table, self.column)
    }
}

/// Layer 5: per-table data quality metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricNode {
    pub table: String,
    pub data_quality_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdgeCardinality {
    #[serde(rename = "M:1")]
    ManyToOne,
    #[serde(rename = "1:M")]
    OneToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    DetailToHeader,
    ChildToParent,
    Reference,
}

/// The single edge layer: table -> table, typed `foreign_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source_table: String,
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
    pub cardinality: EdgeCardinality,
    pub semantic_role: SemanticRole,
    pub confidence: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub client: ClientNode,
    pub domains: Vec<DomainNode>,
    pub entities: Vec<EntityNode>,
    pub tables: Vec<TableNode>,
    pub columns: Vec<ColumnNode>,
    pub metrics: Vec<MetricNode>,
    pub edges: Vec<RelationshipEdge>,
}

/// Per-table and per-column component of the quality score in spec §3:
/// `0.5*(1 - null_pct/100) + 0.3*(distinct_pct/100 if is_key else 1) +
/// 0.2*(0.95 if distinct_pct < 5 else 1)`, averaged over columns.
pub fn data_quality_score(columns: &[(f64, f64, bool)]) -> f64 {
    if columns.is_empty() {
        return 1.0;
    }
    let mut total = 0.0;
    for &(null_pct, distinct_pct, is_key) in columns {
        let completeness = 0.5 * (1.0 - null_pct / 100.0);
        let uniqueness = 0.3 * (if is_key { distinct_pct / 100.0 } else { 1.0 });
        let distribution = 0.2 * (if distinct_pct < 5.0 { 0.95 } else { 1.0 });
        total += completeness + uniqueness + distribution;
    }
    let score = total / columns.len() as f64;
    score.clamp(0.0, 1.0)
}

/// Layer counts, persisted as `knowledge_graph_summary.json` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    pub domain_count: usize,
    pub entity_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    pub metric_count: usize,
    pub edge_count: usize,
    pub per_table: Vec<TableSummaryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummaryEntry {
    pub table: String,
    pub role: Role,
    pub data_quality_score: f64,
    pub incoming: usize,
    pub outgoing: usize,
}

impl KnowledgeGraph {
    pub fn summary(&self) -> GraphSummary {
        let mut per_table = Vec::new();
        for table in &self.tables {
            let incoming = self
                .edges
                .iter()
                .filter(|e| e.target_table == table.name)
                .count();
            let outgoing = self
                .edges
                .iter()
                .filter(|e| e.source_table == table.name)
                .count();
            per_table.push(TableSummaryEntry {
                table: table.name.clone(),
                role: table.role,
                data_quality_score: table.data_quality_score,
                incoming,
                outgoing,
            });
        }
        GraphSummary {
            domain_count: self.domains.len(),
            entity_count: self.entities.len(),
            table_count: self.tables.len(),
            column_count: self.columns.len(),
            metric_count: self.metrics.len(),
            edge_count: self.edges.len(),
            per_table,
        }
    }
}
