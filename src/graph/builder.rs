//! Graph Builder (C7): lowers a `SemanticLayer` into the seven-layer
//! typed `KnowledgeGraph` (spec §4.7).

use crate::models::{
    data_quality_score, BusinessDomain, ClientNode, ColumnNode, ColumnRole, DomainNode,
    EdgeCardinality, EntityNode, KnowledgeGraph, MetricNode, Relationship, RelationshipEdge,
    Role, SemanticLayer, SemanticRole, TableEntry, TableNode,
};

const TEMPORAL_KEYWORDS: &[&str] = &["date", "time", "timestamp", "created", "modified", "updated"];
const GEOSPATIAL_KEYWORDS: &[&str] = &["location", "geo", "latitude", "longitude", "coords", "address"];
const STATUS_KEYWORDS: &[&str] = &["status", "state"];
const AUDIT_KEYWORDS: &[&str] = &["created_by", "updated_by", "deleted", "audit"];

/// Classify a table into a business domain by name keywords (spec §4.7).
fn classify_domain(table_name: &str) -> BusinessDomain {
    let lowered = table_name.to_lowercase();
    if lowered.contains("incident") {
        BusinessDomain::IncidentTracking
    } else if lowered.contains("corrective") {
        BusinessDomain::EhsCompliance
    } else if lowered.contains("facility") {
        BusinessDomain::FacilityOperations
    } else if lowered.contains("employee") {
        BusinessDomain::PersonnelManagement
    } else {
        BusinessDomain::General
    }
}

fn classify_column_role(entry: &TableEntry, column_name: &str) -> ColumnRole {
    if entry.primary_key.iter().any(|c| c == column_name) {
        return ColumnRole::PrimaryKey;
    }
    if entry
        .explicit_foreign_keys
        .iter()
        .any(|fk| fk.columns.iter().any(|c| c == column_name))
    {
        return ColumnRole::ForeignKey;
    }
    let lowered = column_name.to_lowercase();
    if TEMPORAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ColumnRole::Temporal;
    }
    if GEOSPATIAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ColumnRole::Geospatial;
    }
    if STATUS_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ColumnRole::Status;
    }
    if AUDIT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return ColumnRole::Audit;
    }
    if let Some(profile) = entry.column_profiles.get(column_name) {
        if profile.numeric_stats.is_some() {
            return ColumnRole::Measure;
        }
    }
    if entry
        .columns
        .iter()
        .find(|c| c.name == column_name)
        .map(|c| c.sql_type.to_lowercase().contains("text") || c.sql_type.to_lowercase().contains("char"))
        .unwrap_or(false)
    {
        return ColumnRole::Text;
    }
    ColumnRole::Attribute
}

/// Edge cardinality rule (spec §4.7): `M:1` unless the source column is a
/// key and the target isn't, in which case `1:M`.
fn edge_cardinality(
    source_entry: &TableEntry,
    source_column: &str,
    target_entry: &TableEntry,
    target_column: &str,
) -> EdgeCardinality {
    let source_is_key = source_entry.primary_key.iter().any(|c| c == source_column);
    let target_is_key = target_entry.primary_key.iter().any(|c| c == target_column);
    if !source_is_key && target_is_key {
        EdgeCardinality::ManyToOne
    } else {
        EdgeCardinality::OneToMany
    }
}

fn semantic_role(source_table: &str, target_role: Role) -> SemanticRole {
    let lowered = source_table.to_lowercase();
    if lowered.contains("detail") {
        SemanticRole::DetailToHeader
    } else if matches!(target_role, Role::Dimension) {
        SemanticRole::ChildToParent
    } else {
        SemanticRole::Reference
    }
}

fn relationship_to_edge(
    relationship: &Relationship,
    layer: &SemanticLayer,
) -> Option<RelationshipEdge> {
    let source_entry = layer.tables.get(&relationship.source_table)?;
    let target_entry = layer.tables.get(&relationship.target_table)?;

    Some(RelationshipEdge {
        source_table: relationship.source_table.clone(),
        target_table: relationship.target_table.clone(),
        source_column: relationship.source_column.clone(),
        target_column: relationship.target_column.clone(),
        cardinality: edge_cardinality(
            source_entry,
            &relationship.source_column,
            target_entry,
            &relationship.target_column,
        ),
        semantic_role: semantic_role(&relationship.source_table, target_entry.fingerprint.role),
        confidence: relationship.confidence,
        evidence: relationship.evidence.clone(),
    })
}

fn table_column_quality_inputs(entry: &TableEntry) -> Vec<(f64, f64, bool)> {
    entry
        .columns
        .iter()
        .map(|column| {
            let is_key = entry.primary_key.iter().any(|c| c == &column.name);
            let profile = entry.column_profiles.get(&column.name);
            let null_pct = profile.map(|p| p.null_pct).unwrap_or(0.0);
            let distinct_pct = entry.distinct_pct(&column.name).unwrap_or(100.0);
            (null_pct, distinct_pct, is_key)
        })
        .collect()
}

/// Lower a semantic layer into the full node/edge graph.
pub fn build(layer: &SemanticLayer) -> KnowledgeGraph {
    let client = ClientNode {
        client_id: layer.client_id.clone(),
    };

    let mut domains: Vec<DomainNode> = Vec::new();
    let mut entities: Vec<EntityNode> = Vec::new();
    let mut tables = Vec::new();
    let mut columns = Vec::new();
    let mut metrics = Vec::new();
    let mut seen_domains = std::collections::BTreeSet::new();

    for (table_name, entry) in &layer.tables {
        let domain = classify_domain(table_name);
        let domain_key = domain.as_str();
        if seen_domains.insert(domain_key) {
            domains.push(DomainNode { domain });
            entities.push(EntityNode {
                name: domain_key.to_string(),
                domain,
            });
        }

        let quality_inputs = table_column_quality_inputs(entry);
        let data_quality = data_quality_score(&quality_inputs);

        tables.push(TableNode {
            name: table_name.clone(),
            role: entry.fingerprint.role,
            row_count: entry.row_count,
            data_quality_score: data_quality,
            has_temporal: entry.fingerprint.has_temporal,
            has_geospatial: entry.fingerprint.has_geospatial,
            domain,
        });

        metrics.push(MetricNode {
            table: table_name.clone(),
            data_quality_score: data_quality,
        });

        for column in &entry.columns {
            columns.push(ColumnNode {
                table: table_name.clone(),
                column: column.name.clone(),
                sql_type: column.sql_type.clone(),
                column_role: classify_column_role(entry, &column.name),
            });
        }
    }

    let mut edges = Vec::new();
    for entry in layer.tables.values() {
        for relationship in &entry.relationships {
            if let Some(edge) = relationship_to_edge(relationship, layer) {
                edges.push(edge);
            }
        }
    }

    KnowledgeGraph {
        client,
        domains,
        entities,
        tables,
        columns,
        metrics,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDef, Fingerprint, LayerSummary, RelationshipType, RiskProfile};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn entry(role: Role, columns: Vec<&str>, primary_key: Vec<&str>) -> TableEntry {
        TableEntry {
            row_count: 100,
            primary_key: primary_key.into_iter().map(String::from).collect(),
            columns: columns
                .into_iter()
                .map(|c| ColumnDef {
                    name: c.to_string(),
                    sql_type: "integer".to_string(),
                    nullable: false,
                    default: None,
                    comment: None,
                })
                .collect(),
            explicit_foreign_keys: vec![],
            indexes: vec![],
            unique_constraints: vec![],
            column_profiles: BTreeMap::new(),
            fingerprint: Fingerprint {
                role,
                risk_profile: RiskProfile::LowRisk,
                redline_comments: vec![],
                cluster_id: "cluster:incidents".to_string(),
                has_temporal: false,
                has_geospatial: false,
            },
            relationships: vec![],
            description: None,
            description_generated_at: None,
            description_source: None,
        }
    }

    #[test]
    fn incident_table_classified_into_incident_tracking_domain() {
        let mut tables = BTreeMap::new();
        tables.insert("incidents".to_string(), entry(Role::Hub, vec!["id"], vec!["id"]));
        let layer = SemanticLayer {
            client_id: "c1".to_string(),
            version: 1,
            generated_at: Utc::now(),
            tables,
            summary: LayerSummary::default(),
        };

        let graph = build(&layer);
        assert_eq!(graph.tables.len(), 1);
        assert_eq!(graph.tables[0].domain, BusinessDomain::IncidentTracking);
        assert_eq!(graph.entities.len(), 1);
    }

    #[test]
    fn relationship_with_key_target_becomes_many_to_one() {
        let mut tables = BTreeMap::new();
        let mut incidents = entry(Role::Hub, vec!["id"], vec!["id"]);
        let mut details = entry(Role::Detail, vec!["id", "incident_id"], vec!["id"]);
        details.relationships.push(Relationship {
            source_table: "incident_details".to_string(),
            source_column: "incident_id".to_string(),
            target_table: "incidents".to_string(),
            target_column: "id".to_string(),
            kind: RelationshipType::Explicit,
            confidence: 1.0,
            evidence: "foreign_key_constraint".to_string(),
        });
        tables.insert("incidents".to_string(), incidents.clone());
        tables.insert("incident_details".to_string(), details);
        incidents.row_count = 100;

        let layer = SemanticLayer {
            client_id: "c1".to_string(),
            version: 1,
            generated_at: Utc::now(),
            tables,
            summary: LayerSummary::default(),
        };

        let graph = build(&layer);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].cardinality, EdgeCardinality::ManyToOne);
    }
}
