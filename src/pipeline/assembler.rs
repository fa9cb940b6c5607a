//! Semantic Assembler (C5): deterministic merge of C1–C4 into one
//! versioned `SemanticLayer` (spec §4.5).

use std::collections::BTreeMap;

use chrono::Utc;

use crate::models::{FingerprintMap, ProfileMap, RawSchema, RelationshipSet, SemanticLayer, TableEntry};

/// Assemble a new semantic layer version. `previous_version` is the version
/// number of the layer this assembly supersedes (0 if there is none yet).
pub fn assemble(
    client_id: &str,
    previous_version: u64,
    schema: &RawSchema,
    profiles: &ProfileMap,
    fingerprints: &FingerprintMap,
    relationships: &RelationshipSet,
) -> SemanticLayer {
    let mut tables = BTreeMap::new();

    for (table_name, table_schema) in &schema.tables {
        let column_profiles = profiles
            .tables
            .get(table_name)
            .cloned()
            .unwrap_or_default();
        let fingerprint = fingerprints
            .tables
            .get(table_name)
            .cloned()
            .unwrap_or_else(|| crate::models::Fingerprint {
                role: crate::models::Role::Unknown,
                risk_profile: crate::models::RiskProfile::LowRisk,
                redline_comments: Vec::new(),
                cluster_id: format!("orphan:{table_name}"),
                has_temporal: false,
                has_geospatial: false,
            });
        let table_relationships = relationships
            .edges_by_source
            .get(table_name)
            .cloned()
            .unwrap_or_default();

        tables.insert(
            table_name.clone(),
            TableEntry {
                row_count: table_schema.row_count,
                primary_key: table_schema.primary_key.clone(),
                columns: table_schema.columns.clone(),
                explicit_foreign_keys: table_schema.explicit_foreign_keys.clone(),
                indexes: table_schema.indexes.clone(),
                unique_constraints: table_schema.unique_constraints.clone(),
                column_profiles,
                fingerprint,
                relationships: table_relationships,
                description: None,
                description_generated_at: None,
                description_source: None,
            },
        );
    }

    let mut layer = SemanticLayer {
        client_id: client_id.to_string(),
        version: previous_version + 1,
        generated_at: Utc::now(),
        tables,
        summary: Default::default(),
    };
    layer.recompute_summary();
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDef, TableSchema};

    #[test]
    fn assembly_merges_all_four_inputs_and_recomputes_summary() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "incidents".to_string(),
            TableSchema {
                row_count: 5,
                primary_key: vec!["id".to_string()],
                columns: vec![ColumnDef {
                    name: "id".to_string(),
                    sql_type: "integer".to_string(),
                    nullable: false,
                    default: None,
                    comment: None,
                }],
                explicit_foreign_keys: vec![],
                indexes: vec![],
                unique_constraints: vec![],
                row_count_warning: None,
            },
        );
        let schema = RawSchema { tables };
        let profiles = ProfileMap::default();
        let fingerprints = FingerprintMap::default();
        let relationships = RelationshipSet::from_relationships(vec![]);

        let layer = assemble("c1", 0, &schema, &profiles, &fingerprints, &relationships);
        assert_eq!(layer.version, 1);
        assert_eq!(layer.summary.total_tables, 1);
        assert!(layer.tables["incidents"].description.is_none());
    }

    #[test]
    fn assembly_increments_version_on_resupersede() {
        let schema = RawSchema::default();
        let layer = assemble(
            "c1",
            3,
            &schema,
            &ProfileMap::default(),
            &FingerprintMap::default(),
            &RelationshipSet::from_relationships(vec![]),
        );
        assert_eq!(layer.version, 4);
    }
}
