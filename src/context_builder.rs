//! Schema Context Builder (C8): materializes a compact textual schema
//! view for a client from the queryable graph store (spec §4.8), used
//! directly as the system-prompt context for C9.

use std::collections::BTreeMap;

use crate::error::StrataError;
use crate::graph::GraphStore;

const MAX_COLUMNS_PER_TABLE: usize = 20;

/// `build_context(client) → str` (spec §4.8): one block per table, with
/// columns capped and joins listed only when present. Deterministic —
/// tables and columns are sorted by name regardless of store order.
pub async fn build_context(graph: &dyn GraphStore, client_id: &str) -> Result<String, StrataError> {
    let mut views = graph.tables_for_client(client_id).await?;
    views.sort_by(|a, b| a.table.name.cmp(&b.table.name));

    let mut blocks = Vec::with_capacity(views.len());
    for view in &views {
        let mut columns = view.columns.clone();
        columns.sort_by(|a, b| a.column.cmp(&b.column));

        let mut column_parts: Vec<String> = columns
            .iter()
            .take(MAX_COLUMNS_PER_TABLE)
            .map(|c| format!("{} ({})", c.column, c.sql_type))
            .collect();
        let remaining = columns.len().saturating_sub(MAX_COLUMNS_PER_TABLE);
        if remaining > 0 {
            column_parts.push(format!("… +{} more", remaining));
        }

        let mut outgoing = view.outgoing.clone();
        outgoing.sort_by(|a, b| {
            (&a.target_table, &a.target_column).cmp(&(&b.target_table, &b.target_column))
        });
        let join_parts: Vec<String> = outgoing
            .iter()
            .map(|edge| format!("{}({})", edge.target_table, edge.target_column))
            .collect();

        let mut block = format!("TABLE {}:\n  Columns: {}", view.table.name, column_parts.join(", "));
        if !join_parts.is_empty() {
            block.push_str(&format!("\n  Joins to: {}", join_parts.join(", ")));
        }
        blocks.push(block);
    }

    Ok(blocks.join("\n\n"))
}

/// Group a flat list of tables by name for callers that already hold
/// `GraphTableView`s in memory (used by tests and the offline CLI path).
pub fn index_by_table_name<'a>(
    views: &'a [crate::graph::GraphTableView],
) -> BTreeMap<&'a str, &'a crate::graph::GraphTableView> {
    views.iter().map(|v| (v.table.name.as_str(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphTableView;
    use crate::models::{
        BusinessDomain, ColumnNode, ColumnRole, EdgeCardinality, RelationshipEdge, Role,
        SemanticRole, TableNode,
    };
    use async_trait::async_trait;

    struct FakeGraphStore {
        views: Vec<GraphTableView>,
    }

    #[async_trait]
    impl GraphStore for FakeGraphStore {
        async fn load(&self, _client_id: &str, _graph: &crate::models::KnowledgeGraph) -> Result<(), StrataError> {
            Ok(())
        }

        async fn tables_for_client(&self, _client_id: &str) -> Result<Vec<GraphTableView>, StrataError> {
            Ok(self.views.clone())
        }

        async fn purge_client(&self, _client_id: &str) -> Result<(), StrataError> {
            Ok(())
        }
    }

    fn edge(target_table: &str, target_column: &str) -> RelationshipEdge {
        RelationshipEdge {
            source_table: "incident_details".to_string(),
            source_column: "incident_id".to_string(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
            cardinality: EdgeCardinality::ManyToOne,
            semantic_role: SemanticRole::DetailToHeader,
            confidence: 1.0,
            evidence: "foreign_key_constraint".to_string(),
        }
    }

    #[tokio::test]
    async fn builds_one_block_per_table_with_columns_and_joins() {
        let store = FakeGraphStore {
            views: vec![GraphTableView {
                table: TableNode {
                    name: "incident_details".to_string(),
                    role: Role::Detail,
                    row_count: 500,
                    data_quality_score: 0.9,
                    has_temporal: false,
                    has_geospatial: false,
                    domain: BusinessDomain::IncidentTracking,
                },
                columns: vec![
                    ColumnNode {
                        table: "incident_details".to_string(),
                        column: "id".to_string(),
                        sql_type: "integer".to_string(),
                        column_role: ColumnRole::PrimaryKey,
                    },
                    ColumnNode {
                        table: "incident_details".to_string(),
                        column: "incident_id".to_string(),
                        sql_type: "integer".to_string(),
                        column_role: ColumnRole::ForeignKey,
                    },
                ],
                outgoing: vec![edge("incidents", "id")],
            }],
        };

        let context = build_context(&store, "c1").await.unwrap();
        assert!(context.starts_with("TABLE incident_details:"));
        assert!(context.contains("Columns: id (integer), incident_id (integer)"));
        assert!(context.contains("Joins to: incidents(id)"));
    }

    #[tokio::test]
    async fn tables_with_no_outgoing_edges_omit_joins_line() {
        let store = FakeGraphStore {
            views: vec![GraphTableView {
                table: TableNode {
                    name: "employees".to_string(),
                    role: Role::Dimension,
                    row_count: 1000,
                    data_quality_score: 1.0,
                    has_temporal: false,
                    has_geospatial: false,
                    domain: BusinessDomain::PersonnelManagement,
                },
                columns: vec![ColumnNode {
                    table: "employees".to_string(),
                    column: "emp_id".to_string(),
                    sql_type: "integer".to_string(),
                    column_role: ColumnRole::PrimaryKey,
                }],
                outgoing: vec![],
            }],
        };

        let context = build_context(&store, "c1").await.unwrap();
        assert!(!context.contains("Joins to"));
    }

    #[tokio::test]
    async fn column_list_beyond_the_cap_is_summarized() {
        let columns: Vec<ColumnNode> = (0..25)
            .map(|i| ColumnNode {
                table: "wide_table".to_string(),
                column: format!("col_{:02}", i),
                sql_type: "integer".to_string(),
                column_role: ColumnRole::Attribute,
            })
            .collect();
        let store = FakeGraphStore {
            views: vec![GraphTableView {
                table: TableNode {
                    name: "wide_table".to_string(),
                    role: Role::Dimension,
                    row_count: 10,
                    data_quality_score: 1.0,
                    has_temporal: false,
                    has_geospatial: false,
                    domain: BusinessDomain::General,
                },
                columns,
                outgoing: vec![],
            }],
        };

        let context = build_context(&store, "c1").await.unwrap();
        assert!(context.contains("… +5 more"));
    }
}
