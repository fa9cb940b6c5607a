//! Neo4j-backed `GraphStore` (spec §6, reference target Neo4j 5+).

use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{query, Graph};

use crate::error::StrataError;
use crate::models::{
    BusinessDomain, ColumnNode, ColumnRole, EdgeCardinality, KnowledgeGraph, RelationshipEdge,
    Role, SemanticRole, TableNode,
};

use super::{GraphStore, GraphTableView};

/// Deadline applied to every graph-store round trip (spec §5: every
/// external call — database, graph, LLM — is subject to a deadline).
pub const GRAPH_QUERY_DEADLINE: Duration = Duration::from_secs(30);

async fn with_deadline<F, T>(fut: F) -> Result<T, StrataError>
where
    F: std::future::Future<Output = Result<T, StrataError>>,
{
    match tokio::time::timeout(GRAPH_QUERY_DEADLINE, fut).await {
        Ok(result) => result,
        Err(_) => Err(StrataError::GraphStoreUnavailable(
            "graph query deadline exceeded".to_string(),
        )),
    }
}

fn role_from_str(s: &str) -> Role {
    match s {
        "hub" => Role::Hub,
        "dimension" => Role::Dimension,
        "detail" => Role::Detail,
        _ => Role::Unknown,
    }
}

fn domain_from_str(s: &str) -> BusinessDomain {
    match s {
        "incident_tracking" => BusinessDomain::IncidentTracking,
        "ehs_compliance" => BusinessDomain::EhsCompliance,
        "facility_operations" => BusinessDomain::FacilityOperations,
        "personnel_management" => BusinessDomain::PersonnelManagement,
        _ => BusinessDomain::General,
    }
}

fn column_role_from_str(s: &str) -> ColumnRole {
    match s {
        "primary_key" => ColumnRole::PrimaryKey,
        "foreign_key" => ColumnRole::ForeignKey,
        "temporal" => ColumnRole::Temporal,
        "geospatial" => ColumnRole::Geospatial,
        "status" => ColumnRole::Status,
        "audit" => ColumnRole::Audit,
        "measure" => ColumnRole::Measure,
        "text" => ColumnRole::Text,
        _ => ColumnRole::Attribute,
    }
}

fn cardinality_from_str(s: &str) -> EdgeCardinality {
    match s {
        "M:1" => EdgeCardinality::ManyToOne,
        _ => EdgeCardinality::OneToMany,
    }
}

fn semantic_role_from_str(s: &str) -> SemanticRole {
    match s {
        "detail_to_header" => SemanticRole::DetailToHeader,
        "child_to_parent" => SemanticRole::ChildToParent,
        _ => SemanticRole::Reference,
    }
}

pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, StrataError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(StrataError::from)?;
        Ok(Self { graph })
    }

    /// Idempotent uniqueness-constraint bootstrap. Safe to call on every
    /// startup: Neo4j's `IF NOT EXISTS` makes repeated calls no-ops.
    pub async fn ensure_constraints(&self) -> Result<(), StrataError> {
        let statements = [
            "CREATE CONSTRAINT strata_client_unique IF NOT EXISTS \
             FOR (c:Client) REQUIRE c.client_id IS UNIQUE",
            "CREATE CONSTRAINT strata_table_unique IF NOT EXISTS \
             FOR (t:Table) REQUIRE (t.client_id, t.name) IS UNIQUE",
            "CREATE CONSTRAINT strata_column_unique IF NOT EXISTS \
             FOR (c:Column) REQUIRE (c.client_id, c.table, c.name) IS UNIQUE",
        ];
        for stmt in statements {
            self.graph.run(query(stmt)).await.map_err(StrataError::from)?;
        }
        Ok(())
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::Hub => "hub",
            Role::Dimension => "dimension",
            Role::Detail => "detail",
            Role::Unknown => "unknown",
        }
    }

    fn domain_str(domain: BusinessDomain) -> &'static str {
        domain.as_str()
    }

    fn column_role_str(role: ColumnRole) -> &'static str {
        match role {
            ColumnRole::PrimaryKey => "primary_key",
            ColumnRole::ForeignKey => "foreign_key",
            ColumnRole::Temporal => "temporal",
            ColumnRole::Geospatial => "geospatial",
            ColumnRole::Status => "status",
            ColumnRole::Audit => "audit",
            ColumnRole::Measure => "measure",
            ColumnRole::Text => "text",
            ColumnRole::Attribute => "attribute",
        }
    }

    fn cardinality_str(cardinality: EdgeCardinality) -> &'static str {
        match cardinality {
            EdgeCardinality::ManyToOne => "M:1",
            EdgeCardinality::OneToMany => "1:M",
        }
    }

    fn semantic_role_str(role: SemanticRole) -> &'static str {
        match role {
            SemanticRole::DetailToHeader => "detail_to_header",
            SemanticRole::ChildToParent => "child_to_parent",
            SemanticRole::Reference => "reference",
        }
    }
}

impl Neo4jStore {
    async fn load_inner(&self, client_id: &str, graph: &KnowledgeGraph) -> Result<(), StrataError> {
        self.graph
            .run(
                query("MERGE (c:Client {client_id: $client_id})").param("client_id", client_id),
            )
            .await
            .map_err(StrataError::from)?;

        for domain in &graph.domains {
            self.graph
                .run(
                    query(
                        "MATCH (c:Client {client_id: $client_id}) \
                         MERGE (d:Domain {client_id: $client_id, name: $domain}) \
                         MERGE (c)-[:HAS_DOMAIN]->(d)",
                    )
                    .param("client_id", client_id)
                    .param("domain", Self::domain_str(domain.domain)),
                )
                .await
                .map_err(StrataError::from)?;
        }

        for entity in &graph.entities {
            self.graph
                .run(
                    query(
                        "MATCH (d:Domain {client_id: $client_id, name: $domain}) \
                         MERGE (e:Entity {client_id: $client_id, name: $name}) \
                         MERGE (d)-[:HAS_ENTITY]->(e)",
                    )
                    .param("client_id", client_id)
                    .param("domain", Self::domain_str(entity.domain))
                    .param("name", entity.name.as_str()),
                )
                .await
                .map_err(StrataError::from)?;
        }

        for table in &graph.tables {
            self.graph
                .run(
                    query(
                        "MERGE (t:Table {client_id: $client_id, name: $name}) \
                         SET t.role = $role, t.row_count = $row_count, \
                             t.data_quality_score = $dqs, t.has_temporal = $has_temporal, \
                             t.has_geospatial = $has_geospatial, t.domain = $domain \
                         WITH t \
                         MATCH (e:Entity {client_id: $client_id, name: $domain}) \
                         MERGE (e)-[:HAS_TABLE]->(t)",
                    )
                    .param("client_id", client_id)
                    .param("name", table.name.as_str())
                    .param("role", Self::role_str(table.role))
                    .param("row_count", table.row_count)
                    .param("dqs", table.data_quality_score)
                    .param("has_temporal", table.has_temporal)
                    .param("has_geospatial", table.has_geospatial)
                    .param("domain", Self::domain_str(table.domain)),
                )
                .await
                .map_err(StrataError::from)?;
        }

        for column in &graph.columns {
            self.graph
                .run(
                    query(
                        "MERGE (c:Column {client_id: $client_id, table: $table, name: $name}) \
                         SET c.column_role = $role, c.sql_type = $sql_type \
                         WITH c \
                         MATCH (t:Table {client_id: $client_id, name: $table}) \
                         MERGE (t)-[:HAS_COLUMN]->(c)",
                    )
                    .param("client_id", client_id)
                    .param("table", column.table.as_str())
                    .param("name", column.column.as_str())
                    .param("role", Self::column_role_str(column.column_role))
                    .param("sql_type", column.sql_type.as_str()),
                )
                .await
                .map_err(StrataError::from)?;
        }

        for metric in &graph.metrics {
            self.graph
                .run(
                    query(
                        "MATCH (t:Table {client_id: $client_id, name: $table}) \
                         MERGE (m:Metric {client_id: $client_id, table: $table}) \
                         SET m.data_quality_score = $dqs \
                         MERGE (t)-[:HAS_METRIC]->(m)",
                    )
                    .param("client_id", client_id)
                    .param("table", metric.table.as_str())
                    .param("dqs", metric.data_quality_score),
                )
                .await
                .map_err(StrataError::from)?;
        }

        for edge in &graph.edges {
            self.graph
                .run(
                    query(
                        "MATCH (s:Table {client_id: $client_id, name: $source}) \
                         MATCH (t:Table {client_id: $client_id, name: $target}) \
                         MERGE (s)-[r:FOREIGN_KEY {source_column: $source_column, target_column: $target_column}]->(t) \
                         SET r.cardinality = $cardinality, r.semantic_role = $semantic_role, \
                             r.confidence = $confidence, r.evidence = $evidence",
                    )
                    .param("client_id", client_id)
                    .param("source", edge.source_table.as_str())
                    .param("target", edge.target_table.as_str())
                    .param("source_column", edge.source_column.as_str())
                    .param("target_column", edge.target_column.as_str())
                    .param("cardinality", Self::cardinality_str(edge.cardinality))
                    .param("semantic_role", Self::semantic_role_str(edge.semantic_role))
                    .param("confidence", edge.confidence)
                    .param("evidence", edge.evidence.as_str()),
                )
                .await
                .map_err(StrataError::from)?;
        }

        Ok(())
    }

    async fn tables_for_client_inner(&self, client_id: &str) -> Result<Vec<GraphTableView>, StrataError> {
        let mut table_rows = self
            .graph
            .execute(
                query(
                    "MATCH (t:Table {client_id: $client_id}) \
                     RETURN t.name AS name, t.role AS role, t.row_count AS row_count, \
                            t.data_quality_score AS dqs, t.has_temporal AS has_temporal, \
                            t.has_geospatial AS has_geospatial, t.domain AS domain",
                )
                .param("client_id", client_id),
            )
            .await
            .map_err(StrataError::from)?;

        let mut views = Vec::new();
        while let Some(row) = table_rows.next().await.map_err(StrataError::from)? {
            let name: String = row.get("name").unwrap_or_default();
            let role: String = row.get("role").unwrap_or_default();
            let domain: String = row.get("domain").unwrap_or_default();

            let table = TableNode {
                name: name.clone(),
                role: role_from_str(&role),
                row_count: row.get::<i64>("row_count").unwrap_or(0),
                data_quality_score: row.get::<f64>("dqs").unwrap_or(0.0),
                has_temporal: row.get::<bool>("has_temporal").unwrap_or(false),
                has_geospatial: row.get::<bool>("has_geospatial").unwrap_or(false),
                domain: domain_from_str(&domain),
            };

            let mut column_rows = self
                .graph
                .execute(
                    query(
                        "MATCH (c:Column {client_id: $client_id, table: $table}) \
                         RETURN c.name AS name, c.column_role AS role, c.sql_type AS sql_type",
                    )
                    .param("client_id", client_id)
                    .param("table", name.as_str()),
                )
                .await
                .map_err(StrataError::from)?;
            let mut columns = Vec::new();
            while let Some(crow) = column_rows.next().await.map_err(StrataError::from)? {
                let col_name: String = crow.get("name").unwrap_or_default();
                let col_role: String = crow.get("role").unwrap_or_default();
                let sql_type: String = crow.get("sql_type").unwrap_or_default();
                columns.push(ColumnNode {
                    table: name.clone(),
                    column: col_name,
                    sql_type,
                    column_role: column_role_from_str(&col_role),
                });
            }

            let mut edge_rows = self
                .graph
                .execute(
                    query(
                        "MATCH (:Table {client_id: $client_id, name: $table})-[r:FOREIGN_KEY]->(t2:Table) \
                         RETURN t2.name AS target, r.source_column AS source_column, \
                                r.target_column AS target_column, r.cardinality AS cardinality, \
                                r.semantic_role AS semantic_role, r.confidence AS confidence, \
                                r.evidence AS evidence",
                    )
                    .param("client_id", client_id)
                    .param("table", name.as_str()),
                )
                .await
                .map_err(StrataError::from)?;
            let mut outgoing = Vec::new();
            while let Some(erow) = edge_rows.next().await.map_err(StrataError::from)? {
                let cardinality: String = erow.get("cardinality").unwrap_or_default();
                let semantic_role: String = erow.get("semantic_role").unwrap_or_default();
                outgoing.push(RelationshipEdge {
                    source_table: name.clone(),
                    target_table: erow.get("target").unwrap_or_default(),
                    source_column: erow.get("source_column").unwrap_or_default(),
                    target_column: erow.get("target_column").unwrap_or_default(),
                    cardinality: cardinality_from_str(&cardinality),
                    semantic_role: semantic_role_from_str(&semantic_role),
                    confidence: erow.get::<f64>("confidence").unwrap_or(0.0),
                    evidence: erow.get("evidence").unwrap_or_default(),
                });
            }

            views.push(GraphTableView { table, columns, outgoing });
        }

        Ok(views)
    }

    async fn purge_client_inner(&self, client_id: &str) -> Result<(), StrataError> {
        self.graph
            .run(
                query(
                    "MATCH (n {client_id: $client_id}) DETACH DELETE n",
                )
                .param("client_id", client_id),
            )
            .await
            .map_err(StrataError::from)?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn load(&self, client_id: &str, graph: &KnowledgeGraph) -> Result<(), StrataError> {
        with_deadline(self.load_inner(client_id, graph)).await
    }

    async fn tables_for_client(&self, client_id: &str) -> Result<Vec<GraphTableView>, StrataError> {
        with_deadline(self.tables_for_client_inner(client_id)).await
    }

    async fn purge_client(&self, client_id: &str) -> Result<(), StrataError> {
        with_deadline(self.purge_client_inner(client_id)).await
    }
}
