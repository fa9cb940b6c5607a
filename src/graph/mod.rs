//! Graph store capability (spec §6): the abstract surface the graph
//! builder (C7) and schema context builder (C8) are written against,
//! implemented for Neo4j in `neo4j`. `portable` holds the deterministic
//! on-disk dump kept alongside the queryable store.

pub mod builder;
pub mod neo4j;
pub mod portable;

use async_trait::async_trait;

use crate::error::StrataError;
use crate::models::{ColumnNode, KnowledgeGraph, RelationshipEdge, TableNode};

/// A minimal table/column view read back from the queryable store, enough
/// to drive the schema context builder (C8) without depending on the
/// full `KnowledgeGraph` shape.
#[derive(Debug, Clone)]
pub struct GraphTableView {
    pub table: TableNode,
    pub columns: Vec<ColumnNode>,
    pub outgoing: Vec<RelationshipEdge>,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Idempotent upsert of every node and edge in `graph`, keyed by
    /// `(client_id, name)` on tables and `(client_id, table, name)` on
    /// columns (spec §4.7).
    async fn load(&self, client_id: &str, graph: &KnowledgeGraph) -> Result<(), StrataError>;

    /// Tables and columns for a client, used by the schema context
    /// builder. Order is not guaranteed to be stable; callers sort.
    async fn tables_for_client(&self, client_id: &str) -> Result<Vec<GraphTableView>, StrataError>;

    /// Remove every node and edge belonging to `client_id`.
    async fn purge_client(&self, client_id: &str) -> Result<(), StrataError>;
}
