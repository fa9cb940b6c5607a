//! Portable, deterministic on-disk dump of a `KnowledgeGraph` (spec §4.7,
//! §9): stable ordering of nodes and edges so artifacts are diffable and
//! tests can byte-compare. JSON is used as the wire format; `extension()`
//! names the file this is persisted under.

use crate::error::StrataError;
use crate::models::KnowledgeGraph;

pub fn extension() -> &'static str {
    "json"
}

/// Serialize `graph` with its collections re-sorted into a canonical
/// order, independent of whatever order the builder produced them in.
pub fn dump(graph: &KnowledgeGraph) -> Result<Vec<u8>, StrataError> {
    let mut sorted = graph.clone();
    sorted.domains.sort_by_key(|d| d.domain.as_str().to_string());
    sorted.entities.sort_by(|a, b| a.name.cmp(&b.name));
    sorted.tables.sort_by(|a, b| a.name.cmp(&b.name));
    sorted.columns.sort_by(|a, b| a.node_id().cmp(&b.node_id()));
    sorted.metrics.sort_by(|a, b| a.table.cmp(&b.table));
    sorted.edges.sort_by(|a, b| {
        (
            &a.source_table,
            &a.source_column,
            &a.target_table,
            &a.target_column,
        )
            .cmp(&(&b.source_table, &b.source_column, &b.target_table, &b.target_column))
    });

    Ok(serde_json::to_vec_pretty(&sorted)?)
}

pub fn load(bytes: &[u8]) -> Result<KnowledgeGraph, StrataError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientNode;

    #[test]
    fn dump_is_order_independent() {
        let mut g1 = KnowledgeGraph {
            client: ClientNode { client_id: "c1".to_string() },
            domains: vec![],
            entities: vec![],
            tables: vec![],
            columns: vec![],
            metrics: vec![],
            edges: vec![],
        };
        let g2 = g1.clone();
        g1.domains.reverse();

        assert_eq!(dump(&g1).unwrap(), dump(&g2).unwrap());
    }
}
