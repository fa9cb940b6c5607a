//! Cluster partition invariant (spec §8): the fingerprinter's
//! connected-component clusters partition the table set exactly once,
//! checked against a schema wider than the inline unit fixtures (five
//! tables across two disjoint components plus one true orphan).

use std::collections::BTreeMap;
use std::sync::Arc;

use strata::artifacts::{names, ArtifactStore};
use strata::config::PricingTable;
use strata::db::tests_support::{FakeDatabase, FakeTable};
use strata::db::RelationalDatabase;
use strata::models::{Cardinality, ColumnDef, FingerprintMap, ForeignKeyDef, UniqueConstraintDef};
use strata::pipeline::run_ingestion;
use strata::tracker::ApiCallTracker;

fn col(name: &str) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        sql_type: "integer".to_string(),
        nullable: false,
        default: None,
        comment: None,
    }
}

fn table_with_pk(pk: &str, extra_columns: &[&str]) -> FakeTable {
    let mut columns = vec![col(pk)];
    columns.extend(extra_columns.iter().map(|c| col(c)));
    FakeTable {
        columns,
        primary_key: vec![pk.to_string()],
        unique_constraints: vec![UniqueConstraintDef {
            name: format!("{pk}_pkey"),
            columns: vec![pk.to_string()],
        }],
        indexes: vec![],
        foreign_keys: vec![],
        rows: vec![],
    }
}

#[tokio::test]
async fn clusters_partition_every_table_exactly_once() {
    let mut db = FakeDatabase::default();

    // Component A: orders -> order_items (explicit FK).
    db.tables.insert("orders".to_string(), table_with_pk("order_id", &[]));
    let mut order_items = table_with_pk("item_id", &["order_id"]);
    order_items.foreign_keys.push(ForeignKeyDef {
        columns: vec!["order_id".to_string()],
        referred_table: "orders".to_string(),
        referred_columns: vec!["order_id".to_string()],
        cardinality: Cardinality::OneToMany,
    });
    db.tables.insert("order_items".to_string(), order_items);

    // Component B: warehouses -> shipments (explicit FK), disjoint from A.
    db.tables.insert("warehouses".to_string(), table_with_pk("warehouse_id", &[]));
    let mut shipments = table_with_pk("shipment_id", &["warehouse_id"]);
    shipments.foreign_keys.push(ForeignKeyDef {
        columns: vec!["warehouse_id".to_string()],
        referred_table: "warehouses".to_string(),
        referred_columns: vec!["warehouse_id".to_string()],
        cardinality: Cardinality::OneToMany,
    });
    db.tables.insert("shipments".to_string(), shipments);

    // A genuine orphan with no relationships to anything.
    db.tables.insert("audit_log".to_string(), table_with_pk("log_id", &[]));

    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path());
    let tracker = ApiCallTracker::new(dir.path(), PricingTable::default());
    let db: Arc<dyn RelationalDatabase> = Arc::new(db);

    run_ingestion("c1", db, None, None, "test-model", &tracker, &artifacts)
        .await
        .unwrap();

    let fingerprints: FingerprintMap = artifacts.read_json("c1", names::FINGERPRINTS).unwrap().unwrap();

    assert_eq!(fingerprints.tables.len(), 5);

    let mut by_cluster: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (table, fp) in &fingerprints.tables {
        by_cluster.entry(fp.cluster_id.clone()).or_default().push(table.clone());
    }

    // Partition: every table appears in exactly one cluster bucket, and
    // the buckets together cover the whole table set with no overlap.
    let total_in_clusters: usize = by_cluster.values().map(|v| v.len()).sum();
    assert_eq!(total_in_clusters, fingerprints.tables.len());

    let order_cluster = &fingerprints.tables["orders"].cluster_id;
    assert_eq!(&fingerprints.tables["order_items"].cluster_id, order_cluster);

    let warehouse_cluster = &fingerprints.tables["warehouses"].cluster_id;
    assert_eq!(&fingerprints.tables["shipments"].cluster_id, warehouse_cluster);

    assert_ne!(order_cluster, warehouse_cluster);
    assert_eq!(fingerprints.tables["audit_log"].cluster_id, "orphan:audit_log");

    // No cluster spans more than its own connected component.
    assert_eq!(by_cluster[order_cluster].len(), 2);
    assert_eq!(by_cluster[warehouse_cluster].len(), 2);
    assert_eq!(by_cluster["orphan:audit_log"].len(), 1);
}
