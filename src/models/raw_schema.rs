//! Output of the Metadata Reader (C1): `RawSchema`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single column as declared by the source database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
}

/// FK cardinality, decided by comparing the FK column set against unique
/// constraint column sets on the referrer (1:1 iff an exact match exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:n")]
    OneToMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueConstraintDef {
    pub name: String,
    pub columns: Vec<String>,
}

/// One table's full structural description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub row_count: i64,
    /// Ordered column names forming the primary key (empty if none).
    pub primary_key: Vec<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    pub explicit_foreign_keys: Vec<ForeignKeyDef>,
    pub indexes: Vec<IndexDef>,
    pub unique_constraints: Vec<UniqueConstraintDef>,
    /// Set when the row-count query failed; the table is still included
    /// with `row_count = 0` per spec §4.1.
    pub row_count_warning: Option<String>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// A mapping from table name to its structural description, plus the
/// schema it was extracted from. Ordered by table name (`BTreeMap`) so
/// serialization is stable across runs — required for the byte-equal
/// idempotence property in spec §8.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    pub tables: BTreeMap<String, TableSchema>,
}

impl RawSchema {
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }
}
