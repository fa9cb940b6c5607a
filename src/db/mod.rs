//! Relational database capability (spec §6): the abstract surface the
//! pipeline and the SQL executor are written against, implemented for
//! PostgreSQL in `postgres`.

pub mod pool;
pub mod postgres;
#[cfg(any(test, feature = "test-util"))]
pub mod tests_support;

use async_trait::async_trait;

use crate::error::StrataError;
use crate::models::{Cardinality, ColumnDef, ForeignKeyDef, IndexDef, UniqueConstraintDef};

/// A single typed cell value read back from the source database, as
/// returned by `stream_table` and `execute_readonly`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedCell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Temporal(chrono::DateTime<chrono::Utc>),
}

impl TypedCell {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            TypedCell::Int(v) => Some(*v as f64),
            TypedCell::Float(v) => Some(*v),
            TypedCell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            TypedCell::Null => None,
            TypedCell::Bool(v) => Some(v.to_string()),
            TypedCell::Int(v) => Some(v.to_string()),
            TypedCell::Float(v) => Some(v.to_string()),
            TypedCell::Text(s) => Some(s.clone()),
            TypedCell::Temporal(t) => Some(t.to_rfc3339()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedCell::Null)
    }
}

/// One row, column-order-preserved.
pub type Row = Vec<TypedCell>;

/// A batch of rows read from `stream_table`, used by the profiler (C2) to
/// avoid per-column SQL: the whole table is read once (or in batches) and
/// all statistics are computed in memory.
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// A read-only execution result, column-order-preserved (spec §4.10).
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Abstract relational database capability (spec §6). `PgDatabase`
/// implements this against PostgreSQL 13+; tests use simple in-memory
/// fakes implementing the same trait.
#[async_trait]
pub trait RelationalDatabase: Send + Sync {
    /// Base tables in the target schema, in a stable order.
    async fn list_base_tables(&self) -> Result<Vec<String>, StrataError>;

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, StrataError>;

    async fn unique_constraints(&self, table: &str) -> Result<Vec<UniqueConstraintDef>, StrataError>;

    async fn indexes(&self, table: &str) -> Result<Vec<IndexDef>, StrataError>;

    /// Columns in declaration order.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDef>, StrataError>;

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDef>, StrataError>;

    /// `SELECT COUNT(*)`. A failure here is caught by the caller (C1 treats
    /// it as a recorded warning + count 0), so this returns the real error.
    async fn row_count(&self, table: &str) -> Result<i64, StrataError>;

    /// Read the full table, one batch at a time (`batch_size` rows per
    /// batch). The profiler concatenates batches when the table exceeds
    /// its single-shot threshold.
    async fn stream_table(
        &self,
        table: &str,
        batch_size: usize,
    ) -> Result<Vec<RowBatch>, StrataError>;

    /// Execute a parameterless, already-validated read-only statement.
    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult, StrataError>;
}

/// Decide FK cardinality by comparing the FK's column set against each of
/// the referrer's unique constraints: an exact set match makes it 1:1,
/// otherwise 1:n (spec §3, §4.1).
pub fn decide_cardinality(fk_columns: &[String], unique_constraints: &[UniqueConstraintDef]) -> Cardinality {
    let mut fk_sorted = fk_columns.to_vec();
    fk_sorted.sort();
    for uc in unique_constraints {
        let mut uc_sorted = uc.columns.clone();
        uc_sorted.sort();
        if uc_sorted == fk_sorted {
            return Cardinality::OneToOne;
        }
    }
    Cardinality::OneToMany
}
