//! PostgreSQL 13+ implementation of the relational database capability.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::error::StrataError;
use crate::models::{
    Cardinality, ColumnDef, ForeignKeyDef, IndexDef, UniqueConstraintDef,
};

use super::pool::DB_EXECUTION_DEADLINE;
use super::{decide_cardinality, QueryResult, RelationalDatabase, Row as TypedRow, RowBatch, TypedCell};

/// Quote a Postgres identifier for safe interpolation into generated SQL.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub struct PgDatabase {
    pool: PgPool,
    schema: String,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema: "public".to_string(),
        }
    }

    pub fn with_schema(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    async fn run_timed<F, T>(&self, fut: F) -> Result<T, StrataError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(DB_EXECUTION_DEADLINE, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StrataError::from(e)),
            Err(_) => Err(StrataError::DbUnavailable("query deadline exceeded".into())),
        }
    }
}

/// Decode a single cell from a row whose exact column types are not known
/// at compile time. Tries progressively looser types; falls back to text.
fn decode_cell(row: &PgRow, idx: usize) -> TypedCell {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(TypedCell::Int).unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v
            .map(|n| TypedCell::Int(n as i64))
            .unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(TypedCell::Float).unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        return v
            .and_then(|d| d.to_f64())
            .map(TypedCell::Float)
            .unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(TypedCell::Bool).unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(TypedCell::Temporal).unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|d| TypedCell::Temporal(d.and_utc()))
            .unwrap_or(TypedCell::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(TypedCell::Text).unwrap_or(TypedCell::Null);
    }
    TypedCell::Null
}

fn row_to_typed(row: &PgRow) -> TypedRow {
    (0..row.len()).map(|i| decode_cell(row, i)).collect()
}

fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

#[async_trait]
impl RelationalDatabase for PgDatabase {
    async fn list_base_tables(&self) -> Result<Vec<String>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT table_name FROM information_schema.tables \
                     WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
                     ORDER BY table_name",
                )
                .bind(&self.schema)
                .fetch_all(&self.pool),
            )
            .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT kcu.column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON tc.constraint_name = kcu.constraint_name \
                      AND tc.table_schema = kcu.table_schema \
                     WHERE tc.table_schema = $1 AND tc.table_name = $2 \
                       AND tc.constraint_type = 'PRIMARY KEY' \
                     ORDER BY kcu.ordinal_position",
                )
                .bind(&self.schema)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn unique_constraints(
        &self,
        table: &str,
    ) -> Result<Vec<UniqueConstraintDef>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT tc.constraint_name, kcu.column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON tc.constraint_name = kcu.constraint_name \
                      AND tc.table_schema = kcu.table_schema \
                     WHERE tc.table_schema = $1 AND tc.table_name = $2 \
                       AND tc.constraint_type = 'UNIQUE' \
                     ORDER BY tc.constraint_name, kcu.ordinal_position",
                )
                .bind(&self.schema)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        let mut by_name: std::collections::BTreeMap<String, Vec<String>> =
            std::collections::BTreeMap::new();
        for r in &rows {
            let name: String = r.get(0);
            let col: String = r.get(1);
            by_name.entry(name).or_default().push(col);
        }
        Ok(by_name
            .into_iter()
            .map(|(name, columns)| UniqueConstraintDef { name, columns })
            .collect())
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexDef>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT indexname, indexdef FROM pg_indexes \
                     WHERE schemaname = $1 AND tablename = $2 \
                     ORDER BY indexname",
                )
                .bind(&self.schema)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let name: String = r.get(0);
                let def: String = r.get(1);
                let unique = def.to_uppercase().contains("UNIQUE");
                let columns = parse_index_columns(&def);
                IndexDef {
                    name,
                    columns,
                    unique,
                }
            })
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDef>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT c.column_name, c.data_type, c.is_nullable, c.column_default, \
                            col_description(format('%I.%I', c.table_schema, c.table_name)::regclass::oid, \
                                            c.ordinal_position) AS comment \
                     FROM information_schema.columns c \
                     WHERE c.table_schema = $1 AND c.table_name = $2 \
                     ORDER BY c.ordinal_position",
                )
                .bind(&self.schema)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| ColumnDef {
                name: r.get::<String, _>(0),
                sql_type: r.get::<String, _>(1),
                nullable: r.get::<String, _>(2) == "YES",
                default: r.get::<Option<String>, _>(3),
                comment: r.get::<Option<String>, _>(4),
            })
            .collect())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDef>, StrataError> {
        let rows = self
            .run_timed(
                sqlx::query(
                    "SELECT tc.constraint_name, kcu.column_name, ccu.table_name, ccu.column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON tc.constraint_name = kcu.constraint_name \
                      AND tc.table_schema = kcu.table_schema \
                     JOIN information_schema.constraint_column_usage ccu \
                       ON tc.constraint_name = ccu.constraint_name \
                      AND tc.table_schema = ccu.table_schema \
                     WHERE tc.table_schema = $1 AND tc.table_name = $2 \
                       AND tc.constraint_type = 'FOREIGN KEY' \
                     ORDER BY tc.constraint_name, kcu.ordinal_position",
                )
                .bind(&self.schema)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        #[derive(Default, Clone)]
        struct Acc {
            columns: Vec<String>,
            referred_table: String,
            referred_columns: Vec<String>,
        }
        let mut by_name: std::collections::BTreeMap<String, Acc> = std::collections::BTreeMap::new();
        for r in &rows {
            let name: String = r.get(0);
            let col: String = r.get(1);
            let ref_table: String = r.get(2);
            let ref_col: String = r.get(3);
            let entry = by_name.entry(name).or_default();
            entry.columns.push(col);
            entry.referred_table = ref_table;
            entry.referred_columns.push(ref_col);
        }

        let unique_constraints = self.unique_constraints(table).await?;
        Ok(by_name
            .into_values()
            .map(|acc| {
                let cardinality = decide_cardinality(&acc.columns, &unique_constraints);
                ForeignKeyDef {
                    columns: acc.columns,
                    referred_table: acc.referred_table,
                    referred_columns: acc.referred_columns,
                    cardinality,
                }
            })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<i64, StrataError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(&self.schema),
            quote_ident(table)
        );
        let row = self
            .run_timed(sqlx::query(&sql).fetch_one(&self.pool))
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn stream_table(
        &self,
        table: &str,
        batch_size: usize,
    ) -> Result<Vec<RowBatch>, StrataError> {
        let mut batches = Vec::new();
        let mut offset: i64 = 0;
        let batch_size_i64 = batch_size as i64;

        loop {
            let sql = format!(
                "SELECT * FROM {}.{} LIMIT {} OFFSET {}",
                quote_ident(&self.schema),
                quote_ident(table),
                batch_size_i64,
                offset
            );
            let rows = self
                .run_timed(sqlx::query(&sql).fetch_all(&self.pool))
                .await?;
            if rows.is_empty() {
                break;
            }
            let columns = column_names(&rows[0]);
            let typed_rows: Vec<TypedRow> = rows.iter().map(row_to_typed).collect();
            let fetched = typed_rows.len();
            batches.push(RowBatch {
                columns,
                rows: typed_rows,
            });
            if fetched < batch_size {
                break;
            }
            offset += batch_size_i64;
        }
        Ok(batches)
    }

    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult, StrataError> {
        let rows = self
            .run_timed(sqlx::query(sql).fetch_all(&self.pool))
            .await
            .map_err(|e| match e {
                StrataError::DbQueryFailed(msg) => {
                    StrataError::SqlExecFailed(truncate(&msg, 200))
                }
                other => other,
            })?;

        if rows.is_empty() {
            return Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
            });
        }
        let columns = column_names(&rows[0]);
        let typed_rows: Vec<TypedRow> = rows.iter().map(row_to_typed).collect();
        Ok(QueryResult {
            columns,
            rows: typed_rows,
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

/// Extract the parenthesized column list from a `CREATE [UNIQUE] INDEX ...
/// (col1, col2)` definition string. Best-effort — falls back to an empty
/// list rather than failing the whole introspection pass.
fn parse_index_columns(indexdef: &str) -> Vec<String> {
    let Some(start) = indexdef.find('(') else {
        return Vec::new();
    };
    let Some(end) = indexdef.rfind(')') else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    indexdef[start + 1..end]
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
