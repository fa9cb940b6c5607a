//! In-memory `RelationalDatabase` fake used by pipeline unit tests, also
//! exposed to `tests/*.rs` integration tests under the `test-util` feature.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::StrataError;
use crate::models::{Cardinality, ColumnDef, ForeignKeyDef, IndexDef, UniqueConstraintDef};

use super::{QueryResult, RelationalDatabase, Row, RowBatch, TypedCell};

#[derive(Default, Clone)]
pub struct FakeTable {
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<UniqueConstraintDef>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub rows: Vec<Row>,
}

#[derive(Default, Clone)]
pub struct FakeDatabase {
    pub tables: BTreeMap<String, FakeTable>,
    pub row_count_failures: BTreeSet<String>,
}

impl FakeDatabase {
    pub fn with_row_count_failure(mut self, table: &str) -> Self {
        self.row_count_failures.insert(table.to_string());
        self
    }

    fn col(name: &str, sql_type: &str, nullable: bool) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable,
            default: None,
            comment: None,
        }
    }

    /// `employees(emp_id pk, name)`, `incidents(id pk, emp_id, title)`,
    /// `incident_details(id pk, incident_id fk->incidents.id, detail_text)`
    /// — the scenario fixture from spec §8 items 1, 5 and 6.
    pub fn incident_fixture() -> Self {
        let mut db = FakeDatabase::default();

        let employee_rows: Vec<Row> = (1..=1000i64)
            .map(|n| vec![TypedCell::Int(n), TypedCell::Text(format!("Employee {n}"))])
            .collect();
        db.tables.insert(
            "employees".to_string(),
            FakeTable {
                columns: vec![
                    Self::col("emp_id", "integer", false),
                    Self::col("name", "text", true),
                ],
                primary_key: vec!["emp_id".to_string()],
                unique_constraints: vec![UniqueConstraintDef {
                    name: "employees_pkey".to_string(),
                    columns: vec!["emp_id".to_string()],
                }],
                indexes: vec![],
                foreign_keys: vec![],
                rows: employee_rows,
            },
        );

        // 1000 rows, emp_id drawn from 1..=999 (one repeat) so distinct_count
        // < 1000 and almost entirely contained in employees.emp_id.
        let incident_rows: Vec<Row> = (1..=1000i64)
            .map(|n| {
                let emp_id = if n == 1000 { 1 } else { n };
                vec![
                    TypedCell::Int(n),
                    TypedCell::Int(emp_id),
                    TypedCell::Text(format!("Incident {n}")),
                ]
            })
            .collect();
        db.tables.insert(
            "incidents".to_string(),
            FakeTable {
                columns: vec![
                    Self::col("id", "integer", false),
                    Self::col("emp_id", "integer", true),
                    Self::col("title", "text", true),
                ],
                primary_key: vec!["id".to_string()],
                unique_constraints: vec![UniqueConstraintDef {
                    name: "incidents_pkey".to_string(),
                    columns: vec!["id".to_string()],
                }],
                indexes: vec![],
                foreign_keys: vec![],
                rows: incident_rows,
            },
        );

        let detail_rows: Vec<Row> = (1..=500i64)
            .map(|n| {
                vec![
                    TypedCell::Int(n),
                    TypedCell::Int(n),
                    TypedCell::Text(format!("detail {n}")),
                ]
            })
            .collect();
        db.tables.insert(
            "incident_details".to_string(),
            FakeTable {
                columns: vec![
                    Self::col("id", "integer", false),
                    Self::col("incident_id", "integer", false),
                    Self::col("detail_text", "text", true),
                ],
                primary_key: vec!["id".to_string()],
                unique_constraints: vec![UniqueConstraintDef {
                    name: "incident_details_pkey".to_string(),
                    columns: vec!["id".to_string()],
                }],
                indexes: vec![],
                foreign_keys: vec![ForeignKeyDef {
                    columns: vec!["incident_id".to_string()],
                    referred_table: "incidents".to_string(),
                    referred_columns: vec!["id".to_string()],
                    cardinality: Cardinality::OneToMany,
                }],
                rows: detail_rows,
            },
        );

        db
    }
}

#[async_trait]
impl RelationalDatabase for FakeDatabase {
    async fn list_base_tables(&self) -> Result<Vec<String>, StrataError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, StrataError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.primary_key.clone())
            .unwrap_or_default())
    }

    async fn unique_constraints(
        &self,
        table: &str,
    ) -> Result<Vec<UniqueConstraintDef>, StrataError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.unique_constraints.clone())
            .unwrap_or_default())
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexDef>, StrataError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDef>, StrataError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDef>, StrataError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn row_count(&self, table: &str) -> Result<i64, StrataError> {
        if self.row_count_failures.contains(table) {
            return Err(StrataError::DbQueryFailed(format!(
                "simulated row count failure for '{table}'"
            )));
        }
        Ok(self.tables.get(table).map(|t| t.rows.len() as i64).unwrap_or(0))
    }

    async fn stream_table(
        &self,
        table: &str,
        batch_size: usize,
    ) -> Result<Vec<RowBatch>, StrataError> {
        let Some(t) = self.tables.get(table) else {
            return Ok(vec![]);
        };
        let columns: Vec<String> = t.columns.iter().map(|c| c.name.clone()).collect();
        Ok(t.rows
            .chunks(batch_size.max(1))
            .map(|chunk| RowBatch {
                columns: columns.clone(),
                rows: chunk.to_vec(),
            })
            .collect())
    }

    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult, StrataError> {
        let lowered = sql.to_lowercase();
        if lowered.contains("select count(*) from incidents") {
            let count = self.tables.get("incidents").map(|t| t.rows.len()).unwrap_or(0);
            return Ok(QueryResult {
                columns: vec!["count".to_string()],
                rows: vec![vec![TypedCell::Int(count as i64)]],
            });
        }
        Ok(QueryResult {
            columns: vec![],
            rows: vec![],
        })
    }
}
