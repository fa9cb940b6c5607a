//! Metadata Reader (C1): introspects the source database into a `RawSchema`.

use std::collections::BTreeMap;

use crate::db::RelationalDatabase;
use crate::error::StrataError;
use crate::models::{RawSchema, TableSchema};

/// Extract structural metadata for every base table in the target schema.
///
/// A failed row-count query does not abort the table: it is recorded as
/// `row_count_warning` and the table is included with `row_count = 0`
/// (spec §4.1).
pub async fn extract(db: &dyn RelationalDatabase) -> Result<RawSchema, StrataError> {
    let table_names = db.list_base_tables().await?;
    let mut tables = BTreeMap::new();

    for name in table_names {
        let primary_key = db.primary_key(&name).await?;
        let unique_constraints = db.unique_constraints(&name).await?;
        let indexes = db.indexes(&name).await?;
        let columns = db.columns(&name).await?;
        let explicit_foreign_keys = db.foreign_keys(&name).await?;

        let (row_count, row_count_warning) = match db.row_count(&name).await {
            Ok(n) => (n, None),
            Err(e) => {
                tracing::warn!("row count failed for table '{}': {}", name, e);
                (0, Some(e.to_string()))
            }
        };

        tables.insert(
            name,
            TableSchema {
                row_count,
                primary_key,
                columns,
                explicit_foreign_keys,
                indexes,
                unique_constraints,
                row_count_warning,
            },
        );
    }

    Ok(RawSchema { tables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests_support::FakeDatabase;

    #[tokio::test]
    async fn extracts_all_base_tables_in_order() {
        let db = FakeDatabase::incident_fixture();
        let schema = extract(&db).await.unwrap();
        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["employees", "incident_details", "incidents"]);
    }

    #[tokio::test]
    async fn missing_row_count_is_recorded_as_warning_not_failure() {
        let db = FakeDatabase::incident_fixture().with_row_count_failure("incidents");
        let schema = extract(&db).await.unwrap();
        let incidents = &schema.tables["incidents"];
        assert_eq!(incidents.row_count, 0);
        assert!(incidents.row_count_warning.is_some());
    }
}
