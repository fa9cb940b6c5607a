//! SQL Validator/Executor (C10, spec §4.10): rejects destructive
//! statements and executes read-only SQL against the client's database.

use std::sync::OnceLock;

use regex::Regex;

use crate::db::{QueryResult, RelationalDatabase, TypedCell};
use crate::error::StrataError;
use crate::models::{CellValue, ColumnKind, DataFrame};

const REJECTED_KEYWORDS: &[&str] = &["drop", "delete", "truncate", "alter", "update", "create", "insert"];
const MAX_ERROR_LEN: usize = 200;

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b({})\b", REJECTED_KEYWORDS.join("|"));
        Regex::new(&pattern).expect("static keyword regex is valid")
    })
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\n?(.*?)```").unwrap())
}

/// Strip surrounding code fences and language tags from raw LLM output
/// (spec §4.10 statement post-processing).
fn strip_fences(raw: &str) -> String {
    if let Some(caps) = fence_regex().captures(raw) {
        return caps[1].trim().to_string();
    }
    raw.trim().to_string()
}

/// Reject multi-statement bodies and ensure a trailing semicolon.
fn normalize_statement(sql: &str) -> Result<String, StrataError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(StrataError::SqlUnsafe("empty SQL statement".to_string()));
    }
    if trimmed.contains(';') {
        return Err(StrataError::SqlUnsafe(
            "multi-statement SQL bodies are rejected".to_string(),
        ));
    }
    Ok(format!("{};", trimmed))
}

/// Post-process raw LLM SQL output into a single validated statement
/// ready for `validate_and_execute` (spec §4.10).
pub fn sanitize_llm_sql(raw: &str) -> Result<String, StrataError> {
    normalize_statement(&strip_fences(raw))
}

/// Reject any SQL whose lowercased form contains a whole-word destructive
/// keyword (spec §4.10). Never bypassed by case or fencing since callers
/// must route through `sanitize_llm_sql` first.
pub fn validate(sql: &str) -> Result<(), StrataError> {
    if let Some(m) = keyword_regex().find(sql) {
        return Err(StrataError::SqlUnsafe(format!(
            "statement rejected: contains disallowed keyword '{}'",
            m.as_str().to_lowercase()
        )));
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max_len).collect::<String>())
    }
}

fn classify_column(rows: &[Vec<TypedCell>], column_index: usize) -> ColumnKind {
    let mut saw_numeric = false;
    let mut saw_temporal = false;
    let mut saw_text = false;

    for row in rows {
        match row.get(column_index) {
            Some(TypedCell::Int(_)) | Some(TypedCell::Float(_)) => saw_numeric = true,
            Some(TypedCell::Temporal(_)) => saw_temporal = true,
            Some(TypedCell::Text(_)) | Some(TypedCell::Bool(_)) => saw_text = true,
            _ => {}
        }
    }

    if saw_temporal {
        ColumnKind::Temporal
    } else if saw_numeric && !saw_text {
        ColumnKind::Numeric
    } else if saw_text {
        ColumnKind::Categorical
    } else {
        ColumnKind::Other
    }
}

fn cell_to_value(cell: TypedCell) -> CellValue {
    match cell {
        TypedCell::Null => CellValue::Null,
        TypedCell::Bool(b) => CellValue::Bool(b),
        TypedCell::Int(i) => CellValue::Int(i),
        TypedCell::Float(f) => CellValue::Float(f),
        TypedCell::Text(s) => CellValue::Text(s),
        TypedCell::Temporal(t) => CellValue::Temporal(t.to_rfc3339()),
    }
}

fn to_dataframe(result: QueryResult) -> DataFrame {
    let column_types = (0..result.columns.len())
        .map(|i| classify_column(&result.rows, i))
        .collect();
    let rows = result
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_value).collect())
        .collect();
    DataFrame {
        columns: result.columns,
        column_types,
        rows,
    }
}

/// Outcome of `validate_and_execute`: a rejection never produces a
/// dataframe (spec §4.10).
pub enum SqlOutcome {
    Executed(DataFrame),
    /// A "safety alert" — human-readable, never surfaced as a dataframe.
    Rejected(String),
    /// Driver error, already truncated to `MAX_ERROR_LEN`.
    Failed(String),
}

/// Validate then execute `sql` against `db`'s read-only connection.
pub async fn validate_and_execute(db: &dyn RelationalDatabase, sql: &str) -> SqlOutcome {
    if let Err(e) = validate(sql) {
        return SqlOutcome::Rejected(e.to_string());
    }

    match db.execute_readonly(sql).await {
        Ok(result) => SqlOutcome::Executed(to_dataframe(result)),
        Err(e) => SqlOutcome::Failed(truncate(&e.to_string(), MAX_ERROR_LEN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests_support::FakeDatabase;

    #[test]
    fn rejects_whole_word_destructive_keywords() {
        assert!(validate("select * from incidents; update incidents set x=1").is_err());
        assert!(validate("drop table incidents").is_err());
        assert!(validate("select updated_at from incidents").is_ok());
    }

    #[test]
    fn sanitizes_fenced_llm_output_and_adds_semicolon() {
        let raw = "```sql\nselect * from incidents\n```";
        let cleaned = sanitize_llm_sql(raw).unwrap();
        assert_eq!(cleaned, "select * from incidents;");
    }

    #[test]
    fn multi_statement_bodies_are_rejected() {
        let raw = "select 1; select 2";
        assert!(sanitize_llm_sql(raw).is_err());
    }

    #[tokio::test]
    async fn rejected_sql_never_produces_a_dataframe() {
        let db = FakeDatabase::incident_fixture();
        let outcome = validate_and_execute(&db, "delete from incidents").await;
        assert!(matches!(outcome, SqlOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn successful_query_is_returned_as_a_dataframe() {
        let db = FakeDatabase::incident_fixture();
        let outcome = validate_and_execute(&db, "select count(*) from incidents").await;
        match outcome {
            SqlOutcome::Executed(df) => assert!(!df.columns.is_empty()),
            _ => panic!("expected Executed outcome"),
        }
    }
}
