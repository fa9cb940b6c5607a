//! Data Profiler (C2): per-table, per-column statistical, pattern, and
//! anomaly signals (spec §4.2).
//!
//! Each table is profiled independently once its rows are pulled into
//! memory, so tables run across a bounded worker pool (default size =
//! number of cores) — no cross-table shared state.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::Semaphore;

use crate::db::{RelationalDatabase, Row, TypedCell};
use crate::error::StrataError;
use crate::models::{
    Anomalies, ColumnProfile, DatePattern, IdPattern, NumericStats, Patterns, ProfileMap,
    RawSchema, ValueCount,
};

/// Tables at or below this row count are read in a single batch; larger
/// tables are streamed and concatenated (spec §4.2).
const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Number of leading non-null values examined for pattern detection.
const PATTERN_SAMPLE_SIZE: usize = 100;

const LOW_CARDINALITY_THRESHOLD: u64 = 100;
const ENUM_LIKE_THRESHOLD: u64 = 20;

fn numeric_id_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").unwrap())
}

fn uuid_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .unwrap()
    })
}

fn prefixed_id_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2,4}-\d{3,}$").unwrap())
}

fn iso8601_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap())
}

fn us_date_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap())
}

fn eu_date_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap())
}

fn email_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Profile every table in `schema`. Tables with zero rows are skipped
/// entirely (no entry in the resulting map), per spec §4.2.
pub async fn profile(
    db: Arc<dyn RelationalDatabase>,
    schema: &RawSchema,
) -> Result<ProfileMap, StrataError> {
    profile_with_pool_size(db, schema, num_cpus::get().max(1)).await
}

pub async fn profile_with_pool_size(
    db: Arc<dyn RelationalDatabase>,
    schema: &RawSchema,
    pool_size: usize,
) -> Result<ProfileMap, StrataError> {
    let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));
    let mut join_set = tokio::task::JoinSet::new();

    for (table_name, table_schema) in &schema.tables {
        let table_name = table_name.clone();
        let column_names: Vec<String> = table_schema.columns.iter().map(|c| c.name.clone()).collect();
        let column_types: BTreeMap<String, String> = table_schema
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.sql_type.clone()))
            .collect();
        let row_count = table_schema.row_count;
        let db = Arc::clone(&db);
        let semaphore = Arc::clone(&semaphore);

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            if row_count <= 0 {
                return (table_name, None);
            }
            let result = profile_table(db.as_ref(), &table_name, &column_names, &column_types).await;
            (table_name, Some(result))
        });
    }

    let mut tables = BTreeMap::new();
    while let Some(joined) = join_set.join_next().await {
        let (table_name, maybe_result) = joined.map_err(|e| {
            StrataError::DbQueryFailed(format!("profiler task for a table panicked: {e}"))
        })?;
        if let Some(result) = maybe_result {
            tables.insert(table_name, result?);
        }
    }

    Ok(ProfileMap { tables })
}

async fn profile_table(
    db: &dyn RelationalDatabase,
    table_name: &str,
    column_names: &[String],
    column_types: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, ColumnProfile>, StrataError> {
    let batches = db.stream_table(table_name, DEFAULT_BATCH_SIZE).await?;
    let total_rows: u64 = batches.iter().map(|b| b.rows.len() as u64).sum();

    let mut per_column: BTreeMap<usize, Vec<&TypedCell>> = BTreeMap::new();
    for batch in &batches {
        for row in &batch.rows {
            for (idx, cell) in row.iter().enumerate() {
                per_column.entry(idx).or_default().push(cell);
            }
        }
    }

    let mut out = BTreeMap::new();
    for (idx, name) in column_names.iter().enumerate() {
        let cells = per_column.get(&idx).cloned().unwrap_or_default();
        let declared_type = column_types.get(name).map(|s| s.as_str()).unwrap_or("");
        let profile = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            profile_column(&cells, total_rows, declared_type)
        }))
        .unwrap_or_else(|_| ColumnProfile::error_stub("panic while profiling column"));
        out.insert(name.clone(), profile);
    }
    Ok(out)
}

fn profile_column(cells: &[&TypedCell], total_rows: u64, declared_type: &str) -> ColumnProfile {
    let null_count = cells.iter().filter(|c| c.is_null()).count() as u64;
    let non_null: Vec<&&TypedCell> = cells.iter().filter(|c| !c.is_null()).collect();
    let null_pct = if total_rows > 0 {
        round2(100.0 * null_count as f64 / total_rows as f64)
    } else {
        0.0
    };

    let texts: Vec<String> = non_null.iter().filter_map(|c| c.as_text()).collect();
    let distinct: std::collections::BTreeSet<&str> = texts.iter().map(|s| s.as_str()).collect();
    let distinct_count = distinct.len() as u64;

    let numeric_values: Vec<f64> = non_null.iter().filter_map(|c| c.as_numeric()).collect();
    let numeric_coercible_ratio = if non_null.is_empty() {
        1.0
    } else {
        numeric_values.len() as f64 / non_null.len() as f64
    };
    let declared_is_numeric = matches!(
        declared_type.to_lowercase().as_str(),
        "integer" | "bigint" | "smallint" | "numeric" | "real" | "double precision" | "decimal"
    );
    let type_mismatch = declared_is_numeric && numeric_coercible_ratio < 0.5;

    let numeric_stats = if !numeric_values.is_empty()
        && numeric_values.len() as f64 / non_null.len().max(1) as f64 > 0.5
    {
        Some(compute_numeric_stats(&numeric_values))
    } else {
        None
    };

    let anomalies = Anomalies {
        has_outliers: numeric_stats
            .as_ref()
            .map(|s| count_outliers(&numeric_values, s) > 0)
            .unwrap_or(false),
        outlier_count: numeric_stats
            .as_ref()
            .map(|s| count_outliers(&numeric_values, s))
            .unwrap_or(0),
        duplicate_rate: if !non_null.is_empty() {
            round4(1.0 - distinct_count as f64 / non_null.len() as f64)
        } else {
            0.0
        },
        type_mismatch,
    };

    let top_values = if distinct_count > 0 && distinct_count < LOW_CARDINALITY_THRESHOLD {
        Some(top_values(&texts))
    } else {
        None
    };

    let cardinality_ratio = if total_rows > 0 {
        Some(round4(distinct_count as f64 / total_rows as f64))
    } else {
        None
    };

    let sample_values = texts
        .iter()
        .take(10)
        .map(|s| truncate(s, 100))
        .collect();

    let patterns = detect_patterns(&texts, distinct_count);

    ColumnProfile {
        total_rows,
        null_count,
        null_pct,
        distinct_count,
        data_type: declared_type.to_string(),
        numeric_stats,
        top_values,
        cardinality_ratio,
        sample_values,
        patterns,
        anomalies,
        error: None,
    }
}

fn detect_patterns(texts: &[String], distinct_count: u64) -> Patterns {
    let sample: Vec<&str> = texts.iter().take(PATTERN_SAMPLE_SIZE).map(|s| s.as_str()).collect();

    let id_pattern = if sample.is_empty() {
        IdPattern::Null
    } else if sample.iter().all(|v| numeric_id_re().is_match(v)) {
        IdPattern::NumericId
    } else if sample.iter().all(|v| uuid_re().is_match(v)) {
        IdPattern::Uuid
    } else if sample.iter().all(|v| prefixed_id_re().is_match(v)) {
        IdPattern::PrefixedId
    } else {
        IdPattern::Null
    };

    let date_pattern = if sample.is_empty() {
        DatePattern::Null
    } else if sample.iter().all(|v| iso8601_re().is_match(v)) {
        DatePattern::Iso8601
    } else if sample.iter().all(|v| us_date_re().is_match(v)) {
        DatePattern::UsDate
    } else if sample.iter().all(|v| eu_date_re().is_match(v)) {
        DatePattern::EuDate
    } else {
        DatePattern::Null
    };

    let email_pattern = !sample.is_empty() && sample.iter().all(|v| email_re().is_match(v));

    Patterns {
        id_pattern,
        date_pattern,
        email_pattern,
        enum_like: distinct_count > 0 && distinct_count < ENUM_LIKE_THRESHOLD,
        is_binary: distinct_count == 2,
    }
}

fn compute_numeric_stats(values: &[f64]) -> NumericStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    NumericStats {
        min: sorted[0],
        max: sorted[n - 1],
        mean: round4(mean),
        median: round4(percentile(&sorted, 0.5)),
        std: round4(variance.sqrt()),
        q25: round4(percentile(&sorted, 0.25)),
        q75: round4(percentile(&sorted, 0.75)),
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn count_outliers(values: &[f64], stats: &NumericStats) -> u64 {
    let iqr = stats.q75 - stats.q25;
    let lower = stats.q25 - 1.5 * iqr;
    let upper = stats.q75 + 1.5 * iqr;
    values.iter().filter(|v| **v < lower || **v > upper).count() as u64
}

fn top_values(texts: &[String]) -> Vec<ValueCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for t in texts {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let mut values: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values.truncate(10);
    values
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests_support::FakeDatabase;
    use crate::pipeline::metadata_reader;

    #[tokio::test]
    async fn profiles_all_tables_with_rows() {
        let fake = FakeDatabase::incident_fixture();
        let schema = metadata_reader::extract(&fake).await.unwrap();
        let db: Arc<dyn RelationalDatabase> = Arc::new(fake);
        let profiles = profile(db, &schema).await.unwrap();

        assert!(profiles.tables.contains_key("employees"));
        let emp_id_profile = &profiles.tables["employees"]["emp_id"];
        assert_eq!(emp_id_profile.total_rows, 1000);
        assert_eq!(emp_id_profile.null_count, 0);
        assert!(emp_id_profile.numeric_stats.is_some());
    }

    #[tokio::test]
    async fn zero_row_tables_are_skipped() {
        let mut fake = FakeDatabase::incident_fixture();
        fake.tables.get_mut("incident_details").unwrap().rows.clear();
        let schema = metadata_reader::extract(&fake).await.unwrap();
        let db: Arc<dyn RelationalDatabase> = Arc::new(fake);
        let profiles = profile(db, &schema).await.unwrap();
        assert!(!profiles.tables.contains_key("incident_details"));
    }

    #[test]
    fn numeric_id_pattern_detected() {
        let texts = vec!["1".to_string(), "22".to_string(), "333".to_string()];
        let patterns = detect_patterns(&texts, 3);
        assert_eq!(patterns.id_pattern, IdPattern::NumericId);
    }

    #[test]
    fn iqr_outliers_are_flagged() {
        let mut values: Vec<f64> = (1..=20).map(|n| n as f64).collect();
        values.push(10_000.0);
        let stats = compute_numeric_stats(&values);
        assert!(count_outliers(&values, &stats) >= 1);
    }
}
