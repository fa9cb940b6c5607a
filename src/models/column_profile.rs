//! Output of the Data Profiler (C2): `ColumnProfile`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPattern {
    Null,
    NumericId,
    Uuid,
    PrefixedId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    Null,
    Iso8601,
    UsDate,
    EuDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patterns {
    pub id_pattern: IdPattern,
    pub date_pattern: DatePattern,
    pub email_pattern: bool,
    pub enum_like: bool,
    pub is_binary: bool,
}

impl Default for Patterns {
    fn default() -> Self {
        Self {
            id_pattern: IdPattern::Null,
            date_pattern: DatePattern::Null,
            email_pattern: false,
            enum_like: false,
            is_binary: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anomalies {
    pub has_outliers: bool,
    pub outlier_count: u64,
    pub duplicate_rate: f64,
    pub type_mismatch: bool,
}

/// Numeric summary statistics, present only for numeric-coercible columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub q25: f64,
    pub q75: f64,
}

/// A `(value, count)` pair for low-cardinality columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub total_rows: u64,
    pub null_count: u64,
    pub null_pct: f64,
    pub distinct_count: u64,
    pub data_type: String,
    pub numeric_stats: Option<NumericStats>,
    /// Present when `distinct_count < 100`.
    pub top_values: Option<Vec<ValueCount>>,
    pub cardinality_ratio: Option<f64>,
    /// Up to 10 truncated (<=100 char) sample values.
    pub sample_values: Vec<String>,
    pub patterns: Patterns,
    pub anomalies: Anomalies,
    /// Set when profiling this column raised an exception; in that case
    /// `total_rows` is forced to 0 and all other fields are defaulted.
    pub error: Option<String>,
}

impl ColumnProfile {
    /// Build the `{error, total_rows: 0}` stub used when a single column's
    /// profiling fails (spec §4.2 failure handling) — other columns still
    /// complete normally.
    pub fn error_stub(message: impl Into<String>) -> Self {
        Self {
            total_rows: 0,
            null_count: 0,
            null_pct: 0.0,
            distinct_count: 0,
            data_type: "unknown".to_string(),
            numeric_stats: None,
            top_values: None,
            cardinality_ratio: None,
            sample_values: Vec::new(),
            patterns: Patterns::default(),
            anomalies: Anomalies::default(),
            error: Some(message.into()),
        }
    }
}

/// `{table -> {column -> ColumnProfile}}`, ordered for determinism.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMap {
    pub tables: BTreeMap<String, BTreeMap<String, ColumnProfile>>,
}
