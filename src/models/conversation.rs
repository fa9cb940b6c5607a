//! Conversational engine (C9) request/response shapes.
//!
//! Conversation state is owned by the caller (spec §3) — these types are
//! plain data, never stored by the engine itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Rough 4-chars-per-token estimate used for history trimming (spec §4.9).
    pub fn estimated_tokens(&self) -> usize {
        self.content.len().div_ceil(4)
    }
}

/// Closed variant replacing the source's string-keyed agent dispatch
/// (Design Note 3). `NetworkXEngine`/`Neo4jEngine` share the same
/// raw-SQL-producing behavior and differ only in which backing store
/// `context_builder` reads from, so both are represented by `Engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Conversational,
    Neo4jEngine,
    NetworkXEngine,
}

impl AgentKind {
    pub fn is_json_planner(&self) -> bool {
        matches!(self, AgentKind::Conversational)
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub user_message: String,
    pub history: Vec<Message>,
    pub client_id: String,
    pub agent: AgentKind,
    pub model_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    SummaryOnly,
    SqlOnly,
    SqlAndSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSuggestion {
    Bar,
    Scatter,
    Line,
    None,
}

/// A tabular query result with preserved column order (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFrame {
    pub columns: Vec<String>,
    pub column_types: Vec<ColumnKind>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Rendered as an ISO-8601 string — the custom encoder spec §4.11 calls for.
    Temporal(String),
}

impl DataFrame {
    pub fn is_empty_rows(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub mode: ResponseMode,
    pub summary: Option<String>,
    pub sql: Option<String>,
    pub chart_suggestion: Option<ChartSuggestion>,
    pub dataframe: Option<DataFrame>,
    pub error: Option<String>,
    pub full_history: Vec<Message>,
}

impl ChatResponse {
    /// A well-formed failure response (spec §7: always `summary_only`,
    /// a human sentence, and a machine-readable `error` tag).
    pub fn failure(summary: impl Into<String>, error_tag: &str, full_history: Vec<Message>) -> Self {
        Self {
            mode: ResponseMode::SummaryOnly,
            summary: Some(summary.into()),
            sql: None,
            chart_suggestion: None,
            dataframe: None,
            error: Some(error_tag.to_string()),
            full_history,
        }
    }

    /// Whether this response is eligible for caching (spec §4.9 step 7:
    /// only successful, dataframe-bearing responses are cached).
    pub fn is_cacheable(&self) -> bool {
        self.error.is_none() && self.dataframe.is_some()
    }
}
