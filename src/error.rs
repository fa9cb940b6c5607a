use thiserror::Error;

/// Crate-wide error type. Each variant corresponds to one of the stable,
/// machine-readable error kinds in the design (config_missing,
/// db_unavailable, db_query_failed, llm_unavailable, llm_malformed,
/// sql_unsafe, sql_exec_failed, cache_unavailable, graph_store_unavailable),
/// plus a handful of structural variants shared across modules.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Required configuration (env var or YAML field) was absent.
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// The source database could not be reached.
    #[error("database unavailable: {0}")]
    DbUnavailable(String),

    /// A specific query against the source database failed.
    #[error("database query failed: {0}")]
    DbQueryFailed(String),

    /// The graph store could not be reached.
    #[error("graph store unavailable: {0}")]
    GraphStoreUnavailable(String),

    /// The LLM chat capability could not be reached or timed out.
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),

    /// The LLM returned a response that failed to parse under the expected grammar.
    #[error("llm returned malformed output: {0}")]
    LlmMalformed(String),

    /// A statement was rejected by the SQL validator as destructive.
    #[error("sql rejected as unsafe: {0}")]
    SqlUnsafe(String),

    /// A statement passed validation but the driver reported an execution error.
    #[error("sql execution failed: {0}")]
    SqlExecFailed(String),

    /// The cache backend could not be reached. Always advisory — callers
    /// should treat this the same as a cache miss, never as a hard failure.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Requested entity was not found.
    #[error("not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Conflicting state (duplicate artifact version, concurrent write, etc).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StrataError {
    /// Stable, machine-readable tag for this error kind. Surfaced verbatim
    /// in `ChatResponse.error` and in the API-call tracker's error field.
    pub fn as_tag(&self) -> &'static str {
        match self {
            StrataError::ConfigMissing(_) => "config_missing",
            StrataError::DbUnavailable(_) => "db_unavailable",
            StrataError::DbQueryFailed(_) => "db_query_failed",
            StrataError::GraphStoreUnavailable(_) => "graph_store_unavailable",
            StrataError::LlmUnavailable(_) => "llm_unavailable",
            StrataError::LlmMalformed(_) => "llm_malformed",
            StrataError::SqlUnsafe(_) => "sql_unsafe",
            StrataError::SqlExecFailed(_) => "sql_exec_failed",
            StrataError::CacheUnavailable(_) => "cache_unavailable",
            StrataError::NotFound { .. } => "not_found",
            StrataError::Validation(_) => "validation",
            StrataError::Conflict(_) => "conflict",
        }
    }
}

impl From<sqlx::Error> for StrataError {
    fn from(err: sqlx::Error) -> Self {
        StrataError::DbQueryFailed(err.to_string())
    }
}

impl From<neo4rs::Error> for StrataError {
    fn from(err: neo4rs::Error) -> Self {
        StrataError::GraphStoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::Validation(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::Conflict(format!("I/O error: {}", err))
    }
}

impl From<reqwest::Error> for StrataError {
    fn from(err: reqwest::Error) -> Self {
        StrataError::LlmUnavailable(err.to_string())
    }
}
