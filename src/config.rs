//! Client configuration and process-wide settings.
//!
//! Mirrors the teacher's `db/connection.rs` priority chain (file, then env,
//! then default) but for per-client YAML config rather than an embedded-vs-
//! remote database choice.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// Per-client database connection descriptor. Credentials are never stored
/// inline — only the names of the env vars that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user_env: String,
    pub password_env: String,
    pub name: String,
}

/// Top-level per-client configuration, loaded from `<client>.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub database: DatabaseConfig,
}

/// Resolved connection parameters with credentials filled in from the
/// environment. Missing env vars are a hard failure at first use, per spec.
#[derive(Debug, Clone)]
pub struct ResolvedDatabase {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

/// Config-discovery operation (spec §6): the client IDs with a YAML config
/// present in `config_dir`, sorted for determinism. Unreadable filenames
/// are skipped rather than failing the whole listing.
pub fn discover_client_ids(config_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(config_dir) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml") {
                path.file_stem().and_then(|s| s.to_str()).map(String::from)
            } else {
                None
            }
        })
        .collect();
    ids.sort();
    ids
}

/// The closed set of agent kinds exposed by config discovery (spec §6).
pub const AGENT_KINDS: &[&str] = &["conversational", "neo4j_engine", "network_x_engine"];

impl ClientConfig {
    /// Load `<config_dir>/<client_id>.yaml`.
    pub fn load(config_dir: &Path, client_id: &str) -> Result<Self, StrataError> {
        let path = config_dir.join(format!("{client_id}.yaml"));
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            StrataError::ConfigMissing(format!(
                "could not read client config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: ClientConfig = serde_yaml_ng::from_str(&contents).map_err(|e| {
            StrataError::ConfigMissing(format!("invalid client config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Resolve credentials from the named environment variables. Fails hard
    /// (per spec §6/§7, `config_missing`) rather than defaulting silently.
    pub fn resolve_database(&self) -> Result<ResolvedDatabase, StrataError> {
        let user = std::env::var(&self.database.user_env).map_err(|_| {
            StrataError::ConfigMissing(format!(
                "env var '{}' not set for client '{}'",
                self.database.user_env, self.client_id
            ))
        })?;
        let password = std::env::var(&self.database.password_env).map_err(|_| {
            StrataError::ConfigMissing(format!(
                "env var '{}' not set for client '{}'",
                self.database.password_env, self.client_id
            ))
        })?;
        Ok(ResolvedDatabase {
            driver: self.database.driver.clone(),
            host: self.database.host.clone(),
            port: self.database.port,
            user,
            password,
            name: self.database.name.clone(),
        })
    }
}

/// Process-wide settings read once from the environment at startup. None of
/// these are mandatory until the capability that needs them is actually
/// used (e.g. `groq_api_key` is only required when an LLM call is made).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub redis_host: Option<String>,
    pub redis_port: Option<u16>,
    pub redis_ttl_secs: u64,
    pub neo4j_uri: Option<String>,
    pub neo4j_user: Option<String>,
    pub neo4j_password: Option<String>,
    pub app_base_url: Option<String>,
    pub frontend_url: Option<String>,
}

fn default_groq_model() -> String {
    "llama-3.1-70b-versatile".to_string()
}

impl Settings {
    /// Read all recognised environment variables (spec §6), applying
    /// documented defaults for optional values.
    pub fn from_env() -> Self {
        Self {
            groq_api_key: std::env::var("GROQ_API_KEY").ok(),
            groq_model: std::env::var("GROQ_MODEL").unwrap_or_else(|_| default_groq_model()),
            redis_host: std::env::var("REDIS_HOST").ok(),
            redis_port: std::env::var("REDIS_PORT").ok().and_then(|v| v.parse().ok()),
            redis_ttl_secs: std::env::var("REDIS_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            neo4j_uri: std::env::var("NEO4J_URI").ok(),
            neo4j_user: std::env::var("NEO4J_USER").ok(),
            neo4j_password: std::env::var("NEO4J_PASSWORD").ok(),
            app_base_url: std::env::var("APP_BASE_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL").ok(),
        }
    }

    pub fn require_groq_api_key(&self) -> Result<&str, StrataError> {
        self.groq_api_key
            .as_deref()
            .ok_or_else(|| StrataError::ConfigMissing("GROQ_API_KEY".to_string()))
    }

    pub fn require_neo4j_uri(&self) -> Result<&str, StrataError> {
        self.neo4j_uri
            .as_deref()
            .ok_or_else(|| StrataError::ConfigMissing("NEO4J_URI".to_string()))
    }
}

/// Per-model token pricing, in USD per 1000 tokens. Used by the API-call
/// tracker (C12) to compute `cost_usd` for each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTable {
    pub models: std::collections::BTreeMap<String, ModelPrice>,
    pub default: ModelPrice,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut models = std::collections::BTreeMap::new();
        models.insert(
            "llama-3.1-70b-versatile".to_string(),
            ModelPrice {
                input_per_1k: 0.00059,
                output_per_1k: 0.00079,
            },
        );
        models.insert(
            "llama-3.1-8b-instant".to_string(),
            ModelPrice {
                input_per_1k: 0.00005,
                output_per_1k: 0.00008,
            },
        );
        Self {
            models,
            default: ModelPrice {
                input_per_1k: 0.0005,
                output_per_1k: 0.0008,
            },
        }
    }
}

impl PricingTable {
    /// Load `<artifacts_root>/pricing.toml`, falling back to the built-in
    /// default table when absent or unparsable (logged, not fatal).
    pub fn load(artifacts_root: &Path) -> Self {
        let path = artifacts_root.join("pricing.toml");
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}. Using default.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read {}: {}. Using default.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn price_for(&self, model: &str) -> &ModelPrice {
        self.models.get(model).unwrap_or(&self.default)
    }
}
