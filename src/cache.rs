//! Result Cache (C11): fingerprint-keyed cache of completed conversational
//! results (spec §4.11). Cache faults never fail a request — callers treat
//! a miss and an unavailable backend identically.

use std::time::Duration;

use moka::future::Cache;

use crate::models::ChatResponse;

const DEFAULT_TTL_SECS: u64 = 3600;

/// `nl2sql:{client}:{normalized_question}` — normalization is
/// lowercase + trim (spec §3).
pub fn cache_key(client_id: &str, user_message: &str) -> String {
    format!("nl2sql:{}:{}", client_id, user_message.trim().to_lowercase())
}

pub struct ResultCache {
    inner: Cache<String, ChatResponse>,
}

impl ResultCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(if ttl_secs == 0 { DEFAULT_TTL_SECS } else { ttl_secs }))
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<ChatResponse> {
        self.inner.get(key).await
    }

    /// Only successful, dataframe-bearing responses are cached (spec §4.11);
    /// callers are expected to check `ChatResponse::is_cacheable` before
    /// calling, but this is enforced here too so it can never be bypassed.
    pub async fn set(&self, key: String, value: ChatResponse) {
        if value.is_cacheable() {
            self.inner.insert(key, value).await;
        }
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

const SCHEMA_CONTEXT_TTL_SECS: u64 = 30;

/// Short-TTL cache in front of `context_builder::build_context`, keyed by
/// client ID: the schema context changes only on re-ingestion, so paying
/// for a fresh graph-store read on every chat turn is wasted work. A miss
/// or an unconfigured cache both just mean "call the graph store".
pub struct SchemaContextCache {
    inner: Cache<String, String>,
}

impl SchemaContextCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(if ttl_secs == 0 {
                    SCHEMA_CONTEXT_TTL_SECS
                } else {
                    ttl_secs
                }))
                .build(),
        }
    }

    pub async fn get(&self, client_id: &str) -> Option<String> {
        self.inner.get(client_id).await
    }

    pub async fn set(&self, client_id: String, context: String) {
        self.inner.insert(client_id, context).await;
    }

    pub fn invalidate(&self, client_id: &str) {
        self.inner.invalidate(client_id);
    }
}

impl Default for SchemaContextCache {
    fn default() -> Self {
        Self::new(SCHEMA_CONTEXT_TTL_SECS)
    }
}
