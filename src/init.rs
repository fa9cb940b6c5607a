//! Shared initialization logic for the batch ingestion CLI and the
//! interactive `ask` command (mirrors the teacher's `AppContext`):
//! process-wide, read-mostly dependencies assembled once at startup.

use std::path::PathBuf;

use crate::artifacts::{artifacts_root_from_settings, ArtifactStore};
use crate::cache::{ResultCache, SchemaContextCache};
use crate::config::{ClientConfig, PricingTable, Settings};
use crate::db::pool::connect_with_retry;
use crate::db::postgres::PgDatabase;
use crate::error::StrataError;
use crate::graph::neo4j::Neo4jStore;
use crate::llm::groq::GroqClient;
use crate::tracker::ApiCallTracker;

/// Process-wide context shared across CLI commands. Per-client resources
/// (the source database connection, the client's YAML config) are
/// resolved on demand since different clients may point at entirely
/// different databases.
pub struct Context {
    pub settings: Settings,
    pub config_dir: PathBuf,
    pub artifacts: ArtifactStore,
    pub pricing: PricingTable,
    pub tracker: ApiCallTracker,
    pub cache: ResultCache,
    pub schema_context_cache: SchemaContextCache,
    pub graph: Option<Neo4jStore>,
    pub llm: Option<GroqClient>,
}

impl Context {
    /// Assemble the shared context. Missing optional dependencies (Neo4j,
    /// Groq) degrade to `None` with a warning rather than failing startup —
    /// ingestion and querying without them still work for the parts of the
    /// pipeline that don't need them (spec §7 graceful-degradation policy).
    pub async fn new(config_dir: PathBuf, artifacts_root: Option<PathBuf>) -> Result<Self, StrataError> {
        let settings = Settings::from_env();
        let artifacts_root = artifacts_root_from_settings(artifacts_root.as_deref());
        tracing::info!("Using artifacts root: {}", artifacts_root.display());

        let pricing = PricingTable::load(&artifacts_root);
        let artifacts = ArtifactStore::new(artifacts_root.clone());
        let tracker = ApiCallTracker::new(&artifacts_root, pricing.clone());
        let cache = ResultCache::new(settings.redis_ttl_secs);
        let schema_context_cache = SchemaContextCache::default();

        let graph = match connect_graph_store(&settings).await {
            Some(store) => {
                if let Err(e) = store.ensure_constraints().await {
                    tracing::warn!("failed to ensure neo4j constraints: {}", e);
                }
                Some(store)
            }
            None => None,
        };

        let llm = settings.groq_api_key.as_ref().map(|key| {
            tracing::info!("LLM enrichment and conversational engine enabled (model: {})", settings.groq_model);
            GroqClient::new(key.clone())
        });
        if llm.is_none() {
            tracing::warn!("GROQ_API_KEY not set; LLM enrichment and conversational engine disabled");
        }

        Ok(Self {
            settings,
            config_dir,
            artifacts,
            pricing,
            tracker,
            cache,
            schema_context_cache,
            graph,
            llm,
        })
    }

    pub fn load_client(&self, client_id: &str) -> Result<ClientConfig, StrataError> {
        ClientConfig::load(&self.config_dir, client_id)
    }

    /// Resolve credentials and connect to a client's source database.
    pub async fn connect_client_database(&self, client_id: &str) -> Result<PgDatabase, StrataError> {
        let client_config = self.load_client(client_id)?;
        let resolved = client_config.resolve_database()?;
        let pool = connect_with_retry(&resolved).await?;
        Ok(PgDatabase::new(pool))
    }
}

async fn connect_graph_store(settings: &Settings) -> Option<Neo4jStore> {
    let uri = settings.neo4j_uri.as_deref()?;
    let user = settings.neo4j_user.as_deref().unwrap_or("neo4j");
    let password = settings.neo4j_password.as_deref().unwrap_or_default();

    match Neo4jStore::connect(uri, user, password).await {
        Ok(store) => {
            tracing::info!("Connected to graph store at {}", uri);
            Some(store)
        }
        Err(e) => {
            tracing::warn!("graph store unavailable ({}); continuing with portable dumps only", e);
            None
        }
    }
}
