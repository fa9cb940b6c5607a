//! CLI interface for the schema-intelligence batch tool and interactive
//! NL->SQL tester (spec §6: batch exit codes 0/1/2/3; the HTTP surface
//! itself is explicitly out of scope — this is the thin local harness
//! used while developing against the core).

pub mod handlers;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use output::OutputMode;

#[derive(Parser)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one `<client_id>.yaml` per client (default: ./clients)
    #[arg(long, env = "STRATA_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Directory holding per-client ingestion artifacts (default: ./artifacts)
    #[arg(long, env = "STRATA_ARTIFACTS_DIR", global = true)]
    pub artifacts_dir: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ingestion pipeline (C1-C7) for a client.
    Ingest {
        /// Client ID (matches `<config_dir>/<client_id>.yaml`)
        client_id: String,
    },

    /// Ask a single natural-language question against a client's schema.
    Ask {
        /// Client ID
        client_id: String,
        /// Natural-language question
        question: String,
        /// Agent kind: conversational, neo4j_engine, network_x_engine
        #[arg(long, default_value = "conversational")]
        agent: String,
        /// Model override (defaults to GROQ_MODEL)
        #[arg(long)]
        model: Option<String>,
    },

    /// List known client IDs, agent kinds, and model names.
    Discover,

    /// Show the API-call tracker summary (cost, success rate, per-model).
    Metrics,

    /// Purge all graph-store data for a client (reset, spec §4.7).
    Purge {
        /// Client ID
        client_id: String,
    },
}

/// Execute a parsed command, returning the process exit code to use.
pub async fn execute(command: &Commands, ctx: &crate::init::Context, json: bool) -> anyhow::Result<i32> {
    let mode = OutputMode::from_json_flag(json);

    match command {
        Commands::Ingest { client_id } => handlers::ingest::handle_ingest(ctx, client_id, mode).await,
        Commands::Ask {
            client_id,
            question,
            agent,
            model,
        } => {
            handlers::ask::handle_ask(ctx, client_id, question, agent, model.as_deref(), mode).await?;
            Ok(0)
        }
        Commands::Discover => {
            handlers::discover::handle_discover(ctx, mode).await?;
            Ok(0)
        }
        Commands::Metrics => {
            handlers::metrics::handle_metrics(ctx, mode).await?;
            Ok(0)
        }
        Commands::Purge { client_id } => {
            handlers::purge::handle_purge(ctx, client_id, mode).await?;
            Ok(0)
        }
    }
}
