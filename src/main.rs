//! Strata - schema-intelligence layer
//!
//! Usage:
//!   strata ingest <client_id>              Run the C1-C7 pipeline for a client
//!   strata ask <client_id> "question"      Ask a single NL->SQL question
//!   strata discover                        List known clients/agents/models
//!   strata metrics                         Show the API-call tracker summary
//!   strata purge <client_id>                Reset a client's graph-store data
//!   strata --help                          Show all commands

use anyhow::Result;
use clap::Parser;

use strata::cli::Cli;
use strata::init::Context;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("strata=info".parse()?),
        )
        .init();

    let config_dir = cli.config_dir.clone().unwrap_or_else(|| "./clients".into());
    let ctx = Context::new(config_dir, cli.artifacts_dir.clone()).await?;

    let exit_code = match strata::cli::execute(&cli.command, &ctx, cli.json).await {
        Ok(code) => code,
        Err(e) => {
            strata::cli::output::print_error(&e.to_string());
            1
        }
    };

    std::process::exit(exit_code);
}
