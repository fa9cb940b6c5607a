//! Purge-by-client handler — the dedicated reset operation for the
//! queryable graph store (spec §4.7).

use anyhow::{anyhow, Result};

use crate::cli::output::{print_success, OutputMode};
use crate::graph::GraphStore;
use crate::init::Context;

pub async fn handle_purge(ctx: &Context, client_id: &str, _mode: OutputMode) -> Result<()> {
    let graph = ctx
        .graph
        .as_ref()
        .ok_or_else(|| anyhow!("no graph store configured (set NEO4J_URI)"))?;
    graph.purge_client(client_id).await?;
    ctx.schema_context_cache.invalidate(client_id);
    print_success(&format!("purged graph data for client '{}'", client_id));
    Ok(())
}
