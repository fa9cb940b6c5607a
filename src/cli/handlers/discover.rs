//! Config-discovery handler (spec §6): available client IDs, agent
//! kinds, and model names, without touching any external dependency.

use anyhow::Result;

use crate::cli::output::{output_json, print_kv, print_section, OutputMode};
use crate::config::{discover_client_ids, AGENT_KINDS};
use crate::init::Context;

pub async fn handle_discover(ctx: &Context, mode: OutputMode) -> Result<()> {
    let clients = discover_client_ids(&ctx.config_dir);
    let models: Vec<&String> = ctx.pricing.models.keys().collect();

    if mode == OutputMode::Json {
        output_json(&serde_json::json!({
            "clients": clients,
            "agent_kinds": AGENT_KINDS,
            "models": models,
        }));
        return Ok(());
    }

    print_section("Clients", "");
    if clients.is_empty() {
        println!("  (none found in {})", ctx.config_dir.display());
    }
    for client in &clients {
        print_kv("client", client);
    }

    print_section("Agent kinds", "");
    for kind in AGENT_KINDS {
        print_kv("agent", kind);
    }

    print_section("Known models", "");
    for model in models {
        print_kv("model", model);
    }

    Ok(())
}
