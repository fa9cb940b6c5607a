//! Interactive NL->SQL handler — a single conversational turn against a
//! client's current schema graph, for local testing without the HTTP
//! adapter (out of scope per spec §1).

use anyhow::{bail, Result};

use crate::cli::output::{output_json, print_header, print_hint, print_kv, print_table, OutputMode};
use crate::config::AGENT_KINDS;
use crate::engine::{handle, EngineContext};
use crate::init::Context;
use crate::models::{AgentKind, ChatRequest, Message};

fn parse_agent(s: &str) -> Result<AgentKind> {
    match s {
        "conversational" => Ok(AgentKind::Conversational),
        "neo4j_engine" => Ok(AgentKind::Neo4jEngine),
        "network_x_engine" => Ok(AgentKind::NetworkXEngine),
        other => bail!(
            "unknown agent '{}'; expected one of: {}",
            other,
            AGENT_KINDS.join(", ")
        ),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_ask(
    ctx: &Context,
    client_id: &str,
    question: &str,
    agent: &str,
    model: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    let agent_kind = parse_agent(agent)?;
    let db = ctx.connect_client_database(client_id).await?;
    let graph = ctx
        .graph
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no graph store configured (set NEO4J_URI)"))?;
    let llm = ctx
        .llm
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no LLM client configured (set GROQ_API_KEY)"))?;

    let engine_ctx = EngineContext {
        db: &db,
        graph,
        llm,
        cache: &ctx.cache,
        schema_context_cache: &ctx.schema_context_cache,
        tracker: &ctx.tracker,
    };

    let request = ChatRequest {
        user_message: question.to_string(),
        history: Vec::<Message>::new(),
        client_id: client_id.to_string(),
        agent: agent_kind,
        model_name: model.unwrap_or(&ctx.settings.groq_model).to_string(),
    };

    let response = handle(&engine_ctx, request).await;

    if mode == OutputMode::Json {
        output_json(&response);
        return Ok(());
    }

    print_header(&format!("Q: {}", question));
    if let Some(summary) = &response.summary {
        println!("{}\n", summary);
    }
    if let Some(sql) = &response.sql {
        print_kv("sql", sql);
    }
    if let Some(error) = &response.error {
        print_kv("error", error);
    }
    if let Some(df) = &response.dataframe {
        let headers: Vec<&str> = df.columns.iter().map(String::as_str).collect();
        let rows: Vec<Vec<String>> = df
            .rows
            .iter()
            .map(|row| row.iter().map(|c| format!("{:?}", c)).collect())
            .collect();
        if rows.is_empty() {
            print_hint("No results found. Try rephrasing your question.");
        } else {
            print_table(&headers, rows);
        }
    }
    if let Some(chart) = &response.chart_suggestion {
        print_kv("chart suggestion", &format!("{:?}", chart));
    }

    Ok(())
}
