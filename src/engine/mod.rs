//! Conversational Engine (C9, spec §4.9): stateless per-request dispatch
//! between the JSON-planning Conversational agent and the raw-SQL engine
//! agents (Neo4jEngine/NetworkXEngine), sharing one request/response
//! shape. Conversation state is owned by the caller — `EngineContext`
//! holds only read-mostly, shareable dependencies, reconstructed (or
//! borrowed) fresh per request so no agent ever accumulates state across
//! calls (Design Note: no long-lived mutable agent object).

pub mod chart;
pub mod conversational_agent;
pub mod sql_agent;
pub mod token_budget;

use crate::cache::{ResultCache, SchemaContextCache};
use crate::context_builder;
use crate::db::RelationalDatabase;
use crate::error::StrataError;
use crate::graph::GraphStore;
use crate::llm::LlmClient;
use crate::models::{ChatRequest, ChatResponse, Message};
use crate::tracker::ApiCallTracker;

/// Dependencies shared by every conversational request.
pub struct EngineContext<'a> {
    pub db: &'a dyn RelationalDatabase,
    pub graph: &'a dyn GraphStore,
    pub llm: &'a dyn LlmClient,
    pub cache: &'a ResultCache,
    pub schema_context_cache: &'a SchemaContextCache,
    pub tracker: &'a ApiCallTracker,
}

/// Dispatch a single conversational request to the agent named in
/// `request.agent` (spec §4.9).
pub async fn handle(ctx: &EngineContext<'_>, request: ChatRequest) -> ChatResponse {
    if request.agent.is_json_planner() {
        conversational_agent::run(ctx, request).await
    } else {
        sql_agent::run(ctx, request).await
    }
}

async fn build_system_prompt(ctx: &EngineContext<'_>, client_id: &str) -> Result<String, StrataError> {
    if let Some(cached) = ctx.schema_context_cache.get(client_id).await {
        return Ok(cached);
    }
    let context = context_builder::build_context(ctx.graph, client_id).await?;
    ctx.schema_context_cache
        .set(client_id.to_string(), context.clone())
        .await;
    Ok(context)
}

fn failure_response(request: &ChatRequest, error_tag: &str) -> ChatResponse {
    let summary = match error_tag {
        "llm_unavailable" => "The assistant is temporarily unavailable, please try again.",
        "llm_malformed" => "The assistant returned an unexpected response, please rephrase your question.",
        "graph_store_unavailable" => "Schema information is temporarily unavailable.",
        "sql_unsafe" => "That request was rejected as unsafe.",
        _ => "Something went wrong answering that question.",
    };
    ChatResponse::failure(summary, error_tag, request.history.clone())
}

fn append_turn(request: &ChatRequest, assistant_summary: &str) -> Vec<Message> {
    let mut history = request.history.clone();
    history.push(Message::user(&request.user_message));
    history.push(Message::assistant(assistant_summary));
    history
}
