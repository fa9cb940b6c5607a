//! Engine agent (spec §4.9): the NetworkX/Neo4j-backed variant. A single
//! LLM call returns raw SQL (no JSON wrapper); the reply summary is a
//! fixed templated string, never a second LLM call.

use crate::cache::cache_key;
use crate::engine::EngineContext;
use crate::engine::{chart, token_budget};
use crate::llm::ResponseFormat;
use crate::models::{ChatRequest, ChatResponse, ChartSuggestion, Message, ResponseMode};
use crate::validator::{sanitize_llm_sql, validate_and_execute, SqlOutcome};

const SQL_AGENT_TEMPERATURE: f32 = 0.0;
const SQL_AGENT_MAX_TOKENS: u32 = 400;

pub async fn run(ctx: &EngineContext<'_>, request: ChatRequest) -> ChatResponse {
    let key = cache_key(&request.client_id, &request.user_message);
    if let Some(cached) = ctx.cache.get(&key).await {
        return ChatResponse {
            full_history: request.history.clone(),
            ..cached
        };
    }

    let system_prompt = match super::build_system_prompt(ctx, &request.client_id).await {
        Ok(prompt) => prompt,
        Err(e) => return super::failure_response(&request, e.as_tag()),
    };

    let mut messages = vec![Message::system(system_prompt)];
    messages.extend(request.history.iter().cloned());
    messages.push(Message::user(&request.user_message));
    let messages = token_budget::trim_to_budget(messages, token_budget::DEFAULT_TOKEN_BUDGET);

    let started = std::time::Instant::now();
    let outcome = ctx
        .llm
        .chat(
            &request.model_name,
            &messages,
            SQL_AGENT_TEMPERATURE,
            SQL_AGENT_MAX_TOKENS,
            ResponseFormat::Text,
        )
        .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let raw_sql = match outcome {
        Ok(completion) => {
            ctx.tracker.record(
                "sql_agent:plan",
                &request.model_name,
                completion.input_tokens,
                completion.output_tokens,
                latency_ms,
                true,
                None,
            );
            completion.content
        }
        Err(e) => {
            ctx.tracker.record(
                "sql_agent:plan",
                &request.model_name,
                0,
                0,
                latency_ms,
                false,
                Some(e.as_tag().to_string()),
            );
            return super::failure_response(&request, e.as_tag());
        }
    };

    let sql = match sanitize_llm_sql(&raw_sql) {
        Ok(sql) => sql,
        Err(e) => return super::failure_response(&request, e.as_tag()),
    };

    let response = match validate_and_execute(ctx.db, &sql).await {
        SqlOutcome::Executed(dataframe) => {
            let chart_suggestion = Some(chart::suggest(&dataframe));
            ChatResponse {
                mode: ResponseMode::SqlAndSummary,
                summary: Some("Query executed successfully.".to_string()),
                sql: Some(sql),
                chart_suggestion,
                dataframe: Some(dataframe),
                error: None,
                full_history: super::append_turn(&request, "Query executed successfully."),
            }
        }
        SqlOutcome::Rejected(alert) => ChatResponse {
            mode: ResponseMode::SummaryOnly,
            summary: Some(alert),
            sql: Some(sql),
            chart_suggestion: Some(ChartSuggestion::None),
            dataframe: None,
            error: Some("sql_unsafe".to_string()),
            full_history: request.history.clone(),
        },
        SqlOutcome::Failed(err) => ChatResponse {
            mode: ResponseMode::SummaryOnly,
            summary: Some(format!("The query failed: {err}")),
            sql: Some(sql),
            chart_suggestion: Some(ChartSuggestion::None),
            dataframe: None,
            error: Some("sql_exec_failed".to_string()),
            full_history: request.history.clone(),
        },
    };

    if response.is_cacheable() {
        ctx.cache.set(key, response.clone()).await;
    }
    response
}
