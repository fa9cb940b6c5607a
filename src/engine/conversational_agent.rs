//! Conversational agent (spec §4.9): a single JSON-constrained LLM call
//! plans `{mode, summary, sql}`; on a dataframe success a second call
//! produces a data-aware narrative summary.

use serde::Deserialize;

use crate::cache::cache_key;
use crate::engine::EngineContext;
use crate::engine::{chart, token_budget};
use crate::error::StrataError;
use crate::llm::ResponseFormat;
use crate::models::{ChatRequest, ChatResponse, Message, ResponseMode};
use crate::validator::{sanitize_llm_sql, validate_and_execute, SqlOutcome};

const PLAN_TEMPERATURE: f32 = 0.0;
const PLAN_MAX_TOKENS: u32 = 500;
const SUMMARY_TEMPERATURE: f32 = 0.1;
const SUMMARY_MAX_TOKENS: u32 = 400;
const MAX_SAMPLE_ROWS: usize = 20;

#[derive(Debug, Deserialize)]
struct PlannerReply {
    mode: String,
    summary: Option<String>,
    sql: Option<String>,
}

fn parse_mode(raw: &str) -> Option<ResponseMode> {
    match raw {
        "summary_only" => Some(ResponseMode::SummaryOnly),
        "sql_only" => Some(ResponseMode::SqlOnly),
        "sql_and_summary" => Some(ResponseMode::SqlAndSummary),
        _ => None,
    }
}

fn parse_planner_reply(raw: &str) -> Result<(ResponseMode, PlannerReply), StrataError> {
    let reply: PlannerReply = serde_json::from_str(raw)
        .map_err(|e| StrataError::LlmMalformed(format!("planner JSON did not parse: {e}")))?;
    let mode = parse_mode(&reply.mode)
        .ok_or_else(|| StrataError::LlmMalformed(format!("unknown mode '{}'", reply.mode)))?;
    Ok((mode, reply))
}

fn system_prompt_with_modes(schema_context: &str) -> String {
    format!(
        "You are a database analyst. Use the schema below to answer questions.\n\n{schema_context}\n\n\
         Reply with strict JSON: {{\"mode\": \"summary_only\"|\"sql_only\"|\"sql_and_summary\", \
         \"summary\": string, \"sql\": string|null}}. Use summary_only when no data access is \
         needed, sql_only when only the SQL is wanted, sql_and_summary when a query should run \
         and be narrated."
    )
}

pub async fn run(ctx: &EngineContext<'_>, request: ChatRequest) -> ChatResponse {
    let key = cache_key(&request.client_id, &request.user_message);
    if let Some(cached) = ctx.cache.get(&key).await {
        return ChatResponse {
            full_history: request.history.clone(),
            ..cached
        };
    }

    let schema_context = match super::build_system_prompt(ctx, &request.client_id).await {
        Ok(prompt) => prompt,
        Err(e) => return super::failure_response(&request, e.as_tag()),
    };
    let system_prompt = system_prompt_with_modes(&schema_context);

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
            PLAN_TEMPERATURE,
            PLAN_MAX_TOKENS,
            ResponseFormat::JsonObject,
        )
        .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let raw_reply = match outcome {
        Ok(completion) => {
            ctx.tracker.record(
                "conversational:plan",
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
                "conversational:plan",
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

    let (mut mode, reply) = match parse_planner_reply(&raw_reply) {
        Ok(parsed) => parsed,
        Err(e) => return super::failure_response(&request, e.as_tag()),
    };

    // No sql field: answer from the plan's own summary.
    let Some(sql_text) = reply.sql.filter(|s| !s.trim().is_empty()) else {
        let response = ChatResponse {
            mode,
            summary: reply.summary,
            sql: None,
            chart_suggestion: None,
            dataframe: None,
            error: None,
            full_history: request.history.clone(),
        };
        return response;
    };

    if matches!(mode, ResponseMode::SummaryOnly) {
        mode = ResponseMode::SqlAndSummary;
    }

    let sql = match sanitize_llm_sql(&sql_text) {
        Ok(sql) => sql,
        Err(e) => return super::failure_response(&request, e.as_tag()),
    };

    match validate_and_execute(ctx.db, &sql).await {
        SqlOutcome::Executed(dataframe) => {
            let chart_suggestion = Some(chart::suggest(&dataframe));
            let summary = if matches!(mode, ResponseMode::SqlAndSummary) {
                data_aware_summary(ctx, &request, &dataframe).await
            } else {
                reply.summary.unwrap_or_default()
            };

            let response = ChatResponse {
                mode,
                summary: Some(summary.clone()),
                sql: Some(sql),
                chart_suggestion,
                dataframe: Some(dataframe),
                error: None,
                full_history: super::append_turn(&request, &summary),
            };
            if response.is_cacheable() {
                ctx.cache.set(key, response.clone()).await;
            }
            response
        }
        SqlOutcome::Rejected(alert) => ChatResponse {
            mode: ResponseMode::SummaryOnly,
            summary: Some(alert),
            sql: Some(sql),
            chart_suggestion: None,
            dataframe: None,
            error: Some("sql_unsafe".to_string()),
            full_history: request.history.clone(),
        },
        SqlOutcome::Failed(err) => ChatResponse {
            mode: ResponseMode::SummaryOnly,
            summary: Some(format!("The query failed: {err}")),
            sql: Some(sql),
            chart_suggestion: None,
            dataframe: None,
            error: Some("sql_exec_failed".to_string()),
            full_history: request.history.clone(),
        },
    }
}

/// Second LLM call (spec §4.9 step 5): a data-aware narrative summary
/// over the executed dataframe, at a slightly warmer temperature.
async fn data_aware_summary(
    ctx: &EngineContext<'_>,
    request: &ChatRequest,
    dataframe: &crate::models::DataFrame,
) -> String {
    let preview = render_preview(dataframe);
    let prompt = format!(
        "The user asked: \"{}\"\n\nQuery result:\n{preview}\n\nWrite a concise natural-language \
         summary of these results.",
        request.user_message
    );

    let started = std::time::Instant::now();
    let outcome = ctx
        .llm
        .chat(
            &request.model_name,
            &[Message::user(prompt)],
            SUMMARY_TEMPERATURE,
            SUMMARY_MAX_TOKENS,
            ResponseFormat::Text,
        )
        .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(completion) => {
            ctx.tracker.record(
                "conversational:summarize",
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
                "conversational:summarize",
                &request.model_name,
                0,
                0,
                latency_ms,
                false,
                Some(e.as_tag().to_string()),
            );
            format!("Query executed; {} row(s) returned.", dataframe.rows.len())
        }
    }
}

fn cell_display(cell: &crate::models::CellValue) -> String {
    use crate::models::CellValue;
    match cell {
        CellValue::Null => "NULL".to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::Text(s) => s.clone(),
        CellValue::Temporal(t) => t.clone(),
    }
}

fn render_preview(dataframe: &crate::models::DataFrame) -> String {
    let header = dataframe.columns.join(" | ");
    let rows: Vec<String> = dataframe
        .rows
        .iter()
        .take(MAX_SAMPLE_ROWS)
        .map(|row| row.iter().map(cell_display).collect::<Vec<_>>().join(" | "))
        .collect();
    format!("{header}\n{}", rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_planner_reply() {
        let raw = r#"{"mode": "sql_and_summary", "summary": "ok", "sql": "select 1;"}"#;
        let (mode, reply) = parse_planner_reply(raw).unwrap();
        assert_eq!(mode, ResponseMode::SqlAndSummary);
        assert_eq!(reply.sql.as_deref(), Some("select 1;"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_planner_reply("not json").is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let raw = r#"{"mode": "bogus", "summary": "x", "sql": null}"#;
        assert!(parse_planner_reply(raw).is_err());
    }
}
