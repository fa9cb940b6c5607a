//! Groq chat completions client (spec §6 LLM chat capability), reqwest-based.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StrataError;
use crate::models::{ConversationRole, Message};

use super::{ChatCompletion, LlmClient, ResponseFormat};

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default deadline applied to every LLM call (spec §5).
pub const LLM_CALL_DEADLINE: Duration = Duration::from_secs(30);

pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct GroqMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for GroqMessage {
    fn from(m: &Message) -> Self {
        GroqMessage {
            role: match m.role {
                ConversationRole::System => "system",
                ConversationRole::User => "user",
                ConversationRole::Assistant => "assistant",
            },
            content: m.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct ResponseFormatWire {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatWire>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Deserialize)]
struct GroqChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct GroqUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    usage: Option<GroqUsage>,
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
        response_format: ResponseFormat,
    ) -> Result<ChatCompletion, StrataError> {
        let request = GroqRequest {
            model: model.to_string(),
            messages: messages.iter().map(GroqMessage::from).collect(),
            temperature,
            max_tokens,
            response_format: matches!(response_format, ResponseFormat::JsonObject)
                .then_some(ResponseFormatWire { kind: "json_object" }),
        };

        let call = self
            .http
            .post(GROQ_API_BASE)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(LLM_CALL_DEADLINE, call)
            .await
            .map_err(|_| StrataError::LlmUnavailable("request timed out".to_string()))??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StrataError::LlmUnavailable(format!(
                "groq returned {status}: {body}"
            )));
        }

        let parsed: GroqResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| StrataError::LlmMalformed("no choices in response".to_string()))?;

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(ChatCompletion {
            content,
            input_tokens,
            output_tokens,
        })
    }
}
