//! LLM chat capability (spec §6): a single `chat` operation abstracting
//! over the Groq-backed implementation in `groq`.

pub mod groq;

use async_trait::async_trait;

use crate::error::StrataError;
use crate::models::Message;

/// A single chat completion result.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// How the model should be constrained to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
        response_format: ResponseFormat,
    ) -> Result<ChatCompletion, StrataError>;
}
