//! Blocking chat-completions transport for the feedback loop
//!
//! Posts the whole chat history to `<url>/chat/completions` and feeds the
//! first choice's content into the assembler. Context-window rejections are
//! reported as [`SendResult::PromptTooLong`] so the loop can shrink the prompt.

use crate::config::AgentConfig;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use testgen_core::{
    ChatMessage, FeedbackError, FeedbackResult, LlmTransport, ProgressIndicator, SendResult,
    TestsAssembler,
};
use thiserror::Error;
use tracing::{debug, info};

/// Transport failures before they are folded into [`FeedbackError`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

impl From<ClientError> for FeedbackError {
    fn from(e: ClientError) -> Self {
        FeedbackError::transport(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Whether an error response means the prompt did not fit the context window.
pub fn is_context_length_error(status: u16, body: &str) -> bool {
    if status == StatusCode::PAYLOAD_TOO_LARGE.as_u16() {
        return true;
    }
    if status != StatusCode::BAD_REQUEST.as_u16() {
        return false;
    }
    let body = body.to_lowercase();
    [
        "context_length_exceeded",
        "context length",
        "maximum context",
        "context window",
        "too many tokens",
        "prompt is too long",
    ]
    .iter()
    .any(|marker| body.contains(marker))
}

/// Content of the first choice; an absent or null content is an empty reply.
pub fn completion_text(response: ChatCompletionResponse) -> Result<String, ClientError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("no choices".to_string()))?;
    Ok(choice.message.content.unwrap_or_default())
}

/// OpenAI-compatible transport over `reqwest::blocking`.
pub struct OpenAiTransport {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiTransport {
    /// Must not be called from inside an async runtime; the blocking client
    /// owns its own.
    pub fn new(config: &AgentConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.completions_url(),
            model: config.endpoint.model.clone(),
            api_key: config.endpoint.api_key.clone(),
            temperature: config.temperature,
        })
    }

    fn post(&self, history: &[ChatMessage]) -> Result<Option<String>, ClientError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: history,
            temperature: self.temperature,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if is_context_length_error(status.as_u16(), &body) {
                return Ok(None);
            }
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        completion_text(parsed).map(Some)
    }
}

impl LlmTransport for OpenAiTransport {
    fn send(
        &mut self,
        history: &[ChatMessage],
        indicator: &dyn ProgressIndicator,
        assembler: &mut dyn TestsAssembler,
    ) -> FeedbackResult<SendResult> {
        indicator.set_text("Waiting for the model");
        info!(model = %self.model, messages = history.len(), "Requesting completion");

        match self.post(history)? {
            Some(text) => {
                debug!(chars = text.len(), "Completion received");
                assembler.consume(&text);
                Ok(SendResult::Ok)
            }
            None => {
                info!("Prompt rejected as too long");
                Ok(SendResult::PromptTooLong)
            }
        }
    }
}
