//! Request manager: chat history, sending, and reply classification
//!
//! A single manager serves both generation feedback and user feedback
//! requests; [`RequestMode`] decides whether the outgoing prompt stays in the
//! chat history and whether the parsed suite is reformatted.

use crate::assembler::TestsAssembler;
use crate::error::FeedbackResult;
use crate::progress::ProgressIndicator;
use crate::response::{classify_response, LlmResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Transport-level outcome of one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// The model answered; its text is in the assembler.
    Ok,
    /// The prompt exceeded the model's context window.
    PromptTooLong,
}

/// Network client for the model.
pub trait LlmTransport {
    /// Send the chat history and stream the reply into `assembler`.
    fn send(
        &mut self,
        history: &[ChatMessage],
        indicator: &dyn ProgressIndicator,
        assembler: &mut dyn TestsAssembler,
    ) -> FeedbackResult<SendResult>;
}

/// Whether a request is part of the generation feedback cycle or a
/// user-initiated follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Prompt and reply are kept in history; the suite is reformatted.
    #[default]
    Feedback,
    /// Neither prompt nor reply is kept; the suite is returned as parsed.
    UserFeedback,
}

/// What the feedback loop needs from a request manager.
pub trait TestSuiteRequester {
    fn request(
        &mut self,
        prompt: &str,
        indicator: &dyn ProgressIndicator,
        package_name: &str,
        mode: RequestMode,
    ) -> LlmResponse;
}

/// Request manager over a transport and an assembler.
pub struct RequestManager<T, A> {
    transport: T,
    assembler: A,
    chat_history: Vec<ChatMessage>,
}

impl<T: LlmTransport, A: TestsAssembler> RequestManager<T, A> {
    pub fn new(transport: T, assembler: A) -> Self {
        Self {
            transport,
            assembler,
            chat_history: Vec::new(),
        }
    }

    /// Seed the history with a system message.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.chat_history.insert(0, ChatMessage::system(prompt));
        self
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn process_response(&mut self, package_name: &str, mode: RequestMode) -> LlmResponse {
        let content = self.assembler.content().to_string();
        debug!(mode = ?mode, "Full response:\n{}", content);

        if mode == RequestMode::Feedback {
            self.chat_history.push(ChatMessage::assistant(content));
        }

        classify_response(&self.assembler, package_name, mode == RequestMode::Feedback)
    }
}

impl<T: LlmTransport, A: TestsAssembler> TestSuiteRequester for RequestManager<T, A> {
    fn request(
        &mut self,
        prompt: &str,
        indicator: &dyn ProgressIndicator,
        package_name: &str,
        mode: RequestMode,
    ) -> LlmResponse {
        self.assembler.clear();
        self.chat_history.push(ChatMessage::user(prompt));

        info!(history_len = self.chat_history.len(), "Sending request");

        let sent = self
            .transport
            .send(&self.chat_history, indicator, &mut self.assembler);

        let sent = match sent {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "LLM request failed");
                self.assembler.clear();
                SendResult::Ok
            }
        };

        if sent == SendResult::PromptTooLong {
            self.chat_history.pop();
            return LlmResponse::PromptTooLong;
        }

        if mode == RequestMode::UserFeedback {
            self.chat_history.pop();
        }

        self.process_response(package_name, mode)
    }
}
