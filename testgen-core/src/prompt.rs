//! Prompt size reduction and corrective prompts
//!
//! When the model rejects a prompt as too long, the loop asks a
//! [`PromptSizeReductionStrategy`] for a smaller one. Corrective prompts are
//! sent after a failed attempt and refer back to the previous question, so
//! they rely on the request manager keeping chat history.

use tracing::info;

/// Sent after an empty reply.
pub const EMPTY_RESPONSE_PROMPT: &str =
    "You have provided an empty answer! Please, answer my previous question with the same formats";

/// Sent after a reply that parsed but contained no test cases.
pub const NO_TEST_CASES_PROMPT: &str =
    "You have provided an empty answer! Please answer my previous question with the same formats.";

/// Sent after a reply that could not be parsed into a test suite.
pub const NOT_PARSABLE_PROMPT: &str =
    "The provided code is not parsable. Please, generate the correct code";

/// Corrective prompt embedding the suite-level compiler diagnostics.
pub fn compilation_error_prompt(diagnostics: &str) -> String {
    format!(
        "I cannot compile the tests that you provided. The error is:\n{}\n Fix this issue in the provided tests.\nGenerate public classes and public methods. Response only a code with tests between ```, do not provide any other text.",
        diagnostics
    )
}

/// Shrinks a prompt that the model rejected as too long.
pub trait PromptSizeReductionStrategy {
    /// Whether another reduction step is available.
    fn is_reduction_possible(&self) -> bool;

    /// Apply one reduction step and return the new prompt.
    ///
    /// Only called after [`is_reduction_possible`](Self::is_reduction_possible)
    /// returned `true`.
    fn reduce_size_and_generate_prompt(&mut self) -> String;
}

/// Reduction by dropping context sections, lowest priority (last) first.
#[derive(Debug, Clone)]
pub struct ContextTrimmingStrategy {
    instructions: String,
    sections: Vec<String>,
}

impl ContextTrimmingStrategy {
    /// `sections` are ordered from most to least important.
    pub fn new(instructions: impl Into<String>, sections: Vec<String>) -> Self {
        Self {
            instructions: instructions.into(),
            sections,
        }
    }

    /// Split a prompt on blank-line-separated blocks: the first block is kept
    /// as instructions, the rest become trimmable context.
    pub fn from_prompt(prompt: &str) -> Self {
        let mut blocks = prompt
            .split("\n\n")
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from);
        let instructions = blocks.next().unwrap_or_default();
        Self::new(instructions, blocks.collect())
    }

    /// The full prompt for the current set of sections.
    pub fn prompt(&self) -> String {
        std::iter::once(self.instructions.as_str())
            .chain(self.sections.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn remaining_sections(&self) -> usize {
        self.sections.len()
    }
}

impl PromptSizeReductionStrategy for ContextTrimmingStrategy {
    fn is_reduction_possible(&self) -> bool {
        !self.sections.is_empty()
    }

    fn reduce_size_and_generate_prompt(&mut self) -> String {
        if self.sections.pop().is_some() {
            info!(
                remaining = self.sections.len(),
                "Dropped a context section to shrink the prompt"
            );
        }
        self.prompt()
    }
}
