//! Classification of raw model replies
//!
//! Every reply maps to exactly one [`LlmResponse`] variant; only the `Ok`
//! variant carries a suite, so a success without a suite cannot be expressed.

use crate::assembler::TestsAssembler;
use crate::suite::GeneratedTestSuite;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a classified reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseErrorCode {
    Ok,
    PromptTooLong,
    EmptyLlmResponse,
    TestSuiteParsingFailure,
}

impl fmt::Display for ResponseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::PromptTooLong => write!(f, "PROMPT_TOO_LONG"),
            Self::EmptyLlmResponse => write!(f, "EMPTY_LLM_RESPONSE"),
            Self::TestSuiteParsingFailure => write!(f, "TEST_SUITE_PARSING_FAILURE"),
        }
    }
}

/// A classified model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    /// A suite was recovered; it may still hold zero test cases.
    Ok(GeneratedTestSuite),
    /// The request was rejected before reaching the model.
    PromptTooLong,
    /// The model answered with nothing but whitespace.
    EmptyLlmResponse,
    /// Text came back but no test class could be parsed from it.
    TestSuiteParsingFailure,
}

impl LlmResponse {
    pub fn error_code(&self) -> ResponseErrorCode {
        match self {
            Self::Ok(_) => ResponseErrorCode::Ok,
            Self::PromptTooLong => ResponseErrorCode::PromptTooLong,
            Self::EmptyLlmResponse => ResponseErrorCode::EmptyLlmResponse,
            Self::TestSuiteParsingFailure => ResponseErrorCode::TestSuiteParsingFailure,
        }
    }

    pub fn test_suite(&self) -> Option<&GeneratedTestSuite> {
        match self {
            Self::Ok(suite) => Some(suite),
            _ => None,
        }
    }
}

/// Classify whatever the assembler collected for one request.
///
/// `reformat` normalizes the suite (see [`GeneratedTestSuite::reformat`]).
pub fn classify_response(
    assembler: &dyn TestsAssembler,
    package_name: &str,
    reformat: bool,
) -> LlmResponse {
    if assembler.content().trim().is_empty() {
        return LlmResponse::EmptyLlmResponse;
    }

    match assembler.assemble_test_suite(package_name) {
        Some(suite) if reformat => LlmResponse::Ok(suite.reformat()),
        Some(suite) => LlmResponse::Ok(suite),
        None => LlmResponse::TestSuiteParsingFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::JUnitTestsAssembler;

    fn classify(text: &str) -> LlmResponse {
        let mut assembler = JUnitTestsAssembler::new();
        assembler.consume(text);
        classify_response(&assembler, "com.example", true)
    }

    #[test]
    fn test_blank_reply_is_empty() {
        assert_eq!(classify("").error_code(), ResponseErrorCode::EmptyLlmResponse);
        assert_eq!(classify("  \n\t ").error_code(), ResponseErrorCode::EmptyLlmResponse);
    }

    #[test]
    fn test_prose_reply_is_parse_failure() {
        let response = classify("Sorry, I can't write tests for that.");
        assert_eq!(response.error_code(), ResponseErrorCode::TestSuiteParsingFailure);
        assert!(response.test_suite().is_none());
    }

    #[test]
    fn test_class_reply_is_ok_with_suite() {
        let response = classify("```java\npublic class T {\n @Test void a() { x(); }\n @Test void a() { y(); }\n}\n```");
        let suite = response.test_suite().expect("suite");
        assert_eq!(suite.package_name, "com.example");
        let names: Vec<&str> = suite.test_cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a_1"]);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ResponseErrorCode::PromptTooLong.to_string(), "PROMPT_TOO_LONG");
        assert_eq!(LlmResponse::PromptTooLong.error_code(), ResponseErrorCode::PromptTooLong);
    }
}
