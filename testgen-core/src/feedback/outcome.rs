//! Terminal results and caller-visible events of the feedback loop.

use crate::error::{FeedbackError, FeedbackResult};
use crate::suite::{CompilableSet, GeneratedTestSuite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a feedback cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionResult {
    /// A suite was accepted.
    Ok,
    /// The attempt budget ran out before any case compiled.
    NoCompilableTestCasesGenerated,
    /// Cancellation was observed.
    Canceled,
    /// The prompt was too long and could not be reduced further.
    ProvidedPromptTooLong,
    /// Storage claimed success but a written file is missing.
    SavingTestFilesIssue,
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::NoCompilableTestCasesGenerated => write!(f, "NO_COMPILABLE_TEST_CASES_GENERATED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::ProvidedPromptTooLong => write!(f, "PROVIDED_PROMPT_TOO_LONG"),
            Self::SavingTestFilesIssue => write!(f, "SAVING_TEST_FILES_ISSUE"),
        }
    }
}

/// Non-fatal events reported to the caller, once per triggering attempt and
/// before the corrective prompt is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    TestSuiteParsingFailed,
    NoTestCasesGenerated,
    CompilationErrorOccurred,
}

/// Caller-supplied observer for [`WarningType`] events.
pub trait WarningObserver {
    fn on_warning(&mut self, warning: WarningType);
}

impl<F: FnMut(WarningType)> WarningObserver for F {
    fn on_warning(&mut self, warning: WarningType) {
        self(warning)
    }
}

/// What happened in one counted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    EmptyResponse,
    ParsingFailure,
    NoTestCases,
    PromptTooLong,
    Canceled,
    SavingFailed,
    CompilationFailed,
    Accepted,
}

/// One counted attempt of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Attempt number (1-indexed, oversized prompts excluded)
    pub attempt: u32,
    pub status: AttemptStatus,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(attempt: u32, status: AttemptStatus) -> Self {
        Self {
            attempt,
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Final result of a feedback cycle.
///
/// `generated_test_suite` is present if and only if `execution_result` is
/// [`ExecutionResult::Ok`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub execution_result: ExecutionResult,
    pub generated_test_suite: Option<GeneratedTestSuite>,
    pub compilable_test_cases: CompilableSet,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl FeedbackOutcome {
    /// Validating constructor.
    pub fn new(
        execution_result: ExecutionResult,
        generated_test_suite: Option<GeneratedTestSuite>,
        compilable_test_cases: CompilableSet,
    ) -> FeedbackResult<Self> {
        match (execution_result, &generated_test_suite) {
            (ExecutionResult::Ok, None) => Err(FeedbackError::OutcomeInvariant {
                message: "test suite must be provided when the result is OK".to_string(),
            }),
            (result, Some(_)) if result != ExecutionResult::Ok => Err(FeedbackError::OutcomeInvariant {
                message: format!("test suite must not be provided when the result is {}", result),
            }),
            _ => Ok(Self {
                execution_result,
                generated_test_suite,
                compilable_test_cases,
                attempts: Vec::new(),
            }),
        }
    }

    pub fn success(suite: GeneratedTestSuite, compilable_test_cases: CompilableSet) -> Self {
        Self {
            execution_result: ExecutionResult::Ok,
            generated_test_suite: Some(suite),
            compilable_test_cases,
            attempts: Vec::new(),
        }
    }

    /// Outcome without a suite.
    ///
    /// # Panics
    ///
    /// If `execution_result` is [`ExecutionResult::Ok`]; that is a bug in the
    /// caller, not a runtime condition.
    pub fn terminated(execution_result: ExecutionResult, compilable_test_cases: CompilableSet) -> Self {
        assert_ne!(
            execution_result,
            ExecutionResult::Ok,
            "an OK outcome requires a test suite"
        );
        Self {
            execution_result,
            generated_test_suite: None,
            compilable_test_cases,
            attempts: Vec::new(),
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_success(&self) -> bool {
        self.execution_result == ExecutionResult::Ok
    }
}
