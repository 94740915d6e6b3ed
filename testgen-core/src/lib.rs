//! LLM Test Generation Core
//!
//! This library provides:
//! - A feedback loop that turns LLM replies into a compilable test suite
//! - Reply assembly and classification for JUnit-style suites
//! - Filesystem storage, a command-driven compiler, and prompt reduction
//!
//! The network client lives in the `testgen-agent` crate; everything here is
//! synchronous and transport-agnostic.
//!
//! # Usage
//!
//! ```ignore
//! let mut feedback = FeedbackLoop::new(&config, prompt, collaborators);
//! let outcome = feedback.run(&mut report, None);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod assembler;
pub mod config;
pub mod error;
pub mod feedback;
pub mod presenter;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod request;
pub mod response;
pub mod storage;
pub mod suite;

pub use assembler::{JUnitTestsAssembler, TestsAssembler};
pub use config::FeedbackConfig;
pub use error::{FeedbackError, FeedbackResult};
pub use feedback::{
    CommandTestCompiler, ExecutionResult, FeedbackCollaborators, FeedbackLoop, FeedbackOutcome,
    TestCompiler, WarningObserver, WarningType,
};
pub use presenter::{JavaTestsPresenter, TestsPresenter};
pub use progress::{CancellationHandle, ProgressIndicator};
pub use prompt::{ContextTrimmingStrategy, PromptSizeReductionStrategy};
pub use report::Report;
pub use request::{ChatMessage, LlmTransport, RequestManager, RequestMode, SendResult, TestSuiteRequester};
pub use response::LlmResponse;
pub use storage::{FsTestStorage, TestsPersistentStorage};
pub use suite::{CompilableSet, GeneratedTestCase, GeneratedTestSuite};
