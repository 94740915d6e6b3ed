//! Compilation Feedback Module
//!
//! Drives LLM test generation to a compilable suite:
//! - Request a suite and classify the reply
//! - Save per-case files and the suite file, then compile them
//! - Retry with a corrective prompt until the suite compiles or the budget runs out
//!
//! # Architecture
//!
//! ```text
//! Prompt → RequestManager → Assembler → Storage → Compiler → FeedbackLoop
//!    ↑                                                           |
//!    └──────────────────── corrective prompt ────────────────────┘
//! ```

pub mod compiler;
pub mod correction_loop;
pub mod outcome;

pub use compiler::{CommandTestCompiler, CompilationOutcome, TestCasesCompilationResult, TestCompiler};
pub use correction_loop::{FeedbackCollaborators, FeedbackLoop};
pub use outcome::{
    AttemptRecord, AttemptStatus, ExecutionResult, FeedbackOutcome, WarningObserver, WarningType,
};
