//! One end-to-end generation session.
//!
//! Synchronous; the binary runs it on a blocking thread.

use anyhow::{Context, Result};
use testgen_core::{
    CancellationHandle, CommandTestCompiler, ContextTrimmingStrategy, FeedbackCollaborators,
    FeedbackConfig, FeedbackLoop, FeedbackOutcome, FsTestStorage, JUnitTestsAssembler,
    JavaTestsPresenter, LlmTransport, Report, RequestManager, WarningType,
};
use tracing::info;

/// Everything a session produced.
#[derive(Debug)]
pub struct SessionSummary {
    pub outcome: FeedbackOutcome,
    pub report: Report,
    pub warnings: Vec<WarningType>,
}

/// Run the feedback loop over `transport` with the filesystem storage and the
/// configured compiler command.
pub fn run_session<T: LlmTransport>(
    config: &FeedbackConfig,
    prompt: &str,
    transport: T,
    system_prompt: Option<&str>,
    indicator: &CancellationHandle,
) -> Result<SessionSummary> {
    let compiler = CommandTestCompiler::from_template(&config.compile_command)
        .context("Invalid compile command")?;
    let presenter = JavaTestsPresenter::new(&config.test_suite_filename, config.class_name_prefix.clone());
    let mut reduction = ContextTrimmingStrategy::from_prompt(prompt);

    let mut requester = RequestManager::new(transport, JUnitTestsAssembler::new());
    if let Some(system) = system_prompt {
        requester = requester.with_system_prompt(system);
    }

    let mut report = Report::new();
    let mut warnings = Vec::new();
    let outcome = {
        let mut observer = |w: WarningType| warnings.push(w);
        let mut feedback = FeedbackLoop::new(
            config,
            prompt,
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &compiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator,
            },
        );
        feedback.run(&mut report, Some(&mut observer))
    };

    info!(
        result = %outcome.execution_result,
        attempts = outcome.attempts.len(),
        accepted = report.len(),
        "Session finished"
    );

    Ok(SessionSummary {
        outcome,
        report,
        warnings,
    })
}
