//! Feedback cycle for LLM test generation
//!
//! Each iteration:
//! 1. Checks cancellation and the attempt budget
//! 2. Sends the current prompt and classifies the reply
//! 3. Saves one file per test case plus the suite file
//! 4. Compiles them and grows the set of compilable cases
//! 5. Accepts the suite, or retries with a corrective prompt
//!
//! Oversized prompts are shrunk and re-sent without consuming an attempt.
//! Once the counter passes the threshold, the final attempt drops the model's
//! reply (even an empty or unparsable one) in favour of the accumulated
//! compilable cases and always terminates.

use crate::config::FeedbackConfig;
use crate::feedback::compiler::{CompilationOutcome, TestCasesCompilationResult, TestCompiler};
use crate::feedback::outcome::{
    AttemptRecord, AttemptStatus, ExecutionResult, FeedbackOutcome, WarningObserver, WarningType,
};
use crate::presenter::TestsPresenter;
use crate::progress::ProgressIndicator;
use crate::prompt::{
    compilation_error_prompt, PromptSizeReductionStrategy, EMPTY_RESPONSE_PROMPT,
    NOT_PARSABLE_PROMPT, NO_TEST_CASES_PROMPT,
};
use crate::report::Report;
use crate::request::{RequestMode, TestSuiteRequester};
use crate::response::LlmResponse;
use crate::storage::{class_with_test_case_name, TestsPersistentStorage};
use crate::suite::{CompilableSet, GeneratedTestCase, GeneratedTestSuite};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// External capabilities the feedback cycle drives.
pub struct FeedbackCollaborators<'a> {
    pub reduction: &'a mut dyn PromptSizeReductionStrategy,
    pub requester: &'a mut dyn TestSuiteRequester,
    pub compiler: &'a dyn TestCompiler,
    pub storage: &'a dyn TestsPersistentStorage,
    pub presenter: &'a dyn TestsPresenter,
    pub indicator: &'a dyn ProgressIndicator,
}

/// Files written for one attempt.
#[derive(Debug)]
struct SavedFiles {
    test_case_paths: Vec<PathBuf>,
    test_suite_path: PathBuf,
}

/// How the loop exited.
enum LoopExit {
    Accepted(GeneratedTestSuite),
    Stopped(ExecutionResult),
}

/// The feedback cycle controller
pub struct FeedbackLoop<'a> {
    config: &'a FeedbackConfig,
    initial_prompt: String,
    collaborators: FeedbackCollaborators<'a>,
}

impl<'a> FeedbackLoop<'a> {
    pub fn new(
        config: &'a FeedbackConfig,
        initial_prompt: impl Into<String>,
        collaborators: FeedbackCollaborators<'a>,
    ) -> Self {
        Self {
            config,
            initial_prompt: initial_prompt.into(),
            collaborators,
        }
    }

    /// Attempts beyond the threshold are the forced final attempt.
    pub fn is_last_iteration(&self, requests_count: u32) -> bool {
        requests_count > self.config.requests_count_threshold
    }

    /// Run the cycle to completion.
    ///
    /// Accepted cases are written into `report` (one entry per index). The
    /// returned outcome carries a suite only when the result is
    /// [`ExecutionResult::Ok`].
    pub fn run(
        &mut self,
        report: &mut Report,
        mut on_warning: Option<&mut dyn WarningObserver>,
    ) -> FeedbackOutcome {
        let mut requests_count: u32 = 0;
        let mut next_prompt = self.initial_prompt.clone();
        let mut compilable = CompilableSet::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        let exit = loop {
            requests_count += 1;
            let last = self.is_last_iteration(requests_count);

            info!(
                iteration = requests_count,
                threshold = self.config.requests_count_threshold,
                compilable = compilable.len(),
                "Iteration of feedback cycle"
            );

            if self.collaborators.indicator.is_canceled() {
                break LoopExit::Stopped(ExecutionResult::Canceled);
            }

            if last && compilable.is_empty() {
                break LoopExit::Stopped(ExecutionResult::NoCompilableTestCasesGenerated);
            }

            self.collaborators
                .indicator
                .set_text(&format!("Generating tests (attempt {})", requests_count));
            let response = self.collaborators.requester.request(
                &next_prompt,
                self.collaborators.indicator,
                &self.config.package_name,
                RequestMode::Feedback,
            );

            let mut suite = match response {
                LlmResponse::PromptTooLong => {
                    if self.collaborators.reduction.is_reduction_possible() {
                        next_prompt = self.collaborators.reduction.reduce_size_and_generate_prompt();
                        // rejected before reaching the model: not an attempt
                        requests_count -= 1;
                        continue;
                    }
                    attempts.push(AttemptRecord::new(requests_count, AttemptStatus::PromptTooLong));
                    break LoopExit::Stopped(ExecutionResult::ProvidedPromptTooLong);
                }
                LlmResponse::Ok(suite) if last => suite,
                // the final attempt substitutes the compilable set whatever the reply was
                _ if last => GeneratedTestSuite::new(&self.config.package_name),
                LlmResponse::Ok(suite) => suite,
                LlmResponse::EmptyLlmResponse => {
                    attempts.push(AttemptRecord::new(requests_count, AttemptStatus::EmptyResponse));
                    next_prompt = EMPTY_RESPONSE_PROMPT.to_string();
                    continue;
                }
                LlmResponse::TestSuiteParsingFailure => {
                    notify(&mut on_warning, WarningType::TestSuiteParsingFailed);
                    info!("Cannot parse a test suite from the LLM response");
                    attempts.push(AttemptRecord::new(requests_count, AttemptStatus::ParsingFailure));
                    next_prompt = NOT_PARSABLE_PROMPT.to_string();
                    continue;
                }
            };

            info!(test_cases = suite.test_cases.len(), "Test suite generated");

            if suite.test_cases.is_empty() && !last {
                notify(&mut on_warning, WarningType::NoTestCasesGenerated);
                attempts.push(AttemptRecord::new(requests_count, AttemptStatus::NoTestCases));
                next_prompt = NO_TEST_CASES_PROMPT.to_string();
                continue;
            }

            if self.collaborators.indicator.is_canceled() {
                attempts.push(AttemptRecord::new(requests_count, AttemptStatus::Canceled));
                break LoopExit::Stopped(ExecutionResult::Canceled);
            }

            let Some(saved) = self.save_generated_files(&mut suite, &compilable, last) else {
                attempts.push(AttemptRecord::new(requests_count, AttemptStatus::SavingFailed));
                break LoopExit::Stopped(ExecutionResult::SavingTestFilesIssue);
            };

            // on the last attempt the suite already holds the compilable set
            let test_cases = suite.test_cases.clone();

            self.collaborators.indicator.set_text("Compilation tests checking");
            let (cases_result, suite_result) = self.compile(&saved, &test_cases);

            compilable = compilable.union(cases_result.compilable_test_cases);

            if !cases_result.all_test_cases_compilable && !last {
                info!(
                    "Non-compilable test suite:\n{}",
                    self.collaborators.presenter.represent_test_suite(&suite)
                );
                notify(&mut on_warning, WarningType::CompilationErrorOccurred);
                attempts.push(AttemptRecord::new(requests_count, AttemptStatus::CompilationFailed));
                next_prompt = compilation_error_prompt(&suite_result.diagnostics);
                continue;
            }

            info!(forced = last, "Result is compilable");

            for (index, case) in test_cases.iter().enumerate() {
                report.set_test_case(index, &case.name, case.to_string());
            }

            attempts.push(AttemptRecord::new(requests_count, AttemptStatus::Accepted));
            break LoopExit::Accepted(suite);
        };

        let outcome = match exit {
            LoopExit::Accepted(suite) => FeedbackOutcome::success(suite, compilable),
            LoopExit::Stopped(result) => {
                info!(result = %result, "Feedback cycle stopped");
                FeedbackOutcome::terminated(result, compilable)
            }
        };
        outcome.with_attempts(attempts)
    }

    /// Write case files (skipped on the last attempt) and the suite file.
    ///
    /// `None` if any write failed or a reported path does not exist.
    fn save_generated_files(
        &self,
        suite: &mut GeneratedTestSuite,
        compilable: &CompilableSet,
        last: bool,
    ) -> Option<SavedFiles> {
        let mut test_case_paths = Vec::new();

        if last {
            if compilable.is_empty() {
                warn!("Final attempt has no compilable test cases to fall back on");
            }
            suite.update_test_cases(compilable.to_vec());
        } else {
            // one file per case: names must not collide
            suite.make_case_names_unique();
            for (index, case) in suite.test_cases.iter().enumerate() {
                let filename = self.test_case_filename(case);
                let code = self
                    .collaborators
                    .presenter
                    .represent_test_case(suite, index);
                test_case_paths.push(self.save(suite, &code, &filename)?);
            }
        }

        let code = self.collaborators.presenter.represent_test_suite(suite);
        let test_suite_path = self.save(suite, &code, &self.config.test_suite_filename)?;

        if let Some(missing) = test_case_paths
            .iter()
            .chain(std::iter::once(&test_suite_path))
            .find(|p| !p.exists())
        {
            warn!(path = %missing.display(), "Storage reported success but the file is missing");
            return None;
        }

        Some(SavedFiles {
            test_case_paths,
            test_suite_path,
        })
    }

    fn save(&self, suite: &GeneratedTestSuite, code: &str, filename: &str) -> Option<PathBuf> {
        match self.collaborators.storage.save_generated_test(
            &suite.package_name,
            code,
            &self.config.result_path,
            filename,
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, filename, "Failed to save generated test");
                None
            }
        }
    }

    fn compile(
        &self,
        saved: &SavedFiles,
        test_cases: &[GeneratedTestCase],
    ) -> (TestCasesCompilationResult, CompilationOutcome) {
        let compiler = self.collaborators.compiler;
        let cases_result =
            compiler.compile_test_cases(&saved.test_case_paths, &self.config.build_path, test_cases);
        let suite_result = compiler.compile_code(&saved.test_suite_path, &self.config.build_path);

        debug!(
            compiled = cases_result.compilable_test_cases.len(),
            total = test_cases.len(),
            suite_compiles = suite_result.success,
            "Compilation finished"
        );

        (cases_result, suite_result)
    }

    fn test_case_filename(&self, case: &GeneratedTestCase) -> String {
        format!(
            "{}.{}",
            class_with_test_case_name(&self.config.class_name_prefix, &case.name),
            self.config.test_file_extension
        )
    }
}

fn notify(observer: &mut Option<&mut dyn WarningObserver>, warning: WarningType) {
    warn!(warning = ?warning, "Feedback cycle warning");
    if let Some(observer) = observer.as_mut() {
        observer.on_warning(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedbackError;
    use crate::presenter::JavaTestsPresenter;
    use crate::progress::CancellationHandle;
    use crate::prompt::ContextTrimmingStrategy;
    use crate::storage::{FsTestStorage, MockTestsPersistentStorage};
    use std::collections::VecDeque;
    use std::path::Path;

    struct ScriptedRequester {
        responses: VecDeque<LlmResponse>,
        prompts: Vec<String>,
    }

    impl ScriptedRequester {
        fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: responses.into(),
                prompts: Vec::new(),
            }
        }
    }

    impl TestSuiteRequester for ScriptedRequester {
        fn request(
            &mut self,
            prompt: &str,
            indicator: &dyn ProgressIndicator,
            _package_name: &str,
            _mode: RequestMode,
        ) -> LlmResponse {
            self.prompts.push(prompt.to_string());
            // a runaway loop ends up canceled instead of hanging the test
            if self.prompts.len() >= 20 {
                indicator.cancel();
            }
            self.responses
                .pop_front()
                .unwrap_or(LlmResponse::EmptyLlmResponse)
        }
    }

    /// Rejects any file whose source mentions `broken`.
    struct ContentCompiler;

    impl TestCompiler for ContentCompiler {
        fn compile_code(&self, path: &Path, _build_path: &Path) -> CompilationOutcome {
            let source = std::fs::read_to_string(path).unwrap_or_default();
            let ok = !source.contains("broken");
            CompilationOutcome {
                success: ok,
                diagnostics: if ok {
                    String::new()
                } else {
                    format!("{}: error: cannot find symbol broken", path.display())
                },
            }
        }
    }

    fn suite_of(names: &[&str]) -> GeneratedTestSuite {
        let mut suite = GeneratedTestSuite::new("com.example");
        suite.test_cases = names
            .iter()
            .map(|n| {
                let body = if n.starts_with("broken") { "broken();" } else { "ok();" };
                GeneratedTestCase::new(*n, body)
            })
            .collect();
        suite
    }

    fn config(dir: &Path, threshold: u32) -> FeedbackConfig {
        FeedbackConfig {
            requests_count_threshold: threshold,
            package_name: "com.example".to_string(),
            result_path: dir.to_path_buf(),
            build_path: dir.join("build"),
            ..FeedbackConfig::default()
        }
    }

    #[test]
    fn test_oversized_prompt_without_reduction_stops() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3);
        let mut reduction = ContextTrimmingStrategy::from_prompt("only instructions");
        let mut requester = ScriptedRequester::new(vec![LlmResponse::PromptTooLong]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");

        let mut feedback = FeedbackLoop::new(
            &config,
            "only instructions",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut Report::new(), None);

        assert_eq!(outcome.execution_result, ExecutionResult::ProvidedPromptTooLong);
        assert!(outcome.generated_test_suite.is_none());
    }

    #[test]
    fn test_silent_storage_failure_stops_with_saving_issue() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3);
        let ghost = dir.path().join("ghost");

        let mut storage = MockTestsPersistentStorage::new();
        storage
            .expect_save_generated_test()
            .times(2)
            .returning(move |_, _, _, filename| Ok(ghost.join(filename)));

        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let mut requester = ScriptedRequester::new(vec![LlmResponse::Ok(suite_of(&["a"]))]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");
        let mut report = Report::new();

        let mut feedback = FeedbackLoop::new(
            &config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &storage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut report, None);

        assert_eq!(outcome.execution_result, ExecutionResult::SavingTestFilesIssue);
        assert!(outcome.generated_test_suite.is_none());
        assert!(report.is_empty());
    }

    #[test]
    fn test_storage_error_stops_with_saving_issue() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3);

        let mut storage = MockTestsPersistentStorage::new();
        storage
            .expect_save_generated_test()
            .returning(|_, _, path, _| Err(FeedbackError::storage(path, "read-only")));

        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let mut requester = ScriptedRequester::new(vec![LlmResponse::Ok(suite_of(&["a"]))]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");

        let mut feedback = FeedbackLoop::new(
            &config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &storage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut Report::new(), None);

        assert_eq!(outcome.execution_result, ExecutionResult::SavingTestFilesIssue);
    }

    #[test]
    fn test_compile_failure_sends_diagnostics_then_forced_last_attempt_accepts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let mut requester = ScriptedRequester::new(vec![
            LlmResponse::Ok(suite_of(&["good", "broken"])),
            LlmResponse::Ok(suite_of(&["brokenAgain"])),
        ]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");
        let mut report = Report::new();
        let mut warnings = Vec::new();
        let mut observer = |w: WarningType| warnings.push(w);

        let mut feedback = FeedbackLoop::new(
            &config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut report, Some(&mut observer));

        assert_eq!(outcome.execution_result, ExecutionResult::Ok);
        let suite = outcome.generated_test_suite.expect("suite on OK");
        let names: Vec<&str> = suite.test_cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);
        assert_eq!(outcome.compilable_test_cases.len(), 1);
        assert_eq!(report.len(), 1);
        assert_eq!(report.test_case_list[&0].name, "good");
        assert_eq!(warnings, vec![WarningType::CompilationErrorOccurred]);

        assert_eq!(requester.prompts.len(), 2);
        assert!(requester.prompts[1].starts_with("I cannot compile the tests"));
        assert!(requester.prompts[1].contains("cannot find symbol broken"));

        let statuses: Vec<AttemptStatus> = outcome.attempts.iter().map(|a| a.status).collect();
        assert_eq!(statuses, vec![AttemptStatus::CompilationFailed, AttemptStatus::Accepted]);
        assert!(!dir.path().join("GeneratedBrokenAgain.java").exists());
    }

    #[test]
    fn test_parse_failure_and_empty_suite_warn_and_correct() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 5);
        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let mut requester = ScriptedRequester::new(vec![
            LlmResponse::TestSuiteParsingFailure,
            LlmResponse::Ok(suite_of(&[])),
            LlmResponse::Ok(suite_of(&["a"])),
        ]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");
        let mut warnings = Vec::new();
        let mut observer = |w: WarningType| warnings.push(w);

        let mut feedback = FeedbackLoop::new(
            &config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut Report::new(), Some(&mut observer));

        assert!(outcome.is_success());
        assert_eq!(
            warnings,
            vec![WarningType::TestSuiteParsingFailed, WarningType::NoTestCasesGenerated]
        );
        assert_eq!(requester.prompts[1], NOT_PARSABLE_PROMPT);
        assert_eq!(requester.prompts[2], NO_TEST_CASES_PROMPT);
        assert_eq!(outcome.attempts.len(), 3);
    }

    #[test]
    fn test_is_last_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 2);
        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let mut requester = ScriptedRequester::new(vec![]);
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");

        let feedback = FeedbackLoop::new(
            &config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester: &mut requester,
                compiler: &ContentCompiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        assert!(!feedback.is_last_iteration(2));
        assert!(feedback.is_last_iteration(3));
    }

    fn run_scripted(
        config: &FeedbackConfig,
        requester: &mut ScriptedRequester,
    ) -> (FeedbackOutcome, Report) {
        let mut reduction = ContextTrimmingStrategy::from_prompt("p");
        let indicator = CancellationHandle::new();
        let presenter = JavaTestsPresenter::new(&config.test_suite_filename, "Generated");
        let mut report = Report::new();

        let mut feedback = FeedbackLoop::new(
            config,
            "p",
            FeedbackCollaborators {
                reduction: &mut reduction,
                requester,
                compiler: &ContentCompiler,
                storage: &FsTestStorage,
                presenter: &presenter,
                indicator: &indicator,
            },
        );
        let outcome = feedback.run(&mut report, None);
        (outcome, report)
    }

    #[test]
    fn test_final_attempt_ignores_empty_reply() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        // every reply after the first is empty
        let mut requester = ScriptedRequester::new(vec![LlmResponse::Ok(suite_of(&["good", "broken"]))]);

        let (outcome, report) = run_scripted(&config, &mut requester);

        assert_eq!(requester.prompts.len(), 2);
        assert_eq!(outcome.execution_result, ExecutionResult::Ok);
        let names: Vec<String> = outcome
            .generated_test_suite
            .expect("suite on OK")
            .test_cases
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["good"]);
        assert_eq!(report.len(), 1);
        assert!(outcome.attempts.iter().all(|a| a.attempt <= 2));
    }

    #[test]
    fn test_final_attempt_ignores_unparsable_and_caseless_replies() {
        for reply in [LlmResponse::TestSuiteParsingFailure, LlmResponse::Ok(suite_of(&[]))] {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), 1);
            let mut requester =
                ScriptedRequester::new(vec![LlmResponse::Ok(suite_of(&["good", "broken"])), reply]);

            let (outcome, _) = run_scripted(&config, &mut requester);

            assert_eq!(requester.prompts.len(), 2);
            assert_eq!(outcome.execution_result, ExecutionResult::Ok);
            assert_eq!(outcome.generated_test_suite.unwrap().test_cases.len(), 1);
        }
    }

    #[test]
    fn test_case_names_differing_in_case_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3);
        // not reformatted by a request manager: the loop must separate them
        let mut requester = ScriptedRequester::new(vec![
            LlmResponse::Ok(suite_of(&["broken", "Broken"])),
            LlmResponse::Ok(suite_of(&["fine"])),
        ]);

        let (outcome, _) = run_scripted(&config, &mut requester);

        assert_eq!(outcome.execution_result, ExecutionResult::Ok);
        assert!(!outcome.compilable_test_cases.contains("broken"));
        assert!(outcome.compilable_test_cases.contains("Broken_1"));
        assert!(outcome.compilable_test_cases.iter().all(|c| c.body != "broken();"));
        assert!(dir.path().join("GeneratedBroken.java").exists());
        assert!(dir.path().join("GeneratedBroken_1.java").exists());
    }
}
