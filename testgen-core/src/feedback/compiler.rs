//! Compiler wrapper for generated test files
//!
//! Runs a configurable compiler command per file and captures its output as
//! human-readable diagnostics suitable for a corrective prompt.

use crate::error::{FeedbackError, FeedbackResult};
use crate::suite::{CompilableSet, GeneratedTestCase};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Result of compiling one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOutcome {
    /// Whether compilation succeeded
    pub success: bool,
    /// Compiler output (stdout followed by stderr)
    pub diagnostics: String,
}

/// Result of compiling the per-case files of one attempt
#[derive(Debug, Clone, Default)]
pub struct TestCasesCompilationResult {
    /// Whether every compiled case file succeeded
    pub all_test_cases_compilable: bool,
    /// Cases whose files compiled
    pub compilable_test_cases: CompilableSet,
}

/// Compiles generated test sources against a build directory.
pub trait TestCompiler {
    /// Compile a single source file.
    fn compile_code(&self, path: &Path, build_path: &Path) -> CompilationOutcome;

    /// Compile each case file; `paths[i]` holds `test_cases[i]`.
    fn compile_test_cases(
        &self,
        paths: &[PathBuf],
        build_path: &Path,
        test_cases: &[GeneratedTestCase],
    ) -> TestCasesCompilationResult {
        let mut result = TestCasesCompilationResult {
            all_test_cases_compilable: true,
            compilable_test_cases: CompilableSet::new(),
        };

        for (path, case) in paths.iter().zip(test_cases) {
            if self.compile_code(path, build_path).success {
                result.compilable_test_cases.insert(case.clone());
            } else {
                result.all_test_cases_compilable = false;
            }
        }

        result
    }
}

/// Compiler driven by a command template.
///
/// `{file}` and `{build}` in the template are replaced by the source path and
/// the build directory, e.g. `javac -d {build} -cp {build} {file}`.
#[derive(Debug, Clone)]
pub struct CommandTestCompiler {
    argv: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandTestCompiler {
    /// Parse a shell-style command template.
    pub fn from_template(template: &str) -> FeedbackResult<Self> {
        let argv = shlex::split(template)
            .ok_or_else(|| FeedbackError::compiler(format!("unbalanced quotes in '{}'", template)))?;
        if argv.is_empty() {
            return Err(FeedbackError::compiler("compile command is empty"));
        }
        Ok(Self {
            argv,
            working_dir: None,
        })
    }

    /// Run the compiler from this directory.
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn expand(&self, path: &Path, build_path: &Path) -> Vec<String> {
        let file = path.display().to_string();
        let build = build_path.display().to_string();
        self.argv
            .iter()
            .map(|arg| arg.replace("{file}", &file).replace("{build}", &build))
            .collect()
    }
}

impl TestCompiler for CommandTestCompiler {
    fn compile_code(&self, path: &Path, build_path: &Path) -> CompilationOutcome {
        let argv = self.expand(path, build_path);
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        match command.output() {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let diagnostics = format!("{}{}", stdout, stderr).trim().to_string();
                debug!(
                    file = %path.display(),
                    exit_code = ?output.status.code(),
                    "Compiler finished"
                );
                CompilationOutcome {
                    success: output.status.success(),
                    diagnostics,
                }
            }
            Err(e) => CompilationOutcome {
                success: false,
                diagnostics: format!("Failed to run compiler '{}': {}", argv[0], e),
            },
        }
    }
}
