//! Feedback cycle configuration
//!
//! Values come from defaults, `TESTGEN_*` environment variables, or a TOML
//! file; keys missing from the file keep their defaults.

use crate::error::{FeedbackError, FeedbackResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one generation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Counted attempts before the forced final attempt
    pub requests_count_threshold: u32,
    /// Package the generated tests are declared in
    pub package_name: String,
    /// Directory receiving generated test sources
    pub result_path: PathBuf,
    /// Build output the tests are compiled against
    pub build_path: PathBuf,
    /// File name of the assembled suite
    pub test_suite_filename: String,
    /// Extension of per-case files
    pub test_file_extension: String,
    /// Prefix of per-case class names
    pub class_name_prefix: String,
    /// Compiler command template (`{file}`, `{build}` placeholders)
    pub compile_command: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            requests_count_threshold: 3,
            package_name: String::new(),
            result_path: PathBuf::from("generated-tests"),
            build_path: PathBuf::from("build"),
            test_suite_filename: "GeneratedTest.java".to_string(),
            test_file_extension: "java".to_string(),
            class_name_prefix: "Generated".to_string(),
            compile_command: "javac -d {build} -cp {build} {file}".to_string(),
        }
    }
}

impl FeedbackConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load config from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> FeedbackResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FeedbackError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> FeedbackResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `TESTGEN_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(n) = std::env::var("TESTGEN_REQUESTS_THRESHOLD") {
            if let Ok(n) = n.parse() {
                self.requests_count_threshold = n;
            }
        }
        if let Ok(package) = std::env::var("TESTGEN_PACKAGE") {
            self.package_name = package;
        }
        if let Ok(path) = std::env::var("TESTGEN_RESULT_PATH") {
            self.result_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TESTGEN_BUILD_PATH") {
            self.build_path = PathBuf::from(path);
        }
        if let Ok(name) = std::env::var("TESTGEN_SUITE_FILENAME") {
            self.test_suite_filename = name;
        }
        if let Ok(cmd) = std::env::var("TESTGEN_COMPILE_COMMAND") {
            self.compile_command = cmd;
        }
    }

    pub fn validate(&self) -> FeedbackResult<()> {
        if self.test_suite_filename.trim().is_empty() {
            return Err(FeedbackError::config("test_suite_filename must not be empty"));
        }
        if self.test_file_extension.trim().is_empty() {
            return Err(FeedbackError::config("test_file_extension must not be empty"));
        }
        if self.compile_command.trim().is_empty() {
            return Err(FeedbackError::config("compile_command must not be empty"));
        }
        Ok(())
    }
}
