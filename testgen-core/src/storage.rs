//! Persistence of generated test sources
//!
//! The loop writes one file per test case plus one suite file per attempt.
//! Saving the same file twice overwrites it, so retries are safe.

use crate::error::{FeedbackError, FeedbackResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable storage for generated test files.
#[cfg_attr(test, mockall::automock)]
pub trait TestsPersistentStorage {
    /// Write `code` to `result_path/filename` and return the written path.
    ///
    /// On `Ok` the file must already be observable on disk.
    fn save_generated_test(
        &self,
        package_name: &str,
        code: &str,
        result_path: &Path,
        filename: &str,
    ) -> FeedbackResult<PathBuf>;
}

/// Filesystem-backed storage.
#[derive(Debug, Default, Clone)]
pub struct FsTestStorage;

impl FsTestStorage {
    pub fn new() -> Self {
        Self
    }
}

impl TestsPersistentStorage for FsTestStorage {
    fn save_generated_test(
        &self,
        package_name: &str,
        code: &str,
        result_path: &Path,
        filename: &str,
    ) -> FeedbackResult<PathBuf> {
        fs::create_dir_all(result_path)
            .map_err(|e| FeedbackError::storage(result_path, e.to_string()))?;

        let path = result_path.join(filename);
        fs::write(&path, code).map_err(|e| FeedbackError::storage(&path, e.to_string()))?;

        debug!(path = %path.display(), package = package_name, bytes = code.len(), "Saved generated test");
        Ok(path)
    }
}

/// Class name for the standalone file of one test case: the prefix followed
/// by the case name with its first letter upper-cased.
pub fn class_with_test_case_name(prefix: &str, test_case_name: &str) -> String {
    let mut chars = test_case_name.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}
