//! External report sink for accepted test cases.

use crate::error::FeedbackResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One accepted test case as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTestCase {
    /// Position in the final suite
    pub id: usize,
    pub name: String,
    /// Rendered test method source
    pub code: String,
    /// Lines covered by this case; coverage is filled in by later tooling
    #[serde(default)]
    pub covered_lines: BTreeSet<u32>,
}

/// Accepted test cases keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub test_case_list: BTreeMap<usize, ReportTestCase>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) the entry at `index`.
    pub fn set_test_case(&mut self, index: usize, name: impl Into<String>, code: impl Into<String>) {
        self.test_case_list.insert(
            index,
            ReportTestCase {
                id: index,
                name: name.into(),
                code: code.into(),
                covered_lines: BTreeSet::new(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.test_case_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_case_list.is_empty()
    }

    pub fn to_json(&self) -> FeedbackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty JSON form to `path`, replacing any existing file.
    pub fn write_json(&self, path: &Path) -> FeedbackResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_test_case_overwrites_by_index() {
        let mut report = Report::new();
        report.set_test_case(0, "a", "@Test void a() {}");
        report.set_test_case(0, "b", "@Test void b() {}");
        assert_eq!(report.len(), 1);
        assert_eq!(report.test_case_list[&0].name, "b");
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = Report::new();
        report.set_test_case(2, "c", "code");
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["test_case_list"]["2"]["name"], "c");
        assert_eq!(value["test_case_list"]["2"]["id"], 2);
    }

    #[test]
    fn test_write_json_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new();
        report.set_test_case(0, "a", "code");

        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();
        let back: Report = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);

        let err = report
            .write_json(&dir.path().join("missing/report.json"))
            .unwrap_err();
        assert!(matches!(err, crate::FeedbackError::Io(_)));
    }
}
