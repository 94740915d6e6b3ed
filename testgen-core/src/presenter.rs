//! Renders generated suites back into compilable source text.

use crate::storage::class_with_test_case_name;
use crate::suite::{GeneratedTestCase, GeneratedTestSuite};
use std::path::Path;

/// Turns a suite (or one of its cases) into source text.
pub trait TestsPresenter {
    /// Source of a standalone class holding only the case at `index`.
    fn represent_test_case(&self, suite: &GeneratedTestSuite, index: usize) -> String;

    /// Source of the whole suite as a single class.
    fn represent_test_suite(&self, suite: &GeneratedTestSuite) -> String;
}

/// Presenter emitting JUnit classes.
#[derive(Debug, Clone)]
pub struct JavaTestsPresenter {
    suite_class_name: String,
    class_name_prefix: String,
}

impl JavaTestsPresenter {
    /// `test_suite_filename` determines the suite class name (its file stem).
    pub fn new(test_suite_filename: &str, class_name_prefix: impl Into<String>) -> Self {
        let suite_class_name = Path::new(test_suite_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("GeneratedTest")
            .to_string();
        Self {
            suite_class_name,
            class_name_prefix: class_name_prefix.into(),
        }
    }

    pub fn suite_class_name(&self) -> &str {
        &self.suite_class_name
    }

    fn render_class<'a>(
        &self,
        suite: &GeneratedTestSuite,
        class_name: &str,
        cases: impl Iterator<Item = &'a GeneratedTestCase>,
    ) -> String {
        let mut out = String::new();

        if !suite.package_name.is_empty() {
            out.push_str(&format!("package {};\n\n", suite.package_name));
        }
        for import in &suite.imports {
            out.push_str(import);
            out.push_str(";\n");
        }
        if !suite.imports.is_empty() {
            out.push('\n');
        }
        for annotation in &suite.class_annotations {
            out.push_str(annotation);
            out.push('\n');
        }
        out.push_str(&format!("public class {} {{\n", class_name));

        let blocks = suite
            .other_members
            .iter()
            .cloned()
            .chain(cases.map(|c| c.to_string()));
        for block in blocks {
            out.push('\n');
            out.push_str(&indent(&block));
        }

        out.push_str("}\n");
        out
    }
}

impl TestsPresenter for JavaTestsPresenter {
    fn represent_test_case(&self, suite: &GeneratedTestSuite, index: usize) -> String {
        let case = &suite.test_cases[index];
        let class_name = class_with_test_case_name(&self.class_name_prefix, &case.name);
        self.render_class(suite, &class_name, std::iter::once(case))
    }

    fn represent_test_suite(&self, suite: &GeneratedTestSuite) -> String {
        self.render_class(suite, &self.suite_class_name, suite.test_cases.iter())
    }
}

fn indent(block: &str) -> String {
    let mut out = String::new();
    for line in block.lines() {
        if !line.trim().is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
