//! Generated test data: individual cases, the assembled suite, and the
//! accumulated set of cases known to compile.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// A single test method produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedTestCase {
    /// Method name, unique within one suite
    pub name: String,
    /// Method body without the enclosing braces
    pub body: String,
    /// Exceptions listed in the method's `throws` clause
    #[serde(default)]
    pub throws: Vec<String>,
    /// Exception class from `@Test(expected = X.class)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_exception: Option<String>,
}

impl GeneratedTestCase {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            throws: Vec::new(),
            expected_exception: None,
        }
    }

    pub fn with_throws(mut self, exception: impl Into<String>) -> Self {
        self.throws.push(exception.into());
        self
    }

    /// Strip trailing whitespace and common leading indentation from the body.
    fn reformat(&mut self) {
        let lines: Vec<&str> = self
            .body
            .lines()
            .map(str::trim_end)
            .skip_while(|l| l.is_empty())
            .collect();
        let indent = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        let mut body: Vec<&str> = lines
            .iter()
            .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
            .collect();
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
        }
        self.body = body.join("\n");
    }
}

impl fmt::Display for GeneratedTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected_exception {
            Some(exception) => writeln!(f, "@Test(expected = {}.class)", exception)?,
            None => writeln!(f, "@Test")?,
        }
        write!(f, "public void {}()", self.name)?;
        if !self.throws.is_empty() {
            write!(f, " throws {}", self.throws.join(", "))?;
        }
        writeln!(f, " {{")?;
        for line in self.body.lines() {
            if line.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, "    {}", line)?;
            }
        }
        write!(f, "}}")
    }
}

/// An ordered suite of generated cases plus the class-level scaffolding they
/// share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTestSuite {
    /// Package (namespace) the suite is declared in; empty for the default package
    pub package_name: String,
    /// `import` lines, without the trailing semicolon
    #[serde(default)]
    pub imports: BTreeSet<String>,
    /// Class-level annotations such as `@RunWith(...)`
    #[serde(default)]
    pub class_annotations: Vec<String>,
    /// Non-test members (fields, setup methods) rendered verbatim
    #[serde(default)]
    pub other_members: Vec<String>,
    /// Test cases in the order the model produced them
    pub test_cases: Vec<GeneratedTestCase>,
}

impl GeneratedTestSuite {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    /// Replace the suite's cases, keeping the scaffolding.
    pub fn update_test_cases(&mut self, test_cases: Vec<GeneratedTestCase>) {
        self.test_cases = test_cases;
    }

    /// Normalize case bodies and make case names unique.
    pub fn reformat(mut self) -> Self {
        for case in &mut self.test_cases {
            case.reformat();
        }
        self.make_case_names_unique();
        self
    }

    /// Rename cases whose names clash ignoring case.
    ///
    /// Per-case class and file names are derived from the case name, so
    /// `broken` and `Broken` would share a file. Later duplicates get `_1`,
    /// `_2`, ... suffixes in order of appearance.
    pub fn make_case_names_unique(&mut self) {
        let mut seen: HashSet<String> = HashSet::new();
        for case in &mut self.test_cases {
            if seen.insert(case.name.to_lowercase()) {
                continue;
            }
            let mut n = 1;
            while seen.contains(&format!("{}_{}", case.name, n).to_lowercase()) {
                n += 1;
            }
            case.name = format!("{}_{}", case.name, n);
            seen.insert(case.name.to_lowercase());
        }
    }
}

/// Cases that have compiled in some attempt, unique by name.
///
/// The set only grows: inserting a case whose name is already present is a
/// no-op, and there is no removal API. Iteration follows insertion order so
/// report indices stay stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<GeneratedTestCase>", into = "Vec<GeneratedTestCase>")]
pub struct CompilableSet {
    cases: Vec<GeneratedTestCase>,
    names: HashSet<String>,
}

impl CompilableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a case; returns `false` if a case with that name is already present.
    pub fn insert(&mut self, case: GeneratedTestCase) -> bool {
        if !self.names.insert(case.name.clone()) {
            return false;
        }
        self.cases.push(case);
        true
    }

    /// Set union, consuming both sides.
    pub fn union(mut self, other: CompilableSet) -> Self {
        self.extend(other.cases);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedTestCase> {
        self.cases.iter()
    }

    pub fn to_vec(&self) -> Vec<GeneratedTestCase> {
        self.cases.clone()
    }
}

impl Extend<GeneratedTestCase> for CompilableSet {
    fn extend<I: IntoIterator<Item = GeneratedTestCase>>(&mut self, iter: I) {
        for case in iter {
            self.insert(case);
        }
    }
}

impl FromIterator<GeneratedTestCase> for CompilableSet {
    fn from_iter<I: IntoIterator<Item = GeneratedTestCase>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<GeneratedTestCase>> for CompilableSet {
    fn from(cases: Vec<GeneratedTestCase>) -> Self {
        cases.into_iter().collect()
    }
}

impl From<CompilableSet> for Vec<GeneratedTestCase> {
    fn from(set: CompilableSet) -> Self {
        set.cases
    }
}

impl<'a> IntoIterator for &'a CompilableSet {
    type Item = &'a GeneratedTestCase;
    type IntoIter = std::slice::Iter<'a, GeneratedTestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}
