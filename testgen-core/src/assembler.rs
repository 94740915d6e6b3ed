//! Assembles a [`GeneratedTestSuite`] from raw model output
//!
//! The model is asked for a single JUnit test class inside a fenced code
//! block. The assembler accumulates streamed text, then extracts imports,
//! class annotations, non-test members and every `@Test` method.

use crate::suite::{GeneratedTestCase, GeneratedTestSuite};
use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").unwrap());

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:public\s+|final\s+|abstract\s+)*class\s+(\w+)[^{;]*\{").unwrap()
});

static IMPORT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(import\s+(?:static\s+)?[\w.*]+)\s*;").unwrap());

static TEST_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@Test\b").unwrap());

static METHOD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvoid\s+(\w+)\s*\(").unwrap());

static THROWS_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*throws\s+([\w.,\s]+?)\s*$").unwrap());

static EXPECTED_EXCEPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"expected\s*=\s*([\w.]+)\.class").unwrap());

/// Collects model output and turns it into a test suite.
pub trait TestsAssembler {
    /// Append a chunk of streamed model output.
    fn consume(&mut self, chunk: &str);

    /// Everything consumed since the last [`clear`](Self::clear).
    fn content(&self) -> &str;

    /// Drop collected text from a previous attempt.
    fn clear(&mut self);

    /// Parse the collected text; `None` when no test class can be recovered.
    fn assemble_test_suite(&self, package_name: &str) -> Option<GeneratedTestSuite>;
}

/// Assembler for Java/JUnit test classes.
#[derive(Debug, Default, Clone)]
pub struct JUnitTestsAssembler {
    content: String,
}

impl JUnitTestsAssembler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TestsAssembler for JUnitTestsAssembler {
    fn consume(&mut self, chunk: &str) {
        self.content.push_str(chunk);
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn clear(&mut self) {
        self.content.clear();
    }

    fn assemble_test_suite(&self, package_name: &str) -> Option<GeneratedTestSuite> {
        parse_test_class(extract_code(&self.content), package_name)
    }
}

/// Contents of the first fenced code block, or the whole text if unfenced.
pub fn extract_code(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn parse_test_class(code: &str, package_name: &str) -> Option<GeneratedTestSuite> {
    let class_match = CLASS_DECL.find(code)?;
    let open = class_match.end() - 1;
    let close = matching_brace(code, open)?;

    let mut suite = GeneratedTestSuite::new(package_name);
    suite.imports = IMPORT_LINE
        .captures_iter(code)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    suite.class_annotations = class_annotations(&code[..class_match.start()]);

    for member in split_members(&code[open + 1..close])? {
        match parse_test_method(&member) {
            Some(case) => suite.test_cases.push(case),
            None => suite.other_members.push(member),
        }
    }

    Some(suite)
}

/// Annotation lines directly above the class declaration.
fn class_annotations(prefix: &str) -> Vec<String> {
    let mut annotations = Vec::new();
    for line in prefix.lines().map(str::trim) {
        if line.starts_with('@') {
            annotations.push(line.to_string());
        } else if !line.is_empty() {
            annotations.clear();
        }
    }
    annotations
}

fn parse_test_method(member: &str) -> Option<GeneratedTestCase> {
    let marks = structural_chars(member);
    let open = marks.iter().find(|(_, c)| *c == b'{').map(|(i, _)| *i)?;
    let close = marks.iter().rev().find(|(_, c)| *c == b'}').map(|(i, _)| *i)?;
    let header = &member[..open];
    if !TEST_ANNOTATION.is_match(header) {
        return None;
    }

    let name = METHOD_NAME.captures(header)?.get(1)?.as_str();
    let mut case = GeneratedTestCase::new(name, &member[open + 1..close]);
    if let Some(throws) = THROWS_CLAUSE.captures(header).and_then(|c| c.get(1)) {
        case.throws = throws
            .as_str()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    case.expected_exception = EXPECTED_EXCEPTION
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    Some(case)
}

/// Split a class body into top-level members (fields end at `;`, methods and
/// nested types at their closing brace). `None` on unbalanced braces.
fn split_members(body: &str) -> Option<Vec<String>> {
    let mut members: Vec<String> = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (i, c) in structural_chars(body) {
        match c {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return None;
        }
        if depth == 0 && (c == b'}' || c == b';') {
            let member = body[start..=i].trim();
            if member == ";" {
                // initializer like `int[] a = {1, 2};`
                if let Some(last) = members.last_mut() {
                    last.push(';');
                }
            } else if !member.is_empty() {
                members.push(member.to_string());
            }
            start = i + 1;
        }
    }

    (depth == 0).then_some(members)
}

fn matching_brace(code: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in structural_chars(code).into_iter().filter(|(i, _)| *i >= open) {
        match c {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offsets of `{`, `}` and `;` outside comments and literals.
fn structural_chars(text: &str) -> Vec<(usize, u8)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            c @ (b'{' | b'}' | b';') => out.push((i, c)),
            _ => {}
        }
        i += 1;
    }

    out
}
