//! Pytest verbose output parser
//!
//! Expects `-v` style result lines:
//! `test/test_basic.py::test_addition PASSED [ 25%]`
//!
//! Non-header lines following a result attach to the most recent test.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser, EXECUTION_ERROR};

pub struct PytestParser;

fn result_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?::\w+)\s+(PASSED|FAILED|SKIPPED|ERROR|XFAIL|XPASS)(\s+\[\s*\d+%\])?$")
            .expect("valid regex")
    })
}

/// Session header and footer lines that never belong to a test
fn is_session_line(line: &str) -> bool {
    line.starts_with("===")
        || line.starts_with("collecting")
        || line.contains("test session starts")
        || line.contains("passed in")
}

impl OutputParser for PytestParser {
    fn framework(&self) -> Framework {
        Framework::Pytest
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let mut tests: Vec<TestCase> = Vec::new();

        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = result_line().captures(line) {
                let full_name = &caps[1];
                let status = &caps[2];

                // "path::test_name" - keep just the test name
                let name = full_name.rsplit("::").next().unwrap_or(full_name);
                let mut test = TestCase::new(name, matches!(status, "PASSED" | "XPASS"));
                test.raw_output = line.to_string();
                tests.push(test);
                continue;
            }

            if !is_session_line(line) {
                if let Some(last) = tests.last_mut() {
                    last.output.push(line.to_string());
                    last.raw_output.push('\n');
                    last.raw_output.push_str(line);
                }
            }
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(EXECUTION_ERROR, stderr));
        }

        ParsedRun::from_cases(Framework::Pytest, tests, combined_output(stdout, stderr))
    }
}
