//! Bats (TAP) output parser
//!
//! Bats emits TAP: `ok N name` / `not ok N name` result lines with `#`
//! comment lines carrying diagnostics. Comment lines between results attach
//! to the most recent test with the `#` marker stripped.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser, EXECUTION_ERROR};

pub struct BatsParser;

fn result_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(ok|not ok)\s+(\d+)\s+(.+)$").expect("valid regex"))
}

impl OutputParser for BatsParser {
    fn framework(&self) -> Framework {
        Framework::Bats
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let mut tests: Vec<TestCase> = Vec::new();
        let mut current: Option<TestCase> = None;

        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = result_line().captures(line) {
                if let Some(test) = current.take() {
                    tests.push(test);
                }

                let mut test = TestCase::new(caps[3].trim(), &caps[1] == "ok");
                test.raw_output = line.to_string();
                current = Some(test);
                continue;
            }

            // TAP plan lines ("1..N") fall outside any test and are dropped.
            if let Some(test) = current.as_mut() {
                let diagnostic = line.strip_prefix('#').unwrap_or(line).trim();
                if !diagnostic.is_empty() {
                    test.output.push(diagnostic.to_string());
                    test.raw_output.push('\n');
                    test.raw_output.push_str(line);
                }
            }
        }

        if let Some(test) = current.take() {
            tests.push(test);
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(EXECUTION_ERROR, stderr));
        }

        ParsedRun::from_cases(Framework::Bats, tests, combined_output(stdout, stderr))
    }
}
