//! Jest output parser
//!
//! Parses per-test markers:
//! `✓ first test (2ms)` / `✕ second test (1ms)`
//!
//! Lines between a marker and the next marker (or the summary footer)
//! attach to that test: console.log blocks, Expected/Received diffs, stack
//! lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser, EXECUTION_ERROR};

pub struct JestParser;

fn result_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([✓✕])\s+(.+?)(?:\s+\(\d+\s*m?s\))?$").expect("valid regex")
    })
}

/// Suite banner lines like `PASS src/example.test.js`
fn is_suite_banner(line: &str) -> bool {
    line.starts_with("PASS ") || line.starts_with("FAIL ")
}

/// Run footer lines ending the per-test region
fn is_footer(line: &str) -> bool {
    line.starts_with("Test Suites:")
        || line.starts_with("Tests:")
        || line.starts_with("Snapshots:")
        || line.starts_with("Time:")
        || line.starts_with("Ran all test suites")
}

impl OutputParser for JestParser {
    fn framework(&self) -> Framework {
        Framework::Jest
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let mut tests: Vec<TestCase> = Vec::new();
        let mut in_footer = false;

        for line in stdout.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if is_footer(trimmed) {
                in_footer = true;
            }
            if in_footer || is_suite_banner(trimmed) {
                continue;
            }

            if let Some(caps) = result_line().captures(line) {
                let mut test = TestCase::new(&caps[2], &caps[1] == "✓");
                test.raw_output = trimmed.to_string();
                tests.push(test);
                continue;
            }

            if let Some(last) = tests.last_mut() {
                last.output.push(trimmed.to_string());
                last.raw_output.push('\n');
                last.raw_output.push_str(trimmed);
            }
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(EXECUTION_ERROR, stderr));
        }

        ParsedRun::from_cases(Framework::Jest, tests, combined_output(stdout, stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSING: &str = "\
PASS src/example.test.js
  Example Suite
    ✓ first test (2ms)
    ✓ second test (1ms)

Test Suites: 1 passed, 1 total
Tests:       2 passed, 2 total
Snapshots:   0 total
Time:        0.5s
Ran all test suites.";

    #[test]
    fn test_parse_all_passing() {
        let run = JestParser.parse(PASSING, "");

        assert_eq!(run.framework, Framework::Jest);
        assert_eq!(run.tests.len(), 2);
        assert_eq!(run.summary.passed, 2);
        assert_eq!(run.summary.failed, 0);
        assert_eq!(run.tests[0].name, "first test");
        assert_eq!(run.tests[1].name, "second test");
    }

    #[test]
    fn test_parse_failing_test_with_diff() {
        let stdout = "\
FAIL src/example.test.js
  Example Suite
    ✓ first test (2ms)
    ✕ second test (1ms)
      Expected: true
      Received: false

Test Suites: 1 failed, 1 total
Tests:       1 passed, 1 failed, 2 total";
        let run = JestParser.parse(stdout, "");

        assert_eq!(run.summary.total, 2);
        assert_eq!(run.summary.passed, 1);
        assert_eq!(run.summary.failed, 1);

        let failed = &run.tests[1];
        assert_eq!(failed.name, "second test");
        assert!(!failed.passed);
        assert!(failed.output.contains(&"Expected: true".to_string()));
        assert!(failed.output.contains(&"Received: false".to_string()));
    }

    #[test]
    fn test_parse_console_log_attaches_to_test() {
        let stdout = "\
PASS src/example.test.js
  Example Suite
    ✓ test with logs (3ms)
      console.log
        This is a log message
        at Object.<anonymous> (src/example.test.js:5:9)

Tests:       1 passed, 1 total";
        let run = JestParser.parse(stdout, "");

        assert_eq!(run.tests.len(), 1);
        assert_eq!(run.tests[0].name, "test with logs");
        assert!(run.tests[0].output.contains(&"console.log".to_string()));
        assert!(run.tests[0]
            .output
            .contains(&"This is a log message".to_string()));
    }

    #[test]
    fn test_parse_marker_without_duration() {
        let run = JestParser.parse("✓ bare test", "");
        assert_eq!(run.tests.len(), 1);
        assert_eq!(run.tests[0].name, "bare test");
    }

    #[test]
    fn test_parse_empty_output() {
        let run = JestParser.parse("", "");
        assert!(run.tests.is_empty());
        assert_eq!(run.summary.total, 0);
    }

    #[test]
    fn test_parse_stderr_becomes_execution_error() {
        let run = JestParser.parse("", "Error: Jest failed to run tests");

        assert_eq!(run.tests.len(), 1);
        assert_eq!(run.tests[0].name, "Test Execution Error");
        assert!(!run.tests[0].passed);
        assert!(run.tests[0]
            .output
            .contains(&"Error: Jest failed to run tests".to_string()));
        assert_eq!(run.summary.failed, 1);
    }
}
