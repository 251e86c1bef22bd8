//! `cargo test` output parser
//!
//! Parses libtest result lines (`test name ... ok`), extracts failure
//! detail from `---- name ----` panic blocks, and prefers the counts from
//! the `test result:` summary line over derived counts. Ignored tests are
//! excluded from results. Compiler failures collapse the run into a single
//! compilation error.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, Summary, TestCase};
use crate::parsers::{combined_output, OutputParser, COMPILATION_ERROR, EXECUTION_ERROR};

pub struct CargoParser;

fn result_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"test (.+) \.\.\. (ok|FAILED|ignored)").expect("valid regex"))
}

fn summary_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"test result: .+?\. (\d+) passed; (\d+) failed; (\d+) ignored")
            .expect("valid regex")
    })
}

fn duration_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"finished in ([0-9.]+)s").expect("valid regex"))
}

/// Extract the panic block for a failed test, if present. libtest labels
/// blocks `---- name stdout ----`; the bare `---- name ----` form is kept
/// for older output.
fn failure_block<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    let start = [
        format!("---- {} stdout ----", name),
        format!("---- {} ----", name),
    ]
    .iter()
    .find_map(|marker| raw.find(marker.as_str()))?;

    let rest = &raw[start..];
    let end = rest.find("\n\n").unwrap_or(rest.len());
    Some(&rest[..end])
}

impl OutputParser for CargoParser {
    fn framework(&self) -> Framework {
        Framework::Cargo
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let raw = combined_output(stdout, stderr);

        if stderr.contains("error: could not compile") || stderr.contains("error[E") {
            let error_lines: Vec<String> = stderr
                .lines()
                .map(str::trim)
                .filter(|l| l.contains("error:") || l.contains("error["))
                .map(String::from)
                .collect();

            let mut case = TestCase::new(COMPILATION_ERROR, false);
            case.output = if error_lines.is_empty() {
                vec!["Compilation error".to_string()]
            } else {
                error_lines
            };
            case.raw_output = stderr.to_string();
            return ParsedRun::from_cases(Framework::Cargo, vec![case], raw);
        }

        let mut tests: Vec<TestCase> = Vec::new();
        for caps in result_line().captures_iter(&raw) {
            let name = caps[1].trim().to_string();
            let status = &caps[2];
            if status == "ignored" {
                continue;
            }

            let mut test = TestCase::new(name.as_str(), status == "ok");
            if status == "FAILED" {
                if let Some(block) = failure_block(&raw, &name) {
                    test.output = block
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect();
                    test.raw_output = block.to_string();
                }
            }
            if test.raw_output.is_empty() {
                test.output = vec![caps[0].trim().to_string()];
                test.raw_output = caps[0].trim().to_string();
            }
            tests.push(test);
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(EXECUTION_ERROR, stderr));
        }

        // The summary line is authoritative when present; ignored tests are
        // not counted toward the total.
        let mut summary = Summary::from_cases(&tests);
        if let Some(caps) = summary_line().captures(&raw) {
            let passed = caps[1].parse().unwrap_or(summary.passed);
            let failed = caps[2].parse().unwrap_or(summary.failed);
            summary.passed = passed;
            summary.failed = failed;
            summary.total = passed + failed;
        }
        if let Some(caps) = duration_suffix().captures(&raw) {
            if let Ok(secs) = caps[1].parse::<f64>() {
                summary.duration_ms = Some((secs * 1000.0) as u64);
            }
        }

        ParsedRun {
            framework: Framework::Cargo,
            tests,
            summary,
            raw_output: raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_passing() {
        let stdout = "\
running 3 tests
test test_addition ... ok
test test_subtraction ... ok
test test_multiplication ... ok

test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.01s";
        let run = CargoParser.parse(stdout, "");

        assert_eq!(run.framework, Framework::Cargo);
        assert_eq!(run.summary.total, 3);
        assert_eq!(run.summary.passed, 3);
        assert_eq!(run.summary.failed, 0);
        assert_eq!(run.summary.duration_ms, Some(10));
        assert_eq!(run.tests[0].name, "test_addition");
        assert!(run.tests[0].passed);
    }

    #[test]
    fn test_parse_failure_with_panic_block() {
        let stdout = "\
running 3 tests
test test_addition ... ok
test test_subtraction ... FAILED
test test_multiplication ... ok

failures:

---- test_subtraction ----
thread 'test_subtraction' panicked at 'assertion failed: `(left == right)`
  left: `1`,
  right: `0`', tests/test_basic.rs:14:5

failures:
    test_subtraction

test result: FAILED. 2 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.01s";
        let run = CargoParser.parse(stdout, "");

        assert_eq!(run.summary.total, 3);
        assert_eq!(run.summary.passed, 2);
        assert_eq!(run.summary.failed, 1);
        assert_eq!(run.tests.len(), 3);

        let failed = &run.tests[1];
        assert_eq!(failed.name, "test_subtraction");
        assert!(!failed.passed);
        assert!(failed.output.len() > 1);
        assert!(failed
            .output
            .iter()
            .any(|l| l.contains("assertion failed")));
    }

    #[test]
    fn test_parse_failure_detail_with_stdout_label() {
        // libtest writes `---- name stdout ----`, not the bare marker
        let stdout = "\
running 2 tests
test test_addition ... ok
test test_subtraction ... FAILED

failures:

---- test_subtraction stdout ----
thread 'test_subtraction' panicked at tests/test_basic.rs:14:5:
assertion `left == right` failed
  left: 1
 right: 0

failures:
    test_subtraction

test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.01s";
        let run = CargoParser.parse(stdout, "");

        let failed = &run.tests[1];
        assert_eq!(failed.name, "test_subtraction");
        assert!(
            failed.output.iter().any(|l| l.contains("panicked at")),
            "panic detail missing; output = {:?}",
            failed.output
        );
        assert!(failed.raw_output.contains("---- test_subtraction stdout ----"));
    }

    #[test]
    fn test_parse_ignored_tests_excluded() {
        let stdout = "\
running 4 tests
test test_addition ... ok
test test_ignored ... ignored
test test_subtraction ... ok
test test_multiplication ... ok

test result: ok. 3 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.01s";
        let run = CargoParser.parse(stdout, "");

        assert_eq!(run.summary.total, 3);
        assert_eq!(run.summary.passed, 3);
        assert_eq!(run.tests.len(), 3);
        assert!(!run.tests.iter().any(|t| t.name == "test_ignored"));
    }

    #[test]
    fn test_parse_compilation_error() {
        let stderr = "\
error[E0425]: cannot find value `undefined_var` in this scope
 --> src/lib.rs:5:13

error: could not compile `myproject` due to previous error";
        let run = CargoParser.parse("", stderr);

        assert_eq!(run.summary.total, 1);
        assert_eq!(run.summary.failed, 1);
        assert_eq!(run.tests[0].name, "Compilation Error");
        assert!(!run.tests[0].passed);
        assert!(run.tests[0]
            .output
            .iter()
            .any(|l| l.contains("error[E0425]")));
    }

    #[test]
    fn test_parse_empty_output() {
        let run = CargoParser.parse("", "");
        assert!(run.tests.is_empty());
        assert_eq!(run.summary.total, 0);
    }

    #[test]
    fn test_parse_stderr_becomes_execution_error() {
        let run = CargoParser.parse("", "error: no such subcommand");

        assert_eq!(run.tests.len(), 1);
        assert_eq!(run.tests[0].name, "Test Execution Error");
        assert_eq!(run.summary.failed, 1);
    }
}
