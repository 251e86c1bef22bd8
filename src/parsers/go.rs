//! `go test` output parser
//!
//! `=== RUN Name` opens a test, `--- PASS: Name` / `--- FAIL: Name` closes
//! it. Output printed while a test runs attaches to it; failure detail lines
//! (`file_test.go:15: ...`) are emitted after the `--- FAIL:` line and
//! attach to the test that just closed. A `build failed` marker collapses
//! the run into a single compilation error.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser, COMPILATION_ERROR};

pub struct GoParser;

fn run_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^=== RUN\s+(.+)$").expect("valid regex"))
}

fn result_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--- (PASS|FAIL): (.+?)(?: \(.*\))?$").expect("valid regex"))
}

/// Package-level runner lines that belong to no individual test
fn is_control_line(line: &str) -> bool {
    line == "PASS"
        || line == "FAIL"
        || line.starts_with("ok ")
        || line.starts_with("ok\t")
        || line.starts_with("FAIL\t")
        || line.starts_with("FAIL ")
        || line.starts_with("exit status")
}

impl OutputParser for GoParser {
    fn framework(&self) -> Framework {
        Framework::Go
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let raw = combined_output(stdout, stderr);

        if stdout.trim().is_empty() && stderr.trim().is_empty() {
            return ParsedRun::from_cases(Framework::Go, Vec::new(), raw);
        }

        if stderr.contains("build failed") || stdout.contains("build failed") {
            let source = if stderr.trim().is_empty() { stdout } else { stderr };
            let case = TestCase::from_error_stream(COMPILATION_ERROR, source);
            return ParsedRun::from_cases(Framework::Go, vec![case], raw);
        }

        let mut tests: Vec<TestCase> = Vec::new();
        let mut current_name: Option<String> = None;
        let mut current_output: Vec<String> = Vec::new();

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = run_line().captures(line) {
                current_name = Some(caps[1].trim().to_string());
                current_output.clear();
                continue;
            }

            if let Some(caps) = result_line().captures(line) {
                let name = caps[2].trim().to_string();
                let matches_current = current_name.as_deref().map_or(true, |c| c == name);
                if matches_current {
                    let output = std::mem::take(&mut current_output);
                    let mut test = TestCase::new(name, &caps[1] == "PASS");
                    test.raw_output = if output.is_empty() {
                        line.to_string()
                    } else {
                        output.join("\n")
                    };
                    test.output = output;
                    tests.push(test);
                    current_name = None;
                }
                continue;
            }

            if is_control_line(line) {
                continue;
            }

            if current_name.is_some() {
                current_output.push(line.to_string());
            } else if let Some(last) = tests.last_mut() {
                // Failure detail printed after the result line, e.g.
                // "basic_test.go:15: Expected 2 + 2 to equal 5"
                last.output.push(line.to_string());
            }
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(COMPILATION_ERROR, stderr));
        }

        ParsedRun::from_cases(Framework::Go, tests, raw)
    }
}
