//! `flutter test` output parser
//!
//! Status lines carry a running pass/fail tally:
//! `00:01 +1: test name` (pass) / `00:01 -2: test name` (fail).
//! `loading ...` progress and the `All tests passed!` trailer are skipped.
//! `log output:` lines attach to the current test with the prefix stripped.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser, EXECUTION_ERROR};

pub struct FlutterParser;

fn status_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{2}:\d{2}\s+([+-])\d+:\s+(.+?)(?:\s+\[E\])?$").expect("valid regex")
    })
}

impl OutputParser for FlutterParser {
    fn framework(&self) -> Framework {
        Framework::Flutter
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let mut tests: Vec<TestCase> = Vec::new();
        let mut has_current = false;

        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = status_line().captures(line) {
                let name = caps[2].trim();

                // Progress and summary lines share the status format.
                if name.contains("All tests passed") || name.starts_with("loading ") {
                    has_current = false;
                    continue;
                }

                let mut test = TestCase::new(name, &caps[1] == "+");
                test.raw_output = line.to_string();
                tests.push(test);
                has_current = true;
                continue;
            }

            if has_current {
                if let Some(last) = tests.last_mut() {
                    let output = line.strip_prefix("log output:").unwrap_or(line).trim();
                    if !output.is_empty() {
                        last.output.push(output.to_string());
                        last.raw_output.push('\n');
                        last.raw_output.push_str(line);
                    }
                }
            }
        }

        if tests.is_empty() && !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream(EXECUTION_ERROR, stderr));
        }

        ParsedRun::from_cases(Framework::Flutter, tests, combined_output(stdout, stderr))
    }
}
