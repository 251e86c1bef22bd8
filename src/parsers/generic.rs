//! Heuristic parser for arbitrary command output
//!
//! Used when no framework-specific parser applies: CI scripts, docker
//! builds, make targets. Output is segmented into logical blocks on blank
//! lines and section headers, each block becomes one result, and a block is
//! failed when it carries fail/error markers.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Framework, ParsedRun, TestCase};
use crate::parsers::{combined_output, OutputParser};

pub struct GenericParser;

fn header_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(={3,}|-{3,}|#{3,}|Running|Executing|Starting|Results:)")
            .expect("valid regex")
    })
}

/// Lines that open a new logical block. Pass/fail markers deliberately do
/// not split: an ERROR line belongs to the step that produced it.
fn is_section_header(line: &str) -> bool {
    header_prefix().is_match(line)
}

/// Lines worth promoting to a block name
fn is_name_candidate(line: &str) -> bool {
    line.starts_with("Running ")
        || line.starts_with("Test ")
        || line.starts_with("Starting ")
        || line.starts_with("Executing ")
        || header_prefix().is_match(line)
        || line.contains("PASS:")
        || line.contains("FAIL:")
        || line.contains("Running")
}

fn block_to_case(block: Vec<String>, index: usize) -> TestCase {
    let block_text = block.join("\n");

    let mut name = block
        .iter()
        .find(|l| is_name_candidate(l))
        .cloned()
        .unwrap_or_else(|| format!("Output Block {}", index + 1));

    if block_text.contains("Error:") {
        name = "Error Block".to_string();
    }
    if block_text.contains("FAIL ") || block_text.contains(" FAIL") {
        name = format!("FAIL: {}", name);
    }

    let lower = block_text.to_lowercase();
    let failed = lower.contains("fail") || lower.contains("error");

    TestCase {
        name,
        passed: !failed,
        output: block,
        raw_output: block_text,
    }
}

impl OutputParser for GenericParser {
    fn framework(&self) -> Framework {
        Framework::Generic
    }

    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun {
        let raw = combined_output(stdout, stderr);
        if raw.is_empty() {
            return ParsedRun::from_cases(Framework::Generic, Vec::new(), raw);
        }

        let mut blocks: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }

            if is_section_header(line) && !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.push(line.to_string());
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        let mut tests: Vec<TestCase> = blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| block_to_case(block, i))
            .collect();

        if tests.is_empty() {
            // Nothing segmented: treat the whole run as one result.
            let lower = raw.to_lowercase();
            let has_errors = !stderr.trim().is_empty()
                || lower.contains("fail")
                || lower.contains("error");
            let mut case = TestCase::new("Complete Test Run", !has_errors);
            case.output = raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            case.raw_output = raw.clone();
            tests.push(case);
        } else if !stderr.trim().is_empty() {
            tests.push(TestCase::from_error_stream("Error Output", stderr));
        }

        ParsedRun::from_cases(Framework::Generic, tests, raw)
    }
}
