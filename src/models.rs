//! Core data models for Verdict
//!
//! Defines the structures shared by the parsers, the runner, and the CLI:
//! - `Framework`: which test runner produced the output
//! - `TestCase`: a single parsed test with its captured output
//! - `Summary`: aggregate counts for a run
//! - `ParsedRun`: the full structured result of one run

use serde::{Deserialize, Serialize};

/// Test framework whose output is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    /// Bats (TAP output)
    Bats,
    /// Pytest verbose output
    Pytest,
    /// Jest
    Jest,
    /// `go test` output
    Go,
    /// `cargo test` output ("rust" accepted as an alias)
    #[value(alias = "rust")]
    Cargo,
    /// `flutter test` output
    Flutter,
    /// Heuristic fallback for arbitrary command output
    Generic,
}

impl Framework {
    /// All supported frameworks
    pub const ALL: [Framework; 7] = [
        Framework::Bats,
        Framework::Pytest,
        Framework::Jest,
        Framework::Go,
        Framework::Cargo,
        Framework::Flutter,
        Framework::Generic,
    ];

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Framework::Bats => "bats",
            Framework::Pytest => "pytest",
            Framework::Jest => "jest",
            Framework::Go => "go",
            Framework::Cargo => "cargo",
            Framework::Flutter => "flutter",
            Framework::Generic => "generic",
        }
    }

    /// Conventional command used to run this framework's tests
    pub fn conventional_command(&self) -> &'static str {
        match self {
            Framework::Bats => "bats test/*.bats",
            Framework::Pytest => "python -m pytest -v",
            Framework::Jest => "jest",
            Framework::Go => "go test ./...",
            Framework::Cargo => "cargo test",
            Framework::Flutter => "flutter test",
            Framework::Generic => "<any command>",
        }
    }

    /// Conventional test file pattern for this framework
    pub fn file_pattern(&self) -> &'static str {
        match self {
            Framework::Bats => "*.bats",
            Framework::Pytest => "test_*.py",
            Framework::Jest => "*.test.js",
            Framework::Go => "*_test.go",
            Framework::Cargo => "tests/*.rs",
            Framework::Flutter => "*_test.dart",
            Framework::Generic => "*",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single parsed test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Test name as reported by the framework
    pub name: String,

    /// Whether the test passed
    pub passed: bool,

    /// Captured output lines attributed to this test
    #[serde(default)]
    pub output: Vec<String>,

    /// Unprocessed output for this test (result line plus detail block)
    #[serde(default)]
    pub raw_output: String,
}

impl TestCase {
    /// Create a new test case
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            output: Vec::new(),
            raw_output: String::new(),
        }
    }

    /// Create a failed case carrying an error stream, used by all parsers
    /// when a run produced no parseable tests but wrote to stderr.
    pub fn from_error_stream(name: impl Into<String>, stderr: &str) -> Self {
        Self {
            name: name.into(),
            passed: false,
            output: stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            raw_output: stderr.to_string(),
        }
    }
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Overall duration when the framework reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Summary {
    /// Derive a summary from a list of test cases
    pub fn from_cases(cases: &[TestCase]) -> Self {
        let passed = cases.iter().filter(|c| c.passed).count();
        Self {
            total: cases.len(),
            passed,
            failed: cases.len() - passed,
            duration_ms: None,
        }
    }
}

/// The full structured result of parsing one run's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRun {
    /// Framework the output was parsed as
    pub framework: Framework,

    /// Individual test results in output order
    pub tests: Vec<TestCase>,

    /// Aggregate counts
    pub summary: Summary,

    /// Complete combined command output (stdout then stderr, trimmed)
    pub raw_output: String,
}

impl ParsedRun {
    /// Build a run result, deriving the summary from the cases
    pub fn from_cases(framework: Framework, tests: Vec<TestCase>, raw_output: String) -> Self {
        let summary = Summary::from_cases(&tests);
        Self {
            framework,
            tests,
            summary,
            raw_output,
        }
    }

    /// True when no test failed
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0
    }
}
