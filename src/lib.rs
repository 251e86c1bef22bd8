//! Verdict - test command runner and output parser
//!
//! Verdict executes a test command in a working directory, captures its
//! output, and turns framework-specific test runner output (bats, pytest,
//! jest, go, cargo, flutter, or a generic fallback) into structured
//! per-test results suitable for CI pipelines and coding agents.

pub mod config;
pub mod error;
pub mod models;
pub mod parsers;
pub mod report;
pub mod runner;
pub mod security;

// Re-exports for convenience
pub use config::{Config, Verbosity};
pub use error::{VerdictError, VerdictResult};
pub use models::{Framework, ParsedRun, Summary, TestCase};
pub use parsers::{all_parsers, parse_output, parser_for, OutputParser};
pub use report::{write_report, RunReport};
pub use runner::{run_tests, RunOutcome, RunRequest};
pub use security::{sanitize_env, validate_command, SecurityPolicy};
