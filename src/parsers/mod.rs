//! Framework output parsers
//!
//! Each supported framework gets its own parser implementing the
//! `OutputParser` trait. `parse_output` dispatches on `Framework` and is the
//! entry point used by the runner and the CLI.
//!
//! Parsers are line-oriented and total: any input, including empty or
//! malformed output, produces a `ParsedRun` rather than an error.

mod bats;
mod cargo;
mod flutter;
mod generic;
mod go;
mod jest;
mod pytest;

pub use bats::BatsParser;
pub use cargo::CargoParser;
pub use flutter::FlutterParser;
pub use generic::GenericParser;
pub use go::GoParser;
pub use jest::JestParser;
pub use pytest::PytestParser;

use crate::models::{Framework, ParsedRun};

/// Case name used when a run produced no parseable tests but stderr output
pub(crate) const EXECUTION_ERROR: &str = "Test Execution Error";

/// Case name used when the toolchain failed before any test ran
pub(crate) const COMPILATION_ERROR: &str = "Compilation Error";

/// Common seam for all framework parsers
pub trait OutputParser {
    /// Framework this parser understands
    fn framework(&self) -> Framework;

    /// Parse captured stdout/stderr into structured results
    fn parse(&self, stdout: &str, stderr: &str) -> ParsedRun;
}

/// Get the parser for a framework
pub fn parser_for(framework: Framework) -> Box<dyn OutputParser> {
    match framework {
        Framework::Bats => Box::new(BatsParser),
        Framework::Pytest => Box::new(PytestParser),
        Framework::Jest => Box::new(JestParser),
        Framework::Go => Box::new(GoParser),
        Framework::Cargo => Box::new(CargoParser),
        Framework::Flutter => Box::new(FlutterParser),
        Framework::Generic => Box::new(GenericParser),
    }
}

/// All parsers, in `Framework::ALL` order
pub fn all_parsers() -> Vec<Box<dyn OutputParser>> {
    Framework::ALL.iter().map(|fw| parser_for(*fw)).collect()
}

/// Parse captured output for a framework
pub fn parse_output(framework: Framework, stdout: &str, stderr: &str) -> ParsedRun {
    parser_for(framework).parse(stdout, stderr)
}

/// Combined stdout + stderr, trimmed, preserved as `raw_output`
pub(crate) fn combined_output(stdout: &str, stderr: &str) -> String {
    format!("{}\n{}", stdout, stderr).trim().to_string()
}
