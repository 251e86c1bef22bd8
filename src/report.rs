//! Run report persistence
//!
//! Every run leaves three artifacts in the report directory: the raw
//! stdout log, the raw stderr log (only when there was any), and a JSON
//! results file with the parsed outcome. Writes go through a temp file in
//! the same directory and are persisted with a rename, so a crash mid-write
//! never leaves a half-written report behind.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VerdictResult;
use crate::models::ParsedRun;

pub const OUTPUT_LOG: &str = "test_output.log";
pub const ERROR_LOG: &str = "test_errors.log";
pub const RESULTS_FILE: &str = "results.json";

/// Everything recorded about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub command: String,
    pub framework: crate::models::Framework,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub exit_code: Option<i32>,
    pub results: ParsedRun,
}

/// Writes the report artifacts into `dir`, which must already exist.
pub fn write_report(
    dir: &Path,
    stdout: &str,
    stderr: &str,
    report: &RunReport,
) -> VerdictResult<()> {
    write_atomic(dir, OUTPUT_LOG, stdout.as_bytes())?;

    if !stderr.trim().is_empty() {
        write_atomic(dir, ERROR_LOG, stderr.as_bytes())?;
    }

    let json = serde_json::to_vec_pretty(report)?;
    write_atomic(dir, RESULTS_FILE, &json)?;

    Ok(())
}

fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> VerdictResult<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(dir.join(name)).map_err(|e| e.error)?;
    Ok(())
}
