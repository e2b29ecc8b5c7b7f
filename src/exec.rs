//! Shell execution and outcome classification.
//!
//! CodeSignTool has no reliable exit-code contract, so success is judged by
//! scanning the captured streams for known error markers. The heuristic is
//! kept behind `classify` so a future exit-status contract can replace it in
//! one place.

use std::process::Command;

use crate::error::SignError;

/// Literal substrings whose presence in either stream marks a failed run.
const ERROR_MARKERS: [&str; 5] = [
    "Error",
    "Exception",
    "Missing required option",
    "Unmatched arguments from",
    "Unmatched argument",
];

#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            stdout.to_string()
        } else if stdout.is_empty() {
            stderr.to_string()
        } else {
            format!("{stdout}\n{stderr}")
        }
    }
}

/// Runs an assembled command line through the platform shell and captures
/// both streams. Exit status is intentionally not consulted.
pub fn run_shell(command: &str) -> Result<ExecutionOutcome, SignError> {
    let output = if cfg!(windows) {
        Command::new("cmd").args(["/C", command]).output()
    } else {
        Command::new("sh").args(["-c", command]).output()
    }
    .map_err(|e| SignError::Exec(e.to_string()))?;

    Ok(ExecutionOutcome {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// First error marker found in either stream, if any.
pub fn error_marker(outcome: &ExecutionOutcome) -> Option<&'static str> {
    ERROR_MARKERS
        .iter()
        .copied()
        .find(|m| outcome.stdout.contains(m) || outcome.stderr.contains(m))
}

pub fn classify(outcome: &ExecutionOutcome) -> Result<(), SignError> {
    match error_marker(outcome) {
        Some(marker) => {
            tracing::debug!("output matched error marker '{marker}'");
            Err(SignError::ToolFailed(outcome.combined()))
        }
        None => Ok(()),
    }
}
