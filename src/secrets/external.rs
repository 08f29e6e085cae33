//! External secret scanner backend.
//!
//! Invokes a gitleaks-style binary per file: the file's content is piped
//! to stdin and the scanner prints JSON findings on stdout. Both gitleaks'
//! report field names (`RuleID`, `StartLine`, ...) and their snake_case
//! equivalents are accepted, so thin wrappers around other scanners work
//! unchanged.

use super::{EngineKind, Finding, SecretScanner};
use crate::errors::{Error, Result};
use crate::exec::run_with_timeout;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(alias = "RuleID", alias = "rule")]
    rule_id: String,
    #[serde(alias = "StartLine", alias = "line", default = "default_line")]
    start_line: usize,
    #[serde(alias = "EndLine", default)]
    end_line: usize,
    #[serde(alias = "StartColumn", default = "default_line")]
    start_column: usize,
    #[serde(alias = "EndColumn", default)]
    end_column: usize,
}

fn default_line() -> usize {
    1
}

/// Subprocess-backed scanner.
pub struct ExternalScanner {
    program: String,
    timeout: Duration,
}

impl ExternalScanner {
    pub fn new(program: String, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    fn parse(&self, path: &str, stdout: &[u8]) -> Result<Vec<Finding>> {
        let body = String::from_utf8_lossy(stdout);
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawFinding> = serde_json::from_str(trimmed).map_err(|e| Error::Subprocess {
            command: self.program.clone(),
            reason: format!("unparseable findings JSON: {e}"),
        })?;
        Ok(raw
            .into_iter()
            .map(|r| {
                let end_line = if r.end_line == 0 { r.start_line } else { r.end_line };
                let end_column = if r.end_column == 0 {
                    r.start_column
                } else {
                    // Scanners report the last covered column; spans are
                    // exclusive internally.
                    r.end_column + 1
                };
                Finding {
                    file: path.to_string(),
                    line_start: r.start_line,
                    line_end: end_line,
                    start_column: r.start_column,
                    end_column,
                    rule_id: r.rule_id,
                    source: EngineKind::External,
                    byte_range: None,
                }
            })
            .collect())
    }
}

impl SecretScanner for ExternalScanner {
    fn name(&self) -> &'static str {
        "external"
    }

    fn scan(&self, path: &str, content: &str) -> Result<Vec<Finding>> {
        let args = vec!["stdin".to_string(), "--report-format".into(), "json".into()];
        let output = run_with_timeout(
            &self.program,
            &args,
            Some(content.as_bytes()),
            self.timeout,
        )?;
        // gitleaks exits non-zero when leaks exist; stdout still carries
        // the report. Only a missing report is a failure.
        self.parse(path, &output.stdout)
    }
}
