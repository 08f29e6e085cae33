//! Secret detection and redaction.
//!
//! Two backends implement [`SecretScanner`]: a builtin regex engine and an
//! external gitleaks-style subprocess. Findings are span-oriented and never
//! carry the matched text; the redactor is the only code that touches the
//! secret bytes, and it only overwrites them.

use crate::config::{SecretsEngine, SecretsOptions};
use crate::errors::Result;
use std::time::Duration;

mod builtin;
mod deny;
mod external;
mod redact;

pub use builtin::BuiltinScanner;
pub use deny::{hard_deny_match, is_hard_denied};
pub use external::ExternalScanner;
pub use redact::apply_redactions;

/// Which backend produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Builtin,
    External,
}

/// One detector hit. Spans locate the secret; the text itself is never
/// stored.
#[derive(Debug, Clone)]
pub struct Finding {
    /// Relative path of the file.
    pub file: String,
    /// 1-based first line of the span.
    pub line_start: usize,
    /// 1-based last line of the span.
    pub line_end: usize,
    /// 1-based byte column on `line_start`.
    pub start_column: usize,
    /// 1-based byte column one past the span on `line_end`.
    pub end_column: usize,
    /// Identifier of the rule that matched.
    pub rule_id: String,
    /// Backend that produced the finding.
    pub source: EngineKind,
    /// Byte range within the scanned content, when the backend knows it.
    pub byte_range: Option<(usize, usize)>,
}

/// A per-file secret detector.
pub trait SecretScanner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scans one file's text and returns span findings.
    fn scan(&self, path: &str, content: &str) -> Result<Vec<Finding>>;
}

/// Instantiates the scanners the configured engine calls for.
///
/// `auto` prefers the external binary when it is on PATH and falls back to
/// the builtin engine; `both` runs the two and merges by span.
pub fn build_scanners(
    options: &SecretsOptions,
    timeout: Duration,
) -> Vec<Box<dyn SecretScanner>> {
    match options.engine {
        SecretsEngine::Off => Vec::new(),
        SecretsEngine::Builtin => vec![Box::new(BuiltinScanner::new())],
        SecretsEngine::External => vec![Box::new(ExternalScanner::new(
            options.scanner_bin.clone(),
            timeout,
        ))],
        SecretsEngine::Both => vec![
            Box::new(BuiltinScanner::new()),
            Box::new(ExternalScanner::new(options.scanner_bin.clone(), timeout)),
        ],
        SecretsEngine::Auto => {
            if crate::exec::binary_available(&options.scanner_bin) {
                vec![Box::new(ExternalScanner::new(
                    options.scanner_bin.clone(),
                    timeout,
                ))]
            } else {
                log::debug!(
                    "secret scanner '{}' not found, using builtin rules",
                    options.scanner_bin
                );
                vec![Box::new(BuiltinScanner::new())]
            }
        }
    }
}

/// Unions findings from multiple backends, dropping duplicates that cover
/// the same span of the same file.
pub fn merge_by_span(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        (a.line_start, a.start_column, a.line_end, a.end_column)
            .cmp(&(b.line_start, b.start_column, b.line_end, b.end_column))
    });
    findings.dedup_by(|a, b| {
        a.line_start == b.line_start
            && a.start_column == b.start_column
            && a.line_end == b.line_end
            && a.end_column == b.end_column
    });
    findings
}
