//! Built-in transformers.
//!
//! These cover the non-AI cases the tool ships with: previewing long text
//! files, describing binaries that have no text rendition, and piping
//! content through an external program. AI-backed transformers implement
//! the same trait and plug in through the registry.

use super::{
    DataKind, TransformOutcome, Transformer, TransformerDependency, TransformerTraits,
};
use crate::constants::DEFAULT_SUBPROCESS_TIMEOUT_SECS;
use crate::core_types::{BinaryCategory, ContentEncoding, FileContent, FileRecord};
use crate::errors::{Error, Result};
use crate::exec::run_with_timeout;
use crate::output::humanize_size;
use log::warn;
use std::time::Duration;

/// Keeps only the first N lines of a text file.
///
/// Options: `lines` (default 100). Output never grows, so repeated
/// application is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FirstLines;

impl FirstLines {
    fn limit(options: &serde_json::Value) -> usize {
        options
            .get("lines")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .filter(|v| *v > 0)
            .unwrap_or(100)
    }
}

impl Transformer for FirstLines {
    fn name(&self) -> &'static str {
        "first-lines"
    }

    fn traits(&self) -> TransformerTraits {
        TransformerTraits {
            input: DataKind::Text,
            output: DataKind::Text,
            idempotent: true,
            ..TransformerTraits::default()
        }
    }

    fn transform(
        &self,
        record: &mut FileRecord,
        options: &serde_json::Value,
    ) -> Result<TransformOutcome> {
        let Some(text) = record.content_str() else {
            return Ok(TransformOutcome::Unchanged);
        };
        let limit = Self::limit(options);
        let mut end = 0;
        let mut lines = 0;
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                lines += 1;
                if lines == limit {
                    end = offset + 1;
                    break;
                }
            }
        }
        if lines < limit || end == text.len() {
            return Ok(TransformOutcome::Unchanged);
        }
        let clipped = text[..end].to_string();
        record.content = Some(FileContent::Text(clipped));
        Ok(TransformOutcome::Applied)
    }
}

/// Replaces a binary file's bytes with a one-line description.
///
/// This is the non-AI stand-in for convertible categories (images,
/// PDFs, office documents): the output names the kind, the file, and its
/// size, so the document stays informative without embedding bytes.
#[derive(Debug, Clone, Default)]
pub struct BinaryInfo;

impl Transformer for BinaryInfo {
    fn name(&self) -> &'static str {
        "binary-info"
    }

    fn traits(&self) -> TransformerTraits {
        TransformerTraits {
            input: DataKind::Binary,
            output: DataKind::Text,
            idempotent: true,
            ..TransformerTraits::default()
        }
    }

    fn transform(
        &self,
        record: &mut FileRecord,
        _options: &serde_json::Value,
    ) -> Result<TransformOutcome> {
        if !record.is_binary {
            return Ok(TransformOutcome::Unchanged);
        }
        let category = record
            .binary_category
            .unwrap_or(BinaryCategory::Other)
            .label();
        let mime = mime_guess::from_path(&record.path)
            .first()
            .map(|m| m.essence_str().to_string());
        let description = match mime {
            Some(mime) => format!(
                "[{category}: {}, {}, {mime}]",
                record.file_name(),
                humanize_size(record.size)
            ),
            None => format!("[{category}: {}, {}]", record.file_name(), humanize_size(record.size)),
        };
        record.content = Some(FileContent::Text(description));
        record.encoding = ContentEncoding::Utf8;
        Ok(TransformOutcome::Applied)
    }
}

/// Pipes content through a configured external program.
///
/// Options: `command` (required), `args` (list), `timeout_secs`. Declared
/// heavy: results are cached by content + options, and the transform stage
/// shows progress while it runs.
#[derive(Debug, Clone, Default)]
pub struct ExternalCommand {
    /// The configured program, when known at registration time. Declared
    /// as a binary dependency so plan validation can check PATH.
    pub program: Option<String>,
}

impl ExternalCommand {
    /// An instance bound to a specific program.
    pub fn for_program<S: Into<String>>(program: S) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl Transformer for ExternalCommand {
    fn name(&self) -> &'static str {
        "external-command"
    }

    fn traits(&self) -> TransformerTraits {
        TransformerTraits {
            input: DataKind::Text,
            output: DataKind::Text,
            heavy: true,
            dependencies: self
                .program
                .iter()
                .map(|p| TransformerDependency::Binary(p.clone()))
                .collect(),
            ..TransformerTraits::default()
        }
    }

    fn transform(
        &self,
        record: &mut FileRecord,
        options: &serde_json::Value,
    ) -> Result<TransformOutcome> {
        let configured = options.get("command").and_then(|v| v.as_str());
        let Some(command) = configured.or(self.program.as_deref()) else {
            warn!("external-command has no 'command' option; passing through");
            return Ok(TransformOutcome::Unchanged);
        };
        let args: Vec<String> = options
            .get("args")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let timeout = options
            .get("timeout_secs")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_SUBPROCESS_TIMEOUT_SECS);

        let input = record
            .content
            .as_ref()
            .map(FileContent::as_bytes)
            .unwrap_or_default()
            .to_vec();
        let output = run_with_timeout(command, &args, Some(&input), Duration::from_secs(timeout))?;
        if !output.success() {
            return Err(Error::Subprocess {
                command: command.to_string(),
                reason: format!(
                    "exit status {:?}: {}",
                    output.status_code,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        record.content = Some(FileContent::Text(text));
        record.encoding = ContentEncoding::Utf8;
        Ok(TransformOutcome::Applied)
    }
}
