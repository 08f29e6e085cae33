//! Output formatters: XML, JSON, Markdown, and ASCII tree, in batch and
//! streaming variants.

use crate::config::OutputFormat;
use crate::errors::{Error, Result};
use crate::pipeline::PipelineValue;
use byte_unit::{Byte, UnitType};
use std::io::Write;

pub mod dry_run;
pub mod json;
pub mod line_numbers;
pub mod markdown;
pub mod tree;
pub mod writer;
pub mod xml;

/// Serializes a pipeline value to one document.
pub trait DocumentFormatter {
    /// Renders the whole document into a string.
    fn format(&self, value: &PipelineValue) -> Result<String>;

    /// Writes the document incrementally: header, one chunk per file with
    /// a flush, then the footer. The default renders in batch; formatters
    /// with real streaming shapes override this.
    fn stream(&self, value: &PipelineValue, writer: &mut dyn Write) -> Result<()> {
        let text = self.format(value)?;
        writer.write_all(text.as_bytes()).map_err(stream_error)?;
        writer.flush().map_err(stream_error)
    }
}

/// Formatter lookup for the configured output format.
pub fn formatter_for(format: OutputFormat) -> Box<dyn DocumentFormatter> {
    match format {
        OutputFormat::Xml => Box::new(xml::XmlFormatter),
        OutputFormat::Json => Box::new(json::JsonFormatter),
        OutputFormat::Markdown => Box::new(markdown::MarkdownFormatter),
        OutputFormat::Tree => Box::new(tree::TreeFormatter),
    }
}

pub(crate) fn stream_error(e: std::io::Error) -> Error {
    crate::errors::io_error_with_path(e, "<output stream>")
}

/// Renders a byte count for humans: exact below 1 KiB, one decimal above.
pub fn humanize_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.1}")
}

/// RFC 3339 timestamp for document metadata.
pub fn generated_timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// RFC 3339 rendering of a file's mtime, when known.
pub fn format_mtime(modified: Option<std::time::SystemTime>) -> Option<String> {
    let modified = modified?;
    let odt = time::OffsetDateTime::from(modified);
    odt.format(&time::format_description::well_known::Rfc3339).ok()
}

/// Total content size in bytes across the final file set.
pub fn total_size(value: &PipelineValue) -> u64 {
    value.files.iter().map(|f| f.size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_small_and_large() {
        assert_eq!(humanize_size(0), "0 B");
        assert_eq!(humanize_size(512), "512 B");
        assert!(humanize_size(2048).contains("KiB"));
        assert!(humanize_size(5 * 1024 * 1024).contains("MiB"));
    }

    #[test]
    fn timestamp_is_rfc3339_shaped() {
        let stamp = generated_timestamp();
        assert!(stamp.contains('T'));
        assert!(stamp.len() >= 19);
    }

    #[test]
    fn mtime_formats_when_present() {
        assert!(format_mtime(None).is_none());
        let stamp = format_mtime(Some(std::time::SystemTime::UNIX_EPOCH)).unwrap();
        assert!(stamp.starts_with("1970-01-01"));
    }
}
