//! Markdown document formatter: YAML front-matter, directory tree, one
//! marked section per file. Batch and streaming.

use super::line_numbers::with_line_numbers;
use super::{
    format_mtime, generated_timestamp, humanize_size, stream_error, total_size,
    DocumentFormatter,
};
use crate::core_types::{ContentEncoding, FileRecord};
use crate::errors::Result;
use crate::pipeline::PipelineValue;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Write;

/// Markdown export with machine-recoverable file markers.
pub struct MarkdownFormatter;

/// Picks the shortest backtick fence (at least three) that does not occur
/// in the content.
pub(crate) fn fence_for(content: &str) -> String {
    let mut longest_run = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest_run = longest_run.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest_run + 1).max(3))
}

/// SHA-256 of the in-memory content, truncated for display. Hashing the
/// in-memory bytes (not the file on disk) keeps warm-cache re-runs
/// byte-identical to the batch path.
fn content_hash(record: &FileRecord) -> String {
    let mut hasher = Sha256::new();
    if let Some(content) = &record.content {
        hasher.update(content.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("sha256:{}", &digest[..16])
}

fn write_front_matter(out: &mut String, value: &PipelineValue) {
    let render = &value.options.render;
    let _ = writeln!(out, "---");
    let _ = writeln!(out, "tool: copytree");
    let _ = writeln!(out, "generated: {}", generated_timestamp());
    let _ = writeln!(out, "base_path: {}", value.base_path().display());
    let _ = writeln!(out, "profile: {}", value.profile.name);
    let _ = writeln!(out, "file_count: {}", value.files.len());
    let _ = writeln!(out, "total_size_bytes: {}", total_size(value));
    let _ = writeln!(out, "line_numbers: {}", render.line_numbers);
    let _ = writeln!(out, "only_tree: {}", render.only_tree);
    if let Some(instructions) = &value.instructions {
        let _ = writeln!(out, "instructions: |");
        for line in instructions.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    let _ = writeln!(out, "---");
    let _ = writeln!(out);
}

fn write_preamble(out: &mut String, value: &PipelineValue) {
    let basename = value
        .base_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| value.base_path().display().to_string());
    let _ = writeln!(out, "# CopyTree Export — {basename}");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Directory Tree");
    let _ = writeln!(out);
    let _ = writeln!(out, "```text");
    out.push_str(&super::tree::render_tree(&value.files, false));
    let _ = writeln!(out, "```");
    let _ = writeln!(out);
    if let Some(instructions) = &value.instructions {
        let _ = writeln!(out, "## Instructions");
        let _ = writeln!(out);
        let _ = writeln!(out, "{instructions}");
        let _ = writeln!(out);
    }
}

fn write_file_section(out: &mut String, record: &FileRecord, line_numbers: bool) {
    let marker = json!({
        "path": record.path,
        "size": record.size,
        "modified": format_mtime(record.modified),
        "hash": content_hash(record),
        "git": record.git_status,
        "binary": record.is_binary,
        "truncated": record.truncated,
    });
    let _ = writeln!(out, "<!-- copytree:file {marker} -->");
    let _ = writeln!(out, "### @{}", record.path);
    let _ = writeln!(out);

    let mut small = format!("<small>{}", humanize_size(record.size));
    if let Some(mtime) = format_mtime(record.modified) {
        let _ = write!(small, " · modified {mtime}");
    }
    let _ = write!(small, " · {}", content_hash(record));
    if let Some(status) = &record.git_status {
        let _ = write!(small, " · git {status}");
    }
    small.push_str("</small>");
    let _ = writeln!(out, "{small}");
    let _ = writeln!(out);

    let content = record.content_str().unwrap_or("");
    let content = if line_numbers && !record.is_binary {
        with_line_numbers(content)
    } else {
        content.to_string()
    };
    let fence = fence_for(&content);
    let hint = record.extension();
    let _ = writeln!(out, "{fence}{hint}");
    if record.encoding == ContentEncoding::Base64 {
        let _ = writeln!(out, "Content-Transfer: base64");
        let _ = writeln!(out);
    }
    if !content.is_empty() {
        out.push_str(&content);
        if !content.ends_with('\n') {
            out.push('\n');
        }
    }
    let _ = writeln!(out, "{fence}");
    let _ = writeln!(out, "<!-- copytree:end {} -->", record.path);
    let _ = writeln!(out);
}

impl DocumentFormatter for MarkdownFormatter {
    fn format(&self, value: &PipelineValue) -> Result<String> {
        let mut out = String::new();
        write_front_matter(&mut out, value);
        write_preamble(&mut out, value);
        if !value.options.render.only_tree {
            for record in &value.files {
                write_file_section(&mut out, record, value.options.render.line_numbers);
            }
        }
        Ok(out)
    }

    fn stream(&self, value: &PipelineValue, writer: &mut dyn Write) -> Result<()> {
        let mut chunk = String::new();
        write_front_matter(&mut chunk, value);
        write_preamble(&mut chunk, value);
        writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
        writer.flush().map_err(stream_error)?;

        if !value.options.render.only_tree {
            for record in &value.files {
                chunk.clear();
                write_file_section(&mut chunk, record, value.options.render.line_numbers);
                writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
                writer.flush().map_err(stream_error)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsBuilder;
    use crate::core_types::FileContent;
    use crate::profile::Profile;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn text_file(path: &str, content: &str) -> FileRecord {
        let mut record = FileRecord::new(
            path.into(),
            PathBuf::from("/scan/project").join(path),
            content.len() as u64,
            None,
        );
        record.content = Some(FileContent::Text(content.into()));
        record
    }

    fn value_with(
        configure: impl FnOnce(OptionsBuilder) -> OptionsBuilder,
        files: Vec<FileRecord>,
    ) -> PipelineValue {
        let options = configure(OptionsBuilder::new("/scan/project").without_env_overrides())
            .build()
            .unwrap();
        let mut value = PipelineValue::new(Arc::new(options), Arc::new(Profile::everything()));
        value.files = files;
        value
    }

    #[test]
    fn fence_grows_past_embedded_backticks() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("code ```rust"), "````");
        assert_eq!(fence_for("````"), "`````");
    }

    #[test]
    fn front_matter_counts_match() {
        let value = value_with(
            |b| b,
            vec![text_file("a.txt", "12345"), text_file("b.txt", "678")],
        );
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.starts_with("---\n"));
        assert!(md.contains("tool: copytree"));
        assert!(md.contains("file_count: 2"));
        assert!(md.contains("total_size_bytes: 8"));
        assert!(md.contains("# CopyTree Export — project"));
    }

    #[test]
    fn file_sections_have_markers_heading_and_fence() {
        let value = value_with(|b| b, vec![text_file("src/main.rs", "fn main() {}\n")]);
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.contains("<!-- copytree:file"));
        assert!(md.contains(r#""path":"src/main.rs""#));
        assert!(md.contains("### @src/main.rs"));
        assert!(md.contains("```rs\nfn main() {}\n```"));
        assert!(md.contains("<!-- copytree:end src/main.rs -->"));
    }

    #[test]
    fn embedded_fences_are_outfenced() {
        let value = value_with(
            |b| b,
            vec![text_file("README.md", "usage:\n```sh\nls\n```\n")],
        );
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.contains("````md\n"));
        assert!(md.contains("\n````\n"));
    }

    #[test]
    fn base64_files_declare_the_transfer_encoding() {
        let mut record = text_file("blob.bin", "AAEC/w==");
        record.is_binary = true;
        record.encoding = ContentEncoding::Base64;
        let value = value_with(|b| b, vec![record]);
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.contains("Content-Transfer: base64"));
    }

    #[test]
    fn instructions_render_in_front_matter_and_body() {
        let value = value_with(
            |b| b.instructions(Some("Review carefully.\nThanks.")),
            vec![text_file("a.txt", "x")],
        );
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.contains("instructions: |\n  Review carefully.\n  Thanks."));
        assert!(md.contains("## Instructions\n\nReview carefully.\nThanks.\n"));
    }

    #[test]
    fn tree_only_skips_file_sections() {
        let value = value_with(|b| b.only_tree(true), vec![text_file("a.txt", "x")]);
        let md = MarkdownFormatter.format(&value).unwrap();
        assert!(md.contains("## Directory Tree"));
        assert!(!md.contains("copytree:file"));
    }

    #[test]
    fn streaming_matches_batch_modulo_timestamp() {
        let value = value_with(|b| b, vec![text_file("a.txt", "one")]);
        let batch = MarkdownFormatter.format(&value).unwrap();
        let mut streamed = Vec::new();
        MarkdownFormatter.stream(&value, &mut streamed).unwrap();
        let streamed = String::from_utf8(streamed).unwrap();
        let strip = |s: &str| {
            s.lines()
                .filter(|l| !l.starts_with("generated:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(strip(&batch), strip(&streamed));
    }
}
