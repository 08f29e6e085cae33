//! XML document formatter (`ct:` namespace), batch and streaming.

use super::line_numbers::with_line_numbers;
use super::{
    format_mtime, generated_timestamp, stream_error, total_size, DocumentFormatter,
};
use crate::constants::XML_NAMESPACE;
use crate::core_types::{ContentEncoding, FileRecord};
use crate::errors::Result;
use crate::pipeline::PipelineValue;
use std::fmt::Write as _;
use std::io::Write;

/// Emits `<ct:directory>` with a metadata block and one `<ct:file>` per
/// record, content in CDATA.
pub struct XmlFormatter;

/// Escapes an attribute or text value.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Wraps content in CDATA, splitting any embedded `]]>` so the section
/// never terminates early.
fn cdata(content: &str) -> String {
    format!("<![CDATA[{}]]>", content.replace("]]>", "]]]]><![CDATA[>"))
}

fn write_header(out: &mut String, value: &PipelineValue) {
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<ct:directory xmlns:ct="{XML_NAMESPACE}" path="{}">"#,
        escape(&value.base_path().display().to_string())
    );
    let _ = writeln!(out, "  <ct:metadata>");
    let _ = writeln!(out, "    <ct:generated>{}</ct:generated>", generated_timestamp());
    let _ = writeln!(out, "    <ct:fileCount>{}</ct:fileCount>", value.files.len());
    let _ = writeln!(out, "    <ct:totalSize>{}</ct:totalSize>", total_size(value));
    let _ = writeln!(out, "    <ct:profile>{}</ct:profile>", escape(&value.profile.name));
    if let Some(git) = &value.git {
        let mut attrs = String::new();
        if let Some(branch) = &git.branch {
            let _ = write!(attrs, r#" branch="{}""#, escape(branch));
        }
        if let Some(hash) = &git.last_commit_hash {
            let _ = write!(attrs, r#" commit="{}""#, escape(hash));
        }
        let _ = write!(attrs, r#" dirty="{}""#, git.dirty);
        let subject = git.last_commit_subject.as_deref().unwrap_or("");
        let _ = writeln!(out, "    <ct:git{attrs}>{}</ct:git>", escape(subject));
    }
    let _ = writeln!(out, "  </ct:metadata>");
    if let Some(instructions) = &value.instructions {
        let _ = writeln!(out, "  <ct:instructions>{}</ct:instructions>", cdata(instructions));
    }
    let _ = writeln!(out, "  <ct:files>");
}

fn write_file(out: &mut String, record: &FileRecord, line_numbers: bool, only_tree: bool) {
    let mut attrs = format!(
        r#" path="@{}" size="{}""#,
        escape(&record.path),
        record.size
    );
    if let Some(mtime) = format_mtime(record.modified) {
        let _ = write!(attrs, r#" modified="{mtime}""#);
    }
    if record.is_binary {
        let _ = write!(attrs, r#" binary="true""#);
    }
    if record.encoding != ContentEncoding::Utf8 {
        let _ = write!(attrs, r#" encoding="{}""#, record.encoding.as_str());
    }
    if let Some(status) = &record.git_status {
        let _ = write!(attrs, r#" gitStatus="{}""#, escape(status));
    }
    if record.truncated {
        let _ = write!(attrs, r#" truncated="true""#);
        if let Some(original) = record.original_length {
            let _ = write!(attrs, r#" originalLength="{original}""#);
        }
    }

    if only_tree {
        let _ = writeln!(out, "    <ct:file{attrs}/>");
        return;
    }

    let content = record.content_str().unwrap_or("");
    let content = if line_numbers {
        with_line_numbers(content)
    } else {
        content.to_string()
    };
    let _ = writeln!(out, "    <ct:file{attrs}>{}</ct:file>", cdata(&content));
}

fn write_footer(out: &mut String) {
    let _ = writeln!(out, "  </ct:files>");
    let _ = writeln!(out, "</ct:directory>");
}

impl DocumentFormatter for XmlFormatter {
    fn format(&self, value: &PipelineValue) -> Result<String> {
        let mut out = String::new();
        write_header(&mut out, value);
        for record in &value.files {
            write_file(
                &mut out,
                record,
                value.options.render.line_numbers,
                value.options.render.only_tree,
            );
        }
        write_footer(&mut out);
        Ok(out)
    }

    fn stream(&self, value: &PipelineValue, writer: &mut dyn Write) -> Result<()> {
        let mut chunk = String::new();
        write_header(&mut chunk, value);
        writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
        writer.flush().map_err(stream_error)?;

        for record in &value.files {
            chunk.clear();
            write_file(
                &mut chunk,
                record,
                value.options.render.line_numbers,
                value.options.render.only_tree,
            );
            writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
            writer.flush().map_err(stream_error)?;
        }

        chunk.clear();
        write_footer(&mut chunk);
        writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
        writer.flush().map_err(stream_error)
    }
}
