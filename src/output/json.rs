//! JSON document formatter, batch and streaming.

use super::line_numbers::with_line_numbers;
use super::{format_mtime, generated_timestamp, stream_error, total_size, DocumentFormatter};
use crate::core_types::FileRecord;
use crate::errors::{Error, Result};
use crate::pipeline::PipelineValue;
use serde_json::{json, Map, Value};
use std::io::Write;

/// Emits one object: `{directory, metadata{...}, files[...]}`. In
/// tree-only mode the per-file `content` key is omitted.
pub struct JsonFormatter;

fn metadata_value(value: &PipelineValue) -> Value {
    let mut metadata = Map::new();
    metadata.insert("generated".into(), json!(generated_timestamp()));
    metadata.insert("fileCount".into(), json!(value.files.len()));
    metadata.insert("totalSize".into(), json!(total_size(value)));
    metadata.insert("profile".into(), json!(value.profile.name));
    metadata.insert(
        "directoryStructure".into(),
        json!(super::tree::render_tree(&value.files, false)),
    );
    if let Some(instructions) = &value.instructions {
        metadata.insert("instructions".into(), json!(instructions));
    }
    if let Some(git) = &value.git {
        metadata.insert(
            "git".into(),
            serde_json::to_value(git).unwrap_or(Value::Null),
        );
    }
    Value::Object(metadata)
}

fn file_value(record: &FileRecord, line_numbers: bool, only_tree: bool) -> Value {
    let mut file = Map::new();
    file.insert("path".into(), json!(record.path));
    file.insert("size".into(), json!(record.size));
    if let Some(mtime) = format_mtime(record.modified) {
        file.insert("modified".into(), json!(mtime));
    }
    file.insert("isBinary".into(), json!(record.is_binary));
    file.insert("encoding".into(), json!(record.encoding.as_str()));
    if let Some(status) = &record.git_status {
        file.insert("gitStatus".into(), json!(status));
    }
    if record.truncated {
        file.insert("truncated".into(), json!(true));
        if let Some(original) = record.original_length {
            file.insert("originalLength".into(), json!(original));
        }
    }
    if record.secrets_redacted {
        file.insert("secretsRedacted".into(), json!(record.secrets_count));
    }
    if !only_tree {
        let content = record.content_str().unwrap_or("");
        let content = if line_numbers {
            with_line_numbers(content)
        } else {
            content.to_string()
        };
        file.insert("content".into(), json!(content));
    }
    Value::Object(file)
}

impl DocumentFormatter for JsonFormatter {
    fn format(&self, value: &PipelineValue) -> Result<String> {
        let only_tree = value.options.render.only_tree;
        let line_numbers = value.options.render.line_numbers;
        let document = json!({
            "directory": value.base_path().display().to_string(),
            "metadata": metadata_value(value),
            "files": value
                .files
                .iter()
                .map(|record| file_value(record, line_numbers, only_tree))
                .collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&document)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| Error::Internal(format!("JSON serialization: {e}")))
    }

    fn stream(&self, value: &PipelineValue, writer: &mut dyn Write) -> Result<()> {
        let only_tree = value.options.render.only_tree;
        let line_numbers = value.options.render.line_numbers;

        let directory = serde_json::to_string(&value.base_path().display().to_string())
            .map_err(|e| Error::Internal(e.to_string()))?;
        let metadata = serde_json::to_string(&metadata_value(value))
            .map_err(|e| Error::Internal(e.to_string()))?;
        write!(writer, "{{\"directory\":{directory},\"metadata\":{metadata},\"files\":[")
            .map_err(stream_error)?;
        writer.flush().map_err(stream_error)?;

        for (index, record) in value.files.iter().enumerate() {
            let chunk = serde_json::to_string(&file_value(record, line_numbers, only_tree))
                .map_err(|e| Error::Internal(e.to_string()))?;
            if index > 0 {
                writer.write_all(b",").map_err(stream_error)?;
            }
            writer.write_all(chunk.as_bytes()).map_err(stream_error)?;
            writer.flush().map_err(stream_error)?;
        }

        writer.write_all(b"]}\n").map_err(stream_error)?;
        writer.flush().map_err(stream_error)
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
            PathBuf::from("/scan").join(path),
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
        let options = configure(OptionsBuilder::new("/scan").without_env_overrides())
            .build()
            .unwrap();
        let mut value = PipelineValue::new(Arc::new(options), Arc::new(Profile::everything()));
        value.files = files;
        value
    }

    #[test]
    fn document_parses_and_carries_files() {
        let value = value_with(|b| b, vec![text_file("a.txt", "alpha")]);
        let text = JsonFormatter.format(&value).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["directory"], "/scan");
        assert_eq!(parsed["metadata"]["fileCount"], 1);
        assert_eq!(parsed["files"][0]["path"], "a.txt");
        assert_eq!(parsed["files"][0]["content"], "alpha");
        assert!(parsed["metadata"]["directoryStructure"]
            .as_str()
            .unwrap()
            .contains("a.txt"));
    }

    #[test]
    fn tree_only_omits_content() {
        let value = value_with(|b| b.only_tree(true), vec![text_file("a.txt", "alpha")]);
        let text = JsonFormatter.format(&value).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert!(parsed["files"][0].get("content").is_none());
    }

    #[test]
    fn empty_set_is_valid_json() {
        let value = value_with(|b| b, Vec::new());
        let text = JsonFormatter.format(&value).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["metadata"]["fileCount"], 0);
        assert_eq!(parsed["files"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn streamed_output_is_parseable_and_equivalent() {
        let value = value_with(
            |b| b,
            vec![text_file("a.txt", "one"), text_file("b.txt", "two")],
        );
        let mut streamed = Vec::new();
        JsonFormatter.stream(&value, &mut streamed).unwrap();
        let parsed: Value = serde_json::from_slice(&streamed).unwrap();
        assert_eq!(parsed["files"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["files"][1]["content"], "two");
    }

    #[test]
    fn truncation_metadata_is_surfaced() {
        let mut record = text_file("big.txt", "clipped");
        record.truncated = true;
        record.original_length = Some(100);
        let value = value_with(|b| b, vec![record]);
        let parsed: Value =
            serde_json::from_str(&JsonFormatter.format(&value).unwrap()).unwrap();
        assert_eq!(parsed["files"][0]["truncated"], true);
        assert_eq!(parsed["files"][0]["originalLength"], 100);
    }
}
