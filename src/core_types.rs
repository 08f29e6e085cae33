//! Defines core data structures threaded through the pipeline.
//!
//! `FileRecord` is the unit every stage consumes and produces; the
//! surrounding types describe its content, git context, and the cumulative
//! statistics the stages report.

use crate::constants::KNOWN_BINARY_EXTENSIONS;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Content of a file in flight.
///
/// Text is the common case. `Bytes` holds raw content for binary files that
/// are kept whole (base64 policy before encoding, or convertible binaries
/// awaiting a transformer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Decoded (or already transformed) textual content.
    Text(String),
    /// Raw bytes, not yet representable as text.
    Bytes(Vec<u8>),
}

impl FileContent {
    /// Returns the textual content, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            FileContent::Bytes(_) => None,
        }
    }

    /// Number of Unicode code points for text, bytes for raw content.
    pub fn char_count(&self) -> usize {
        match self {
            FileContent::Text(s) => s.chars().count(),
            FileContent::Bytes(b) => b.len(),
        }
    }

    /// The raw bytes backing this content.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Bytes(b) => b,
        }
    }
}

/// How `FileRecord::content` is encoded for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentEncoding {
    /// Plain UTF-8 text.
    Utf8,
    /// Base64-encoded binary content.
    Base64,
    /// Raw binary, not included in textual output.
    Binary,
}

impl ContentEncoding {
    /// Stable string used in output attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Utf8 => "utf-8",
            ContentEncoding::Base64 => "base64",
            ContentEncoding::Binary => "binary",
        }
    }
}

/// Broad classification of a binary file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryCategory {
    Image,
    Pdf,
    Document,
    Spreadsheet,
    Archive,
    Audio,
    Video,
    Executable,
    Font,
    Other,
}

impl BinaryCategory {
    /// Classifies a path by extension. Returns `Other` for unknown binary
    /// types; callers decide binary-ness separately.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "ico" | "tiff" | "heic" => {
                BinaryCategory::Image
            }
            "pdf" => BinaryCategory::Pdf,
            "doc" | "docx" | "odt" | "ppt" | "pptx" => BinaryCategory::Document,
            "xls" | "xlsx" | "ods" => BinaryCategory::Spreadsheet,
            "zip" | "tar" | "gz" | "bz2" | "xz" | "zst" | "7z" | "rar" | "jar" | "war" => {
                BinaryCategory::Archive
            }
            "mp3" | "wav" | "flac" | "ogg" | "m4a" => BinaryCategory::Audio,
            "mp4" | "mkv" | "avi" | "mov" | "webm" => BinaryCategory::Video,
            "exe" | "dll" | "so" | "dylib" | "bin" | "o" | "a" | "class" | "pyc" | "wasm" => {
                BinaryCategory::Executable
            }
            "ttf" | "otf" | "woff" | "woff2" | "eot" => BinaryCategory::Font,
            _ => BinaryCategory::Other,
        }
    }

    /// Whether this category has a known document conversion (handled by a
    /// transformer under the `convert` policy).
    pub fn is_convertible(&self) -> bool {
        matches!(
            self,
            BinaryCategory::Pdf
                | BinaryCategory::Document
                | BinaryCategory::Spreadsheet
                | BinaryCategory::Image
        )
    }

    /// Lowercase label for display.
    pub fn label(&self) -> &'static str {
        match self {
            BinaryCategory::Image => "image",
            BinaryCategory::Pdf => "pdf",
            BinaryCategory::Document => "document",
            BinaryCategory::Spreadsheet => "spreadsheet",
            BinaryCategory::Archive => "archive",
            BinaryCategory::Audio => "audio",
            BinaryCategory::Video => "video",
            BinaryCategory::Executable => "executable",
            BinaryCategory::Font => "font",
            BinaryCategory::Other => "binary",
        }
    }
}

/// True if the extension alone marks the path as binary.
pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| KNOWN_BINARY_EXTENSIONS.contains(&e.as_str()))
}

/// One file in flight through the pipeline.
///
/// Created by discovery (or the external-source merge), annotated in place
/// by later stages, and consumed by the formatter. `path` is the canonical
/// identity: POSIX separators, relative to the scan root, never empty,
/// never absolute, no `..` segments.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// POSIX-normalized path relative to the scan root.
    pub path: String,
    /// Canonical absolute filesystem path.
    pub absolute_path: PathBuf,
    /// Size in bytes at traversal time.
    pub size: u64,
    /// Modification time at traversal time, when the platform reports one.
    pub modified: Option<SystemTime>,
    /// Content, absent until the loading stage runs.
    pub content: Option<FileContent>,
    /// Set by the loading stage.
    pub is_binary: bool,
    /// Encoding of `content` for output purposes.
    pub encoding: ContentEncoding,
    /// Binary classification, when `is_binary`.
    pub binary_category: Option<BinaryCategory>,

    // Annotations accumulated by stages.
    /// Protected from every filter stage.
    pub always_include: bool,
    /// Git status letter (`M`, `A`, `??`, ...) when requested.
    pub git_status: Option<String>,
    /// True once the secrets guard rewrote any span.
    pub secrets_redacted: bool,
    /// Number of redacted findings in this file.
    pub secrets_count: usize,
    /// True when the char-limit stage cut this file short.
    pub truncated: bool,
    /// Code-point length before truncation.
    pub original_length: Option<usize>,
    /// True when this record came from an external source merge.
    pub is_external: bool,
    /// Source identifier for external records.
    pub external_source: Option<String>,
    /// True once a transformer rewrote the content.
    pub transformed: bool,
    /// One-file failure note (transform error, decode failure).
    pub error: Option<String>,
    /// Reason the content was withheld (binary `comment` policy).
    pub excluded_reason: Option<String>,
}

impl FileRecord {
    /// Creates a record as discovery produces it: metadata only, no content.
    pub fn new(
        path: String,
        absolute_path: PathBuf,
        size: u64,
        modified: Option<SystemTime>,
    ) -> Self {
        Self {
            path,
            absolute_path,
            size,
            modified,
            content: None,
            is_binary: false,
            encoding: ContentEncoding::Utf8,
            binary_category: None,
            always_include: false,
            git_status: None,
            secrets_redacted: false,
            secrets_count: 0,
            truncated: false,
            original_length: None,
            is_external: false,
            external_source: None,
            transformed: false,
            error: None,
            excluded_reason: None,
        }
    }

    /// Textual content, if loaded and text.
    pub fn content_str(&self) -> Option<&str> {
        self.content.as_ref().and_then(FileContent::as_text)
    }

    /// Code points of content, 0 when unloaded.
    pub fn char_count(&self) -> usize {
        self.content.as_ref().map_or(0, FileContent::char_count)
    }

    /// File extension, lowercased, empty when absent.
    pub fn extension(&self) -> String {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }

    /// Path depth (number of separators).
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Basename of the record's path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Git context attached to the pipeline value when a git stage runs.
#[derive(Debug, Clone, Serialize)]
pub struct GitMetadata {
    /// Current branch name, if HEAD is on one.
    pub branch: Option<String>,
    /// Abbreviated hash of the last commit.
    pub last_commit_hash: Option<String>,
    /// Subject line of the last commit.
    pub last_commit_subject: Option<String>,
    /// True when the worktree or index has uncommitted changes.
    pub dirty: bool,
    /// Which git filter produced this metadata (`modified`, `changed`, `status`).
    pub filter: Option<String>,
}

/// A sanitized secret finding: everything needed for reporting, nothing
/// that could reproduce the secret.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SanitizedFinding {
    /// Relative path of the file.
    pub file: String,
    /// 1-based line of the finding.
    pub line: usize,
    /// Identifier of the rule that matched.
    pub rule: String,
}

/// Counters reported by the secrets guard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretsStats {
    pub files_scanned: usize,
    pub secrets_redacted: usize,
    pub files_excluded: usize,
    pub findings: Vec<SanitizedFinding>,
}

/// Cumulative per-stage counters carried by the pipeline value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub discovered: usize,
    pub force_included: usize,
    pub external_merged: usize,
    pub excluded_by_profile: usize,
    pub git_filtered_out: usize,
    pub loaded: usize,
    pub binaries_detected: usize,
    pub binaries_skipped: usize,
    pub secrets_guard: SecretsStats,
    pub transformed: usize,
    pub transform_errors: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub duplicates_dropped: usize,
    pub truncated_files: usize,
    pub skipped_by_limit: usize,
    pub head_dropped: usize,
}
