//! Fixed strings, limits, and defaults shared across the pipeline.

/// Name of the per-directory ignore file that pushes a new layer onto the
/// walker's ignore stack.
pub const IGNORE_FILE_NAME: &str = ".copytreeignore";

/// Directories that are always pruned, regardless of configuration.
pub const DANGEROUS_DIRS: &[&str] = &[".git", "node_modules"];

/// Bytes sniffed from the head of a file for binary detection.
pub const DEFAULT_SAMPLE_BYTES: usize = 8192;

/// A sample whose non-printable byte ratio exceeds this is treated as binary.
pub const NON_PRINTABLE_THRESHOLD: f64 = 0.3;

/// Content substituted for binary files under the `placeholder` policy.
pub const BINARY_PLACEHOLDER: &str = "[binary file content not included]";

/// Content substituted when a text file cannot be decoded.
pub const DECODE_ERROR_SENTINEL: &str = "[unreadable: invalid text encoding]";

/// Appended to the last (partially included) file by the char-limit stage.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Prefix of the sentinel that replaces content when a transformer fails.
pub const TRANSFORM_ERROR_PREFIX: &str = "[transform error: ";

/// XML namespace for the `ct:` prefix.
pub const XML_NAMESPACE: &str = "urn:copytree";

/// Default worker-pool size for the transform stage.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default parallelism for the secrets guard.
pub const DEFAULT_SECRETS_CONCURRENCY: usize = 4;

/// Largest file the secrets guard will scan, in bytes.
pub const DEFAULT_SECRETS_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Default time-to-live for cached heavy-transform results.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Default timeout for external subprocesses (secret scanner, command
/// transformers).
pub const DEFAULT_SUBPROCESS_TIMEOUT_SECS: u64 = 30;

/// Minimum width of the line-number gutter (`%4d: `).
pub const LINE_NUMBER_WIDTH: usize = 4;

/// Extensions treated as binary without sniffing, lowercase.
pub const KNOWN_BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "tiff", "heic", "pdf", "doc", "docx",
    "xls", "xlsx", "ppt", "pptx", "odt", "ods", "zip", "tar", "gz", "bz2", "xz", "zst", "7z",
    "rar", "jar", "war", "mp3", "wav", "flac", "ogg", "m4a", "mp4", "mkv", "avi", "mov", "webm",
    "exe", "dll", "so", "dylib", "bin", "o", "a", "class", "pyc", "wasm", "ttf", "otf", "woff",
    "woff2", "eot", "sqlite", "db",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_extension_list_is_lowercase() {
        for ext in KNOWN_BINARY_EXTENSIONS {
            assert_eq!(*ext, ext.to_lowercase(), "extension {ext} not lowercase");
        }
    }

    #[test]
    fn dangerous_dirs_include_vcs_and_node_modules() {
        assert!(DANGEROUS_DIRS.contains(&".git"));
        assert!(DANGEROUS_DIRS.contains(&"node_modules"));
    }
}
