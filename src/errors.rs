//! Defines the crate-wide error taxonomy.
//!
//! Recoverable conditions (one-file failures, malformed ignore lines, git
//! hiccups) are handled locally with a warning and never surface here. The
//! variants below are the errors that can end a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a `copytree` run.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid option combination or value, detected before the pipeline starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure with path context.
    #[error("I/O error accessing '{path}': {source}")]
    Io {
        /// The path that caused the I/O error.
        path: String,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// The scan root does not exist or is not a directory.
    #[error("not a scannable path: {0}")]
    NotAPath(PathBuf),

    /// A git query failed. `GitFilter` demotes itself to a no-op on this;
    /// it only escapes when raised outside that stage.
    #[error("git error: {0}")]
    Git(String),

    /// Secrets were found while `fail_on_secrets` is set. Carries a
    /// sanitized summary only; raw secret text is never attached.
    #[error("secrets detected in {count} location(s): {summary}")]
    SecretsDetected {
        /// Number of findings across all files.
        count: usize,
        /// Sanitized `file:line rule` lines, newline-separated.
        summary: String,
    },

    /// Cache read/write failure. Treated as a miss where it occurs; this
    /// variant exists for cache maintenance paths and tests.
    #[error("cache error: {0}")]
    Cache(String),

    /// The run was cancelled (Ctrl+C or a caller-supplied token).
    #[error("operation cancelled")]
    Cancelled,

    /// A stage failed and no recovery hook produced a replacement value.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        /// Name of the failing stage.
        stage: &'static str,
        /// The error the stage returned.
        #[source]
        source: Box<Error>,
    },

    /// An external subprocess (secret scanner, transformer command) failed
    /// or exceeded its timeout.
    #[error("external command '{command}' failed: {reason}")]
    Subprocess {
        /// The program that was invoked.
        command: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// Bug or invariant violation; aborts and is reported with context.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wraps a `std::io::Error` with the path it occurred on.
pub fn io_error_with_path<P: AsRef<std::path::Path>>(source: std::io::Error, path: P) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

impl Error {
    /// True for errors that end the run because the user asked them to
    /// (cancellation, fail-on-secrets) rather than because something broke.
    pub fn is_user_requested_abort(&self) -> bool {
        matches!(self, Error::Cancelled | Error::SecretsDetected { .. })
    }
}
