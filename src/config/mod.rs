//! Defines the immutable `Options` snapshot consumed by the pipeline.
//!
//! All CLI, profile, and environment inputs are flattened into one struct
//! before the first stage runs; no stage reads configuration dynamically.
//! Instances are built through [`OptionsBuilder`], which validates
//! combinations and applies environment overrides.

use crate::constants::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_SAMPLE_BYTES, DEFAULT_SECRETS_CONCURRENCY,
    DEFAULT_SECRETS_MAX_FILE_BYTES, DEFAULT_SUBPROCESS_TIMEOUT_SECS, NON_PRINTABLE_THRESHOLD,
};
use crate::errors::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use builder::OptionsBuilder;

mod builder;
mod env;

/// How binary files are represented in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryPolicy {
    /// Replace content with a fixed placeholder string, keep the record.
    #[default]
    Placeholder,
    /// Drop the record entirely.
    Skip,
    /// Load fully and base64-encode.
    Base64,
    /// Keep the record with empty content and an exclusion note.
    Comment,
    /// Load convertible categories fully and hand them to the transform
    /// stage; everything else falls back to the placeholder.
    Convert,
}

impl FromStr for BinaryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placeholder" => Ok(BinaryPolicy::Placeholder),
            "skip" => Ok(BinaryPolicy::Skip),
            "base64" => Ok(BinaryPolicy::Base64),
            "comment" => Ok(BinaryPolicy::Comment),
            "convert" => Ok(BinaryPolicy::Convert),
            other => Err(Error::Config(format!("unknown binary policy '{other}'"))),
        }
    }
}

/// Which secret-detection backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretsEngine {
    /// Regex rules compiled into the binary.
    #[default]
    Builtin,
    /// A gitleaks-style external scanner.
    External,
    /// Union of both backends, merged by span.
    Both,
    /// External when its binary is on PATH, builtin otherwise.
    Auto,
    /// Secrets guard disabled entirely.
    Off,
}

impl FromStr for SecretsEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(SecretsEngine::Builtin),
            "external" => Ok(SecretsEngine::External),
            "both" => Ok(SecretsEngine::Both),
            "auto" => Ok(SecretsEngine::Auto),
            "off" => Ok(SecretsEngine::Off),
            other => Err(Error::Config(format!("unknown secrets engine '{other}'"))),
        }
    }
}

/// How detected secret spans are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedactionMode {
    /// Replace the span with `<REDACTED:RuleID>`.
    #[default]
    Typed,
    /// Replace the span with `*` of the same length.
    LengthPreserving,
    /// Do not rewrite; exclude the whole file instead.
    Off,
}

impl FromStr for RedactionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typed" => Ok(RedactionMode::Typed),
            "length-preserving" => Ok(RedactionMode::LengthPreserving),
            "off" => Ok(RedactionMode::Off),
            other => Err(Error::Config(format!("unknown redaction mode '{other}'"))),
        }
    }
}

/// Key used by the sort stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Path,
    Size,
    Modified,
    Name,
    Extension,
    Depth,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(SortKey::Path),
            "size" => Ok(SortKey::Size),
            "modified" => Ok(SortKey::Modified),
            "name" => Ok(SortKey::Name),
            "extension" => Ok(SortKey::Extension),
            "depth" => Ok(SortKey::Depth),
            other => Err(Error::Config(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(Error::Config(format!("unknown sort order '{other}'"))),
        }
    }
}

/// The document shape to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
    Markdown,
    Tree,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xml" => Ok(OutputFormat::Xml),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "tree" => Ok(OutputFormat::Tree),
            other => Err(Error::Config(format!("unknown output format '{other}'"))),
        }
    }
}

impl OutputFormat {
    /// Stable name used in metadata blocks.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Tree => "tree",
        }
    }
}

/// Where the rendered document goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputDestination {
    /// Write the assembled document to standard output.
    #[default]
    Stdout,
    /// Write to the given file.
    File(PathBuf),
    /// Write incrementally to standard output, flushing per file.
    Stream,
}

/// Settings that control the walker.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Include dotfiles and dot-directories.
    pub include_hidden: bool,
    /// Maximum directory depth below the root (`None` = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links (with inode revisit protection).
    pub follow_symlinks: bool,
    /// Honor the root `.gitignore`.
    pub use_gitignore: bool,
    /// Extra ignore rules seeded into the built-in global layer.
    pub global_excludes: Vec<String>,
    /// Skip files larger than this many bytes.
    pub max_file_size: Option<u64>,
    /// Worker threads for the parallel walk.
    pub walker_threads: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            max_depth: None,
            follow_symlinks: false,
            use_gitignore: true,
            global_excludes: Vec::new(),
            max_file_size: None,
            walker_threads: 4,
        }
    }
}

/// Pattern sets applied by the filter stages, on top of the profile.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Inclusion gate; when non-empty, a file must match one of these.
    pub filter: Vec<String>,
    /// Drop any match.
    pub exclude: Vec<String>,
    /// Patterns protected from all filter stages.
    pub always: Vec<String>,
    /// Second-pass patterns evaluated with all ignores bypassed.
    pub force_include: Vec<String>,
}

/// Git-stage activation flags.
#[derive(Debug, Clone, Default)]
pub struct GitOptions {
    /// Keep only files with index or worktree changes.
    pub modified: bool,
    /// Keep only files changed since this revision.
    pub changed: Option<String>,
    /// Annotate surviving files with their status letters.
    pub with_git_status: bool,
}

impl GitOptions {
    /// True when any git work is requested.
    pub fn is_active(&self) -> bool {
        self.modified || self.changed.is_some() || self.with_git_status
    }
}

/// File-loading stage settings.
#[derive(Debug, Clone)]
pub struct LoadingOptions {
    /// Policy for binary files.
    pub binary_policy: BinaryPolicy,
    /// Bytes sniffed for binary detection.
    pub sample_bytes: usize,
    /// Non-printable ratio above which a sample is binary.
    pub non_printable_threshold: f64,
    /// Parallelism bound for loading.
    pub concurrency: usize,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            binary_policy: BinaryPolicy::default(),
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            non_printable_threshold: NON_PRINTABLE_THRESHOLD,
            concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Secrets-guard settings.
#[derive(Debug, Clone)]
pub struct SecretsOptions {
    pub engine: SecretsEngine,
    pub redaction: RedactionMode,
    /// Glob patterns for files the guard skips entirely.
    pub allowlist: Vec<String>,
    /// Files larger than this are not scanned.
    pub max_file_bytes: u64,
    /// Abort the pipeline when any finding exists.
    pub fail_on_secrets: bool,
    /// Path or name of the external scanner binary.
    pub scanner_bin: String,
    /// Parallelism bound for scanning.
    pub concurrency: usize,
}

impl Default for SecretsOptions {
    fn default() -> Self {
        Self {
            engine: SecretsEngine::default(),
            redaction: RedactionMode::default(),
            allowlist: Vec::new(),
            max_file_bytes: DEFAULT_SECRETS_MAX_FILE_BYTES,
            fail_on_secrets: false,
            scanner_bin: "gitleaks".to_string(),
            concurrency: DEFAULT_SECRETS_CONCURRENCY,
        }
    }
}

/// Transform-stage settings.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Worker-pool size for per-file dispatch.
    pub max_concurrency: usize,
    /// Disable cache reads and writes; transformers still run.
    pub no_cache: bool,
    /// TTL applied to newly written cache entries.
    pub cache_ttl: Duration,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            no_cache: false,
            cache_ttl: Duration::from_secs(crate::constants::DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Ordering and budget settings applied near the end of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct LimitOptions {
    /// Sort key.
    pub sort_key: SortKey,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Global character budget (Unicode code points).
    pub char_limit: Option<usize>,
    /// Secondary cap on total content bytes.
    pub max_total_bytes: Option<u64>,
    /// Keep only the first N files after sorting.
    pub head: Option<usize>,
}

/// Rendering settings.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub destination: OutputDestination,
    /// Prefix content lines with 1-based line numbers.
    pub line_numbers: bool,
    /// Emit structure only, no file contents.
    pub only_tree: bool,
    /// Show per-file sizes in tree and dry-run listings.
    pub show_size: bool,
    /// Suppress the instructions block.
    pub no_instructions: bool,
    /// Free-form text prepended to the document.
    pub instructions: Option<String>,
}

/// The immutable configuration snapshot for one run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Absolute root directory of the scan.
    pub base_path: PathBuf,
    /// Name of the resolved profile (metadata only; resolution is the
    /// profile collaborator's job).
    pub profile_name: String,
    pub discovery: DiscoveryOptions,
    pub filtering: FilterOptions,
    pub git: GitOptions,
    pub loading: LoadingOptions,
    pub secrets: SecretsOptions,
    pub transform: TransformOptions,
    pub limit: LimitOptions,
    pub render: RenderOptions,
    /// Print the would-be file list instead of contents.
    pub dry_run: bool,
    /// Print per-stage statistics to stderr after the run.
    pub info: bool,
    /// Timeout applied to external subprocesses.
    pub subprocess_timeout: Duration,
    /// Continue past unrecovered stage errors (degraded output).
    pub continue_on_error: bool,
}

impl Options {
    /// Starts a builder rooted at the given path.
    pub fn builder<P: Into<PathBuf>>(base_path: P) -> OptionsBuilder {
        OptionsBuilder::new(base_path)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            profile_name: "default".to_string(),
            discovery: DiscoveryOptions::default(),
            filtering: FilterOptions::default(),
            git: GitOptions::default(),
            loading: LoadingOptions::default(),
            secrets: SecretsOptions::default(),
            transform: TransformOptions::default(),
            limit: LimitOptions::default(),
            render: RenderOptions::default(),
            dry_run: false,
            info: false,
            subprocess_timeout: Duration::from_secs(DEFAULT_SUBPROCESS_TIMEOUT_SECS),
            continue_on_error: false,
        }
    }
}
