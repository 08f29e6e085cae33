//! Transformer interface, traits metadata, and the selection registry.
//!
//! A transformer rewrites one file's content. The registry maps a file to
//! at most one transformer through a priority-ordered chain: exact
//! extension match, then MIME type, then a path regex, then pass-through.
//! Profiles enable, disable, and parameterize transformers by name;
//! AI-backed implementations plug in through the same trait.

use crate::core_types::FileRecord;
use crate::errors::Result;
use dyn_clone::DynClone;
use log::debug;
use regex::Regex;

pub mod cache;
pub mod plan;

mod builtin;

pub use builtin::{BinaryInfo, ExternalCommand, FirstLines};

/// Data kinds a transformer consumes or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataKind {
    #[default]
    Text,
    Binary,
    Any,
}

impl DataKind {
    /// Whether a value of kind `produced` can feed an input of this kind.
    pub fn accepts(&self, produced: DataKind) -> bool {
        matches!(self, DataKind::Any)
            || produced == DataKind::Any
            || *self == produced
    }
}

/// An external requirement a transformer declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformerDependency {
    /// An executable that must be on PATH.
    Binary(String),
    /// Network access.
    Network,
}

/// Resource requirements beyond dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Needs an API key at run time.
    pub api_key: bool,
    /// Needs network access.
    pub network: bool,
    /// Approximate peak memory in bytes, when meaningfully large.
    pub memory_hint: Option<u64>,
}

/// Static traits a transformer declares about itself.
#[derive(Debug, Clone, Default)]
pub struct TransformerTraits {
    pub input: DataKind,
    pub output: DataKind,
    /// Re-running on its own output is a no-op.
    pub idempotent: bool,
    /// Must keep its position relative to other transformers.
    pub order_sensitive: bool,
    /// Expensive enough to cache and show progress for.
    pub heavy: bool,
    /// Accumulates state across files; flushed once per stage run.
    pub stateful: bool,
    pub dependencies: Vec<TransformerDependency>,
    /// Names of transformers this one cannot share a plan with.
    pub conflicts_with: Vec<String>,
    pub requirements: Requirements,
}

/// What a transformer did with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Pass-through; nothing changed.
    Unchanged,
    /// Content replaced; the record is marked `transformed`.
    Applied,
    /// Content replaced but the record is not marked (counted only).
    AppliedUnmarked,
}

/// Rewrites one file's content.
pub trait Transformer: DynClone + Send + Sync {
    /// Registry name; profiles reference transformers by this.
    fn name(&self) -> &'static str;

    /// Declared traits.
    fn traits(&self) -> TransformerTraits {
        TransformerTraits::default()
    }

    /// Transforms the record in place.
    ///
    /// `options` is the profile-provided configuration for this
    /// transformer (`Null` when unconfigured).
    fn transform(
        &self,
        record: &mut FileRecord,
        options: &serde_json::Value,
    ) -> Result<TransformOutcome>;

    /// Called once after the per-file loop; batch transformers emit their
    /// accumulated work here.
    fn flush(&self, _files: &mut Vec<FileRecord>) -> Result<()> {
        Ok(())
    }
}

dyn_clone::clone_trait_object!(Transformer);

/// One registry entry: a transformer plus its selection criteria.
pub struct Registration {
    pub transformer: Box<dyn Transformer>,
    /// Lowercase extensions matched in tier 1.
    pub extensions: Vec<String>,
    /// MIME types matched in tier 2; a trailing `/*` matches the type part.
    pub mime_types: Vec<String>,
    /// Path regex matched in tier 3.
    pub path_pattern: Option<Regex>,
    /// Tie-breaker within a tier; higher wins.
    pub priority: i32,
}

impl Registration {
    pub fn new(transformer: Box<dyn Transformer>) -> Self {
        Self {
            transformer,
            extensions: Vec::new(),
            mime_types: Vec::new(),
            path_pattern: None,
            priority: 0,
        }
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(|e| e.into().to_lowercase()).collect();
        self
    }

    pub fn mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn path_pattern(mut self, pattern: Regex) -> Self {
        self.path_pattern = Some(pattern);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn matches_mime(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|candidate| {
            if let Some(prefix) = candidate.strip_suffix("/*") {
                mime.split('/').next() == Some(prefix)
            } else {
                candidate == mime
            }
        })
    }
}

/// Priority-ordered transformer lookup.
pub struct TransformerRegistry {
    entries: Vec<Registration>,
}

impl TransformerRegistry {
    /// An empty registry; every file passes through.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// The built-in set: `binary-info` for convertible binary categories
    /// and the opt-in `first-lines` / `external-command` transformers,
    /// which select nothing until a profile gives them a pattern.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            Registration::new(Box::new(BinaryInfo))
                .extensions([
                    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "tiff", "heic", "pdf",
                    "doc", "docx", "odt", "ppt", "pptx", "xls", "xlsx", "ods",
                ])
                .mime_types(["image/*", "application/pdf"]),
        );
        registry.register(Registration::new(Box::new(FirstLines)));
        registry.register(Registration::new(Box::new(ExternalCommand::default())));
        registry
    }

    /// Adds an entry.
    pub fn register(&mut self, registration: Registration) {
        self.entries.push(registration);
    }

    /// Grafts selection criteria from profile options onto the named
    /// entry: `extensions: [..]` and `pattern: "regex"` keys are honored.
    pub fn apply_profile_selectors(&mut self, name: &str, options: &serde_json::Value) {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.transformer.name() == name)
        else {
            return;
        };
        if let Some(extensions) = options.get("extensions").and_then(|v| v.as_array()) {
            entry.extensions.extend(
                extensions
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_lowercase()),
            );
        }
        if let Some(pattern) = options.get("pattern").and_then(|v| v.as_str()) {
            match Regex::new(pattern) {
                Ok(regex) => entry.path_pattern = Some(regex),
                Err(e) => log::warn!("transformer {name}: invalid pattern '{pattern}': {e}"),
            }
        }
    }

    /// Selects the transformer for a record, or `None` for pass-through.
    ///
    /// Tiers are tried in order; within a tier the highest-priority entry
    /// wins, first registration breaking ties.
    pub fn select(&self, record: &FileRecord) -> Option<&Registration> {
        let extension = record.extension();
        if let Some(found) = self.best(|e| !extension.is_empty() && e.extensions.contains(&extension))
        {
            debug!("{}: transformer {} (extension)", record.path, found.transformer.name());
            return Some(found);
        }

        let mime = mime_guess::from_path(&record.path)
            .first()
            .map(|m| m.essence_str().to_string());
        if let Some(mime) = mime {
            if let Some(found) = self.best(|e| e.matches_mime(&mime)) {
                debug!("{}: transformer {} (mime)", record.path, found.transformer.name());
                return Some(found);
            }
        }

        if let Some(found) = self.best(|e| {
            e.path_pattern
                .as_ref()
                .is_some_and(|p| p.is_match(&record.path))
        }) {
            debug!("{}: transformer {} (pattern)", record.path, found.transformer.name());
            return Some(found);
        }
        None
    }

    fn best<F: Fn(&Registration) -> bool>(&self, matches: F) -> Option<&Registration> {
        self.entries
            .iter()
            .filter(|e| matches(e))
            .max_by_key(|e| e.priority)
    }

    /// All registrations, in registration order.
    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }
}
