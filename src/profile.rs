//! Profile representation: which files a run selects and how it shapes them.
//!
//! Discovery of profiles on disk, inheritance, and schema validation belong
//! to the profile collaborator; this module only models the resolved shape
//! and compiles its patterns for matching. All matching treats dotfiles as
//! ordinary names and is case-insensitive on platforms whose filesystems
//! are.

use crate::errors::{Error, Result};
use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Per-transformer settings inside a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerConfig {
    /// Whether the transformer may run.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Transformer-specific options, passed through opaquely.
    #[serde(default)]
    pub options: serde_json::Value,
}

fn default_true() -> bool {
    true
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            options: serde_json::Value::Null,
        }
    }
}

/// One external root to merge into the scan.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEntry {
    /// Local path or URL; URLs require a resolver collaborator.
    pub source: String,
    /// Prefix under which merged files appear.
    pub destination: String,
    /// Include globs evaluated against the external root; empty = all.
    #[serde(default)]
    pub rules: Vec<String>,
    /// When true, a failing source logs a warning instead of erroring.
    #[serde(default)]
    pub optional: bool,
}

/// A resolved profile.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    /// Parent profile name; inheritance is resolved by the collaborator
    /// before this struct is constructed.
    pub extends: Option<String>,
    /// Include globs; empty means match all.
    pub include: Vec<String>,
    /// Exclude globs.
    pub exclude: Vec<String>,
    /// Patterns whose matches survive every filter stage.
    pub always: Vec<String>,
    /// Transformer name to settings.
    pub transformers: BTreeMap<String, TransformerConfig>,
    /// External roots to merge.
    pub external: Vec<ExternalEntry>,
}

impl Profile {
    /// Parses the documented YAML shape (JSON parses too, YAML being a
    /// superset).
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Config(format!("invalid profile: {e}")))
    }

    /// A profile that selects everything and transforms nothing specially.
    pub fn everything() -> Self {
        Self {
            name: "default".to_string(),
            ..Self::default()
        }
    }

    /// True unless the profile disables the named transformer.
    pub fn transformer_enabled(&self, name: &str) -> bool {
        self.transformers.get(name).map_or(true, |t| t.enabled)
    }

    /// Options configured for the named transformer.
    pub fn transformer_options(&self, name: &str) -> serde_json::Value {
        self.transformers
            .get(name)
            .map(|t| t.options.clone())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Glob match options shared by all profile-level matching: dotfiles are
/// not special, separators must be literal, case sensitivity follows the
/// platform's filesystem convention.
pub fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: cfg!(not(any(windows, target_os = "macos"))),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// A compiled, ordered set of glob patterns.
///
/// Invalid patterns are skipped with a warning rather than failing the run,
/// matching how malformed ignore lines are treated.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Pattern)>,
}

impl PatternSet {
    /// Compiles the given pattern strings.
    pub fn compile<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for source in sources {
            let source = source.as_ref();
            match Pattern::new(source) {
                Ok(pattern) => patterns.push((source.to_string(), pattern)),
                Err(e) => log::warn!("invalid glob pattern '{source}': {e}"),
            }
        }
        Self { patterns }
    }

    /// True when no pattern compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when any pattern matches the relative path.
    pub fn matches(&self, path: &str) -> bool {
        let options = match_options();
        self.patterns
            .iter()
            .any(|(_, p)| p.matches_with(path, options))
    }

    /// True when any pattern matches as a glob, equals the path exactly,
    /// or equals its basename. This is the `always` matching rule.
    pub fn matches_loose(&self, path: &str) -> bool {
        if self.matches(path) {
            return true;
        }
        let basename = path.rsplit('/').next().unwrap_or(path);
        self.patterns
            .iter()
            .any(|(source, _)| source == path || source == basename)
    }
}

/// Pattern sets compiled once from a profile plus CLI-provided patterns.
#[derive(Debug, Clone)]
pub struct ProfileMatcher {
    include: PatternSet,
    exclude: PatternSet,
    always: PatternSet,
}

impl ProfileMatcher {
    /// Compiles the union of profile patterns and CLI overrides.
    pub fn new(
        profile: &Profile,
        extra_filter: &[String],
        extra_exclude: &[String],
        extra_always: &[String],
    ) -> Self {
        let include = profile
            .include
            .iter()
            .chain(extra_filter.iter())
            .cloned()
            .collect::<Vec<_>>();
        let exclude = profile
            .exclude
            .iter()
            .chain(extra_exclude.iter())
            .cloned()
            .collect::<Vec<_>>();
        let always = profile
            .always
            .iter()
            .chain(extra_always.iter())
            .cloned()
            .collect::<Vec<_>>();
        Self {
            include: PatternSet::compile(include),
            exclude: PatternSet::compile(exclude),
            always: PatternSet::compile(always),
        }
    }

    /// Inclusion gate: with no include patterns everything passes.
    pub fn is_included(&self, path: &str) -> bool {
        self.include.is_empty() || self.include.matches(path)
    }

    /// True when an exclude pattern matches.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.matches(path)
    }

    /// True when the path is protected by an `always` pattern.
    pub fn is_always(&self, path: &str) -> bool {
        self.always.matches_loose(path)
    }
}
