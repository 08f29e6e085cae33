//! Builder that assembles and validates an [`Options`] snapshot.

use super::env::apply_env_overrides;
use super::{
    BinaryPolicy, Options, OutputDestination, OutputFormat, RedactionMode, SecretsEngine,
    SortKey, SortOrder,
};
use crate::errors::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Accumulates settings and produces a validated, immutable [`Options`].
///
/// # Examples
///
/// ```
/// use copytree::config::{Options, OutputFormat};
///
/// let options = Options::builder(".")
///     .format(OutputFormat::Markdown)
///     .filter(vec!["**/*.rs".into()])
///     .char_limit(Some(100_000))
///     .build()
///     .unwrap();
/// assert_eq!(options.render.format, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    options: Options,
    skip_env: bool,
}

impl OptionsBuilder {
    /// Starts from defaults with the given scan root.
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        let mut options = Options::default();
        options.base_path = base_path.into();
        Self {
            options,
            skip_env: false,
        }
    }

    pub fn profile_name<S: Into<String>>(mut self, name: S) -> Self {
        self.options.profile_name = name.into();
        self
    }

    pub fn filter(mut self, patterns: Vec<String>) -> Self {
        self.options.filtering.filter = patterns;
        self
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.options.filtering.exclude = patterns;
        self
    }

    pub fn always(mut self, patterns: Vec<String>) -> Self {
        self.options.filtering.always = patterns;
        self
    }

    pub fn force_include(mut self, patterns: Vec<String>) -> Self {
        self.options.filtering.force_include = patterns;
        self
    }

    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.options.discovery.include_hidden = yes;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.options.discovery.max_depth = depth;
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.options.discovery.follow_symlinks = yes;
        self
    }

    pub fn use_gitignore(mut self, yes: bool) -> Self {
        self.options.discovery.use_gitignore = yes;
        self
    }

    pub fn global_excludes(mut self, rules: Vec<String>) -> Self {
        self.options.discovery.global_excludes = rules;
        self
    }

    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.options.discovery.max_file_size = bytes;
        self
    }

    pub fn modified(mut self, yes: bool) -> Self {
        self.options.git.modified = yes;
        self
    }

    pub fn changed<S: Into<String>>(mut self, rev: Option<S>) -> Self {
        self.options.git.changed = rev.map(Into::into);
        self
    }

    pub fn with_git_status(mut self, yes: bool) -> Self {
        self.options.git.with_git_status = yes;
        self
    }

    pub fn binary_policy(mut self, policy: BinaryPolicy) -> Self {
        self.options.loading.binary_policy = policy;
        self
    }

    pub fn secrets_engine(mut self, engine: SecretsEngine) -> Self {
        self.options.secrets.engine = engine;
        self
    }

    pub fn redaction(mut self, mode: RedactionMode) -> Self {
        self.options.secrets.redaction = mode;
        self
    }

    pub fn secrets_allowlist(mut self, globs: Vec<String>) -> Self {
        self.options.secrets.allowlist = globs;
        self
    }

    pub fn fail_on_secrets(mut self, yes: bool) -> Self {
        self.options.secrets.fail_on_secrets = yes;
        self
    }

    pub fn max_concurrency(mut self, workers: usize) -> Self {
        self.options.transform.max_concurrency = workers;
        self
    }

    pub fn no_cache(mut self, yes: bool) -> Self {
        self.options.transform.no_cache = yes;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.options.transform.cache_ttl = ttl;
        self
    }

    pub fn sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.options.limit.sort_key = key;
        self.options.limit.sort_order = order;
        self
    }

    pub fn char_limit(mut self, limit: Option<usize>) -> Self {
        self.options.limit.char_limit = limit;
        self
    }

    pub fn head(mut self, head: Option<usize>) -> Self {
        self.options.limit.head = head;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.options.render.format = format;
        self
    }

    pub fn destination(mut self, destination: OutputDestination) -> Self {
        self.options.render.destination = destination;
        self
    }

    pub fn line_numbers(mut self, yes: bool) -> Self {
        self.options.render.line_numbers = yes;
        self
    }

    pub fn only_tree(mut self, yes: bool) -> Self {
        self.options.render.only_tree = yes;
        self
    }

    pub fn show_size(mut self, yes: bool) -> Self {
        self.options.render.show_size = yes;
        self
    }

    pub fn no_instructions(mut self, yes: bool) -> Self {
        self.options.render.no_instructions = yes;
        self
    }

    pub fn instructions<S: Into<String>>(mut self, text: Option<S>) -> Self {
        self.options.render.instructions = text.map(Into::into);
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.options.dry_run = yes;
        self
    }

    pub fn info(mut self, yes: bool) -> Self {
        self.options.info = yes;
        self
    }

    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.options.continue_on_error = yes;
        self
    }

    /// Disables environment-variable overrides; used by tests that must not
    /// observe the ambient environment.
    pub fn without_env_overrides(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Validates the accumulated settings and freezes them.
    pub fn build(mut self) -> Result<Options> {
        if !self.skip_env {
            apply_env_overrides(&mut self.options)?;
        }
        validate(&self.options)?;
        Ok(self.options)
    }

    /// Direct access for option groups without dedicated setters.
    pub fn configure<F: FnOnce(&mut Options)>(mut self, f: F) -> Self {
        f(&mut self.options);
        self
    }
}

fn validate(options: &Options) -> Result<()> {
    if options.git.modified && options.git.changed.is_some() {
        return Err(Error::Config(
            "--modified and --changed are mutually exclusive".into(),
        ));
    }
    if options.limit.char_limit == Some(0) {
        return Err(Error::Config("character limit must be positive".into()));
    }
    if options.limit.head == Some(0) {
        return Err(Error::Config("--head must be positive".into()));
    }
    if options.transform.max_concurrency == 0 {
        return Err(Error::Config("max concurrency must be positive".into()));
    }
    if options.render.only_tree && options.render.destination == OutputDestination::Stream {
        return Err(Error::Config(
            "--only-tree cannot be combined with streaming output".into(),
        ));
    }
    if !(0.0..=1.0).contains(&options.loading.non_printable_threshold) {
        return Err(Error::Config(
            "non-printable threshold must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_modified_with_changed() {
        let err = OptionsBuilder::new(".")
            .without_env_overrides()
            .modified(true)
            .changed(Some("HEAD~1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_zero_char_limit() {
        let err = OptionsBuilder::new(".")
            .without_env_overrides()
            .char_limit(Some(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_streaming_tree_only() {
        let err = OptionsBuilder::new(".")
            .without_env_overrides()
            .only_tree(true)
            .destination(OutputDestination::Stream)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn builds_with_defaults() {
        let options = OptionsBuilder::new("/tmp/scan")
            .without_env_overrides()
            .build()
            .unwrap();
        assert_eq!(options.base_path, PathBuf::from("/tmp/scan"));
        assert_eq!(options.render.format, OutputFormat::Xml);
        assert!(!options.dry_run);
    }
}
