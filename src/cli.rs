//! Command-line surface mapped onto the immutable options snapshot.

use crate::config::{
    BinaryPolicy, Options, OptionsBuilder, OutputDestination, OutputFormat, RedactionMode,
    SecretsEngine, SortKey, SortOrder,
};
use crate::errors::{Error, Result};
use crate::profile::Profile;
use byte_unit::Byte;
use clap::Parser;
use std::path::PathBuf;

/// Materialize a directory tree into a single structured document.
#[derive(Parser, Debug)]
#[command(name = "copytree", version, about, author)]
pub struct Cli {
    /// Root directory to scan.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Profile name ("auto" resolves the project default).
    #[arg(long, default_value = "auto")]
    pub profile: String,

    /// Load a profile from a YAML/JSON file.
    #[arg(long, value_name = "FILE")]
    pub profile_file: Option<PathBuf>,

    /// Include patterns; files must match one when any are given.
    #[arg(short = 'f', long = "filter", value_name = "GLOB")]
    pub filter: Vec<String>,

    /// Exclude patterns.
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Patterns protected from every filter stage.
    #[arg(long = "always", value_name = "GLOB")]
    pub always: Vec<String>,

    /// Re-add matching files with all ignore rules bypassed.
    #[arg(long = "force-include", value_name = "PATTERN")]
    pub force_include: Vec<String>,

    /// Keep only files with uncommitted changes.
    #[arg(short = 'm', long)]
    pub modified: bool,

    /// Keep only files changed since the given revision.
    #[arg(long, value_name = "REV", conflicts_with = "modified")]
    pub changed: Option<String>,

    /// Annotate files with their git status letters.
    #[arg(long = "with-git-status")]
    pub with_git_status: bool,

    /// Prefix content lines with line numbers.
    #[arg(short = 'l', long = "line-numbers")]
    pub line_numbers: bool,

    /// Print per-stage statistics to stderr after the run.
    #[arg(long)]
    pub info: bool,

    /// Show file sizes in tree and dry-run listings.
    #[arg(long = "show-size")]
    pub show_size: bool,

    /// Include binary files, base64-encoded.
    #[arg(long = "include-binary")]
    pub include_binary: bool,

    /// Binary handling: placeholder, skip, base64, comment, convert.
    #[arg(long = "binary-policy", value_name = "POLICY")]
    pub binary_policy: Option<String>,

    /// List the files a run would process, without loading them.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Keep only the first N files after sorting.
    #[arg(long, value_name = "N")]
    pub head: Option<usize>,

    /// Global character budget for file contents.
    #[arg(short = 'C', long = "char-limit", value_name = "N")]
    pub char_limit: Option<usize>,

    /// Write the document to a file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stream the document incrementally instead of assembling it.
    #[arg(long, conflicts_with = "output")]
    pub stream: bool,

    /// Output format: xml, json, markdown, tree.
    #[arg(long, default_value = "xml")]
    pub format: String,

    /// Emit structure only, without file contents.
    #[arg(long = "only-tree")]
    pub only_tree: bool,

    /// Suppress the instructions block.
    #[arg(long = "no-instructions")]
    pub no_instructions: bool,

    /// Text prepended to the document.
    #[arg(long, value_name = "TEXT")]
    pub instructions: Option<String>,

    /// Disable the heavy-transform cache for this run.
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Include hidden files and directories.
    #[arg(long = "hidden")]
    pub hidden: bool,

    /// Do not honor the root .gitignore.
    #[arg(long = "no-ignore")]
    pub no_ignore: bool,

    /// Follow symbolic links (cycle-safe).
    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Maximum directory depth below the root.
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Skip files larger than this (accepts 512K, 10M, ...).
    #[arg(long = "max-file-size", value_name = "SIZE")]
    pub max_file_size: Option<String>,

    /// Sort key: path, size, modified, name, extension, depth.
    #[arg(long, default_value = "path")]
    pub sort: String,

    /// Sort direction: asc or desc.
    #[arg(long = "sort-order", default_value = "asc")]
    pub sort_order: String,

    /// Secret detection engine: builtin, external, both, auto, off.
    #[arg(long = "secrets-engine", default_value = "builtin")]
    pub secrets_engine: String,

    /// Redaction mode: typed, length-preserving, off.
    #[arg(long, default_value = "typed")]
    pub redaction: String,

    /// Globs the secrets guard skips.
    #[arg(long = "secrets-allow", value_name = "GLOB")]
    pub secrets_allow: Vec<String>,

    /// Abort with a non-zero exit when any secret is found.
    #[arg(long = "fail-on-secrets")]
    pub fail_on_secrets: bool,

    /// Worker-pool size for loading and transforming.
    #[arg(long = "max-concurrency", value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Continue past unrecovered stage errors (degraded output).
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,
}

impl Cli {
    /// Resolves the profile: an explicit file wins, otherwise the named
    /// profile is left to the profile collaborator and the built-in
    /// match-everything profile is used.
    pub fn resolve_profile(&self) -> Result<Profile> {
        if let Some(path) = &self.profile_file {
            let body = std::fs::read_to_string(path)
                .map_err(|e| crate::errors::io_error_with_path(e, path))?;
            return Profile::from_yaml(&body);
        }
        let mut profile = Profile::everything();
        if self.profile != "auto" {
            profile.name = self.profile.clone();
        }
        Ok(profile)
    }

    /// Builds the validated options snapshot.
    pub fn into_options(&self) -> Result<Options> {
        let format: OutputFormat = self.format.parse()?;
        let sort_key: SortKey = self.sort.parse()?;
        let sort_order: SortOrder = self.sort_order.parse()?;
        let secrets_engine: SecretsEngine = self.secrets_engine.parse()?;
        let redaction: RedactionMode = self.redaction.parse()?;

        let binary_policy = match (&self.binary_policy, self.include_binary) {
            (Some(policy), _) => policy.parse::<BinaryPolicy>()?,
            (None, true) => BinaryPolicy::Base64,
            (None, false) => BinaryPolicy::Placeholder,
        };

        let max_file_size = self
            .max_file_size
            .as_deref()
            .map(|raw| {
                Byte::parse_str(raw, true)
                    .map(|b| b.as_u64())
                    .map_err(|e| Error::Config(format!("--max-file-size '{raw}': {e}")))
            })
            .transpose()?;

        let destination = if self.stream {
            OutputDestination::Stream
        } else if let Some(path) = &self.output {
            OutputDestination::File(path.clone())
        } else {
            OutputDestination::Stdout
        };

        let mut builder = OptionsBuilder::new(&self.path)
            .profile_name(&self.profile)
            .filter(self.filter.clone())
            .exclude(self.exclude.clone())
            .always(self.always.clone())
            .force_include(self.force_include.clone())
            .modified(self.modified)
            .changed(self.changed.as_deref())
            .with_git_status(self.with_git_status)
            .include_hidden(self.hidden)
            .use_gitignore(!self.no_ignore)
            .follow_symlinks(self.follow_symlinks)
            .max_depth(self.max_depth)
            .max_file_size(max_file_size)
            .binary_policy(binary_policy)
            .secrets_engine(secrets_engine)
            .redaction(redaction)
            .secrets_allowlist(self.secrets_allow.clone())
            .fail_on_secrets(self.fail_on_secrets)
            .no_cache(self.no_cache)
            .sort(sort_key, sort_order)
            .char_limit(self.char_limit)
            .head(self.head)
            .format(format)
            .destination(destination)
            .line_numbers(self.line_numbers)
            .only_tree(self.only_tree)
            .show_size(self.show_size)
            .no_instructions(self.no_instructions)
            .instructions(self.instructions.as_deref())
            .dry_run(self.dry_run)
            .info(self.info)
            .continue_on_error(self.continue_on_error);

        if let Some(workers) = self.max_concurrency {
            builder = builder.max_concurrency(workers).configure(|o| {
                o.loading.concurrency = workers;
            });
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("copytree").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_map_to_xml_stdout() {
        let options = parse(&[]).into_options().unwrap();
        assert_eq!(options.render.format, OutputFormat::Xml);
        assert_eq!(options.render.destination, OutputDestination::Stdout);
        assert_eq!(options.loading.binary_policy, BinaryPolicy::Placeholder);
    }

    #[test]
    fn include_binary_selects_base64() {
        let options = parse(&["--include-binary"]).into_options().unwrap();
        assert_eq!(options.loading.binary_policy, BinaryPolicy::Base64);
    }

    #[test]
    fn explicit_binary_policy_wins() {
        let options = parse(&["--include-binary", "--binary-policy", "skip"])
            .into_options()
            .unwrap();
        assert_eq!(options.loading.binary_policy, BinaryPolicy::Skip);
    }

    #[test]
    fn modified_conflicts_with_changed() {
        let result =
            Cli::try_parse_from(["copytree", "--modified", "--changed", "HEAD~1"]);
        assert!(result.is_err());
    }

    #[test]
    fn human_sizes_parse() {
        let options = parse(&["--max-file-size", "4 KiB"]).into_options().unwrap();
        assert_eq!(options.discovery.max_file_size, Some(4096));
    }

    #[test]
    fn stream_and_output_conflict() {
        assert!(Cli::try_parse_from(["copytree", "--stream", "--output", "x.xml"]).is_err());
    }

    #[test]
    fn repeated_pattern_flags_accumulate() {
        let cli = parse(&["-f", "**/*.rs", "-f", "**/*.toml", "-x", "target/**"]);
        assert_eq!(cli.filter.len(), 2);
        assert_eq!(cli.exclude.len(), 1);
    }

    #[test]
    fn profile_file_round_trips() {
        let path = std::env::temp_dir().join(format!("ct-prof-{}.yml", std::process::id()));
        std::fs::write(&path, "name: custom\ninclude:\n  - \"src/**\"\n").unwrap();
        let cli = parse(&["--profile-file", path.to_str().unwrap()]);
        let profile = cli.resolve_profile().unwrap();
        assert_eq!(profile.name, "custom");
        assert_eq!(profile.include, vec!["src/**"]);
        std::fs::remove_file(path).unwrap();
    }
}
