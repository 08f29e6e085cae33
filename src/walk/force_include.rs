//! Second-pass traversal that re-adds files the ignore stack pruned.
//!
//! Force-include patterns are evaluated against the whole tree with every
//! ignore layer bypassed. Bare names are normalized gitignore-style: `name`
//! becomes `**/name` plus `**/name/**`, so both a file called `name` and
//! everything under a directory called `name` qualify.

use crate::config::DiscoveryOptions;
use crate::core_types::FileRecord;
use crate::profile::PatternSet;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

/// Expands user-facing force-include patterns to matchable globs.
pub(crate) fn normalize_patterns(patterns: &[String]) -> Vec<String> {
    let mut normalized = Vec::new();
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let has_slash = trimmed.contains('/');
        let has_meta = trimmed.contains(['*', '?', '[']);
        if !has_slash && !has_meta {
            normalized.push(format!("**/{trimmed}"));
            normalized.push(format!("**/{trimmed}/**"));
        } else {
            normalized.push(trimmed.trim_start_matches('/').to_string());
        }
    }
    normalized
}

/// Walks the tree without ignore rules and returns records for files that
/// match a force-include pattern and are not already present.
pub fn force_include_pass(
    base: &Path,
    patterns: &[String],
    options: &DiscoveryOptions,
    existing: &[FileRecord],
) -> Vec<FileRecord> {
    if patterns.is_empty() {
        return Vec::new();
    }
    let globs = PatternSet::compile(normalize_patterns(patterns));
    if globs.is_empty() {
        return Vec::new();
    }

    let known: HashSet<&str> = existing.iter().map(|f| f.path.as_str()).collect();
    let mut added = Vec::new();

    let mut walker = WalkDir::new(base).follow_links(options.follow_symlinks);
    if let Some(max) = options.max_depth {
        walker = walker.max_depth(max + 1);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("force-include pass: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(base) else {
            continue;
        };
        let rel_str = crate::ignore::normalize_rel(rel);
        if rel_str.is_empty() || known.contains(rel_str.as_str()) {
            continue;
        }
        if !globs.matches(&rel_str) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                warn!("force-include pass: {}: {e}", entry.path().display());
                continue;
            }
        };
        if let Some(max) = options.max_file_size {
            if meta.len() > max {
                continue;
            }
        }
        debug!("force-including {rel_str}");
        added.push(FileRecord::new(
            rel_str,
            entry.path().to_path_buf(),
            meta.len(),
            meta.modified().ok(),
        ));
    }
    added
}
