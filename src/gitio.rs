//! Local git repository queries backing the git filter stage.
//!
//! Everything here is read-only: status sets, revision diffs, and HEAD
//! metadata. Paths returned are relative to the repository workdir; the
//! stage translates them to scan-root-relative record paths. Any failure
//! surfaces as [`Error::Git`], which the git filter demotes to a no-op.

use crate::core_types::GitMetadata;
use crate::errors::{Error, Result};
use git2::{Repository, Status, StatusOptions};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A discovered repository and the queries the pipeline needs.
pub struct GitQueries {
    repo: Repository,
}

impl GitQueries {
    /// Discovers the repository containing `base`, if any.
    pub fn discover(base: &Path) -> Option<Self> {
        match Repository::discover(base) {
            Ok(repo) => {
                debug!("git repository at {:?}", repo.workdir());
                Some(Self { repo })
            }
            Err(e) => {
                debug!("no git repository at {}: {e}", base.display());
                None
            }
        }
    }

    /// The repository's working directory.
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| Error::Git("bare repository has no worktree".into()))
    }

    fn statuses(&self) -> Result<git2::Statuses<'_>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .renames_head_to_index(true);
        self.repo
            .statuses(Some(&mut options))
            .map_err(|e| Error::Git(format!("status query failed: {e}")))
    }

    /// Workdir-relative path to status letter for every changed file.
    pub fn status_map(&self) -> Result<HashMap<String, String>> {
        let statuses = self.statuses()?;
        let mut map = HashMap::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            map.insert(path.to_string(), status_letter(entry.status()));
        }
        Ok(map)
    }

    /// Workdir-relative paths with index or worktree changes.
    pub fn modified_set(&self) -> Result<HashSet<String>> {
        Ok(self.status_map()?.into_keys().collect())
    }

    /// Workdir-relative paths changed between `rev` and HEAD, per the
    /// committed trees. Worktree-only changes are not included; callers
    /// union with [`modified_set`] when they want them.
    pub fn changed_since(&self, rev: &str) -> Result<HashSet<String>> {
        let old = self
            .repo
            .revparse_single(rev)
            .map_err(|e| Error::Git(format!("cannot resolve '{rev}': {e}")))?
            .peel_to_commit()
            .map_err(|e| Error::Git(format!("'{rev}' is not a commit: {e}")))?
            .tree()
            .map_err(|e| Error::Git(e.to_string()))?;
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .and_then(|c| c.tree())
            .map_err(|e| Error::Git(format!("cannot resolve HEAD: {e}")))?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old), Some(&head), None)
            .map_err(|e| Error::Git(format!("diff failed: {e}")))?;

        let mut changed = HashSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    changed.insert(path.to_string_lossy().into_owned());
                }
            }
        }
        Ok(changed)
    }

    /// Branch, last commit, and dirtiness for the metadata block.
    pub fn metadata(&self, filter: Option<&str>) -> GitMetadata {
        let head = self.repo.head().ok();
        let branch = head
            .as_ref()
            .filter(|h| h.is_branch())
            .and_then(|h| h.shorthand())
            .map(str::to_string);
        let commit = head.as_ref().and_then(|h| h.peel_to_commit().ok());
        let last_commit_hash = commit
            .as_ref()
            .map(|c| c.id().to_string().chars().take(7).collect::<String>());
        let last_commit_subject = commit
            .as_ref()
            .and_then(|c| c.summary())
            .map(str::to_string);
        let dirty = self
            .statuses()
            .map(|statuses| !statuses.is_empty())
            .unwrap_or(false);
        GitMetadata {
            branch,
            last_commit_hash,
            last_commit_subject,
            dirty,
            filter: filter.map(str::to_string),
        }
    }
}

fn status_letter(status: Status) -> String {
    if status.is_conflicted() {
        "U".to_string()
    } else if status.contains(Status::WT_NEW) {
        "??".to_string()
    } else if status.contains(Status::INDEX_NEW) {
        "A".to_string()
    } else if status.contains(Status::INDEX_DELETED) || status.contains(Status::WT_DELETED) {
        "D".to_string()
    } else if status.contains(Status::INDEX_RENAMED) || status.contains(Status::WT_RENAMED) {
        "R".to_string()
    } else if status.contains(Status::INDEX_TYPECHANGE) || status.contains(Status::WT_TYPECHANGE) {
        "T".to_string()
    } else {
        "M".to_string()
    }
}
