//! Git filter stage: `--modified`, `--changed <rev>`, and status
//! annotation.

use crate::errors::{Error, Result};
use crate::gitio::GitQueries;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use log::{debug, warn};
use std::collections::HashSet;

/// Filters the file set by git state and attaches repository metadata.
///
/// `--modified` keeps files with index or worktree changes; `--changed
/// <rev>` keeps files in the committed diff against HEAD plus worktree
/// changes; `--with-git-status` annotates survivors with status letters.
/// Always-include files are exempt from the filtering (not the
/// annotation). Every git failure demotes the stage to a no-op through its
/// recovery hook.
pub struct GitFilter;

impl GitFilter {
    fn apply(&self, value: &mut PipelineValue) -> Result<()> {
        let git = value.options.git.clone();
        let Some(queries) = GitQueries::discover(&value.options.base_path) else {
            debug!("not a git repository; git filter is a no-op");
            return Ok(());
        };
        let workdir = queries.workdir()?.to_path_buf();

        let filter_name = if git.modified {
            Some("modified")
        } else if git.changed.is_some() {
            Some("changed")
        } else {
            Some("status")
        };

        let status_map = queries.status_map()?;

        let keep: Option<HashSet<String>> = if git.modified {
            Some(status_map.keys().cloned().collect())
        } else if let Some(rev) = &git.changed {
            let mut changed = queries.changed_since(rev)?;
            // Worktree edits count as changed-since too.
            changed.extend(status_map.keys().cloned());
            Some(changed)
        } else {
            None
        };

        let repo_rel = |record: &crate::core_types::FileRecord| {
            record
                .absolute_path
                .strip_prefix(&workdir)
                .map(crate::ignore::normalize_rel)
                .unwrap_or_else(|_| record.path.clone())
        };

        if git.with_git_status {
            for record in &mut value.files {
                record.git_status = status_map.get(&repo_rel(record)).cloned();
            }
        }

        if let Some(keep) = &keep {
            let before = value.files.len();
            value
                .files
                .retain(|record| record.always_include || keep.contains(&repo_rel(record)));
            value.stats.git_filtered_out = before - value.files.len();
        }

        value.git = Some(queries.metadata(filter_name));
        Ok(())
    }
}

impl Stage for GitFilter {
    fn name(&self) -> &'static str {
        "git-filter"
    }

    fn should_apply(&self, value: &PipelineValue) -> bool {
        value.options.git.is_active()
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        self.apply(value)
    }

    fn handle_error(
        &self,
        err: Error,
        _value: &mut PipelineValue,
        _ctx: &StageContext,
    ) -> Result<()> {
        match err {
            Error::Git(message) => {
                warn!("git query failed, continuing without git filter: {message}");
                Ok(())
            }
            other => Err(other),
        }
    }
}
