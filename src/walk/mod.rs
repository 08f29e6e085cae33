//! Layered ignore-aware directory traversal.
//!
//! The walker streams `FileRecord`s for every file under a root, consulting
//! an evolving [`IgnoreStack`]: a built-in global layer (hidden-file rule
//! plus configured exclusions), the root `.gitignore`, and one layer per
//! in-tree `.copytreeignore`. Ignored directories are pruned without
//! descending. Sibling subtrees are walked by a bounded worker pool, so
//! emission order is unspecified; the sort stage establishes any
//! user-visible order.

use crate::cancellation::CancellationToken;
use crate::config::DiscoveryOptions;
use crate::constants::{DANGEROUS_DIRS, IGNORE_FILE_NAME};
use crate::core_types::FileRecord;
use crate::errors::{Error, Result};
use crate::ignore::{IgnoreLayer, IgnoreStack};
use crossbeam_channel::{unbounded, Sender};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod force_include;

pub use force_include::force_include_pass;

/// Tracks visited directory identities when symlink following is enabled,
/// so link cycles terminate and each real directory is entered once.
#[derive(Debug, Default)]
struct VisitedDirs {
    inner: Mutex<HashSet<(u64, u64)>>,
    fallback: Mutex<HashSet<PathBuf>>,
}

impl VisitedDirs {
    /// Returns false when the directory was seen before.
    fn first_visit(&self, path: &Path) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if let Ok(meta) = std::fs::metadata(path) {
                return self
                    .inner
                    .lock()
                    .expect("visited-set lock poisoned")
                    .insert((meta.dev(), meta.ino()));
            }
        }
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.fallback
            .lock()
            .expect("visited-set lock poisoned")
            .insert(canonical)
    }
}

struct WalkContext<'a> {
    base: &'a Path,
    options: &'a DiscoveryOptions,
    token: &'a CancellationToken,
    visited: VisitedDirs,
}

/// Walks `base` and returns every file that survives the ignore stack.
///
/// Output order is unspecified. Unreadable directories and entries are
/// skipped with a warning; only a missing root or cancellation abort the
/// walk.
pub fn walk(
    base: &Path,
    options: &DiscoveryOptions,
    token: &CancellationToken,
) -> Result<Vec<FileRecord>> {
    let base = base
        .canonicalize()
        .map_err(|_| Error::NotAPath(base.to_path_buf()))?;
    if !base.is_dir() {
        return Err(Error::NotAPath(base));
    }

    let stack = seed_stack(&base, options);
    let ctx = WalkContext {
        base: &base,
        options,
        token,
        visited: VisitedDirs::default(),
    };

    let (tx, rx) = unbounded();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.walker_threads.max(1))
        .build()
        .map_err(|e| Error::Internal(format!("walker pool: {e}")))?;

    pool.in_place_scope(|scope| {
        walk_dir(scope, &ctx, base.to_path_buf(), 0, stack, tx);
    });

    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let files: Vec<FileRecord> = rx.into_iter().collect();
    debug!("walk complete: {} files under {}", files.len(), base.display());
    Ok(files)
}

/// Builds the initial stack: hidden-file rule and configured exclusions in
/// the global layer, then the root `.gitignore` when enabled.
fn seed_stack(base: &Path, options: &DiscoveryOptions) -> IgnoreStack {
    let mut global_rules: Vec<String> = Vec::new();
    if !options.include_hidden {
        // First so any configured rule can negate it.
        global_rules.push(".*".to_string());
    }
    global_rules.extend(options.global_excludes.iter().cloned());

    let mut stack = IgnoreStack::new().push(IgnoreLayer::from_lines(base, &global_rules));

    if options.use_gitignore {
        let gitignore = base.join(".gitignore");
        if gitignore.is_file() {
            stack = stack.push(IgnoreLayer::from_file(base, &gitignore));
        }
    }
    stack
}

fn walk_dir<'s>(
    scope: &rayon::Scope<'s>,
    ctx: &'s WalkContext<'s>,
    dir: PathBuf,
    depth: usize,
    stack: IgnoreStack,
    tx: Sender<FileRecord>,
) {
    if ctx.token.is_cancelled() {
        return;
    }

    // Entering a directory that carries an ignore file pushes a new layer
    // scoped to this subtree.
    let ignore_file = dir.join(IGNORE_FILE_NAME);
    let stack = if ignore_file.is_file() {
        stack.push(IgnoreLayer::from_file(&dir, &ignore_file))
    } else {
        stack
    };

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("skipping unreadable directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries {
        if ctx.token.is_cancelled() {
            return;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };

        if file_type.is_symlink() {
            if !ctx.options.follow_symlinks {
                debug!("not following symlink {}", path.display());
                continue;
            }
            let Ok(meta) = std::fs::metadata(&path) else {
                warn!("skipping dangling symlink {}", path.display());
                continue;
            };
            if meta.is_dir() {
                descend(scope, ctx, path, depth, &stack, &tx);
            } else if meta.is_file() {
                emit_file(ctx, &path, &stack, &tx);
            }
            continue;
        }

        if file_type.is_dir() {
            descend(scope, ctx, path, depth, &stack, &tx);
        } else if file_type.is_file() {
            emit_file(ctx, &path, &stack, &tx);
        }
    }
}

fn descend<'s>(
    scope: &rayon::Scope<'s>,
    ctx: &'s WalkContext<'s>,
    path: PathBuf,
    depth: usize,
    stack: &IgnoreStack,
    tx: &Sender<FileRecord>,
) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if DANGEROUS_DIRS.contains(&name.as_str()) {
        debug!("pruning {}", path.display());
        return;
    }
    if stack.is_ignored(&path, true) {
        debug!("pruning ignored directory {}", path.display());
        return;
    }
    if let Some(max) = ctx.options.max_depth {
        if depth + 1 > max {
            return;
        }
    }
    if ctx.options.follow_symlinks && !ctx.visited.first_visit(&path) {
        debug!("already visited {}", path.display());
        return;
    }

    let stack = stack.clone();
    let tx = tx.clone();
    scope.spawn(move |scope| walk_dir(scope, ctx, path, depth + 1, stack, tx));
}

fn emit_file(ctx: &WalkContext<'_>, path: &Path, stack: &IgnoreStack, tx: &Sender<FileRecord>) {
    if stack.is_ignored(path, false) {
        return;
    }
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("skipping {}: {e}", path.display());
            return;
        }
    };
    if let Some(max) = ctx.options.max_file_size {
        if meta.len() > max {
            debug!("skipping oversized file {}", path.display());
            return;
        }
    }
    if let Some(record) = make_record(ctx.base, path, &meta) {
        let _ = tx.send(record);
    }
}

/// Builds a record with the POSIX-normalized relative path identity.
pub(crate) fn make_record(
    base: &Path,
    path: &Path,
    meta: &std::fs::Metadata,
) -> Option<FileRecord> {
    let rel = path.strip_prefix(base).ok()?;
    let rel_str = crate::ignore::normalize_rel(rel);
    if rel_str.is_empty() {
        return None;
    }
    Some(FileRecord::new(
        rel_str,
        path.to_path_buf(),
        meta.len(),
        meta.modified().ok(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DiscoveryOptions {
        DiscoveryOptions::default()
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn paths(files: &[FileRecord]) -> Vec<String> {
        let mut paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn walks_nested_tree() {
        let dir = std::env::temp_dir().join(format!("ct-walk-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, "a.txt", "a");
        write(&dir, "sub/b.txt", "b");
        write(&dir, "sub/deep/c.txt", "c");

        let files = walk(&dir, &options(), &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec!["a.txt", "sub/b.txt", "sub/deep/c.txt"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn gitignore_and_tree_ignore_layers_apply() {
        let dir = std::env::temp_dir().join(format!("ct-walk-ig-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, ".gitignore", "*.log\n");
        write(&dir, "keep.txt", "k");
        write(&dir, "drop.log", "d");
        write(&dir, "sub/.copytreeignore", "local.txt\n");
        write(&dir, "sub/local.txt", "l");
        write(&dir, "sub/kept.txt", "k");

        let files = walk(&dir, &options(), &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec!["keep.txt", "sub/kept.txt"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn hidden_files_excluded_by_default_and_includable() {
        let dir = std::env::temp_dir().join(format!("ct-walk-h-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, ".hidden", "h");
        write(&dir, "shown.txt", "s");

        let files = walk(&dir, &options(), &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec!["shown.txt"]);

        let mut opts = options();
        opts.include_hidden = true;
        opts.use_gitignore = false;
        let files = walk(&dir, &opts, &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec![".hidden", "shown.txt"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dangerous_dirs_always_pruned() {
        let dir = std::env::temp_dir().join(format!("ct-walk-d-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, ".git/config", "x");
        write(&dir, "node_modules/pkg/index.js", "x");
        write(&dir, "src/main.rs", "fn main() {}");

        let mut opts = options();
        opts.include_hidden = true;
        let files = walk(&dir, &opts, &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec!["src/main.rs"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn max_depth_limits_descent() {
        let dir = std::env::temp_dir().join(format!("ct-walk-md-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, "top.txt", "t");
        write(&dir, "one/mid.txt", "m");
        write(&dir, "one/two/deep.txt", "d");

        let mut opts = options();
        opts.max_depth = Some(1);
        let files = walk(&dir, &opts, &CancellationToken::new()).unwrap();
        assert_eq!(paths(&files), vec!["one/mid.txt", "top.txt"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = walk(
            Path::new("/definitely/not/here"),
            &options(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotAPath(_)));
    }

    #[test]
    fn cancelled_token_aborts() {
        let dir = std::env::temp_dir().join(format!("ct-walk-c-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, "a.txt", "a");
        let token = CancellationToken::new();
        token.cancel();
        let err = walk(&dir, &options(), &token).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
