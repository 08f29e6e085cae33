//! Layers and the evaluation stack the walker consults.

use super::rules::{parse_lines, IgnoreRule};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An ordered rule set bound to the directory it was found in.
#[derive(Debug, Clone)]
pub struct IgnoreLayer {
    /// Directory the rules are relative to.
    pub base: PathBuf,
    /// Rules in file order.
    pub rules: Vec<IgnoreRule>,
}

impl IgnoreLayer {
    /// Builds a layer from raw rule lines.
    pub fn from_lines<I, S>(base: &Path, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let body: String = lines
            .into_iter()
            .map(|l| format!("{}\n", l.as_ref()))
            .collect();
        Self {
            base: base.to_path_buf(),
            rules: parse_lines(&body),
        }
    }

    /// Reads an ignore file rooted at `base`. A missing or unreadable file
    /// yields an empty layer with a warning, never an error.
    pub fn from_file(base: &Path, file: &Path) -> Self {
        let rules = match std::fs::read_to_string(file) {
            Ok(body) => parse_lines(&body),
            Err(e) => {
                warn!("could not read ignore file {}: {e}", file.display());
                Vec::new()
            }
        };
        Self {
            base: base.to_path_buf(),
            rules,
        }
    }

    /// True when the layer has no usable rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// An immutable stack of layers, shared structurally between sibling
/// subtrees during the walk. Pushing returns a new stack; the parent's view
/// is unaffected, which is what lets directory workers proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct IgnoreStack {
    layers: Vec<Arc<IgnoreLayer>>,
}

impl IgnoreStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stack with `layer` pushed on top. Empty layers are not
    /// pushed; the original stack is returned unchanged.
    pub fn push(&self, layer: IgnoreLayer) -> Self {
        if layer.is_empty() {
            return self.clone();
        }
        let mut layers = self.layers.clone();
        layers.push(Arc::new(layer));
        Self { layers }
    }

    /// Number of layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Evaluates the stack for an absolute path.
    ///
    /// Rules run in order from the outermost layer to the innermost; the
    /// last rule that matches decides. A path no rule matches is included.
    pub fn is_ignored(&self, absolute: &Path, is_dir: bool) -> bool {
        let mut decision = None;
        for layer in &self.layers {
            let Ok(rel) = absolute.strip_prefix(&layer.base) else {
                continue;
            };
            let rel_str = normalize_rel(rel);
            if rel_str.is_empty() {
                continue;
            }
            for rule in &layer.rules {
                if rule.matches(&rel_str, is_dir) {
                    decision = Some(!rule.negated);
                }
            }
        }
        decision.unwrap_or(false)
    }
}

/// Renders a relative path with forward slashes for rule matching.
pub fn normalize_rel(rel: &Path) -> String {
    let mut out = String::new();
    for component in rel.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with(base: &str, lines: &[&str]) -> IgnoreStack {
        IgnoreStack::new().push(IgnoreLayer::from_lines(Path::new(base), lines.iter().copied()))
    }

    #[test]
    fn unmatched_paths_are_included() {
        let stack = stack_with("/repo", &["*.log"]);
        assert!(!stack.is_ignored(Path::new("/repo/src/main.rs"), false));
        assert!(stack.is_ignored(Path::new("/repo/debug.log"), false));
    }

    #[test]
    fn last_match_wins_within_a_layer() {
        let stack = stack_with("/repo", &["*.log", "!keep.log"]);
        assert!(stack.is_ignored(Path::new("/repo/a.log"), false));
        assert!(!stack.is_ignored(Path::new("/repo/logs/keep.log"), false));
    }

    #[test]
    fn inner_layer_overrides_outer() {
        let outer = IgnoreLayer::from_lines(Path::new("/repo"), ["*.tmp"]);
        let inner = IgnoreLayer::from_lines(Path::new("/repo/work"), ["!scratch.tmp"]);
        let stack = IgnoreStack::new().push(outer).push(inner);
        assert!(stack.is_ignored(Path::new("/repo/other.tmp"), false));
        assert!(!stack.is_ignored(Path::new("/repo/work/scratch.tmp"), false));
        // The inner negation does not leak outside its base.
        assert!(stack.is_ignored(Path::new("/repo/scratch.tmp"), false));
    }

    #[test]
    fn rules_are_relative_to_their_layer_base() {
        let inner = IgnoreLayer::from_lines(Path::new("/repo/sub"), ["/dist"]);
        let stack = IgnoreStack::new().push(inner);
        assert!(stack.is_ignored(Path::new("/repo/sub/dist"), true));
        assert!(!stack.is_ignored(Path::new("/repo/dist"), true));
        assert!(!stack.is_ignored(Path::new("/repo/sub/deep/dist"), true));
    }

    #[test]
    fn negation_only_layer_is_inert_without_prior_match() {
        let stack = stack_with("/repo", &["!free.txt"]);
        assert!(!stack.is_ignored(Path::new("/repo/free.txt"), false));
        assert!(!stack.is_ignored(Path::new("/repo/other.txt"), false));
    }

    #[test]
    fn directory_only_rules_prune_dirs_not_files() {
        let stack = stack_with("/repo", &["cache/"]);
        assert!(stack.is_ignored(Path::new("/repo/cache"), true));
        assert!(!stack.is_ignored(Path::new("/repo/cache"), false));
    }

    #[test]
    fn empty_layers_are_not_pushed() {
        let stack = IgnoreStack::new().push(IgnoreLayer::from_lines(Path::new("/r"), ["# x"]));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn hidden_exclusion_can_be_negated_by_later_rule() {
        // Mirrors the built-in hidden-file rule plus a user negation.
        let stack = stack_with("/repo", &[".*", "!.github"]);
        assert!(stack.is_ignored(Path::new("/repo/.env"), false));
        assert!(!stack.is_ignored(Path::new("/repo/.github"), true));
    }
}
