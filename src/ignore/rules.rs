//! Parses single gitignore-grammar lines into matchable rules.

use globset::{GlobBuilder, GlobMatcher};
use log::warn;

/// One parsed ignore rule.
///
/// Grammar: `#` comments and blank lines are skipped; a leading `!` negates;
/// a trailing `/` restricts the rule to directories; a pattern containing a
/// slash (or starting with one) anchors it to the layer's base directory;
/// `**` crosses path segments, `*` and `?` do not, `[...]` is a character
/// class.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    /// The line as written, for diagnostics.
    pub original: String,
    /// Pattern applies only relative to the layer base.
    pub anchored: bool,
    /// Pattern matches directories only.
    pub dir_only: bool,
    /// A match re-includes instead of ignoring.
    pub negated: bool,
    matcher: GlobMatcher,
}

impl IgnoreRule {
    /// Parses one line. Returns `None` for blanks, comments, and lines that
    /// do not compile (the latter log a warning and are dropped, leaving
    /// the remaining rules in force).
    pub fn parse(line: &str) -> Option<Self> {
        let original = line.to_string();
        let mut pattern = line.trim();
        if pattern.is_empty() || pattern.starts_with('#') {
            return None;
        }

        let negated = if let Some(rest) = pattern.strip_prefix('!') {
            pattern = rest;
            true
        } else {
            false
        };

        let dir_only = if let Some(rest) = pattern.strip_suffix('/') {
            pattern = rest;
            true
        } else {
            false
        };

        if pattern.is_empty() {
            return None;
        }

        let mut anchored = false;
        if let Some(rest) = pattern.strip_prefix('/') {
            pattern = rest;
            anchored = true;
        }
        // A slash anywhere in the body anchors the pattern to the base.
        if pattern.contains('/') {
            anchored = true;
        }

        let glob_source = if anchored {
            pattern.to_string()
        } else {
            format!("**/{pattern}")
        };

        let matcher = match GlobBuilder::new(&glob_source)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
        {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                warn!("skipping malformed ignore rule '{original}': {e}");
                return None;
            }
        };

        Some(Self {
            original,
            anchored,
            dir_only,
            negated,
            matcher,
        })
    }

    /// Tests the rule against a path relative to the layer base.
    ///
    /// `rel_path` uses forward slashes and no leading `./`. `is_dir`
    /// reflects the entry type; directory-only rules never match files.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        self.matcher.is_match(rel_path)
    }
}

/// Parses a whole ignore file body, dropping unusable lines.
pub(super) fn parse_lines(body: &str) -> Vec<IgnoreRule> {
    body.lines().filter_map(IgnoreRule::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(line: &str) -> IgnoreRule {
        IgnoreRule::parse(line).expect("rule should parse")
    }

    #[test]
    fn comments_and_blanks_are_dropped() {
        assert!(IgnoreRule::parse("").is_none());
        assert!(IgnoreRule::parse("   ").is_none());
        assert!(IgnoreRule::parse("# a comment").is_none());
    }

    #[test]
    fn unanchored_name_matches_any_depth() {
        let r = rule("*.log");
        assert!(r.matches("debug.log", false));
        assert!(r.matches("deep/nested/trace.log", false));
        assert!(!r.matches("notes.txt", false));
        assert!(!r.anchored);
    }

    #[test]
    fn leading_slash_anchors_to_base() {
        let r = rule("/dist");
        assert!(r.anchored);
        assert!(r.matches("dist", true));
        assert!(!r.matches("packages/dist", true));
    }

    #[test]
    fn interior_slash_anchors_to_base() {
        let r = rule("build/output");
        assert!(r.anchored);
        assert!(r.matches("build/output", false));
        assert!(!r.matches("sub/build/output", false));
    }

    #[test]
    fn trailing_slash_restricts_to_directories() {
        let r = rule("build/");
        assert!(r.dir_only);
        assert!(r.matches("build", true));
        assert!(!r.matches("build", false));
        assert!(r.matches("a/b/build", true)); // unanchored
    }

    #[test]
    fn negation_flag_is_parsed() {
        let r = rule("!important.log");
        assert!(r.negated);
        assert!(r.matches("logs/important.log", false));
    }

    #[test]
    fn double_star_crosses_segments_single_star_does_not() {
        let r = rule("docs/**/*.md");
        assert!(r.matches("docs/a/b/readme.md", false));
        let single = rule("/src/*.rs");
        assert!(single.matches("src/main.rs", false));
        assert!(!single.matches("src/nested/mod.rs", false));
    }

    #[test]
    fn character_class_and_question_mark() {
        let r = rule("file[0-9].tmp");
        assert!(r.matches("file3.tmp", false));
        assert!(!r.matches("fileA.tmp", false));
        let q = rule("?.txt");
        assert!(q.matches("a.txt", false));
        assert!(!q.matches("ab.txt", false));
    }

    #[test]
    fn malformed_rule_is_skipped() {
        assert!(IgnoreRule::parse("[unclosed").is_none());
        let rules = parse_lines("[bad\n*.log\n");
        assert_eq!(rules.len(), 1);
    }
}
