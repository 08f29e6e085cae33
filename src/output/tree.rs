//! ASCII directory tree rendering, used standalone as the `tree` format
//! and embedded by the Markdown and JSON formatters.

use super::{humanize_size, total_size, DocumentFormatter};
use crate::core_types::FileRecord;
use crate::errors::Result;
use crate::pipeline::PipelineValue;
use std::collections::BTreeMap;

#[derive(Default)]
struct TreeNode {
    dirs: BTreeMap<String, TreeNode>,
    files: Vec<(String, u64)>,
}

impl TreeNode {
    fn insert(&mut self, path: &str, size: u64) {
        match path.split_once('/') {
            Some((dir, rest)) => self
                .dirs
                .entry(dir.to_string())
                .or_default()
                .insert(rest, size),
            None => self.files.push((path.to_string(), size)),
        }
    }

    fn render(&self, prefix: &str, out: &mut String, show_sizes: bool) {
        let mut entries: Vec<TreeEntry<'_>> = Vec::new();
        for (name, node) in &self.dirs {
            entries.push(TreeEntry::Dir(name, node));
        }
        let mut files: Vec<&(String, u64)> = self.files.iter().collect();
        files.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()).then(a.0.cmp(&b.0)));
        for file in files {
            entries.push(TreeEntry::File(&file.0, file.1));
        }

        let count = entries.len();
        for (index, entry) in entries.into_iter().enumerate() {
            let last = index + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            let continuation = if last { "    " } else { "│   " };
            match entry {
                TreeEntry::Dir(name, node) => {
                    out.push_str(&format!("{prefix}{connector}{name}/\n"));
                    node.render(&format!("{prefix}{continuation}"), out, show_sizes);
                }
                TreeEntry::File(name, size) => {
                    if show_sizes {
                        out.push_str(&format!(
                            "{prefix}{connector}{name} ({})\n",
                            humanize_size(size)
                        ));
                    } else {
                        out.push_str(&format!("{prefix}{connector}{name}\n"));
                    }
                }
            }
        }
    }
}

enum TreeEntry<'a> {
    Dir(&'a str, &'a TreeNode),
    File(&'a str, u64),
}

/// Renders the bare ASCII tree (no header/footer) for embedding.
pub fn render_tree(files: &[FileRecord], show_sizes: bool) -> String {
    let mut root = TreeNode::default();
    for record in files {
        root.insert(&record.path, record.size);
    }
    let mut out = String::new();
    root.render("", &mut out, show_sizes);
    out
}

/// The standalone `tree` output format: base path header, the tree, and a
/// `N files, <size>` footer.
pub struct TreeFormatter;

impl DocumentFormatter for TreeFormatter {
    fn format(&self, value: &PipelineValue) -> Result<String> {
        let mut out = String::new();
        out.push_str(&value.base_path().display().to_string());
        out.push_str("\n\n");
        out.push_str(&render_tree(&value.files, true));
        out.push('\n');
        out.push_str(&format!(
            "{} files, {}\n",
            value.files.len(),
            humanize_size(total_size(value))
        ));
        Ok(out)
    }
}
