//! Line-number prefixing for rendered content.

use crate::constants::LINE_NUMBER_WIDTH;

/// Prefixes every line with a right-aligned, 1-based index (`%4d: `).
pub fn with_line_numbers(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + content.len() / 8);
    for (index, line) in content.lines().enumerate() {
        out.push_str(&format!(
            "{:>width$}: {line}\n",
            index + 1,
            width = LINE_NUMBER_WIDTH
        ));
    }
    // A trailing newline-less last line was still numbered; keep parity
    // with the input's final newline.
    if !content.ends_with('\n') && !out.is_empty() {
        out.pop();
    }
    out
}
