//! Rewrites detected secret spans.

use super::Finding;
use crate::config::RedactionMode;
use log::warn;

/// Applies redactions to `content` and returns the rewritten text plus the
/// number of spans actually rewritten.
///
/// Spans are resolved to byte ranges (directly from the finding, or from
/// its line/column coordinates), processed back-to-front so earlier ranges
/// stay valid, and clamped to character boundaries. Overlapping spans are
/// rewritten once. `RedactionMode::Off` returns the content untouched with
/// a zero count; the caller excludes the file instead.
pub fn apply_redactions(
    content: &str,
    findings: &[Finding],
    mode: RedactionMode,
) -> (String, usize) {
    if findings.is_empty() || mode == RedactionMode::Off {
        return (content.to_string(), 0);
    }

    let mut spans: Vec<(usize, usize, &Finding)> = findings
        .iter()
        .filter_map(|finding| {
            resolve_range(content, finding).map(|(start, end)| (start, end, finding))
        })
        .collect();
    spans.sort_by_key(|(start, end, _)| (*start, *end));

    // Merge overlaps, keeping the first finding's rule for the label.
    let mut merged: Vec<(usize, usize, &Finding)> = Vec::new();
    for (start, end, finding) in spans {
        match merged.last_mut() {
            Some((_, last_end, _)) if start < *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end, finding)),
        }
    }

    let mut result = content.to_string();
    let mut count = 0;
    for (start, end, finding) in merged.into_iter().rev() {
        let start = floor_char_boundary(&result, start);
        let end = ceil_char_boundary(&result, end);
        if start >= end || end > result.len() {
            warn!(
                "skipping out-of-range secret span in {} ({}..{})",
                finding.file, start, end
            );
            continue;
        }
        let replacement = match mode {
            RedactionMode::Typed => format!("<REDACTED:{}>", finding.rule_id),
            RedactionMode::LengthPreserving => {
                let chars = result[start..end].chars().count();
                "*".repeat(chars)
            }
            RedactionMode::Off => unreachable!("handled above"),
        };
        result.replace_range(start..end, &replacement);
        count += 1;
    }
    (result, count)
}

/// Resolves a finding to a byte range within `content`.
fn resolve_range(content: &str, finding: &Finding) -> Option<(usize, usize)> {
    if let Some(range) = finding.byte_range {
        return Some(range);
    }
    // External backends report 1-based line/column coordinates.
    let mut line_starts = vec![0usize];
    for (offset, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            line_starts.push(offset + 1);
        }
    }
    let start_line = line_starts.get(finding.line_start.checked_sub(1)?)?;
    let end_line = line_starts.get(finding.line_end.checked_sub(1)?)?;
    let start = start_line + finding.start_column.checked_sub(1)?;
    let end = end_line + finding.end_column.checked_sub(1)?;
    (start < end && end <= content.len()).then_some((start, end))
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}
