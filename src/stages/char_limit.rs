//! Budget stage: head cap, global character limit, total byte cap.

use crate::constants::TRUNCATION_MARKER;
use crate::core_types::FileContent;
use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use log::debug;

/// Enforces the output budgets, in order: `--head N` keeps the first N
/// files; the character limit walks files in their current (sorted) order,
/// truncating the boundary file to fill the remaining budget exactly
/// (marker appended on top) and dropping everything after it; the total
/// byte cap drops whole files past the threshold.
///
/// Characters are Unicode code points.
pub struct CharLimit;

impl Stage for CharLimit {
    fn name(&self) -> &'static str {
        "char-limit"
    }

    fn should_apply(&self, value: &PipelineValue) -> bool {
        let limit = &value.options.limit;
        limit.head.is_some() || limit.char_limit.is_some() || limit.max_total_bytes.is_some()
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let limits = value.options.limit.clone();

        if let Some(head) = limits.head {
            if value.files.len() > head {
                value.stats.head_dropped = value.files.len() - head;
                value.files.truncate(head);
                debug!("head cap kept first {head} file(s)");
            }
        }

        if let Some(limit) = limits.char_limit {
            let mut used = 0usize;
            let mut cut_at = None;
            for (index, record) in value.files.iter_mut().enumerate() {
                let chars = record.char_count();
                if used + chars <= limit {
                    used += chars;
                    continue;
                }
                let remaining = limit - used;
                if remaining == 0 {
                    cut_at = Some(index);
                    break;
                }
                if let Some(text) = record.content_str() {
                    let mut clipped: String = text.chars().take(remaining).collect();
                    clipped.push_str(TRUNCATION_MARKER);
                    record.content = Some(FileContent::Text(clipped));
                    record.truncated = true;
                    record.original_length = Some(chars);
                    value.stats.truncated_files += 1;
                    cut_at = Some(index + 1);
                } else {
                    // A binary record cannot be partially included.
                    cut_at = Some(index);
                }
                break;
            }
            if let Some(cut) = cut_at {
                value.stats.skipped_by_limit += value.files.len() - cut;
                value.files.truncate(cut);
            }
        }

        if let Some(max_bytes) = limits.max_total_bytes {
            let mut used = 0u64;
            let mut cut_at = value.files.len();
            for (index, record) in value.files.iter().enumerate() {
                let bytes = record
                    .content
                    .as_ref()
                    .map_or(0, |c| c.as_bytes().len() as u64);
                if used + bytes > max_bytes {
                    cut_at = index;
                    break;
                }
                used += bytes;
            }
            if cut_at < value.files.len() {
                value.stats.skipped_by_limit += value.files.len() - cut_at;
                value.files.truncate(cut_at);
            }
        }

        Ok(())
    }
}
