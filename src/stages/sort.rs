//! Sort stage: stable multi-key ordering with natural collation.

use crate::config::{SortKey, SortOrder};
use crate::core_types::FileRecord;
use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use std::cmp::Ordering;

/// Stable sort by the configured key and direction, with the path as the
/// ascending tie-breaker. String keys compare naturally (digit runs as
/// numbers) and case-insensitively.
pub struct Sort;

/// Natural, case-insensitive string comparison: digit runs compare as
/// numbers (`file2` < `file10`), everything else by lowercased characters.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b), // total order for stability
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => {
                if lc.is_ascii_digit() && rc.is_ascii_digit() {
                    let lnum = take_number(&mut left);
                    let rnum = take_number(&mut right);
                    match lnum.cmp(&rnum) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    let lfold = lc.to_lowercase();
                    let rfold = rc.to_lowercase();
                    match lfold.cmp(rfold) {
                        Ordering::Equal => {
                            left.next();
                            right.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u128 {
    let mut value: u128 = 0;
    while let Some(c) = chars.peek().copied() {
        let Some(digit) = c.to_digit(10) else { break };
        value = value.saturating_mul(10).saturating_add(u128::from(digit));
        chars.next();
    }
    value
}

fn compare_by_key(a: &FileRecord, b: &FileRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Path => natural_cmp(&a.path, &b.path),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Modified => a.modified.cmp(&b.modified),
        SortKey::Name => natural_cmp(a.file_name(), b.file_name()),
        SortKey::Extension => natural_cmp(&a.extension(), &b.extension()),
        SortKey::Depth => a.depth().cmp(&b.depth()),
    }
}

impl Stage for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let key = value.options.limit.sort_key;
        let order = value.options.limit.sort_order;
        value.files.sort_by(|a, b| {
            let primary = compare_by_key(a, b, key);
            let primary = match order {
                SortOrder::Ascending => primary,
                SortOrder::Descending => primary.reverse(),
            };
            // Path ties ascend regardless of direction, keeping output
            // deterministic when keys collide.
            primary.then_with(|| natural_cmp(&a.path, &b.path))
        });
        Ok(())
    }
}
