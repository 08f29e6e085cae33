//! Profile filter stage: the include gate and the exclude sweep.

use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::profile::ProfileMatcher;
use log::debug;

/// Applies the profile's include and exclude patterns (plus any CLI
/// overrides) in the strict order: files protected by `always` patterns
/// are exempt from both gates; otherwise a non-empty include set must
/// match, then any exclude match drops the file.
pub struct ProfileFilter;

impl Stage for ProfileFilter {
    fn name(&self) -> &'static str {
        "profile-filter"
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let matcher = ProfileMatcher::new(
            &value.profile,
            &value.options.filtering.filter,
            &value.options.filtering.exclude,
            &value.options.filtering.always,
        );

        let before = value.files.len();
        value.files.retain(|record| {
            if matcher.is_always(&record.path) {
                return true;
            }
            if !matcher.is_included(&record.path) {
                debug!("{}: no include pattern matched", record.path);
                return false;
            }
            if matcher.is_excluded(&record.path) {
                debug!("{}: excluded", record.path);
                return false;
            }
            true
        });
        value.stats.excluded_by_profile = before - value.files.len();
        Ok(())
    }
}
