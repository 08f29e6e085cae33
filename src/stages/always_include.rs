//! Always-include annotation stage.

use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::profile::PatternSet;
use log::debug;

/// Tags files whose path matches an `always` pattern (glob, exact path, or
/// basename). Adds no files; the annotation protects those already present
/// from later filter stages.
pub struct AlwaysInclude;

impl Stage for AlwaysInclude {
    fn name(&self) -> &'static str {
        "always-include"
    }

    fn should_apply(&self, value: &PipelineValue) -> bool {
        !value.profile.always.is_empty() || !value.options.filtering.always.is_empty()
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let patterns: Vec<String> = value
            .profile
            .always
            .iter()
            .chain(value.options.filtering.always.iter())
            .cloned()
            .collect();
        let set = PatternSet::compile(patterns);
        let mut tagged = 0;
        for record in &mut value.files {
            if set.matches_loose(&record.path) {
                record.always_include = true;
                tagged += 1;
            }
        }
        debug!("tagged {tagged} always-include file(s)");
        Ok(())
    }
}
