//! The pipeline stages and the standard plans that compose them.

mod always_include;
mod char_limit;
mod dedup;
mod external_source;
mod file_discovery;
mod file_loading;
mod git_filter;
mod output_formatting;
mod profile_filter;
mod secrets_guard;
mod sort;
mod streaming_output;
mod transform;

pub use always_include::AlwaysInclude;
pub use char_limit::CharLimit;
pub use dedup::Dedup;
pub use external_source::{ExternalSource, ExternalSourceResolver, LocalPathResolver};
pub use file_discovery::FileDiscovery;
pub use file_loading::FileLoading;
pub use git_filter::GitFilter;
pub use output_formatting::OutputFormatting;
pub use profile_filter::ProfileFilter;
pub use secrets_guard::SecretsGuard;
pub use sort::Sort;
pub use streaming_output::StreamingOutput;
pub use transform::Transform;

use crate::config::{Options, OutputDestination};
use crate::pipeline::Pipeline;
use crate::profile::Profile;
use crate::transform::cache::TransformCache;
use crate::transform::TransformerRegistry;
use log::warn;
use std::sync::Arc;

/// Which standard stage composition to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Everything: discovery through formatting.
    Full,
    /// Structure only: no loading, guarding, or transforming.
    TreeOnly,
    /// Full processing, but the formatter streams straight to the
    /// destination instead of assembling a document in memory.
    Streamed,
    /// Discovery and filtering only; the caller renders the listing.
    DryRun,
}

impl PlanKind {
    /// Selects the plan the options ask for.
    pub fn for_options(options: &Options) -> Self {
        if options.dry_run {
            PlanKind::DryRun
        } else if options.render.only_tree {
            PlanKind::TreeOnly
        } else if options.render.destination == OutputDestination::Stream {
            PlanKind::Streamed
        } else {
            PlanKind::Full
        }
    }
}

/// Builds the registry for a run: builtin transformers with the profile's
/// selection criteria grafted on.
pub fn registry_for_profile(profile: &Profile) -> TransformerRegistry {
    let mut registry = TransformerRegistry::builtin();
    for (name, config) in &profile.transformers {
        registry.apply_profile_selectors(name, &config.options);
    }
    registry
}

/// Composes the standard plan of the given kind.
///
/// The cache is injected here (and only here): stages never reach for
/// process-wide state. A `None` cache disables reuse but not transforms.
pub fn standard_plan(
    kind: PlanKind,
    options: &Options,
    profile: &Profile,
    resolver: Arc<dyn ExternalSourceResolver>,
) -> Pipeline {
    let cache = if options.transform.no_cache {
        None
    } else {
        match TransformCache::open_default(options.transform.cache_ttl) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("transform cache unavailable: {e}");
                None
            }
        }
    };
    standard_plan_with_cache(kind, options, profile, resolver, cache)
}

/// Like [`standard_plan`], with an explicit cache (used by tests).
pub fn standard_plan_with_cache(
    kind: PlanKind,
    options: &Options,
    profile: &Profile,
    resolver: Arc<dyn ExternalSourceResolver>,
    cache: Option<TransformCache>,
) -> Pipeline {
    let registry = Arc::new(registry_for_profile(profile));

    let mut stages: Vec<Box<dyn crate::pipeline::Stage>> = vec![
        Box::new(FileDiscovery),
        Box::new(ExternalSource::new(resolver)),
        Box::new(ProfileFilter),
        Box::new(AlwaysInclude),
        Box::new(GitFilter),
    ];

    match kind {
        PlanKind::TreeOnly | PlanKind::DryRun => {
            stages.push(Box::new(Sort));
        }
        PlanKind::Full | PlanKind::Streamed => {
            stages.push(Box::new(FileLoading));
            stages.push(Box::new(SecretsGuard));
            stages.push(Box::new(Transform::new(registry, cache)));
            stages.push(Box::new(Dedup));
            stages.push(Box::new(Sort));
            stages.push(Box::new(CharLimit));
        }
    }

    match kind {
        PlanKind::Full | PlanKind::TreeOnly => {
            stages.push(Box::new(OutputFormatting));
        }
        PlanKind::Streamed => {
            stages.push(Box::new(StreamingOutput));
        }
        PlanKind::DryRun => {}
    }

    Pipeline::new(stages).continue_on_error(options.continue_on_error)
}
