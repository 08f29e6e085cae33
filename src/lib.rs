//! copytree materializes a directory tree into a single structured
//! document (XML, JSON, Markdown, or ASCII tree) for AI and code-analysis
//! consumers.
//!
//! The library is a staged pipeline: discovery walks the tree through
//! layered ignore rules, filter stages narrow the set, loading and
//! transform stages shape content, and a formatter emits one document.
//! [`run`] drives the standard plans; embedders can compose their own
//! stage lists through [`pipeline::Pipeline`].

pub mod cancellation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod errors;
pub mod events;
pub mod exec;
pub mod gitio;
pub mod ignore;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod secrets;
pub mod stages;
pub mod transform;
pub mod walk;

pub use cancellation::CancellationToken;
pub use errors::{Error, Result};

use crate::config::Options;
use crate::core_types::PipelineStats;
use crate::events::EventSink;
use crate::output::writer::setup_writer;
use crate::pipeline::{PipelineValue, StageContext};
use crate::profile::Profile;
use crate::stages::{standard_plan, ExternalSourceResolver, LocalPathResolver, PlanKind};
use log::info;
use std::io::Write;
use std::sync::Arc;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Cumulative per-stage counters.
    pub stats: PipelineStats,
    /// Size in bytes of the rendered document (0 for dry runs and
    /// streaming, where bytes go straight to the destination).
    pub output_size: usize,
}

/// Runs the standard pipeline for the given options and profile, writing
/// the document to the configured destination.
///
/// # Errors
///
/// Returns the first unrecovered error: configuration problems, a missing
/// scan root, `fail_on_secrets` findings, I/O failures at the destination,
/// or cancellation.
pub fn run(
    options: Options,
    profile: Profile,
    events: EventSink,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    run_with_resolver(options, profile, events, cancel, Arc::new(LocalPathResolver))
}

/// [`run`] with a custom external-source resolver (e.g. one that clones
/// remote repositories into a keyed temp directory).
pub fn run_with_resolver(
    options: Options,
    profile: Profile,
    events: EventSink,
    cancel: CancellationToken,
    resolver: Arc<dyn ExternalSourceResolver>,
) -> Result<RunOutcome> {
    let kind = PlanKind::for_options(&options);
    info!(
        "starting copytree run over {} ({:?} plan)",
        options.base_path.display(),
        kind
    );

    let pipeline = standard_plan(kind, &options, &profile, resolver);
    let ctx = StageContext::new(events, cancel);
    let show_info = options.info;
    let destination = options.render.destination.clone();

    let value = PipelineValue::new(Arc::new(options), Arc::new(profile));
    let value = pipeline.run(value, &ctx)?;

    let mut output_size = 0;
    match kind {
        PlanKind::DryRun => {
            let mut writer = setup_writer(&destination)?;
            output::dry_run::write_dry_run(&value, writer.as_mut())?;
        }
        PlanKind::Streamed => {
            // The streaming stage already delivered the bytes.
        }
        PlanKind::Full | PlanKind::TreeOnly => {
            let rendered = value
                .output
                .as_ref()
                .ok_or_else(|| Error::Internal("formatter produced no output".into()))?;
            output_size = rendered.size;
            let mut writer = setup_writer(&destination)?;
            writer
                .write_all(rendered.text.as_bytes())
                .map_err(|e| errors::io_error_with_path(e, "<output>"))?;
            writer
                .flush()
                .map_err(|e| errors::io_error_with_path(e, "<output>"))?;
        }
    }

    if show_info {
        print_stats(&value.stats, output_size);
    }
    info!("copytree run complete ({output_size} bytes)");
    Ok(RunOutcome {
        stats: value.stats,
        output_size,
    })
}

/// Per-stage statistics on stderr for `--info`.
fn print_stats(stats: &PipelineStats, output_size: usize) {
    eprintln!("copytree run statistics:");
    eprintln!("  discovered:          {}", stats.discovered);
    if stats.force_included > 0 {
        eprintln!("  force-included:      {}", stats.force_included);
    }
    if stats.external_merged > 0 {
        eprintln!("  external merged:     {}", stats.external_merged);
    }
    eprintln!("  excluded by profile: {}", stats.excluded_by_profile);
    if stats.git_filtered_out > 0 {
        eprintln!("  git filtered out:    {}", stats.git_filtered_out);
    }
    eprintln!("  loaded:              {}", stats.loaded);
    if stats.binaries_detected > 0 {
        eprintln!(
            "  binaries:            {} ({} skipped)",
            stats.binaries_detected, stats.binaries_skipped
        );
    }
    let secrets = &stats.secrets_guard;
    if secrets.files_scanned > 0 {
        eprintln!(
            "  secrets guard:       {} scanned, {} redacted, {} excluded",
            secrets.files_scanned, secrets.secrets_redacted, secrets.files_excluded
        );
    }
    if stats.transformed > 0 || stats.transform_errors > 0 {
        eprintln!(
            "  transformed:         {} ({} errors, {} cache hits)",
            stats.transformed, stats.transform_errors, stats.cache_hits
        );
    }
    if stats.duplicates_dropped > 0 {
        eprintln!("  duplicates dropped:  {}", stats.duplicates_dropped);
    }
    if stats.truncated_files > 0 || stats.skipped_by_limit > 0 {
        eprintln!(
            "  char limit:          {} truncated, {} skipped",
            stats.truncated_files, stats.skipped_by_limit
        );
    }
    eprintln!("  output size:         {output_size} bytes");
}
