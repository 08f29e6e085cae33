//! Transform stage: per-file dispatch with bounded concurrency and
//! heavy-transform caching.

use crate::constants::TRANSFORM_ERROR_PREFIX;
use crate::core_types::FileContent;
use crate::errors::{Error, Result};
use crate::events::PipelineEvent;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::transform::cache::{CachedTransform, TransformCache};
use crate::transform::{TransformOutcome, Transformer, TransformerRegistry};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Dispatches each file to its selected transformer over a worker pool of
/// `max_concurrency`, consulting the injected cache for heavy transformers
/// and replacing failed files' content with an error sentinel.
///
/// The "active files" view exists only for progress display: workers
/// publish `FileStarted`/`FileFinished` events and maintain a bounded name
/// list; correctness never depends on it.
pub struct Transform {
    registry: Arc<TransformerRegistry>,
    cache: Option<TransformCache>,
}

impl Transform {
    /// The cache is injected here; `None` disables reuse entirely.
    pub fn new(registry: Arc<TransformerRegistry>, cache: Option<TransformCache>) -> Self {
        Self { registry, cache }
    }

    fn run_transformer(
        transformer: &dyn Transformer,
        record: &mut crate::core_types::FileRecord,
        options: &serde_json::Value,
        cache: Option<&TransformCache>,
        hits: &AtomicUsize,
        misses: &AtomicUsize,
    ) -> Result<TransformOutcome> {
        let heavy = transformer.traits().heavy;
        let Some(cache) = cache.filter(|_| heavy) else {
            return transformer.transform(record, options);
        };
        let key = record.content.as_ref().map(|content| {
            TransformCache::key(content.as_bytes(), transformer.name(), options)
        });

        if let Some(key) = &key {
            if let Some(cached) = cache.get(key) {
                debug!("{}: cache hit for {}", record.path, transformer.name());
                hits.fetch_add(1, Ordering::Relaxed);
                record.content = Some(FileContent::Text(cached.content));
                return Ok(if cached.transformed {
                    TransformOutcome::Applied
                } else {
                    TransformOutcome::Unchanged
                });
            }
        }
        misses.fetch_add(1, Ordering::Relaxed);
        let outcome = transformer.transform(record, options)?;
        if let (Some(key), Some(FileContent::Text(text))) = (&key, &record.content) {
            cache.put(
                key,
                &CachedTransform {
                    content: text.clone(),
                    transformed: outcome == TransformOutcome::Applied,
                },
            );
        }
        Ok(outcome)
    }
}

impl Stage for Transform {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()> {
        let max_concurrency = value.options.transform.max_concurrency.max(1);
        let profile = value.profile.clone();
        let cache = self.cache.as_ref();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency)
            .build()
            .map_err(|e| Error::Internal(format!("transform pool: {e}")))?;

        let transformed = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);
        let hits = AtomicUsize::new(0);
        let misses = AtomicUsize::new(0);
        let active: Mutex<Vec<String>> = Mutex::new(Vec::with_capacity(max_concurrency));
        let flush_needed: Mutex<HashSet<&'static str>> = Mutex::new(HashSet::new());

        pool.install(|| {
            value.files.par_iter_mut().for_each(|record| {
                if ctx.cancel.is_cancelled() {
                    return;
                }
                let Some(registration) = self.registry.select(record) else {
                    return;
                };
                let transformer = registration.transformer.as_ref();
                let name = transformer.name();
                if !profile.transformer_enabled(name) {
                    debug!("{}: transformer {name} disabled by profile", record.path);
                    return;
                }
                let options = profile.transformer_options(name);

                {
                    let mut active = active.lock().expect("active view lock poisoned");
                    active.push(record.path.clone());
                    active.truncate(max_concurrency);
                }
                ctx.events.emit(PipelineEvent::FileStarted {
                    stage: "transform",
                    path: record.path.clone(),
                });

                if transformer.traits().stateful {
                    flush_needed
                        .lock()
                        .expect("flush set lock poisoned")
                        .insert(name);
                }

                match Self::run_transformer(transformer, record, &options, cache, &hits, &misses)
                {
                    Ok(TransformOutcome::Applied) => {
                        record.transformed = true;
                        transformed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(TransformOutcome::AppliedUnmarked) => {
                        transformed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(TransformOutcome::Unchanged) => {}
                    Err(e) => {
                        warn!("transform of {} failed: {e}", record.path);
                        record.content = Some(FileContent::Text(format!(
                            "{TRANSFORM_ERROR_PREFIX}{e}]"
                        )));
                        record.error = Some(e.to_string());
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                ctx.events.emit(PipelineEvent::FileFinished {
                    stage: "transform",
                    path: record.path.clone(),
                });
                active
                    .lock()
                    .expect("active view lock poisoned")
                    .retain(|p| p != &record.path);
            });
        });

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Batch transformers flush once per stage run, after the loop.
        let names: Vec<&'static str> = flush_needed
            .into_inner()
            .expect("flush set lock poisoned")
            .into_iter()
            .collect();
        for name in names {
            if let Some(registration) = self
                .registry
                .entries()
                .iter()
                .find(|e| e.transformer.name() == name)
            {
                if let Err(e) = registration.transformer.flush(&mut value.files) {
                    warn!("flush of transformer {name} failed: {e}");
                    errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        value.stats.transformed = transformed.load(Ordering::Relaxed);
        value.stats.transform_errors = errors.load(Ordering::Relaxed);
        value.stats.cache_hits = hits.load(Ordering::Relaxed);
        value.stats.cache_misses = misses.load(Ordering::Relaxed);
        Ok(())
    }
}
