//! File-loading stage: materialize content, classify text vs binary,
//! apply the binary policy.

use crate::config::BinaryPolicy;
use crate::constants::{BINARY_PLACEHOLDER, DECODE_ERROR_SENTINEL};
use crate::core_types::{
    has_binary_extension, BinaryCategory, ContentEncoding, FileContent, FileRecord,
};
use crate::errors::{Error, Result};
use crate::pipeline::{PipelineValue, Stage, StageContext};
use base64::Engine;
use content_inspector::{inspect, ContentType};
use log::{debug, warn};
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loads every record's content in parallel (bounded), sniffing a head
/// sample for binary detection and applying the configured binary policy.
pub struct FileLoading;

enum LoadDecision {
    Keep,
    Drop,
}

impl FileLoading {
    fn load_one(
        record: &mut FileRecord,
        sample_bytes: usize,
        threshold: f64,
        policy: BinaryPolicy,
    ) -> Result<LoadDecision> {
        let mut file = File::open(&record.absolute_path)
            .map_err(|e| crate::errors::io_error_with_path(e, &record.absolute_path))?;
        let mut sample = vec![0u8; sample_bytes.min(record.size as usize).max(1)];
        let read = file
            .read(&mut sample)
            .map_err(|e| crate::errors::io_error_with_path(e, &record.absolute_path))?;
        sample.truncate(read);

        let is_binary = has_binary_extension(std::path::Path::new(&record.path))
            || inspect(&sample) == ContentType::BINARY
            || non_printable_ratio(&sample) > threshold;

        if !is_binary {
            drop(file);
            let bytes = std::fs::read(&record.absolute_path)
                .map_err(|e| crate::errors::io_error_with_path(e, &record.absolute_path))?;
            match String::from_utf8(bytes) {
                Ok(text) => {
                    record.content = Some(FileContent::Text(text));
                    record.encoding = ContentEncoding::Utf8;
                }
                Err(_) => {
                    debug!("{}: undecodable text, using sentinel", record.path);
                    record.content = Some(FileContent::Text(DECODE_ERROR_SENTINEL.to_string()));
                    record.encoding = ContentEncoding::Utf8;
                    record.error = Some("invalid text encoding".to_string());
                }
            }
            return Ok(LoadDecision::Keep);
        }

        record.is_binary = true;
        record.binary_category = Some(BinaryCategory::from_path(std::path::Path::new(
            &record.path,
        )));

        let convertible = record
            .binary_category
            .is_some_and(|c| c.is_convertible());

        match policy {
            BinaryPolicy::Convert if convertible => {
                drop(file);
                let bytes = std::fs::read(&record.absolute_path)
                    .map_err(|e| crate::errors::io_error_with_path(e, &record.absolute_path))?;
                record.content = Some(FileContent::Bytes(bytes));
                record.encoding = ContentEncoding::Binary;
                Ok(LoadDecision::Keep)
            }
            BinaryPolicy::Base64 => {
                drop(file);
                let bytes = std::fs::read(&record.absolute_path)
                    .map_err(|e| crate::errors::io_error_with_path(e, &record.absolute_path))?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                record.content = Some(FileContent::Text(encoded));
                record.encoding = ContentEncoding::Base64;
                Ok(LoadDecision::Keep)
            }
            BinaryPolicy::Skip => Ok(LoadDecision::Drop),
            BinaryPolicy::Comment => {
                record.content = Some(FileContent::Text(String::new()));
                record.encoding = ContentEncoding::Binary;
                record.excluded_reason = Some("binary file".to_string());
                Ok(LoadDecision::Keep)
            }
            // `Convert` for a non-convertible category degrades to the
            // placeholder.
            BinaryPolicy::Placeholder | BinaryPolicy::Convert => {
                record.content = Some(FileContent::Text(BINARY_PLACEHOLDER.to_string()));
                record.encoding = ContentEncoding::Binary;
                Ok(LoadDecision::Keep)
            }
        }
    }
}

impl Stage for FileLoading {
    fn name(&self) -> &'static str {
        "file-loading"
    }

    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()> {
        let loading = value.options.loading.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(loading.concurrency.max(1))
            .build()
            .map_err(|e| Error::Internal(format!("loading pool: {e}")))?;

        let binaries = AtomicUsize::new(0);
        let dropped = AtomicUsize::new(0);

        let mut drop_flags = vec![false; value.files.len()];
        pool.install(|| {
            value
                .files
                .par_iter_mut()
                .zip(drop_flags.par_iter_mut())
                .for_each(|(record, drop_flag)| {
                    if ctx.cancel.is_cancelled() {
                        return;
                    }
                    match Self::load_one(
                        record,
                        loading.sample_bytes,
                        loading.non_printable_threshold,
                        loading.binary_policy,
                    ) {
                        Ok(LoadDecision::Keep) => {
                            if record.is_binary {
                                binaries.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Ok(LoadDecision::Drop) => {
                            binaries.fetch_add(1, Ordering::Relaxed);
                            dropped.fetch_add(1, Ordering::Relaxed);
                            *drop_flag = true;
                        }
                        Err(e) => {
                            warn!("could not load {}: {e}", record.path);
                            *drop_flag = true;
                        }
                    }
                });
        });

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut keep = drop_flags.iter().map(|d| !d);
        value.files.retain(|_| keep.next().unwrap_or(true));

        value.stats.binaries_detected = binaries.load(Ordering::Relaxed);
        value.stats.binaries_skipped = dropped.load(Ordering::Relaxed);
        value.stats.loaded = value.files.len();
        Ok(())
    }
}

/// Share of bytes in the sample outside printable ASCII, tab, CR, and LF.
fn non_printable_ratio(sample: &[u8]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let non_printable = sample
        .iter()
        .filter(|&&b| b != b'\t' && b != b'\n' && b != b'\r' && (b < 0x20 || b == 0x7f))
        .count();
    non_printable as f64 / sample.len() as f64
}
