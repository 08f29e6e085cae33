//! Secrets guard stage: scan loaded content, redact or exclude.

use crate::config::RedactionMode;
use crate::core_types::{FileContent, SanitizedFinding};
use crate::errors::{Error, Result};
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::profile::PatternSet;
use crate::secrets::{
    apply_redactions, build_scanners, hard_deny_match, merge_by_span, Finding, SecretScanner,
};
use log::{debug, warn};
use rayon::prelude::*;
use std::sync::Mutex;

/// Runs after loading (it needs content). Hard-denied filenames are
/// excluded outright; allowlisted, binary, and oversized files are
/// skipped; everything else is scanned by the configured engines and
/// redacted in place. With `fail_on_secrets`, any finding aborts the run
/// with a sanitized summary.
pub struct SecretsGuard;

enum GuardVerdict {
    Clean,
    Redacted(usize, Vec<SanitizedFinding>),
    Exclude,
    ExcludeWithFindings(Vec<SanitizedFinding>),
}

impl SecretsGuard {
    fn guard_one(
        record: &mut crate::core_types::FileRecord,
        scanners: &[Box<dyn SecretScanner>],
        allowlist: &PatternSet,
        max_file_bytes: u64,
        redaction: RedactionMode,
    ) -> GuardVerdict {
        if let Some(pattern) = hard_deny_match(&record.path) {
            debug!("{}: hard-denied by '{pattern}'", record.path);
            return GuardVerdict::Exclude;
        }
        if allowlist.matches(&record.path) {
            return GuardVerdict::Clean;
        }
        if record.is_binary || record.size > max_file_bytes {
            return GuardVerdict::Clean;
        }
        let Some(content) = record.content_str().map(str::to_string) else {
            return GuardVerdict::Clean;
        };

        let mut findings: Vec<Finding> = Vec::new();
        for scanner in scanners {
            match scanner.scan(&record.path, &content) {
                Ok(found) => findings.extend(found),
                Err(e) => {
                    // A broken backend must not leak files unscanned by the
                    // other backend; it degrades to that backend's view.
                    warn!("secret scanner '{}' failed on {}: {e}", scanner.name(), record.path);
                }
            }
        }
        if findings.is_empty() {
            return GuardVerdict::Clean;
        }
        let findings = merge_by_span(findings);
        let sanitized: Vec<SanitizedFinding> = findings
            .iter()
            .map(|f| SanitizedFinding {
                file: f.file.clone(),
                line: f.line_start,
                rule: f.rule_id.clone(),
            })
            .collect();

        if redaction == RedactionMode::Off {
            return GuardVerdict::ExcludeWithFindings(sanitized);
        }

        let (redacted, count) = apply_redactions(&content, &findings, redaction);
        record.content = Some(FileContent::Text(redacted));
        record.secrets_redacted = true;
        record.secrets_count = count;
        GuardVerdict::Redacted(count, sanitized)
    }
}

impl Stage for SecretsGuard {
    fn name(&self) -> &'static str {
        "secrets-guard"
    }

    fn should_apply(&self, value: &PipelineValue) -> bool {
        value.options.secrets.engine != crate::config::SecretsEngine::Off
    }

    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()> {
        let secrets = value.options.secrets.clone();
        let timeout = value.options.subprocess_timeout;
        let scanners = build_scanners(&secrets, timeout);
        let allowlist = PatternSet::compile(&secrets.allowlist);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(secrets.concurrency.max(1))
            .build()
            .map_err(|e| Error::Internal(format!("secrets pool: {e}")))?;

        let collected: Mutex<(usize, usize, Vec<SanitizedFinding>)> =
            Mutex::new((0, 0, Vec::new()));
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
                    let verdict = Self::guard_one(
                        record,
                        &scanners,
                        &allowlist,
                        secrets.max_file_bytes,
                        secrets.redaction,
                    );
                    let mut collected = collected.lock().expect("secrets stats lock poisoned");
                    match verdict {
                        GuardVerdict::Clean => {}
                        GuardVerdict::Redacted(count, sanitized) => {
                            collected.0 += count;
                            collected.2.extend(sanitized);
                        }
                        GuardVerdict::Exclude => {
                            collected.1 += 1;
                            *drop_flag = true;
                        }
                        GuardVerdict::ExcludeWithFindings(sanitized) => {
                            collected.1 += 1;
                            collected.2.extend(sanitized);
                            *drop_flag = true;
                        }
                    }
                });
        });

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let scanned = value.files.len();
        let mut keep = drop_flags.iter().map(|d| !d);
        value.files.retain(|_| keep.next().unwrap_or(true));

        let (redacted, excluded, findings) =
            collected.into_inner().expect("secrets stats lock poisoned");
        value.stats.secrets_guard.files_scanned = scanned;
        value.stats.secrets_guard.secrets_redacted = redacted;
        value.stats.secrets_guard.files_excluded = excluded;
        value.stats.secrets_guard.findings = findings;

        if secrets.fail_on_secrets && !value.stats.secrets_guard.findings.is_empty() {
            let findings = &value.stats.secrets_guard.findings;
            let summary = findings
                .iter()
                .map(|f| format!("{}:{} {}", f.file, f.line, f.rule))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::SecretsDetected {
                count: findings.len(),
                summary,
            });
        }
        Ok(())
    }
}
