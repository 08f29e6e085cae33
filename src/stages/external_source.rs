//! External-source merge stage.
//!
//! Profiles can pull additional roots into the scan. Resolving a source
//! (cloning a repository, expanding a URL) is the collaborator's job,
//! expressed by [`ExternalSourceResolver`]; this stage walks whatever
//! local path the resolver produced, applies the entry's include rules,
//! prefixes the configured destination, and merges. On path collisions the
//! merged record wins (last writer by composition order).

use crate::core_types::FileRecord;
use crate::errors::{Error, Result};
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::profile::{ExternalEntry, PatternSet};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Resolves an external source description to a local directory.
///
/// Implementations may clone repositories into a keyed temp directory and
/// return that path; the pipeline never sees the transport.
pub trait ExternalSourceResolver: Send + Sync {
    /// Returns a local directory containing the source's files.
    fn resolve(&self, source: &str) -> Result<PathBuf>;
}

/// Resolver for sources that are already local paths. Anything that looks
/// like a URL is refused; wiring a cloning resolver is the caller's choice.
pub struct LocalPathResolver;

impl ExternalSourceResolver for LocalPathResolver {
    fn resolve(&self, source: &str) -> Result<PathBuf> {
        if source.contains("://") || source.starts_with("git@") {
            return Err(Error::Config(format!(
                "external source '{source}' requires a cloning resolver"
            )));
        }
        let path = PathBuf::from(source);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(Error::NotAPath(path))
        }
    }
}

/// Merges files from each profile `external` entry.
pub struct ExternalSource {
    resolver: Arc<dyn ExternalSourceResolver>,
}

impl ExternalSource {
    pub fn new(resolver: Arc<dyn ExternalSourceResolver>) -> Self {
        Self { resolver }
    }

    fn collect_entry(&self, entry: &ExternalEntry) -> Result<Vec<FileRecord>> {
        let root = self.resolver.resolve(&entry.source)?;
        let root = root
            .canonicalize()
            .map_err(|_| Error::NotAPath(root.clone()))?;
        let rules = PatternSet::compile(&entry.rules);
        let destination = entry.destination.trim_matches('/');

        let mut records = Vec::new();
        for walked in WalkDir::new(&root) {
            let walked = match walked {
                Ok(walked) => walked,
                Err(e) => {
                    warn!("external source {}: {e}", entry.source);
                    continue;
                }
            };
            if !walked.file_type().is_file() {
                continue;
            }
            let Ok(rel) = walked.path().strip_prefix(&root) else {
                continue;
            };
            let rel_str = crate::ignore::normalize_rel(rel);
            if rel_str.is_empty() {
                continue;
            }
            if !rules.is_empty() && !rules.matches(&rel_str) {
                continue;
            }
            let Ok(meta) = walked.metadata() else { continue };
            let merged_path = if destination.is_empty() {
                rel_str
            } else {
                format!("{destination}/{rel_str}")
            };
            let mut record = FileRecord::new(
                merged_path,
                walked.path().to_path_buf(),
                meta.len(),
                meta.modified().ok(),
            );
            record.is_external = true;
            record.external_source = Some(entry.source.clone());
            records.push(record);
        }
        Ok(records)
    }
}

impl Stage for ExternalSource {
    fn name(&self) -> &'static str {
        "external-source"
    }

    fn should_apply(&self, value: &PipelineValue) -> bool {
        !value.profile.external.is_empty()
    }

    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()> {
        let profile = value.profile.clone();
        for entry in &profile.external {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let records = match self.collect_entry(entry) {
                Ok(records) => records,
                Err(e) if entry.optional => {
                    warn!("optional external source '{}' skipped: {e}", entry.source);
                    continue;
                }
                Err(e) => return Err(e),
            };
            info!(
                "merged {} file(s) from external source '{}'",
                records.len(),
                entry.source
            );
            value.stats.external_merged += records.len();
            merge_last_writer_wins(&mut value.files, records);
        }
        Ok(())
    }
}

/// Replaces same-path records with the incoming ones, appending the rest.
fn merge_last_writer_wins(files: &mut Vec<FileRecord>, incoming: Vec<FileRecord>) {
    for record in incoming {
        if let Some(existing) = files.iter_mut().find(|f| f.path == record.path) {
            *existing = record;
        } else {
            files.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsBuilder;
    use crate::profile::Profile;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn value_with_profile(profile: Profile) -> PipelineValue {
        let options = OptionsBuilder::new(".").without_env_overrides().build().unwrap();
        PipelineValue::new(Arc::new(options), Arc::new(profile))
    }

    #[test]
    fn merges_external_files_under_destination() {
        let dir = std::env::temp_dir().join(format!("ct-ext-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write(&dir, "proto/api.proto", "syntax");
        write(&dir, "notes.md", "n");

        let profile = Profile {
            external: vec![ExternalEntry {
                source: dir.to_string_lossy().into_owned(),
                destination: "shared".into(),
                rules: vec!["**/*.proto".into()],
                optional: false,
            }],
            ..Profile::default()
        };
        let mut value = value_with_profile(profile);
        ExternalSource::new(Arc::new(LocalPathResolver))
            .process(&mut value, &StageContext::headless())
            .unwrap();

        assert_eq!(value.files.len(), 1);
        let record = &value.files[0];
        assert_eq!(record.path, "shared/proto/api.proto");
        assert!(record.is_external);
        assert_eq!(value.stats.external_merged, 1);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn optional_missing_source_is_skipped() {
        let profile = Profile {
            external: vec![ExternalEntry {
                source: "/nonexistent/path".into(),
                destination: "x".into(),
                rules: Vec::new(),
                optional: true,
            }],
            ..Profile::default()
        };
        let mut value = value_with_profile(profile);
        ExternalSource::new(Arc::new(LocalPathResolver))
            .process(&mut value, &StageContext::headless())
            .unwrap();
        assert!(value.files.is_empty());
    }

    #[test]
    fn required_missing_source_fails() {
        let profile = Profile {
            external: vec![ExternalEntry {
                source: "/nonexistent/path".into(),
                destination: "x".into(),
                rules: Vec::new(),
                optional: false,
            }],
            ..Profile::default()
        };
        let mut value = value_with_profile(profile);
        let err = ExternalSource::new(Arc::new(LocalPathResolver))
            .process(&mut value, &StageContext::headless())
            .unwrap_err();
        assert!(matches!(err, Error::NotAPath(_)));
    }

    #[test]
    fn collisions_are_last_writer_wins() {
        let mut files = vec![FileRecord::new(
            "shared/a.txt".into(),
            PathBuf::from("/local/shared/a.txt"),
            1,
            None,
        )];
        let mut incoming = FileRecord::new(
            "shared/a.txt".into(),
            PathBuf::from("/ext/a.txt"),
            2,
            None,
        );
        incoming.is_external = true;
        merge_last_writer_wins(&mut files, vec![incoming]);
        assert_eq!(files.len(), 1);
        assert!(files[0].is_external);
        assert_eq!(files[0].size, 2);
    }

    #[test]
    fn url_sources_need_a_cloning_resolver() {
        let err = LocalPathResolver
            .resolve("https://github.com/acme/widgets.git")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
