//! Dedup stage: drop files whose content hashes equal an earlier file's.

use crate::core_types::FileContent;
use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Content dedup: the first occurrence wins, later duplicates are dropped
/// and counted. The walker emits in no particular order, so "first" is
/// defined over natural path order, which keeps the surviving record
/// deterministic run to run. Files without loaded content pass through
/// untouched. Runs after the transform stage, so identical transformed
/// outputs collapse.
pub struct Dedup;

/// SHA-256 of a record's content bytes.
pub(crate) fn content_hash(content: &FileContent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

impl Stage for Dedup {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        value
            .files
            .sort_by(|a, b| super::sort::natural_cmp(&a.path, &b.path));
        let mut seen: HashSet<String> = HashSet::new();
        let before = value.files.len();
        value.files.retain(|record| match &record.content {
            None => true,
            Some(content) => {
                let hash = content_hash(content);
                if seen.insert(hash) {
                    true
                } else {
                    debug!("{}: duplicate content, dropped", record.path);
                    false
                }
            }
        });
        value.stats.duplicates_dropped += before - value.files.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsBuilder;
    use crate::core_types::FileRecord;
    use crate::profile::Profile;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn file(path: &str, content: Option<&str>) -> FileRecord {
        let mut record = FileRecord::new(path.into(), PathBuf::from("/r").join(path), 0, None);
        record.content = content.map(|c| FileContent::Text(c.into()));
        record
    }

    fn run(files: Vec<FileRecord>) -> PipelineValue {
        let options = OptionsBuilder::new(".").without_env_overrides().build().unwrap();
        let mut value = PipelineValue::new(Arc::new(options), Arc::new(Profile::everything()));
        value.files = files;
        Dedup.process(&mut value, &StageContext::headless()).unwrap();
        value
    }

    #[test]
    fn first_occurrence_wins() {
        let value = run(vec![
            file("a.txt", Some("A")),
            file("b.txt", Some("A")),
            file("c.txt", Some("B")),
        ]);
        let kept: Vec<&str> = value.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(kept, vec!["a.txt", "c.txt"]);
        assert_eq!(value.stats.duplicates_dropped, 1);
    }

    #[test]
    fn files_without_content_pass_through() {
        let value = run(vec![file("a.txt", None), file("b.txt", None)]);
        assert_eq!(value.files.len(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut value = run(vec![
            file("a.txt", Some("same")),
            file("b.txt", Some("same")),
        ]);
        assert_eq!(value.files.len(), 1);
        let dropped_after_first = value.stats.duplicates_dropped;
        Dedup.process(&mut value, &StageContext::headless()).unwrap();
        assert_eq!(value.files.len(), 1);
        assert_eq!(value.stats.duplicates_dropped, dropped_after_first);
    }

    #[test]
    fn identical_bytes_collide_across_content_kinds() {
        let mut binary = file("blob", None);
        binary.content = Some(FileContent::Bytes(b"abc".to_vec()));
        let value = run(vec![binary, file("text.txt", Some("abc"))]);
        assert_eq!(value.files.len(), 1);
        assert_eq!(value.files[0].path, "blob");
    }
}
