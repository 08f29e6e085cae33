//! Discovery stage: the layered walk plus the force-include second pass.

use crate::errors::Result;
use crate::pipeline::{PipelineValue, Stage, StageContext};
use crate::walk::{force_include_pass, walk};
use log::info;

/// Streams file records from the scan root through the ignore stack, then
/// re-adds force-included files with all ignores bypassed.
pub struct FileDiscovery;

impl Stage for FileDiscovery {
    fn name(&self) -> &'static str {
        "file-discovery"
    }

    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()> {
        let options = value.options.clone();
        let files = walk(&options.base_path, &options.discovery, &ctx.cancel)?;
        value.stats.discovered = files.len();
        value.files = files;

        if !options.filtering.force_include.is_empty() {
            let base = options
                .base_path
                .canonicalize()
                .unwrap_or_else(|_| options.base_path.clone());
            let added = force_include_pass(
                &base,
                &options.filtering.force_include,
                &options.discovery,
                &value.files,
            );
            value.stats.force_included = added.len();
            value.files.extend(added);
        }

        info!(
            "discovered {} file(s) ({} force-included)",
            value.files.len(),
            value.stats.force_included
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsBuilder;
    use crate::profile::Profile;
    use std::sync::Arc;

    #[test]
    fn discovery_populates_files_and_stats() {
        let dir = std::env::temp_dir().join(format!("ct-disc-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("a.txt"), "a").unwrap();
        std::fs::write(dir.join("sub/b.txt"), "b").unwrap();

        let options = OptionsBuilder::new(&dir).without_env_overrides().build().unwrap();
        let mut value =
            PipelineValue::new(Arc::new(options), Arc::new(Profile::everything()));
        FileDiscovery
            .process(&mut value, &StageContext::headless())
            .unwrap();
        assert_eq!(value.stats.discovered, 2);
        assert_eq!(value.files.len(), 2);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn force_include_adds_ignored_files() {
        let dir = std::env::temp_dir().join(format!("ct-disc-fi-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("vendor")).unwrap();
        std::fs::write(dir.join(".gitignore"), "vendor/\n").unwrap();
        std::fs::write(dir.join("main.rs"), "x").unwrap();
        std::fs::write(dir.join("vendor/lib.js"), "y").unwrap();

        let options = OptionsBuilder::new(&dir)
            .without_env_overrides()
            .force_include(vec!["vendor".into()])
            .build()
            .unwrap();
        let mut value =
            PipelineValue::new(Arc::new(options), Arc::new(Profile::everything()));
        FileDiscovery
            .process(&mut value, &StageContext::headless())
            .unwrap();
        assert_eq!(value.stats.force_included, 1);
        assert!(value.files.iter().any(|f| f.path == "vendor/lib.js"));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
