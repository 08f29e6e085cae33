// tests/common.rs

use assert_cmd::prelude::*;
use std::path::Path;
use std::process::Command;

/// The compiled binary under test.
pub fn copytree_cmd() -> Command {
    Command::cargo_bin("copytree").expect("copytree binary must build")
}

/// Writes a file under `dir`, creating parent directories.
pub fn create_file(dir: &Path, relative: &str, content: impl AsRef<[u8]>) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, content).expect("write test file");
}

/// Strips lines carrying run-time-varying fields (timestamps) so two runs
/// can be compared byte-for-byte.
#[allow(dead_code)]
pub fn strip_generated(text: &str) -> String {
    text.lines()
        .filter(|line| {
            !line.contains("<ct:generated>")
                && !line.starts_with("generated:")
                && !line.contains("\"generated\"")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
