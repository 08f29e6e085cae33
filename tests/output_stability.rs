// Re-run stability and streaming equivalence.

mod common;

use common::{copytree_cmd, create_file, strip_generated};
use tempfile::TempDir;

fn stdout_of(dir: &std::path::Path, args: &[&str]) -> String {
    let output = copytree_cmd()
        .arg(dir)
        .args(args)
        .output()
        .expect("binary runs");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).expect("utf-8 output")
}

fn populate(dir: &std::path::Path) {
    create_file(dir, "src/lib.rs", "pub fn lib() {}\n");
    create_file(dir, "src/bin/tool.rs", "fn main() {}\n");
    create_file(dir, "docs/readme.md", "# docs\n\nwith `code`\n");
}

#[test]
fn identical_runs_produce_identical_documents_modulo_timestamp() {
    let dir = TempDir::new().unwrap();
    populate(dir.path());

    for format in ["xml", "json", "markdown", "tree"] {
        let first = stdout_of(dir.path(), &["--format", format]);
        let second = stdout_of(dir.path(), &["--format", format]);
        assert_eq!(
            strip_generated(&first),
            strip_generated(&second),
            "format {format} must be stable across runs"
        );
    }
}

#[test]
fn streamed_xml_equals_batch_xml() {
    let dir = TempDir::new().unwrap();
    populate(dir.path());

    let batch = stdout_of(dir.path(), &["--format", "xml"]);
    let streamed = stdout_of(dir.path(), &["--format", "xml", "--stream"]);
    assert_eq!(strip_generated(&batch), strip_generated(&streamed));
}

#[test]
fn streamed_json_parses_with_all_files() {
    let dir = TempDir::new().unwrap();
    populate(dir.path());

    let streamed = stdout_of(dir.path(), &["--format", "json", "--stream"]);
    let parsed: serde_json::Value = serde_json::from_str(&streamed).unwrap();
    assert_eq!(parsed["files"].as_array().unwrap().len(), 3);
}

#[test]
fn streamed_markdown_equals_batch_markdown() {
    let dir = TempDir::new().unwrap();
    populate(dir.path());

    let batch = stdout_of(dir.path(), &["--format", "markdown"]);
    let streamed = stdout_of(dir.path(), &["--format", "markdown", "--stream"]);
    assert_eq!(strip_generated(&batch), strip_generated(&streamed));
}

#[test]
fn markdown_front_matter_counts_match_files() {
    let dir = TempDir::new().unwrap();
    populate(dir.path());

    let markdown = stdout_of(dir.path(), &["--format", "markdown"]);
    let file_count: usize = markdown
        .lines()
        .find_map(|l| l.strip_prefix("file_count: "))
        .unwrap()
        .parse()
        .unwrap();
    let total_size: u64 = markdown
        .lines()
        .find_map(|l| l.strip_prefix("total_size_bytes: "))
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(file_count, 3);
    let expected: u64 = ["src/lib.rs", "src/bin/tool.rs", "docs/readme.md"]
        .iter()
        .map(|rel| std::fs::metadata(dir.path().join(rel)).unwrap().len())
        .sum();
    assert_eq!(total_size, expected);
    assert_eq!(markdown.matches("<!-- copytree:file").count(), 3);
    assert_eq!(markdown.matches("<!-- copytree:end").count(), 3);
}

#[test]
fn xml_cdata_never_leaks_a_terminator() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "tricky.txt", "body ]]> more ]]> end");

    let xml = stdout_of(dir.path(), &["--format", "xml"]);
    // Every embedded terminator is split across CDATA sections.
    assert!(xml.contains("body ]]]]><![CDATA[> more ]]]]><![CDATA[> end"));
    assert!(!xml.contains("body ]]> more"));
}
