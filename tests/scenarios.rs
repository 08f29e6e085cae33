// End-to-end scenarios over the library pipeline.

mod common;

use common::create_file;
use copytree::cancellation::CancellationToken;
use copytree::config::{
    BinaryPolicy, OptionsBuilder, OutputDestination, OutputFormat, RedactionMode,
};
use copytree::events::EventSink;
use copytree::profile::Profile;
use copytree::run;
use tempfile::TempDir;

fn run_to_string(
    configure: impl FnOnce(OptionsBuilder) -> OptionsBuilder,
    profile: Profile,
    root: &std::path::Path,
) -> String {
    let out = root.join("__copytree_output__");
    let options = configure(
        OptionsBuilder::new(root)
            .without_env_overrides()
            .exclude(vec!["__copytree_output__".into()])
            .destination(OutputDestination::File(out.clone()))
            .no_cache(true),
    )
    .build()
    .expect("options must validate");
    run(options, profile, EventSink::disabled(), CancellationToken::new())
        .expect("pipeline must succeed");
    std::fs::read_to_string(out).expect("output file must exist")
}

#[test]
fn minimal_xml_scenario() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a/x.txt", "hi");
    create_file(dir.path(), "a/y.bin", b"\x00\x01");

    let profile = Profile {
        include: vec!["**/*".into()],
        ..Profile::default()
    };
    let xml = run_to_string(
        |b| b.binary_policy(BinaryPolicy::Placeholder).format(OutputFormat::Xml),
        profile,
        dir.path(),
    );

    assert!(xml.contains(r#"<ct:file path="@a/x.txt" size="2""#));
    assert!(xml.contains("<![CDATA[hi]]>"));
    assert!(xml.contains(r#"binary="true""#));
    assert!(xml.contains("[binary file content not included]"));
}

#[test]
fn dedup_scenario() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a.txt", "A");
    create_file(dir.path(), "b.txt", "A");
    create_file(dir.path(), "c.txt", "B");

    let json = run_to_string(
        |b| b.format(OutputFormat::Json),
        Profile::everything(),
        dir.path(),
    );
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let paths: Vec<&str> = parsed["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["a.txt", "c.txt"]);
}

#[test]
fn always_overrides_exclude_scenario() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "secrets/keep.txt", "keep me");
    create_file(dir.path(), "secrets/drop.txt", "drop me");

    let profile = Profile {
        exclude: vec!["secrets/**".into()],
        always: vec!["secrets/keep.txt".into()],
        ..Profile::default()
    };
    let json = run_to_string(|b| b.format(OutputFormat::Json), profile, dir.path());
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let paths: Vec<&str> = parsed["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["secrets/keep.txt"]);
}

#[test]
fn git_changed_scenario() {
    use git2::{IndexAddOption, Repository, Signature};

    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let commit_all = |message: &str| {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    };

    create_file(dir.path(), "other.js", "old");
    create_file(dir.path(), "b.js", "b-one");
    commit_all("first");
    create_file(dir.path(), "a.js", "added");
    commit_all("second");
    create_file(dir.path(), "b.js", "b-two"); // worktree modification

    let json = run_to_string(
        |b| b.format(OutputFormat::Json).changed(Some("HEAD~1")),
        Profile::everything(),
        dir.path(),
    );
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let mut paths: Vec<&str> = parsed["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["a.js", "b.js"]);
}

#[test]
fn char_limit_scenario() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a.txt", "a".repeat(100));
    create_file(dir.path(), "b.txt", "b".repeat(100));
    create_file(dir.path(), "c.txt", "c".repeat(100));

    let json = run_to_string(
        |b| b.format(OutputFormat::Json).char_limit(Some(150)),
        Profile::everything(),
        dir.path(),
    );
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let files = parsed["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["path"], "a.txt");
    assert_eq!(files[0]["content"].as_str().unwrap().len(), 100);
    assert_eq!(files[1]["path"], "b.txt");
    assert_eq!(files[1]["truncated"], true);
    assert_eq!(files[1]["originalLength"], 100);
    let truncated = files[1]["content"].as_str().unwrap();
    assert!(truncated.starts_with(&"b".repeat(50)));
    assert!(truncated.contains("[truncated]"));
}

#[test]
fn secrets_redaction_scenario() {
    let dir = TempDir::new().unwrap();
    let secret = "S3CR3T".repeat(10); // 60 chars; use exact 40 below
    let forty: String = secret.chars().take(40).collect();
    create_file(
        dir.path(),
        "deploy.txt",
        format!("AWS_SECRET_ACCESS_KEY={forty}\n"),
    );

    let xml = run_to_string(
        |b| b.redaction(RedactionMode::Typed),
        Profile::everything(),
        dir.path(),
    );
    assert!(xml.contains("AWS_SECRET_ACCESS_KEY=<REDACTED:AWS_SECRET_KEY>"));
    assert!(!xml.contains(&forty));
}

#[test]
fn empty_tree_is_valid_output() {
    let dir = TempDir::new().unwrap();
    let xml = run_to_string(|b| b, Profile::everything(), dir.path());
    assert!(xml.contains("<ct:fileCount>0</ct:fileCount>"));
    assert!(xml.contains("</ct:directory>"));
}

#[test]
fn hard_denied_files_never_reach_output() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "app/.env.production", "DB_PASSWORD=hunter2hunter2\n");
    create_file(dir.path(), "app/main.rs", "fn main() {}\n");

    let profile = Profile {
        always: vec![".env.production".into()],
        ..Profile::default()
    };
    let xml = run_to_string(|b| b.include_hidden(true), profile, dir.path());
    assert!(!xml.contains(".env.production"));
    assert!(!xml.contains("hunter2hunter2"));
    assert!(xml.contains("app/main.rs"));
}
