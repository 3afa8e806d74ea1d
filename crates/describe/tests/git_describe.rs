//! Tests for describing real git repositories
//!
//! These tests build repositories with git2 inside a temp directory and run
//! the full locate/resolve/format/assign pipeline against them.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use describe::{
    DescribeConfig, DescribeError, Describer, GitRevisionSource, MemoryPropertyStore,
    OverridePolicyResult, PropertiesFile, PropertyStore, Resolution, ResolutionOutcome,
    RevisionSource,
};
use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

const COMMIT_TIME: i64 = 1_700_000_000;

fn write_file<P: AsRef<Path>>(base: P, rel: &str, content: &str) {
    let path = base.as_ref().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

fn configure_user(repo: &Repository, name: &str, email: &str) {
    let mut cfg = repo.config().unwrap();
    cfg.set_str("user.name", name).unwrap();
    cfg.set_str("user.email", email).unwrap();
}

fn init_repo(root: &TempDir) -> (PathBuf, Repository) {
    let path = root.path().join("repo");
    let repo = Repository::init(&path).unwrap();
    configure_user(&repo, "Test User", "test@example.com");
    (path, repo)
}

fn commit_file(repo: &Repository, rel: &str, content: &str, time: i64) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    write_file(&workdir, rel, content);

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(rel)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Test User", "test@example.com", &Time::new(time, 0)).unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, &format!("update {}", rel), &tree, &parents)
        .unwrap()
}

/// Discovery must not escape the temp directory into whatever encloses it.
fn config_for(td: &TempDir, dir: &Path) -> DescribeConfig {
    DescribeConfig {
        format: "git-demo-%s".to_string(),
        scm_directory: Some(dir.to_path_buf()),
        ceiling_directories: vec![td.path().to_path_buf()],
        ..DescribeConfig::default()
    }
}

fn source_for(td: &TempDir) -> GitRevisionSource {
    GitRevisionSource::new().with_ceiling_dirs([td.path()])
}

/// Test 1: abbreviated hash is a prefix of HEAD with the minimum length
#[test]
fn test_abbreviated_hash_prefixes_head() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    let head = commit_file(&repo, "README.md", "# Demo\n", COMMIT_TIME);

    for min_len in [4, 7, 12, 40, 64] {
        let resolution = source_for(&td).resolve(&path, min_len).unwrap();
        let Resolution::Resolved(rev) = resolution else {
            panic!("expected a resolved revision");
        };

        assert_eq!(rev.revision_id, head.to_string());
        assert!(rev.revision_id.starts_with(&rev.abbreviated));
        assert!(rev.abbreviated.len() >= min_len.min(40));
        assert_eq!(rev.commit_time, COMMIT_TIME);
    }
}

/// Test 2: HEAD follows the latest commit
#[test]
fn test_resolves_latest_commit() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    commit_file(&repo, "a.txt", "one\n", COMMIT_TIME);
    let second = commit_file(&repo, "b.txt", "two\n", COMMIT_TIME + 60);

    let mut store = MemoryPropertyStore::new();
    let report = Describer::new(config_for(&td, &path))
        .run(&mut store)
        .unwrap()
        .unwrap();

    let short = &second.to_string()[..7];
    assert_eq!(report.description, format!("git-demo-{}", short));
    assert_eq!(store.get("describe"), Some(format!("git-demo-{}", short)));
    assert_eq!(
        store.get("project.build.outputTimestamp").as_deref(),
        Some("1700000060")
    );
}

/// Test 3: discovery walks up from a nested module directory
#[test]
fn test_discovers_repository_from_subdirectory() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    let head = commit_file(&repo, "module/src/lib.rs", "\n", COMMIT_TIME);

    let mut store = MemoryPropertyStore::new();
    let report = Describer::new(config_for(&td, &path.join("module").join("src")))
        .run(&mut store)
        .unwrap()
        .unwrap();

    assert_eq!(report.outcome.abbreviated(), Some(&head.to_string()[..7]));
}

/// Test 4: an empty repository yields NoCommits and the fallback hash
#[test]
fn test_empty_repository_uses_fallback() {
    let td = TempDir::new().unwrap();
    let (path, _repo) = init_repo(&td);

    assert_eq!(
        source_for(&td).resolve(&path, 7).unwrap(),
        Resolution::NoCommits
    );

    let config = DescribeConfig {
        fail: true,
        ..config_for(&td, &path)
    };
    let mut store = MemoryPropertyStore::new();
    let report = Describer::new(config).run(&mut store).unwrap().unwrap();

    assert_eq!(report.outcome, ResolutionOutcome::NoCommits);
    assert_eq!(store.get("describe").as_deref(), Some("git-demo-unknown"));
    let stamp: i64 = store
        .get("project.build.outputTimestamp")
        .unwrap()
        .parse()
        .unwrap();
    assert!(stamp > 0);
}

/// Test 5: a missing repository falls back without fail
#[test]
fn test_missing_repository_falls_back() {
    let td = TempDir::new().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();

    let mut store = MemoryPropertyStore::new();
    let report = Describer::new(config_for(&td, &work))
        .run(&mut store)
        .unwrap()
        .unwrap();

    assert!(matches!(
        report.outcome,
        ResolutionOutcome::RepositoryNotFound { .. }
    ));
    assert_eq!(store.get("describe").as_deref(), Some("git-demo-unknown"));
}

/// Test 6: a missing repository aborts with fail
#[test]
fn test_missing_repository_aborts_with_fail() {
    let td = TempDir::new().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();

    let config = DescribeConfig {
        fail: true,
        ..config_for(&td, &work)
    };
    let mut store = MemoryPropertyStore::new();
    let err = Describer::new(config).run(&mut store).unwrap_err();

    match err {
        DescribeError::RepositoryNotFound { path } => assert_eq!(path, work),
        other => panic!("expected RepositoryNotFound error, got: {:?}", other),
    }
    assert!(store.is_empty());
}

/// Test 7: existing properties are kept unless override is set
#[test]
fn test_existing_properties_without_override() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    commit_file(&repo, "README.md", "# Demo\n", COMMIT_TIME);

    let mut store: MemoryPropertyStore = [
        ("describe", "git-parent-1234567"),
        ("project.build.outputTimestamp", "1600000000"),
    ]
    .into_iter()
    .collect();
    let report = Describer::new(config_for(&td, &path))
        .run(&mut store)
        .unwrap()
        .unwrap();

    assert_eq!(
        report.description_assignment.result,
        OverridePolicyResult::SkipExisting
    );
    assert_eq!(
        report.timestamp_assignment.result,
        OverridePolicyResult::SkipExisting
    );
    assert_eq!(store.get("describe").as_deref(), Some("git-parent-1234567"));
    assert_eq!(
        store.get("project.build.outputTimestamp").as_deref(),
        Some("1600000000")
    );
}

/// Test 8: override takes the later of the recorded and commit timestamps
#[test]
fn test_override_merges_timestamp() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    let head = commit_file(&repo, "README.md", "# Demo\n", COMMIT_TIME);

    let config = DescribeConfig {
        override_existing: true,
        ..config_for(&td, &path)
    };

    let mut older: MemoryPropertyStore = [
        ("describe", "git-parent-1234567"),
        ("project.build.outputTimestamp", "1600000000"),
    ]
    .into_iter()
    .collect();
    Describer::new(config.clone()).run(&mut older).unwrap();
    assert_eq!(
        older.get("describe"),
        Some(format!("git-demo-{}", &head.to_string()[..7]))
    );
    assert_eq!(
        older.get("project.build.outputTimestamp").as_deref(),
        Some("1700000000")
    );

    let mut newer: MemoryPropertyStore =
        [("project.build.outputTimestamp", "1800000000")].into_iter().collect();
    Describer::new(config).run(&mut newer).unwrap();
    assert_eq!(
        newer.get("project.build.outputTimestamp").as_deref(),
        Some("1800000000")
    );
}

/// Test 9: properties file store round-trips through a run
#[test]
fn test_properties_file_store() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    let head = commit_file(&repo, "README.md", "# Demo\n", COMMIT_TIME);

    let props = td.path().join("target").join("build.properties");
    write_file(
        td.path(),
        "target/build.properties",
        "# from an earlier step\nproject.name=demo\nproject.build.outputTimestamp=not-a-number\n",
    );

    let config = DescribeConfig {
        format: DescribeConfig::default().format,
        ..config_for(&td, &path)
    };
    let mut store = PropertiesFile::load(&props).unwrap();
    Describer::new(config).run(&mut store).unwrap();
    store.save().unwrap();

    let reloaded = PropertiesFile::load(&props).unwrap();
    assert_eq!(
        reloaded.get("describe"),
        Some(format!("git-demo-{}", &head.to_string()[..7]))
    );
    assert_eq!(
        reloaded.get("project.build.outputTimestamp").as_deref(),
        Some("1700000000")
    );
    assert_eq!(reloaded.get("project.name").as_deref(), Some("demo"));
}

/// Test 10: a detached HEAD still resolves
#[test]
fn test_detached_head() {
    let td = TempDir::new().unwrap();
    let (path, repo) = init_repo(&td);
    let first = commit_file(&repo, "a.txt", "one\n", COMMIT_TIME);
    commit_file(&repo, "b.txt", "two\n", COMMIT_TIME + 60);
    repo.set_head_detached(first).unwrap();

    let Resolution::Resolved(rev) = source_for(&td).resolve(&path, 7).unwrap() else {
        panic!("expected a resolved revision");
    };
    assert_eq!(rev.revision_id, first.to_string());
    assert_eq!(rev.commit_time, COMMIT_TIME);
}
