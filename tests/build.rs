use std::path::Path;
use std::process::{Command, Output};

use git2::{Repository, Signature, Time};

fn commit(repo: &Repository, dir: &Path, file: &str, content: &str, time: i64, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Dev", "dev@example.com", &Time::new(time, 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// One file, one fix: chunks `[c1, c2*]` and `[c3]`.
fn sample_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, dir.path(), "Foo.java", "class Foo {\n}\n", 1_000, "add Foo");
    commit(
        &repo,
        dir.path(),
        "Foo.java",
        "class Foo {\n  int x;\n}\n",
        2_000,
        "Fix missing field",
    );
    commit(
        &repo,
        dir.path(),
        "Foo.java",
        "class Foo {\n  int y;\n}\n",
        3_000,
        "rename field",
    );
    dir
}

fn fixpulse(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fixpulse"))
        .args(args)
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn class_column(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(|line| line.rsplit(',').next().unwrap().to_string())
        .collect()
}

#[test]
fn build_writes_csv_rows_per_chunk_prefix() {
    let repo = sample_repo();
    let output = fixpulse(repo.path(), &["build", "--format", "csv"]);
    assert!(
        output.status.success(),
        "fixpulse build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    let header = stdout.lines().next().unwrap();
    assert!(header.starts_with("numCommits,numAuthors,"));
    assert!(header.ends_with(",isFixed"));
    assert_eq!(class_column(&stdout), vec!["true", "true", "false"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Wrote 3 rows"), "stderr: {stderr}");
}

#[test]
fn build_fixed_only_drops_trailing_chunk() {
    let repo = sample_repo();
    let output = fixpulse(repo.path(), &["build", "--format", "csv", "--fixed-only"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(class_column(&stdout), vec!["true", "true"]);
}

#[test]
fn build_writes_arff_to_file() {
    let repo = sample_repo();
    let out = repo.path().join("dataset.arff");
    let output = fixpulse(
        repo.path(),
        &["build", "--output", out.to_str().unwrap(), "--relation", "foo"],
    );
    assert!(output.status.success());

    let arff = std::fs::read_to_string(out).unwrap();
    assert!(arff.starts_with("@relation foo"));
    assert!(arff.contains("@attribute changeGini numeric"));
    assert!(arff.contains("@attribute isFixed {true,false}"));
    assert!(arff.contains("@data"));
}

#[test]
fn build_reads_config_file() {
    let repo = sample_repo();
    std::fs::write(
        repo.path().join(".fixpulse.toml"),
        "[dataset]\nformat = \"jsonl\"\n",
    )
    .unwrap();
    let output = fixpulse(repo.path(), &["build"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["entity"], "Foo.java");
}

#[test]
fn build_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = fixpulse(dir.path(), &["build"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a git repository"), "stderr: {stderr}");
}

#[test]
fn schema_lists_group_attributes_then_class() {
    let dir = tempfile::tempdir().unwrap();
    let output = fixpulse(dir.path(), &["schema"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "numCommits");
    assert_eq!(names[9], "isFixed");
}
