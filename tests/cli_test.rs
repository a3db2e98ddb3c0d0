//! End-to-end tests driving the `rspec-support` binary as a subprocess.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Temporary directory holding input files for one test
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

/// Run the binary, returning exit code, stdout and stderr
fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_rspec-support"))
        .args(args)
        .output()
        .expect("Failed to run rspec-support");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =============================================================================
// diff
// =============================================================================

#[test]
fn diff_prints_unified_hunks() {
    let fixture = Fixture::new();
    let actual = fixture.write_file("actual.txt", b"foo\nbar\nqux\n");
    let expected = fixture.write_file("expected.txt", b"foo\nbaz\nqux\n");

    let (code, stdout, _) = run(&["diff", path_str(&actual), path_str(&expected)]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "\n@@ -1,3 +1,3 @@\n foo\n-bar\n+baz\n qux\n");
}

#[test]
fn diff_of_identical_files_is_empty() {
    let fixture = Fixture::new();
    let actual = fixture.write_file("actual.txt", b"same\nlines\n");
    let expected = fixture.write_file("expected.txt", b"same\nlines\n");

    let (code, stdout, _) = run(&["diff", path_str(&actual), path_str(&expected)]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "");
}

#[test]
fn diff_respects_context_option() {
    let fixture = Fixture::new();
    let actual = fixture.write_file("actual.txt", b"a\nb\nc\nd\ne\n");
    let expected = fixture.write_file("expected.txt", b"a\nb\nX\nd\ne\n");

    let (code, stdout, _) = run(&[
        "diff",
        "--context",
        "0",
        path_str(&actual),
        path_str(&expected),
    ]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "\n@@ -3 +3 @@\n-c\n+X\n");
}

#[test]
fn diff_colors_on_request() {
    let fixture = Fixture::new();
    let actual = fixture.write_file("actual.txt", b"one\ntwo\n");
    let expected = fixture.write_file("expected.txt", b"one\nthree\n");

    let (code, stdout, _) = run(&["diff", "--color", path_str(&actual), path_str(&expected)]);

    assert_eq!(code, 0);
    assert!(stdout.contains("\x1b["), "expected ANSI escapes in {stdout:?}");
}

#[test]
fn diff_transcodes_latin1_input() {
    let fixture = Fixture::new();
    let actual = fixture.write_file("actual.txt", b"caf\xe9\nold\n");
    let expected = fixture.write_file("expected.txt", "caf\u{e9}\nnew\n".as_bytes());

    let (code, stdout, _) = run(&[
        "diff",
        "--actual-encoding",
        "ISO-8859-1",
        path_str(&actual),
        path_str(&expected),
    ]);

    assert_eq!(code, 0);
    assert!(stdout.contains(" caf\u{e9}\n-old\n+new\n"), "got {stdout:?}");
}

#[test]
fn diff_reports_missing_file() {
    let fixture = Fixture::new();
    let expected = fixture.write_file("expected.txt", b"x\n");
    let missing = fixture.path().join("missing.txt");

    let (code, _, stderr) = run(&["diff", path_str(&missing), path_str(&expected)]);

    assert_eq!(code, 1);
    assert!(stderr.contains("Failed to read"), "got {stderr:?}");
}

// =============================================================================
// signature
// =============================================================================

#[test]
fn signature_describes_parameters() {
    let (code, stdout, _) = run(&["signature", "x, y = 1, z:, **opts"]);

    assert_eq!(code, 0);
    assert_eq!(
        stdout,
        "arity of 1 to 2 and required keyword args (:z) and any additional keyword args\n"
    );
}

#[test]
fn signature_accepts_matching_count() {
    let (code, stdout, stderr) = run(&["signature", "a, b", "--count", "2"]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "arity of 2\n");
    assert_eq!(stderr, "");
}

#[test]
fn signature_rejects_wrong_count() {
    let (code, _, stderr) = run(&["signature", "a, b", "--count", "3"]);

    assert_eq!(code, 1);
    assert!(
        stderr.contains("Wrong number of arguments. Expected 2, got 3."),
        "got {stderr:?}"
    );
}

#[test]
fn signature_checks_keywords_and_unlimited() {
    let (code, _, stderr) = run(&["signature", "a, b:", "--count", "1", "--keyword", "c"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Missing required keyword arguments"), "got {stderr:?}");

    let (code, _, stderr) = run(&["signature", "a", "--count", "1", "--unlimited"]);
    assert_eq!(code, 1);
    assert!(
        stderr.contains("Expected an unlimited number of arguments to be accepted"),
        "got {stderr:?}"
    );

    let (code, _, _) = run(&["signature", "*args", "--count", "4", "--unlimited"]);
    assert_eq!(code, 0);
}

#[test]
fn signature_rejects_malformed_parameters() {
    let (code, _, stderr) = run(&["signature", "a, a"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("Duplicated parameter name 'a'"), "got {stderr:?}");
}

// =============================================================================
// completions / man
// =============================================================================

#[test]
fn completions_generate_for_bash() {
    let (code, stdout, _) = run(&["completions", "bash"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("rspec-support"));
}

#[test]
fn man_page_renders() {
    let (code, stdout, _) = run(&["man"]);

    assert_eq!(code, 0);
    assert!(stdout.contains(".TH"));
}
