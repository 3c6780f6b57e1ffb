use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

#[inline]
fn create_makefile(content: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("could not create temporary directory");
    let path = dir.path().join("Makefile");
    if let Err(e) = fs::write(&path, content) {
        panic!("could not write to {path}: {e}", path = path.display())
    }
    dir
}

#[inline]
fn run_minimake(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_minimake"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("could not execute minimake")
}

#[test]
fn cycled() {
    let dir = create_makefile("a: b\n\ttouch a\nb: a\n\ttouch b\n");
    let out = run_minimake(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!{
        stderr.contains("Makefile:1: rule error: circular dependency among {a, b}"),
        "{stderr}"
    }

    assert!(out.stdout.is_empty());
    assert!(!dir.path().join("a").exists());
    assert!(!dir.path().join("b").exists());
}

#[test]
fn cycled_path() {
    let dir = create_makefile("A: B\nB: C\nC: A\nfree:\n\ttouch free\n");
    let out = run_minimake(dir.path(), &["-F"]);

    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("circular dependency among {A, B, C}"), "{stderr}");
    assert!(stderr.contains("build error: cycle detected: A -> B -> C -> A"), "{stderr}");

    // Forced builds still get the acyclic part done.
    assert!(dir.path().join("free").exists());
}

#[test]
fn depends_on_itself() {
    let dir = create_makefile("hello: hello\n\techo hello\n");
    let out = run_minimake(dir.path(), &["-F"]);

    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Makefile:1: build error: cycle detected: hello -> hello"), "{stderr}");
    assert!(!String::from_utf8_lossy(&out.stdout).contains("hello"));
}
