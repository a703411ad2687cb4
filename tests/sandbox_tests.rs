//! Sandbox Tests
//!
//! Tests for sandboxed path resolution: depth accounting, the `..` floor,
//! symlink refusal, and the OS-error mapping.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use tempfile::tempdir;

use qooil::protocol::ErrorKind;
use qooil::sandbox::{real_path, Sandbox};

fn kind(err: qooil::QooilError) -> ErrorKind {
    err.kind().expect("expected a protocol error")
}

/// A root with `a/b/c` directories and a few files
fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("a/b/c")).unwrap();
    fs::write(root.join("top.txt"), "top").unwrap();
    fs::write(root.join("a/inner.txt"), "inner").unwrap();
}

// =============================================================================
// Depth And Virtual Path
// =============================================================================

#[test]
fn test_starts_at_root() {
    let dir = tempdir().unwrap();
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(sandbox.depth(), 0);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/");
}

#[test]
fn test_chdir_descends() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.chdir(b"a/b").unwrap();
    assert_eq!(sandbox.depth(), 2);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/a/b");

    sandbox.chdir(b"c").unwrap();
    assert_eq!(sandbox.depth(), 3);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/a/b/c");
}

#[test]
fn test_dotdot_ascends() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.chdir(b"a/b/c").unwrap();
    sandbox.chdir(b"../..").unwrap();
    assert_eq!(sandbox.depth(), 1);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/a");
}

#[test]
fn test_dotdot_floors_at_root() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.chdir(b"a/b").unwrap();
    // Two real ascents, then three dropped ones
    sandbox.chdir(b"../../../../..").unwrap();
    assert_eq!(sandbox.depth(), 0);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/");
}

#[test]
fn test_absolute_path_anchors_at_root() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.chdir(b"a/b/c").unwrap();
    sandbox.chdir(b"/a").unwrap();
    assert_eq!(sandbox.depth(), 1);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/a");
}

#[test]
fn test_dot_and_empty_segments_are_skipped() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.chdir(b"./a//.///b/").unwrap();
    assert_eq!(sandbox.depth(), 2);
    assert_eq!(sandbox.virtual_path().unwrap(), b"/a/b");
}

// =============================================================================
// Escape Attempts
// =============================================================================

#[test]
fn test_no_resolution_escapes_root() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    let root_real = {
        let (fd, _) = sandbox.open_dir(b"").unwrap();
        real_path(&fd).unwrap()
    };

    let attempts: &[&[u8]] = &[
        b"..",
        b"../..",
        b"/..",
        b"/../../..",
        b"a/../../..",
        b"a/b/../../../../a",
        b"../a",
        b"//../a/b",
        b"./../.",
    ];
    for attempt in attempts {
        // Every attempt either fails or lands under the root
        if let Ok((fd, _)) = sandbox.open_dir(attempt) {
            let resolved = real_path(&fd).unwrap();
            assert!(
                resolved.starts_with(&root_real),
                "{} escaped to {}",
                String::from_utf8_lossy(attempt),
                resolved.display()
            );
        }
    }
}

#[test]
fn test_symlinked_dir_is_refused() {
    let outside = tempdir().unwrap();
    fs::write(outside.path().join("secret"), "hidden").unwrap();

    let dir = tempdir().unwrap();
    symlink(outside.path(), dir.path().join("escape")).unwrap();
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    assert_eq!(kind(sandbox.open_dir(b"escape").unwrap_err()), ErrorKind::CantOpen);
    assert_eq!(
        kind(sandbox.open_file(b"escape/secret").unwrap_err()),
        ErrorKind::CantOpen
    );
}

#[test]
fn test_symlinked_file_is_refused() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("real.txt"), "data").unwrap();
    symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    // Even a link that stays inside the root is not followed
    assert_eq!(
        kind(sandbox.open_file(b"link.txt").unwrap_err()),
        ErrorKind::CantOpen
    );
}

// =============================================================================
// Error Mapping
// =============================================================================

#[test]
fn test_missing_dir_is_non_existing() {
    let dir = tempdir().unwrap();
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(
        kind(sandbox.open_dir(b"nope").unwrap_err()),
        ErrorKind::NonExisting
    );
}

#[test]
fn test_file_as_dir_is_not_dir() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(
        kind(sandbox.open_dir(b"top.txt").unwrap_err()),
        ErrorKind::IsNotDir
    );
    // A file in the middle of a path fails the same way
    assert_eq!(
        kind(sandbox.open_dir(b"top.txt/below").unwrap_err()),
        ErrorKind::IsNotDir
    );
}

#[test]
fn test_dir_as_file_is_not_file() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(
        kind(sandbox.open_file(b"a").unwrap_err()),
        ErrorKind::IsNotFile
    );
}

#[test]
fn test_missing_file_is_non_existing() {
    let dir = tempdir().unwrap();
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(
        kind(sandbox.open_file(b"nope.txt").unwrap_err()),
        ErrorKind::NonExisting
    );
}

#[test]
fn test_pathless_target_is_not_file() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    // No final name segment: these denote directories
    assert_eq!(kind(sandbox.open_file(b"").unwrap_err()), ErrorKind::IsNotFile);
    assert_eq!(
        kind(sandbox.open_file(b"a/..").unwrap_err()),
        ErrorKind::IsNotFile
    );
}

// =============================================================================
// File Operations
// =============================================================================

#[test]
fn test_open_file_reports_size() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    let (mut file, size) = sandbox.open_file(b"a/inner.txt").unwrap();
    assert_eq!(size, 5);
    let mut content = String::new();
    std::io::Read::read_to_string(&mut file, &mut content).unwrap();
    assert_eq!(content, "inner");
}

#[test]
fn test_create_file_truncates() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    let mut file = sandbox.create_file(b"top.txt").unwrap();
    std::io::Write::write_all(&mut file, b"new").unwrap();
    drop(file);
    assert_eq!(fs::read(dir.path().join("top.txt")).unwrap(), b"new");
}

#[test]
fn test_remove_file() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    sandbox.remove_file(b"a/inner.txt").unwrap();
    assert!(!dir.path().join("a/inner.txt").exists());
}

#[test]
fn test_remove_dir_is_not_file() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();
    assert_eq!(
        kind(sandbox.remove_file(b"a").unwrap_err()),
        ErrorKind::IsNotFile
    );
    assert!(dir.path().join("a").exists());
}

#[test]
fn test_read_dir_lists_children() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let sandbox = Sandbox::with_root(dir.path()).unwrap();

    let mut entries = sandbox.read_dir(b"a").unwrap();
    entries.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, b"b");
    assert!(entries[0].is_dir);
    assert_eq!(entries[1].name, b"inner.txt");
    assert!(!entries[1].is_dir);
}
