//! Edge case and error handling tests for fosum


use harness::{TestTree, run_fosum, summarize};
use std::fs;

// ============================================================================
// Symlink Edge Cases
// ============================================================================

#[cfg(unix)]
#[test]
fn test_symlink_to_file() {
    let tree = TestTree::new();
    tree.add_file("target.rs", "fn target() {}\n");
    tree.symlink("target.rs", "link.rs");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("├── link.rs -> target.rs\n"));
    assert!(stdout.contains("=== link.rs ===\nfn target() {}\n"));
    assert!(stdout.contains("=== target.rs ===\nfn target() {}\n"));
}

#[cfg(unix)]
#[test]
fn test_symlink_to_directory_listed_once() {
    let tree = TestTree::new();
    tree.add_file("realdir/file.rs", "fn file() {}\n");
    tree.symlink("realdir", "zlink");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("└── zlink -> realdir [already listed]\n"));
    assert_eq!(stdout.matches("fn file() {}").count(), 1);
    assert!(stdout.contains("errors: 0"));
}

#[cfg(unix)]
#[test]
fn test_symlink_sorting_before_target_listed_once() {
    let tree = TestTree::new();
    tree.add_file("src/lib.rs", "pub fn lib() {}\n");
    tree.symlink("src", "a_current");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("├── a_current -> src [already listed]\n"));
    assert_eq!(stdout.matches("pub fn lib() {}").count(), 1);
    assert!(stdout.contains("=== src/lib.rs ==="));
    assert!(!stdout.contains("=== a_current/lib.rs ==="));
}

#[cfg(unix)]
#[test]
fn test_symlink_to_parent_no_infinite_loop() {
    let tree = TestTree::new();
    tree.add_file("sub/file.rs", "fn f() {}\n");
    tree.symlink("..", "sub/parent");

    let (stdout, stderr, code) = run_fosum(tree.path(), &[]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("parent -> .. [cyclic symlink]"));
    assert!(stdout.contains("errors: 1"));
    assert!(stderr.contains("cyclic symlink"));
}

#[cfg(unix)]
#[test]
fn test_self_referential_symlink() {
    let tree = TestTree::new();
    tree.add_file("file.rs", "");
    tree.symlink("selfref", "selfref");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("selfref -> selfref [cyclic symlink]"));
}

#[cfg(unix)]
#[test]
fn test_symlink_outside_root_not_followed() {
    let outside = TestTree::new();
    outside.add_file("secret.txt", "top secret\n");
    let tree = TestTree::new();
    let target = outside.path().join("secret.txt");
    tree.symlink(&target.to_string_lossy(), "leak.txt");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("[symlink points outside root]"));
    assert!(!stdout.contains("top secret"));
}

#[cfg(unix)]
#[test]
fn test_broken_symlink() {
    let tree = TestTree::new();
    tree.add_file("ok.txt", "ok\n");
    tree.symlink("nowhere.txt", "broken.txt");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("├── broken.txt -> nowhere.txt [broken symlink]\n"));
    assert!(stdout.contains("=== ok.txt ===\nok\n"));
    assert!(stdout.contains("files scanned: 1"));
    assert!(stdout.contains("errors: 1"));
}

// ============================================================================
// Permission Edge Cases
// ============================================================================

/// False when running as root, where permission bits are not enforced.
#[cfg(unix)]
fn permissions_enforced(tree: &TestTree, path: &str) -> bool {
    let full = tree.path().join(path);
    if full.is_dir() {
        fs::read_dir(full).is_err()
    } else {
        fs::read(full).is_err()
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory() {
    let tree = TestTree::new();
    tree.add_file("locked/inner.txt", "inner\n");
    tree.add_file("open.txt", "open\n");
    tree.set_mode("locked", 0o000);

    if !permissions_enforced(&tree, "locked") {
        tree.set_mode("locked", 0o755);
        return;
    }

    let (stdout, _stderr, code) = run_fosum(tree.path(), &[]);
    tree.set_mode("locked", 0o755);

    assert_eq!(code, 0);
    assert!(stdout.contains("locked/ [permission denied]"));
    assert!(stdout.contains("=== open.txt ===\nopen\n"));
    assert!(!stdout.contains("inner"));
    assert!(stdout.contains("errors: 1"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file() {
    let tree = TestTree::new();
    tree.add_file("secret.txt", "hidden\n");
    tree.add_file("visible.txt", "shown\n");
    tree.set_mode("secret.txt", 0o000);

    if !permissions_enforced(&tree, "secret.txt") {
        tree.set_mode("secret.txt", 0o644);
        return;
    }

    let (stdout, _stderr, code) = run_fosum(tree.path(), &[]);
    tree.set_mode("secret.txt", 0o644);

    assert_eq!(code, 0);
    assert!(stdout.contains("=== secret.txt ===\n[unreadable: permission denied]\n"));
    assert!(stdout.contains("=== visible.txt ===\nshown\n"));
    assert!(stdout.contains("errors: 1"));
}

// ============================================================================
// File Content Edge Cases
// ============================================================================

#[test]
fn test_empty_directory() {
    let tree = TestTree::new();

    let stdout = summarize(tree.path(), &[]);
    assert_eq!(
        stdout,
        ".\n\n[files scanned: 0, included: 0 (0 truncated), omitted: 0, errors: 0, total bytes: 0]\n"
    );
}

#[test]
fn test_empty_file() {
    let tree = TestTree::new();
    tree.add_file("empty.txt", "");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("=== empty.txt ===\n\n["));
    assert!(!stdout.contains("truncated: "));
    assert!(stdout.contains("included: 1 (0 truncated)"));
}

#[test]
fn test_binary_detected_after_sniff_window() {
    let tree = TestTree::new();
    let mut content = vec![b'a'; 10_000];
    content.extend_from_slice(&[0xFF, 0xFE]);
    tree.add_bytes("late.dat", &content);

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("=== late.dat ===\n[binary] late.dat (10002 bytes)\n"));
}

#[test]
fn test_text_without_trailing_newline() {
    let tree = TestTree::new();
    tree.add_file("a.txt", "no newline");
    tree.add_file("b.txt", "next");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("=== a.txt ===\nno newline\n\n=== b.txt ===\nnext\n\n"));
}

#[test]
fn test_crlf_content_preserved() {
    let tree = TestTree::new();
    tree.add_file("win.txt", "one\r\ntwo\r\n");

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("=== win.txt ===\none\r\ntwo\r\n"));
}

#[test]
fn test_markdown_fence_survives_backticks() {
    let tree = TestTree::new();
    tree.add_file("README.md", "Run:\n\n```sh\ncargo test\n```\n");

    let stdout = summarize(tree.path(), &["-f", "markdown"]);
    assert!(stdout.contains("````md\nRun:\n\n```sh\ncargo test\n```\n````\n"));
}

#[test]
fn test_unicode_names_sorted_bytewise() {
    let tree = TestTree::new();
    tree.add_file("émoji.txt", "e\n");
    tree.add_file("zeta.txt", "z\n");
    tree.add_file("Alpha.txt", "a\n");

    let stdout = summarize(tree.path(), &[]);
    let alpha = stdout.find("=== Alpha.txt").unwrap();
    let zeta = stdout.find("=== zeta.txt").unwrap();
    let emoji = stdout.find("=== émoji.txt").unwrap();
    assert!(alpha < zeta && zeta < emoji);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_file_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tree = TestTree::new();
    let name = OsStr::from_bytes(b"bad\xffname.txt");
    fs::write(tree.path().join(name), "content\n").unwrap();

    let stdout = summarize(tree.path(), &[]);
    assert!(stdout.contains("=== bad\u{FFFD}name.txt ===\ncontent\n"));
}

#[cfg(unix)]
#[test]
fn test_fifo_reported_as_unreadable() {
    let tree = TestTree::new();
    tree.add_file("real.txt", "real\n");
    let status = std::process::Command::new("mkfifo")
        .arg(tree.path().join("pipe"))
        .status();
    if !status.is_ok_and(|s| s.success()) {
        return;
    }

    let stdout = summarize(tree.path(), &["--timeout", "200ms"]);
    assert!(stdout.contains("├── pipe\n"));
    assert!(stdout.contains("=== pipe ===\n[unreadable: timeout]\n"));
    assert!(stdout.contains("=== real.txt ===\nreal\n"));
    assert!(stdout.contains("files scanned: 2"));
    assert!(stdout.contains("errors: 1"));
}

#[cfg(unix)]
#[test]
fn test_fifo_without_timeout_is_not_opened() {
    let tree = TestTree::new();
    let status = std::process::Command::new("mkfifo")
        .arg(tree.path().join("pipe"))
        .status();
    if !status.is_ok_and(|s| s.success()) {
        return;
    }

    let stdout = summarize(tree.path(), &["--timeout", "0"]);
    assert!(stdout.contains("=== pipe ===\n[unreadable: special file]\n"));
    assert!(stdout.contains("errors: 1"));
}
