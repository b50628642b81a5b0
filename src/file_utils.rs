//! Shared file reading utilities
//!
//! Reading is split into a sniff of the first few kilobytes, used to spot
//! binary files without loading them, and the full read for text files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Bytes inspected to decide whether a file is binary.
pub const SNIFF_WINDOW: usize = 8192;

/// Result of loading a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Binary,
    Text(String),
}

/// Why a file could not be loaded.
#[derive(Debug)]
pub enum ReadFailure {
    Timeout,
    Io(io::Error),
}

/// True if the sniffed bytes contain a NUL byte or an invalid UTF-8 sequence.
/// A multi-byte character cut by the end of the window does not count.
pub fn looks_binary(head: &[u8]) -> bool {
    if head.contains(&0) {
        return true;
    }
    match std::str::from_utf8(head) {
        Ok(_) => false,
        Err(e) => e.error_len().is_some(),
    }
}

/// Load a file, reading at most `limit` bytes. Binary files are detected
/// from the sniff window and not read further.
pub fn load_file(path: &Path, limit: u64) -> io::Result<Loaded> {
    let file = File::open(path)?;
    let mut reader = file.take(limit);

    let mut buf = Vec::with_capacity(SNIFF_WINDOW.min(limit as usize));
    (&mut reader)
        .take(SNIFF_WINDOW as u64)
        .read_to_end(&mut buf)?;
    if looks_binary(&buf) {
        return Ok(Loaded::Binary);
    }

    reader.read_to_end(&mut buf)?;
    match String::from_utf8(buf) {
        Ok(text) => Ok(Loaded::Text(text)),
        Err(_) => Ok(Loaded::Binary),
    }
}

/// Load a file on a helper thread, giving up after `timeout`.
/// A timed-out reader thread is left to finish on its own.
pub fn load_with_timeout(
    path: &Path,
    limit: u64,
    timeout: Option<Duration>,
) -> Result<Loaded, ReadFailure> {
    let Some(timeout) = timeout else {
        return load_file(path, limit).map_err(ReadFailure::Io);
    };

    let (tx, rx) = mpsc::channel();
    let owned = path.to_path_buf();
    let spawned = thread::Builder::new()
        .name("fosum-read".to_string())
        .spawn(move || {
            let _ = tx.send(load_file(&owned, limit));
        });

    if let Err(err) = spawned {
        debug!(error = %err, "cannot spawn reader thread, reading inline");
        return load_file(path, limit).map_err(ReadFailure::Io);
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(ReadFailure::Io),
        Err(RecvTimeoutError::Timeout) => Err(ReadFailure::Timeout),
        Err(RecvTimeoutError::Disconnected) => {
            Err(ReadFailure::Io(io::Error::other("reader thread exited")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_looks_binary() {
        assert!(!looks_binary(b"hello\nthere"));
        assert!(!looks_binary(b""));
        assert!(looks_binary(b"abc\0def"));
        assert!(looks_binary(&[0xFF, 0xFE, 0x41]));
        // "é" cut in half at the end of the window
        assert!(!looks_binary(&[b'a', 0xC3]));
    }

    #[test]
    fn test_load_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello\nthere").unwrap();

        let loaded = load_file(&path, 1_000).unwrap();
        assert_eq!(loaded, Loaded::Text("hello\nthere".to_string()));
    }

    #[test]
    fn test_load_binary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.bin");
        fs::write(&path, [0x89, b'P', b'N', b'G', 0x00, 0x01]).unwrap();

        assert_eq!(load_file(&path, 1_000).unwrap(), Loaded::Binary);
    }

    #[test]
    fn test_invalid_utf8_after_sniff_window_is_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.txt");
        let mut content = vec![b'a'; SNIFF_WINDOW + 10];
        content.push(0xFF);
        fs::write(&path, &content).unwrap();

        assert_eq!(load_file(&path, 1_000_000).unwrap(), Loaded::Binary);
    }

    #[test]
    fn test_load_respects_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert_eq!(
            load_file(&path, 10).unwrap(),
            Loaded::Text("x".repeat(10))
        );
    }

    #[test]
    fn test_utf8_with_bom_is_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.rs");
        let mut content = vec![0xEF, 0xBB, 0xBF];
        content.extend_from_slice(b"fn main() {}");
        fs::write(&path, &content).unwrap();

        match load_file(&path, 1_000).unwrap() {
            Loaded::Text(text) => assert!(text.ends_with("fn main() {}")),
            Loaded::Binary => panic!("BOM file should be text"),
        }
    }

    #[test]
    fn test_load_with_timeout_reads_normally() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "quick").unwrap();

        let loaded = load_with_timeout(&path, 1_000, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(loaded, Loaded::Text("quick".to_string()));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_with_timeout(Path::new("/nonexistent/file.rs"), 1_000, None);
        assert!(matches!(result, Err(ReadFailure::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_read_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipe");
        let status = std::process::Command::new("mkfifo").arg(&path).status();
        if !status.is_ok_and(|s| s.success()) {
            // mkfifo unavailable
            return;
        }

        let result = load_with_timeout(&path, 1_000, Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(ReadFailure::Timeout)));
    }
}
