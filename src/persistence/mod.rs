//! Flat-file persistence for balance notes and the run cache.
//!
//! - `records`: one front-matter note per day inside the vault
//! - `front_matter`: tolerant parser for those notes
//! - `run_cache`: lock-protected "already logged today" marker

pub mod front_matter;
pub mod records;
pub mod run_cache;

pub use records::{BalanceRecord, RecordLookup, RecordStore};
pub use run_cache::{CacheState, RunCache};

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Sibling path with `suffix` appended to the file name (`cache.json` -> `cache.json.lock`).
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Write bytes to a file atomically.
///
/// Writes to `<path>.tmp` in the same directory, syncs it, then renames it
/// over `path`. Readers see either the old or the new content, and a crash
/// leaves the old file intact. Concurrent writers to the same path must be
/// serialized by the caller.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = sibling_with_suffix(path, ".tmp");
    let written = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()
    })();

    if let Err(e) = written.and_then(|_| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/tmp/cache.json"), ".lock"),
            PathBuf::from("/tmp/cache.json.lock")
        );
        assert_eq!(
            sibling_with_suffix(Path::new("cache"), ".tmp"),
            PathBuf::from("cache.tmp")
        );
    }

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!sibling_with_suffix(&path, ".tmp").exists());
    }
}
