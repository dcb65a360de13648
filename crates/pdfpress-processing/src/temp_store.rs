//! Temp store for in-flight compressions
//!
//! Every request gets a [`TempFilePair`] inside a shared working directory. The pair
//! removes its files when dropped, so cleanup runs on every exit path of the handler,
//! including errors and panics. Files left behind by a crashed process are collected
//! by [`TempStore::sweep_older_than`] at the next startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Extension of every file the store creates; nothing else in the directory is touched.
const TRACKED_EXTENSION: &str = "pdf";
const WRITE_PROBE_PREFIX: &str = ".write-probe-";

/// Shared working directory for ephemeral input/output files
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if absent and verify that it is writable.
    ///
    /// Idempotent. An error here means the process cannot serve requests.
    pub fn ensure_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;

        // Unique per call so concurrent readiness checks never remove each other's probe
        let probe = self
            .root
            .join(format!("{}{}", WRITE_PROBE_PREFIX, Uuid::new_v4()));
        fs::write(&probe, b"")?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    /// Remove tracked files whose last modification is older than `max_age`.
    ///
    /// Best-effort: unreadable entries and failed removals are skipped. Returns the
    /// number of files removed.
    pub fn sweep_older_than(&self, max_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut removed = 0;

        for path in self.tracked_files() {
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable temp file");
                    continue;
                }
            };

            // Files with a modification time in the future are left alone
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };

            if age > max_age && Self::remove_if_exists(&path) {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(
                removed,
                max_age_secs = max_age.as_secs(),
                dir = %self.root.display(),
                "Swept stale temp files"
            );
        }
        removed
    }

    /// Remove every tracked file unconditionally. Returns the number removed.
    pub fn wipe_all(&self) -> usize {
        let removed = self
            .tracked_files()
            .into_iter()
            .filter(|path| Self::remove_if_exists(path))
            .count();

        tracing::info!(removed, dir = %self.root.display(), "Wiped temp directory");
        removed
    }

    /// Allocate a fresh input/output pair keyed by a new random identifier.
    pub fn new_pair(&self) -> TempFilePair {
        loop {
            let id = Uuid::new_v4();
            let input = self.root.join(format!("{}_input.{}", id, TRACKED_EXTENSION));
            let output = self.root.join(format!("{}_output.{}", id, TRACKED_EXTENSION));

            // A v4 collision is practically impossible, but an identifier is never
            // handed out while files under it still exist.
            if input.exists() || output.exists() {
                tracing::warn!(%id, "Temp identifier already in use, generating another");
                continue;
            }

            return TempFilePair {
                id,
                input,
                output,
                released: false,
            };
        }
    }

    /// Best-effort removal of a single file. Returns true if a file was removed.
    pub fn remove_if_exists(path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove temp file");
                false
            }
        }
    }

    /// Number of tracked files currently present.
    pub fn tracked_file_count(&self) -> usize {
        self.tracked_files().len()
    }

    /// Run [`sweep_older_than`](Self::sweep_older_than) every `interval` on the blocking pool.
    pub fn spawn_periodic_sweep(
        self: Arc<Self>,
        interval: Duration,
        max_age: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the startup sweep already ran.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let store = self.clone();
                if let Err(e) =
                    tokio::task::spawn_blocking(move || store.sweep_older_than(max_age)).await
                {
                    tracing::warn!(error = %e, "Periodic temp sweep task failed");
                }
            }
        })
    }

    fn tracked_files(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.root.display(), error = %e, "Cannot list temp directory");
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case(TRACKED_EXTENSION))
            })
            .collect()
    }
}

/// Input/output paths owned by one request.
///
/// Dropping the pair removes both files. Call [`cleanup`](Self::cleanup) to release
/// them at a specific point instead of at end of scope.
#[derive(Debug)]
pub struct TempFilePair {
    id: Uuid,
    input: PathBuf,
    output: PathBuf,
    released: bool,
}

impl TempFilePair {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Remove both files now.
    pub fn cleanup(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        TempStore::remove_if_exists(&self.input);
        TempStore::remove_if_exists(&self.output);
        self.released = true;
    }
}

impl Drop for TempFilePair {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs::OpenOptions;
    use tempfile::TempDir;

    fn store() -> (TempDir, TempStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TempStore::new(dir.path().join("work"));
        store.ensure_directory().expect("ensure directory");
        (dir, store)
    }

    fn age_file(path: &Path, age: Duration) {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .expect("open file");
        file.set_modified(SystemTime::now() - age)
            .expect("set mtime");
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let (_dir, store) = store();
        assert!(store.root().is_dir());
        assert!(store.ensure_directory().is_ok());
        assert_eq!(store.tracked_file_count(), 0);
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_directory_concurrent_calls() {
        let (_dir, store) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.ensure_directory().expect("ensure directory");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("probe thread panicked");
        }

        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_directory_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file_path = dir.path().join("not-a-dir");
        fs::write(&file_path, b"x").expect("write");
        let store = TempStore::new(&file_path);
        assert!(store.ensure_directory().is_err());
    }

    #[test]
    fn test_pair_paths_share_identifier() {
        let (_dir, store) = store();
        let pair = store.new_pair();
        let id = pair.id().to_string();
        assert_eq!(
            pair.input_path().file_name().and_then(|n| n.to_str()),
            Some(format!("{}_input.pdf", id).as_str())
        );
        assert_eq!(
            pair.output_path().file_name().and_then(|n| n.to_str()),
            Some(format!("{}_output.pdf", id).as_str())
        );
        assert_eq!(pair.input_path().parent(), Some(store.root()));
    }

    #[test]
    fn test_pairs_never_share_identifiers() {
        let (_dir, store) = store();
        let pairs: Vec<_> = (0..500).map(|_| store.new_pair()).collect();
        let ids: HashSet<_> = pairs.iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), pairs.len());
    }

    #[test]
    fn test_drop_removes_both_files() {
        let (_dir, store) = store();
        let pair = store.new_pair();
        let input = pair.input_path().to_path_buf();
        let output = pair.output_path().to_path_buf();
        fs::write(&input, b"%PDF-in").expect("write input");
        fs::write(&output, b"%PDF-out").expect("write output");
        assert_eq!(store.tracked_file_count(), 2);

        drop(pair);

        assert!(!input.exists());
        assert!(!output.exists());
        assert_eq!(store.tracked_file_count(), 0);
    }

    #[test]
    fn test_cleanup_tolerates_missing_output() {
        let (_dir, store) = store();
        let pair = store.new_pair();
        let input = pair.input_path().to_path_buf();
        fs::write(&input, b"%PDF-in").expect("write input");

        pair.cleanup();

        assert!(!input.exists());
    }

    #[test]
    fn test_pair_removed_when_scope_unwinds() {
        let (_dir, store) = store();
        let input = {
            let pair = store.new_pair();
            fs::write(pair.input_path(), b"%PDF-in").expect("write input");
            let input = pair.input_path().to_path_buf();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                let _owned = pair;
                panic!("fault during compression");
            }));
            assert!(result.is_err());
            input
        };
        assert!(!input.exists());
    }

    #[test]
    fn test_remove_if_exists_missing_file() {
        let (_dir, store) = store();
        assert!(!TempStore::remove_if_exists(&store.root().join("absent.pdf")));
    }

    #[test]
    fn test_sweep_removes_only_old_tracked_files() {
        let (_dir, store) = store();
        let old = store.root().join("old_input.pdf");
        let fresh = store.root().join("fresh_input.pdf");
        let untracked = store.root().join("notes.txt");
        fs::write(&old, b"old").expect("write");
        fs::write(&fresh, b"fresh").expect("write");
        fs::write(&untracked, b"keep").expect("write");
        age_file(&old, Duration::from_secs(7200));
        age_file(&untracked, Duration::from_secs(7200));

        let removed = store.sweep_older_than(Duration::from_secs(3600));

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(untracked.exists());
    }

    #[test]
    fn test_wipe_all_removes_every_tracked_file() {
        let (_dir, store) = store();
        for name in ["a_input.pdf", "a_output.pdf", "b_input.PDF"] {
            fs::write(store.root().join(name), b"x").expect("write");
        }
        fs::write(store.root().join("keep.log"), b"x").expect("write");

        assert_eq!(store.wipe_all(), 3);
        assert_eq!(store.tracked_file_count(), 0);
        assert!(store.root().join("keep.log").exists());
    }

    #[test]
    fn test_sweep_and_wipe_on_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TempStore::new(dir.path().join("never-created"));
        assert_eq!(store.sweep_older_than(Duration::from_secs(1)), 0);
        assert_eq!(store.wipe_all(), 0);
    }

    #[tokio::test]
    async fn test_periodic_sweep_runs_after_interval() {
        let (_dir, store) = store();
        let stale = store.root().join("stale_output.pdf");
        fs::write(&stale, b"x").expect("write");
        age_file(&stale, Duration::from_secs(7200));

        let handle = Arc::new(store.clone())
            .spawn_periodic_sweep(Duration::from_millis(50), Duration::from_secs(3600));

        for _ in 0..100 {
            if !stale.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert!(!stale.exists());
    }
}
