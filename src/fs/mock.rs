// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory filesystem for tests.
///
/// Clones share the same underlying files, so a test can keep a handle and
/// inspect what the code under test wrote. Writes can be made to fail to
/// exercise persistence error paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files.get(path.as_ref()).cloned()
    }

    /// Make every subsequent `write_atomic` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(content) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated write failure: {:?}", path));
        }
        self.add_file(path, contents);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }
}
