// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface used by the state store.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace the contents of `path` in one step.
    ///
    /// Readers observe either the old or the new contents, never a mix.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }

        let tmp = temp_path_for(path);
        {
            let mut file =
                fs::File::create(&tmp).with_context(|| format!("creating file {:?}", tmp))?;
            file.write_all(contents)
                .with_context(|| format!("writing to file {:?}", tmp))?;
            file.sync_all()
                .with_context(|| format!("syncing file {:?}", tmp))?;
        }

        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {:?} to {:?}", tmp, path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Sibling temp file used for atomic replacement (`state.json` -> `.state.json.tmp`).
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
