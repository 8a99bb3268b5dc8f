//! Artifact output

use std::io;
use std::path::{Path, PathBuf};

/// Write `bytes` to `directory/filename`, creating the directory if absent.
///
/// An existing file is overwritten.
pub async fn write(directory: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(directory).await?;
    let path = directory.join(filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Writes artifacts into one output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    directory: PathBuf,
}

impl OutputWriter {
    /// Writer for `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Target directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the directory up front so an unusable location fails the
    /// run before any work is done
    pub async fn ensure_directory(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await
    }

    /// Write one artifact
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        write(&self.directory, filename, bytes).await
    }
}
