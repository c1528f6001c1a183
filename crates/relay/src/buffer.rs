//! Rolling buffer file shared by the fetch loop and the playback process.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tracing::debug;

/// Handle to the session buffer file.
///
/// Cloning yields another handle to the same path; the file itself is only
/// appended to by the fetch loop of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStore {
    path: PathBuf,
}

impl BufferStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file, or truncate it when it already exists. The parent
    /// directory is created as needed.
    pub async fn reset(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        File::create(&self.path).await?;
        debug!(path = %self.path.display(), "Buffer reset");
        Ok(())
    }

    /// Zero the file in place. Fails when the file does not exist.
    pub async fn truncate(&self) -> io::Result<()> {
        let file = OpenOptions::new().write(true).open(&self.path).await?;
        file.set_len(0).await?;
        debug!(path = %self.path.display(), "Buffer truncated");
        Ok(())
    }

    /// Delete the file. A missing file is not an error.
    pub async fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Buffer removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Open the existing file for appending. The file is never created here,
    /// so a buffer removed by cleanup is not resurrected by a late write.
    pub async fn append(&self) -> io::Result<File> {
        OpenOptions::new().append(true).open(&self.path).await
    }

    pub async fn len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }

    /// Whether the file exists and holds at least one byte.
    pub async fn has_data(&self) -> bool {
        matches!(self.len().await, Ok(len) if len > 0)
    }
}
