// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Saving received bytes
//
// Bytes are written to a per-task `.part` file as they arrive. A resumed
// request appends to it; completion renames it to the final name.

use crate::types::AppError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, SeekFrom};

/// Directory that finished downloads are saved into
#[derive(Debug, Clone)]
pub struct DownloadDir {
    root: PathBuf,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Partial file for one task
    pub fn partial_path(&self, task_id: &str, name: &str) -> PathBuf {
        let short_id: String = task_id.chars().take(8).collect();
        self.root
            .join(format!(".{}.{}.part", safe_file_name(name), short_id))
    }

    /// Open the partial file positioned at `offset`. Anything past the
    /// offset was never counted as received and is cut off.
    pub async fn open_partial(&self, path: &Path, offset: u64) -> Result<File, AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to create download dir: {}", e)))?;

        if offset == 0 {
            return File::create(path)
                .await
                .map_err(|e| AppError::FileIo(format!("Failed to create file: {}", e)));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to open file: {}", e)))?;
        let existing = file.metadata().await?.len();
        if existing < offset {
            return Err(AppError::FileIo(format!(
                "Partial file holds {} bytes, expected {}",
                existing, offset
            )));
        }
        file.set_len(offset).await?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to seek: {}", e)))?;
        Ok(file)
    }

    /// Move a finished partial file to its final, non-clashing name
    pub async fn finalize(&self, partial: &Path, name: &str) -> Result<PathBuf, AppError> {
        let destination = self.unique_destination(name).await?;
        tokio::fs::rename(partial, &destination)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to save {}: {}", name, e)))?;
        tracing::info!("Saved {:?}", destination);
        Ok(destination)
    }

    /// Delete a partial file that will never be resumed
    pub fn discard(&self, partial: &Path) {
        match std::fs::remove_file(partial) {
            Ok(()) => tracing::debug!("Discarded {:?}", partial),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to discard {:?}: {}", partial, e),
        }
    }

    /// `name`, or `name (1)`, `name (2)`, ... if taken
    async fn unique_destination(&self, name: &str) -> Result<PathBuf, AppError> {
        let name = safe_file_name(name);
        let candidate = self.root.join(&name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }

        let path = Path::new(&name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.clone());
        let extension = path.extension().map(|e| e.to_string_lossy().to_string());

        let mut n = 1u32;
        loop {
            let numbered = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = self.root.join(numbered);
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

/// Last path component of a remote name, so nothing lands outside the root
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "download".to_string())
}
