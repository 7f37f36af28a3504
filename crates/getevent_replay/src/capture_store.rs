//! Host-side storage for raw captures and staged cluster files

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{ReplayError, Result};

/// File name of the raw capture inside a session directory
pub const CAPTURE_FILE_NAME: &str = "capture.bin";

fn session_name(now: DateTime<Local>) -> String {
    // Format: yyyy-mm-dd_HH-MM-SS-mmm
    now.format("%Y-%m-%d_%H-%M-%S-%3f").to_string()
}

/// Manages one timestamped session directory under a base folder
#[derive(Debug, Clone)]
pub struct CaptureStore {
    base_dir: PathBuf,
    session_dir: PathBuf,
}

impl CaptureStore {
    /// Create the store and its session directory
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let session_dir = base_dir.join(session_name(Local::now()));

        fs::create_dir_all(&session_dir)
            .await
            .map_err(ReplayError::Io)?;

        info!("Capture session directory: {}", session_dir.display());

        Ok(Self {
            base_dir,
            session_dir,
        })
    }

    /// Write the raw capture of this session
    pub async fn save_capture(&self, data: &[u8]) -> Result<PathBuf> {
        let path = self.session_dir.join(CAPTURE_FILE_NAME);
        fs::write(&path, data).await.map_err(ReplayError::Io)?;
        debug!("Saved capture: {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// Write one cluster's raw bytes as `<index>.bin`
    pub async fn save_cluster(&self, index: usize, data: &[u8]) -> Result<PathBuf> {
        let path = self.cluster_path(index);
        fs::write(&path, data).await.map_err(ReplayError::Io)?;
        debug!("Saved cluster {}: {} ({} bytes)", index, path.display(), data.len());
        Ok(path)
    }

    pub fn cluster_path(&self, index: usize) -> PathBuf {
        self.session_dir.join(format!("{}.bin", index))
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Read a previously stored capture
pub async fn load_capture(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path).await.map_err(ReplayError::Io)?;
    debug!("Loaded capture: {} ({} bytes)", path.display(), data.len());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_capture_store_creation() {
        let temp_dir = tempdir().unwrap();
        let store = CaptureStore::new(temp_dir.path()).await.unwrap();

        assert!(store.session_dir().exists());
        assert_eq!(store.base_dir(), temp_dir.path());
        assert!(store.session_dir().starts_with(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_save_and_load_capture() {
        let temp_dir = tempdir().unwrap();
        let store = CaptureStore::new(temp_dir.path()).await.unwrap();
        let data: Vec<u8> = (0u8..=47).collect();

        let path = store.save_capture(&data).await.unwrap();
        assert_eq!(path.file_name().unwrap(), CAPTURE_FILE_NAME);
        assert_eq!(load_capture(&path).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_save_cluster_names() {
        let temp_dir = tempdir().unwrap();
        let store = CaptureStore::new(temp_dir.path()).await.unwrap();

        let path = store.save_cluster(3, &[1, 2, 3]).await.unwrap();
        assert_eq!(path, store.cluster_path(3));
        assert_eq!(path.file_name().unwrap(), "3.bin");
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_load_missing_capture_fails() {
        let temp_dir = tempdir().unwrap();
        let result = load_capture(temp_dir.path().join("missing.bin")).await;
        assert!(matches!(result, Err(ReplayError::Io(_))));
    }
}
