//! Local filesystem storage implementation.
//!
//! Every write goes to a `.tmp` sibling first and is renamed over the target,
//! so a crash mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{JobState, PathsConfig, RawFragment, ScrollPosition, TypedRecord};
use crate::storage::HarvestStore;
use crate::utils::csv;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    paths: PathsConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory with default file names.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths: PathsConfig::default(),
        }
    }

    /// Create a LocalStorage using the configured directory and file names.
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            root_dir: paths.data_dir.clone(),
            paths: paths.clone(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::persistence(key, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Remove a file, treating a missing file as already removed.
    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => {
                log::info!("Removed {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn csv_key(&self) -> String {
        Path::new(&self.paths.final_file)
            .with_extension("csv")
            .to_string_lossy()
            .into_owned()
    }
}

/// Parse checkpoint file content. `None` when it is not a single integer.
fn parse_checkpoint(bytes: &[u8]) -> Option<ScrollPosition> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

#[async_trait]
impl HarvestStore for LocalStorage {
    async fn load_checkpoint(&self) -> Result<ScrollPosition> {
        let key = &self.paths.checkpoint_file;
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(parse_checkpoint(&bytes).unwrap_or_else(|| {
                log::warn!("Checkpoint {} is unreadable, starting from 0", key);
                0
            })),
            None => Ok(0),
        }
    }

    async fn save_checkpoint(&self, position: ScrollPosition) -> Result<()> {
        self.write_bytes(&self.paths.checkpoint_file, position.to_string().as_bytes())
            .await?;
        log::info!("Checkpoint saved at {}px", position);
        Ok(())
    }

    async fn clear_checkpoint(&self) -> Result<()> {
        self.remove(&self.paths.checkpoint_file).await
    }

    async fn load_batches(&self) -> Result<Vec<RawFragment>> {
        Ok(self
            .read_json(&self.paths.batch_file)
            .await?
            .unwrap_or_default())
    }

    async fn append_batch(&self, batch: &[RawFragment]) -> Result<usize> {
        let mut stored = self.load_batches().await?;
        stored.extend_from_slice(batch);
        self.write_json(&self.paths.batch_file, &stored).await?;
        log::info!(
            "Flushed {} fragment(s) to {} ({} stored)",
            batch.len(),
            self.paths.batch_file,
            stored.len()
        );
        Ok(stored.len())
    }

    async fn clear_batches(&self) -> Result<()> {
        self.remove(&self.paths.batch_file).await
    }

    async fn load_master(&self) -> Result<Vec<RawFragment>> {
        Ok(self
            .read_json(&self.paths.master_file)
            .await?
            .unwrap_or_default())
    }

    async fn save_master(&self, rows: &[RawFragment]) -> Result<()> {
        self.write_json(&self.paths.master_file, rows).await
    }

    async fn load_final(&self) -> Result<Vec<TypedRecord>> {
        Ok(self
            .read_json(&self.paths.final_file)
            .await?
            .unwrap_or_default())
    }

    async fn save_final(&self, records: &[TypedRecord]) -> Result<()> {
        self.write_json(&self.paths.final_file, records).await?;

        if self.paths.export_csv {
            let rows: Vec<Vec<String>> = records.iter().map(TypedRecord::to_cells).collect();
            let headers: Vec<String> = TypedRecord::HEADERS.iter().map(|h| h.to_string()).collect();
            let contents = csv::to_csv_string(&headers, &rows);
            self.write_bytes(&self.csv_key(), contents.as_bytes())
                .await?;
        }
        Ok(())
    }

    async fn load_job(&self) -> Result<JobState> {
        Ok(self
            .read_json(&self.paths.job_file)
            .await?
            .unwrap_or_default())
    }

    async fn save_job(&self, state: &JobState) -> Result<()> {
        self.write_json(&self.paths.job_file, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fragment(position: u64, html: &str) -> RawFragment {
        RawFragment {
            position,
            html_content: html.to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_checkpoint_absent_is_zero() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.load_checkpoint().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.save_checkpoint(1600).await.unwrap();
        assert_eq!(storage.load_checkpoint().await.unwrap(), 1600);

        let raw = std::fs::read_to_string(tmp.path().join("last_position.txt")).unwrap();
        assert_eq!(raw, "1600");
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_zero() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("last_position.txt"), "12ab\n").unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.load_checkpoint().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint_tolerates_whitespace() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("last_position.txt"), " 2400\n").unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.load_checkpoint().await.unwrap(), 2400);
    }

    #[tokio::test]
    async fn test_clear_checkpoint_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.clear_checkpoint().await.is_ok());
    }

    #[tokio::test]
    async fn test_append_batch_accumulates() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let total = storage
            .append_batch(&[fragment(0, "<table>a</table>")])
            .await
            .unwrap();
        assert_eq!(total, 1);

        let total = storage
            .append_batch(&[fragment(800, "<table>b</table>"), fragment(1600, "<table>c</table>")])
            .await
            .unwrap();
        assert_eq!(total, 3);

        let loaded = storage.load_batches().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].position, 0);
        assert_eq!(loaded[2].html_content, "<table>c</table>");
    }

    #[tokio::test]
    async fn test_corrupt_batch_store_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("batches.json"), "{not json").unwrap();
        let storage = LocalStorage::new(tmp.path());

        let err = storage.load_batches().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_save_final_writes_csv() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let record = TypedRecord {
            id: "00012".to_string(),
            short_name: "Pipe".to_string(),
            full_name: "Pipe, steel".to_string(),
            quantity: 4,
            price: 12.5,
            code: "GOST 8732".to_string(),
            grade: "St20".to_string(),
            weight: 1.25,
        };
        storage.save_final(&[record.clone()]).await.unwrap();

        assert_eq!(storage.load_final().await.unwrap(), vec![record]);

        let csv = std::fs::read_to_string(tmp.path().join("result.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,short_name,full_name,quantity,price,code,grade,weight")
        );
        assert_eq!(
            lines.next(),
            Some(r#"00012,Pipe,"Pipe, steel",4,12.5,GOST 8732,St20,1.25"#)
        );
    }

    #[tokio::test]
    async fn test_job_state_defaults_to_idle() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.load_job().await.unwrap(), JobState::Idle);
    }

    #[tokio::test]
    async fn test_from_config_uses_file_names() {
        let tmp = TempDir::new().unwrap();
        let paths = PathsConfig {
            data_dir: tmp.path().join("nested"),
            checkpoint_file: "pos.txt".to_string(),
            ..PathsConfig::default()
        };
        let storage = LocalStorage::from_config(&paths);

        storage.save_checkpoint(5).await.unwrap();
        assert!(tmp.path().join("nested/pos.txt").exists());
    }
}
