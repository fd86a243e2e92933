//! Store wrapper with injectable failures for tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{JobState, RawFragment, ScrollPosition, TypedRecord};
use crate::storage::{HarvestStore, LocalStorage};

/// Delegates to [`LocalStorage`] unless a failure switch is set.
pub(crate) struct FlakyStore {
    pub inner: LocalStorage,
    pub fail_append: AtomicBool,
    pub fail_final: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: LocalStorage) -> Self {
        Self {
            inner,
            fail_append: AtomicBool::new(false),
            fail_final: AtomicBool::new(false),
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::Io(std::io::Error::other(format!("{what}: disk full"))))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HarvestStore for FlakyStore {
    async fn load_checkpoint(&self) -> Result<ScrollPosition> {
        self.inner.load_checkpoint().await
    }

    async fn save_checkpoint(&self, position: ScrollPosition) -> Result<()> {
        self.inner.save_checkpoint(position).await
    }

    async fn clear_checkpoint(&self) -> Result<()> {
        self.inner.clear_checkpoint().await
    }

    async fn load_batches(&self) -> Result<Vec<RawFragment>> {
        self.inner.load_batches().await
    }

    async fn append_batch(&self, batch: &[RawFragment]) -> Result<usize> {
        Self::check(&self.fail_append, "append_batch")?;
        self.inner.append_batch(batch).await
    }

    async fn clear_batches(&self) -> Result<()> {
        self.inner.clear_batches().await
    }

    async fn load_master(&self) -> Result<Vec<RawFragment>> {
        self.inner.load_master().await
    }

    async fn save_master(&self, rows: &[RawFragment]) -> Result<()> {
        self.inner.save_master(rows).await
    }

    async fn load_final(&self) -> Result<Vec<TypedRecord>> {
        self.inner.load_final().await
    }

    async fn save_final(&self, records: &[TypedRecord]) -> Result<()> {
        Self::check(&self.fail_final, "save_final")?;
        self.inner.save_final(records).await
    }

    async fn load_job(&self) -> Result<JobState> {
        self.inner.load_job().await
    }

    async fn save_job(&self, state: &JobState) -> Result<()> {
        self.inner.save_job(state).await
    }
}
