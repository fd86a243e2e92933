//! Durable stores for harvest progress.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── last_position.txt     # Checkpoint: last flushed scroll position
//! ├── batches.json          # Fragments flushed during the current run
//! ├── master.json           # Merged fragments across runs (full-row dedup)
//! ├── result.json           # Typed records produced from master.json
//! ├── result.csv            # Optional CSV export of result.json
//! └── job.json              # Job state
//! ```
//!
//! `last_position.txt` and `batches.json` only exist between a flush and a
//! successful finalize.

pub mod local;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{JobState, RawFragment, ScrollPosition, TypedRecord};

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for harvest storage backends.
#[async_trait]
pub trait HarvestStore: Send + Sync {
    /// Last checkpointed position, or `0` when absent or unreadable.
    async fn load_checkpoint(&self) -> Result<ScrollPosition>;

    /// Replace the checkpoint.
    async fn save_checkpoint(&self, position: ScrollPosition) -> Result<()>;

    async fn clear_checkpoint(&self) -> Result<()>;

    /// All fragments flushed so far in the current run.
    async fn load_batches(&self) -> Result<Vec<RawFragment>>;

    /// Append fragments to the batch store. Returns the stored fragment count.
    async fn append_batch(&self, batch: &[RawFragment]) -> Result<usize>;

    async fn clear_batches(&self) -> Result<()>;

    /// Merged fragments from previous runs.
    async fn load_master(&self) -> Result<Vec<RawFragment>>;

    async fn save_master(&self, rows: &[RawFragment]) -> Result<()>;

    async fn load_final(&self) -> Result<Vec<TypedRecord>>;

    /// Write the final typed dataset.
    async fn save_final(&self, records: &[TypedRecord]) -> Result<()>;

    /// Stored job state, `Idle` when none was recorded.
    async fn load_job(&self) -> Result<JobState>;

    async fn save_job(&self, state: &JobState) -> Result<()>;
}
