// src/pipeline/status.rs

//! Snapshot of the data directory for the `status` command.

use crate::error::Result;
use crate::models::{JobState, ScrollPosition};
use crate::storage::HarvestStore;
use crate::utils::report;

/// Current contents of every store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatus {
    pub checkpoint: ScrollPosition,
    pub batch_fragments: usize,
    pub master_rows: usize,
    pub final_records: usize,
    pub job: JobState,
}

impl StoreStatus {
    /// A checkpoint or pending batches mean the next `run` resumes.
    pub fn has_pending_progress(&self) -> bool {
        self.checkpoint > 0 || self.batch_fragments > 0
    }
}

pub async fn collect_status(store: &dyn HarvestStore) -> Result<StoreStatus> {
    Ok(StoreStatus {
        checkpoint: store.load_checkpoint().await?,
        batch_fragments: store.load_batches().await?.len(),
        master_rows: store.load_master().await?.len(),
        final_records: store.load_final().await?.len(),
        job: store.load_job().await?,
    })
}

/// Print the store status.
pub async fn run_status(store: &dyn HarvestStore) -> Result<StoreStatus> {
    let status = collect_status(store).await?;

    let job = match &status.job {
        JobState::Idle => "idle".to_string(),
        JobState::Running { pid, started_at } => {
            format!("running (pid {pid}, since {started_at})")
        }
        JobState::Completed {
            finished_at,
            records,
        } => format!("completed at {finished_at} with {records} record(s)"),
        JobState::Failed { finished_at, error } => format!("failed at {finished_at}: {error}"),
        JobState::Interrupted {
            finished_at,
            position,
        } => format!("interrupted at {finished_at}, position {position}px"),
    };

    report::summary(
        "Harvest status",
        &[
            ("Job", job),
            ("Checkpoint", format!("{}px", status.checkpoint)),
            ("Pending fragments", status.batch_fragments.to_string()),
            ("Master rows", status.master_rows.to_string()),
            ("Final records", status.final_records.to_string()),
        ],
    );
    if status.has_pending_progress() {
        log::info!("Next run resumes from {}px", status.checkpoint);
    }
    Ok(status)
}
