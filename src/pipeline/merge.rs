// src/pipeline/merge.rs

//! Flush, merge and finalize stages.
//!
//! Extraction deduplicates by row identifier; the merge here deduplicates by
//! whole row (position and markup). The two keys are kept distinct on purpose:
//! the same identifier captured with different markup survives the merge.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{Config, RawFragment, ScrollPosition};
use crate::services::{BatchBuffer, RecordTransformer};
use crate::storage::HarvestStore;

/// Result of merging the batch store into the master dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub previous_rows: usize,
    pub batch_rows: usize,
    pub master_rows: usize,
}

/// Result of a successful finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub merge: MergeSummary,
    pub records: usize,
}

/// Persist the buffer and checkpoint `position`, then clear the buffer.
///
/// The checkpoint is written only after the batch store accepted the
/// fragments, so it never points past durable content. Returns the number of
/// fragments now stored.
pub async fn flush(
    store: &dyn HarvestStore,
    buffer: &mut BatchBuffer,
    position: ScrollPosition,
) -> Result<usize> {
    let stored = store
        .append_batch(buffer.fragments())
        .await
        .map_err(|e| AppError::persistence("batch flush", e))?;
    let flushed = buffer.take();
    log::debug!("Flushed {} fragment(s), {} stored", flushed.len(), stored);

    store
        .save_checkpoint(position)
        .await
        .map_err(|e| AppError::persistence("checkpoint", e))?;
    Ok(stored)
}

/// Concatenate master then batch rows, keeping the first of each identical row.
pub fn merge_rows(master: Vec<RawFragment>, batches: Vec<RawFragment>) -> Vec<RawFragment> {
    let mut seen = HashSet::new();
    master
        .into_iter()
        .chain(batches)
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

/// Merge the batch store into the master dataset and write it back.
pub async fn merge(store: &dyn HarvestStore) -> Result<(MergeSummary, Vec<RawFragment>)> {
    let batches = store.load_batches().await?;
    let master = store.load_master().await?;

    let previous_rows = master.len();
    let batch_rows = batches.len();
    let merged = merge_rows(master, batches);

    store
        .save_master(&merged)
        .await
        .map_err(|e| AppError::persistence("master dataset", e))?;

    log::info!(
        "Merged {} batch row(s) into {} existing row(s): {} row(s) in master",
        batch_rows,
        previous_rows,
        merged.len()
    );

    let summary = MergeSummary {
        previous_rows,
        batch_rows,
        master_rows: merged.len(),
    };
    Ok((summary, merged))
}

/// Merge, transform the master into typed records, write the final dataset,
/// and only then delete the checkpoint and batch store.
///
/// Any failure before the final write leaves the intermediate stores in
/// place so a later `finalize` can retry.
pub async fn finalize(config: &Config, store: &dyn HarvestStore) -> Result<FinalizeSummary> {
    let (merge, master) = merge(store).await?;

    let transformer = RecordTransformer::new(&config.extraction)?;
    let records = transformer.transform(&master);

    if let Err(e) = store.save_final(&records).await {
        log::error!(
            "Final dataset write failed, keeping checkpoint and batches for retry: {}",
            e
        );
        return Err(e);
    }
    log::info!("Final dataset written: {} record(s)", records.len());

    store.clear_checkpoint().await?;
    store.clear_batches().await?;

    Ok(FinalizeSummary {
        merge,
        records: records.len(),
    })
}
