// src/pipeline/harvest.rs

//! Incremental scroll-and-extract loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, RawFragment, ScrollPosition};
use crate::pipeline::merge;
use crate::services::{BatchBuffer, RowExtractor, SeenIndex};
use crate::storage::HarvestStore;
use crate::surface::{RenderSurface, ScrollMode};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Position reached the scrollable extent
    EndOfContent,
    /// Position reached the configured hard cap
    PositionCap,
    /// Too many consecutive iterations without a new row
    Stalled,
    /// Cancellation was requested
    Interrupted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Termination::EndOfContent => "end of content",
            Termination::PositionCap => "position cap",
            Termination::Stalled => "stalled",
            Termination::Interrupted => "interrupted",
        };
        f.write_str(label)
    }
}

/// Counters collected over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub iterations: u64,
    pub new_records: usize,
    pub duplicates: usize,
    pub fragments: usize,
    pub flushes: usize,
    pub stall_increments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub termination: Termination,
    pub start_position: ScrollPosition,
    /// Last position that was scrolled to and scanned
    pub last_position: ScrollPosition,
    /// Position held by the checkpoint store when the loop stopped
    pub checkpoint: ScrollPosition,
    pub unique_ids: usize,
    pub stats: HarvestStats,
}

/// Drives a [`RenderSurface`] from the checkpoint until a stop condition,
/// buffering newly seen rows and flushing them to the store.
pub struct Harvester<'a> {
    config: &'a Config,
    surface: &'a dyn RenderSurface,
    store: &'a dyn HarvestStore,
    extractor: RowExtractor,
    cancel: Arc<AtomicBool>,
}

impl<'a> Harvester<'a> {
    pub fn new(
        config: &'a Config,
        surface: &'a dyn RenderSurface,
        store: &'a dyn HarvestStore,
    ) -> Result<Self> {
        Ok(Self {
            config,
            surface,
            store,
            extractor: RowExtractor::new(&config.extraction)?,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop at the next iteration boundary once `cancel` is set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run the loop to completion.
    ///
    /// On every stop condition except cancellation the remaining buffer is
    /// flushed and the last scanned position checkpointed. Cancellation
    /// leaves all stores at their last flushed state.
    pub async fn run(&self) -> Result<HarvestOutcome> {
        let scroll = &self.config.scroll;

        let start_position = self.store.load_checkpoint().await?;
        let persisted = self.store.load_batches().await?;
        let mut index = SeenIndex::rebuild(&persisted, &self.extractor);
        log::info!(
            "Starting at position {} with {} known identifier(s) from {} stored fragment(s)",
            start_position,
            index.len(),
            persisted.len()
        );
        drop(persisted);

        let mode = ScrollMode::detect(self.surface, &self.config.extraction.scroll_region).await?;

        let mut buffer = BatchBuffer::new(scroll.batch_size);
        let mut stats = HarvestStats::default();
        let mut position = start_position;
        let mut last_position = start_position;
        let mut checkpoint = start_position;
        let mut stall: u32 = 0;

        let termination = loop {
            if self.cancelled() {
                log::warn!(
                    "Interrupted before position {}, {} buffered fragment(s) discarded",
                    position,
                    buffer.len()
                );
                break Termination::Interrupted;
            }

            stats.iterations += 1;
            let extent = mode.extent(self.surface).await?;
            mode.scroll_to(self.surface, position).await?;
            pause(scroll.settle_delay()).await;

            let content = self.surface.current_content().await?;
            let mut new_rows = Vec::new();
            let mut duplicates = 0;
            for row in self.extractor.extract(&content) {
                if index.register(&row.id) {
                    new_rows.push(row.html);
                } else {
                    duplicates += 1;
                }
            }
            stats.duplicates += duplicates;

            if new_rows.is_empty() {
                stall += 1;
                stats.stall_increments += 1;
                if stall % 10 == 0 {
                    log::info!(
                        "No new rows for {} attempt(s), position {}",
                        stall,
                        position
                    );
                }
            } else {
                stall = 0;
                stats.new_records += new_rows.len();
                stats.fragments += 1;
                log::info!(
                    "Position {}: {} new, {} duplicate, {} unique so far",
                    position,
                    new_rows.len(),
                    duplicates,
                    index.len()
                );
                buffer.push(RawFragment::from_rows(position, &new_rows));
            }

            if buffer.is_full() {
                merge::flush(self.store, &mut buffer, position).await?;
                checkpoint = position;
                stats.flushes += 1;
            }

            last_position = position;
            position = position.saturating_add(scroll.step);

            if position >= extent {
                break Termination::EndOfContent;
            }
            if position >= scroll.max_position {
                break Termination::PositionCap;
            }
            if stall >= scroll.max_stall_attempts {
                break Termination::Stalled;
            }

            pause(scroll.step_pause()).await;
        };

        if termination != Termination::Interrupted {
            merge::flush(self.store, &mut buffer, last_position).await?;
            checkpoint = last_position;
            stats.flushes += 1;
        }

        log::info!(
            "Harvest stopped ({}) at position {}: {} unique identifier(s)",
            termination,
            last_position,
            index.len()
        );

        Ok(HarvestOutcome {
            termination,
            start_position,
            last_position,
            checkpoint,
            unique_ids: index.len(),
            stats,
        })
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
