// src/pipeline/run.rs

//! Full harvest job: sign in, prepare the page, collect, finalize.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::error::{AppError, Result};
use crate::models::{Config, Credentials, Job, JobState};
use crate::pipeline::harvest::{HarvestOutcome, Harvester, Termination};
use crate::pipeline::login::{login_and_navigate, prune_page};
use crate::pipeline::merge::{self, FinalizeSummary};
use crate::storage::HarvestStore;
use crate::surface::{RenderSurface, with_session};
use crate::utils::report;

/// What one run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub harvest: HarvestOutcome,
    /// `None` when the run was interrupted before finalizing
    pub finalize: Option<FinalizeSummary>,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        self.harvest.termination == Termination::Interrupted
    }

    pub fn log_summary(&self) {
        let harvest = &self.harvest;
        let mut items = vec![
            ("Termination", harvest.termination.to_string()),
            ("Start position", format!("{}px", harvest.start_position)),
            ("Final position", format!("{}px", harvest.last_position)),
            ("Checkpoint", format!("{}px", harvest.checkpoint)),
            ("Unique records", harvest.unique_ids.to_string()),
            ("New this run", harvest.stats.new_records.to_string()),
            ("Flushes", harvest.stats.flushes.to_string()),
        ];
        if let Some(finalize) = &self.finalize {
            items.push(("Master rows", finalize.merge.master_rows.to_string()));
            items.push(("Final records", finalize.records.to_string()));
        }
        report::summary("Harvest run", &items);
    }
}

async fn phase<T>(name: &str, body: impl Future<Output = Result<T>>) -> Result<T> {
    let result = body.await;
    report::outcome(name, result.is_ok());
    result
}

/// Harvest from the checkpoint, then merge and finalize unless interrupted.
///
/// Assumes the surface already shows the target table.
pub async fn run_collection(
    config: &Config,
    surface: &dyn RenderSurface,
    store: &dyn HarvestStore,
    cancel: Arc<AtomicBool>,
) -> Result<RunReport> {
    let harvester = Harvester::new(config, surface, store)?.with_cancel(cancel);
    let harvest = phase("Harvest", harvester.run()).await?;

    if harvest.termination == Termination::Interrupted {
        log::warn!(
            "Skipping merge, resume will continue from {}px",
            harvest.checkpoint
        );
        return Ok(RunReport {
            harvest,
            finalize: None,
        });
    }

    let finalize = phase("Finalize", merge::finalize(config, store)).await?;
    Ok(RunReport {
        harvest,
        finalize: Some(finalize),
    })
}

/// How `run_job` treats existing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Replace a stored `Running` state instead of refusing to start
    pub force: bool,
    /// Discard the checkpoint and pending batches once the job is claimed
    pub fresh: bool,
}

/// Claim the job slot, run every phase inside one surface session, and
/// record the result in the job state file.
///
/// A stored `Running` state blocks the run unless `force` is set, and in
/// that case nothing is cleared even with `fresh`. The surface is closed on
/// every path, including a refused start.
pub async fn run_job(
    config: &Config,
    credentials: &Credentials,
    surface: &dyn RenderSurface,
    store: &dyn HarvestStore,
    cancel: Arc<AtomicBool>,
    options: RunOptions,
) -> Result<RunReport> {
    with_session(surface, async {
        let mut job = claim_job(store, options.force).await?;

        report::header("Scroll harvest");
        let result = run_phases(config, credentials, surface, store, cancel, options.fresh).await;

        let recorded = match &result {
            Ok(run) if run.interrupted() => job.interrupt(run.harvest.checkpoint),
            Ok(run) => job.complete(run.finalize.map(|f| f.records).unwrap_or(0)),
            Err(e) => job.fail(e.to_string()),
        };
        if let Err(e) = recorded {
            log::error!("Could not record job result: {}", e);
        } else if let Err(e) = store.save_job(job.state()).await {
            log::error!("Could not save job state: {}", e);
        }

        if let Ok(run) = &result {
            run.log_summary();
        }
        result
    })
    .await
}

async fn claim_job(store: &dyn HarvestStore, force: bool) -> Result<Job> {
    let mut job = Job::from_state(store.load_job().await?);

    if let JobState::Running { pid, started_at } = job.state().clone() {
        if !force {
            return Err(AppError::validation(format!(
                "a harvest job (pid {pid}) has been running since {started_at}; use --force if it is gone"
            )));
        }
        job.reset();
    }

    job.start(std::process::id())?;
    store.save_job(job.state()).await?;
    Ok(job)
}

async fn run_phases(
    config: &Config,
    credentials: &Credentials,
    surface: &dyn RenderSurface,
    store: &dyn HarvestStore,
    cancel: Arc<AtomicBool>,
    fresh: bool,
) -> Result<RunReport> {
    if fresh {
        log::info!("Discarding checkpoint and pending batches");
        store.clear_checkpoint().await?;
        store.clear_batches().await?;
    }

    report::step(1, 3, "Login - Signing in and opening the table");
    phase("Login", login_and_navigate(config, credentials, surface)).await?;

    report::step(2, 3, "Prepare - Pruning page elements");
    prune_page(config, surface).await;

    report::step(3, 3, "Collect - Harvesting and finalizing");
    run_collection(config, surface, store, cancel).await
}
