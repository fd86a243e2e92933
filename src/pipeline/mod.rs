//! Pipeline entry points for harvest operations.
//!
//! - `run_job`: Sign in, harvest from the checkpoint, finalize
//! - `finalize`: Merge stored batches and write the final dataset
//! - `run_status`: Report what the data directory holds
//! - `run_validate`: Check configuration and selectors

pub mod harvest;
pub mod login;
pub mod merge;
pub mod run;
pub mod status;
pub mod validate;

pub use harvest::{HarvestOutcome, HarvestStats, Harvester, Termination};
pub use merge::{FinalizeSummary, MergeSummary, finalize};
pub use run::{RunOptions, RunReport, run_collection, run_job};
pub use status::{StoreStatus, run_status};
pub use validate::run_validate;
