//! Harvest job lifecycle.
//!
//! A single `Job` value owns the state of the harvest process. Callers move
//! it through `start`, `complete`, `fail` and `interrupt`; anything else is
//! rejected with [`AppError::InvalidTransition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ScrollPosition;

/// Persisted state of the harvest job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running {
        pid: u32,
        started_at: DateTime<Utc>,
    },
    Completed {
        finished_at: DateTime<Utc>,
        records: usize,
    },
    Failed {
        finished_at: DateTime<Utc>,
        error: String,
    },
    Interrupted {
        finished_at: DateTime<Utc>,
        position: ScrollPosition,
    },
}

impl JobState {
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Interrupted { .. } => "interrupted",
        }
    }
}

/// The harvest job and its transitions.
#[derive(Debug, Clone, Default)]
pub struct Job {
    state: JobState,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume tracking from a previously persisted state.
    pub fn from_state(state: JobState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, JobState::Running { .. })
    }

    /// Begin a run. Refused while another run is recorded as running.
    pub fn start(&mut self, pid: u32) -> Result<()> {
        if self.is_running() {
            return Err(self.refuse("running"));
        }
        self.state = JobState::Running {
            pid,
            started_at: Utc::now(),
        };
        Ok(())
    }

    /// Finish a run successfully.
    pub fn complete(&mut self, records: usize) -> Result<()> {
        self.finish("completed")?;
        self.state = JobState::Completed {
            finished_at: Utc::now(),
            records,
        };
        Ok(())
    }

    /// Finish a run with an error.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.finish("failed")?;
        self.state = JobState::Failed {
            finished_at: Utc::now(),
            error: error.into(),
        };
        Ok(())
    }

    /// Record an external interrupt and the last flushed position.
    pub fn interrupt(&mut self, position: ScrollPosition) -> Result<()> {
        self.finish("interrupted")?;
        self.state = JobState::Interrupted {
            finished_at: Utc::now(),
            position,
        };
        Ok(())
    }

    /// Drop a stale `Running` record left behind by a killed process.
    pub fn reset(&mut self) {
        if self.is_running() {
            log::warn!("Discarding stale running job state");
        }
        self.state = JobState::Idle;
    }

    fn finish(&self, to: &str) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(self.refuse(to))
        }
    }

    fn refuse(&self, to: &str) -> AppError {
        AppError::InvalidTransition {
            from: self.state.label().to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_complete() {
        let mut job = Job::new();
        job.start(42).unwrap();
        assert!(job.is_running());

        job.complete(3).unwrap();
        assert!(matches!(
            job.state(),
            JobState::Completed { records: 3, .. }
        ));
    }

    #[test]
    fn test_second_start_refused() {
        let mut job = Job::new();
        job.start(1).unwrap();
        let err = job.start(2).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_finish_requires_running() {
        let mut job = Job::new();
        assert!(job.complete(0).is_err());
        assert!(job.fail("boom").is_err());
        assert!(job.interrupt(0).is_err());
    }

    #[test]
    fn test_restart_after_failure() {
        let mut job = Job::new();
        job.start(1).unwrap();
        job.fail("surface closed").unwrap();
        assert!(job.start(2).is_ok());
    }

    #[test]
    fn test_reset_clears_stale_running() {
        let mut job = Job::from_state(JobState::Running {
            pid: 7,
            started_at: Utc::now(),
        });
        job.reset();
        assert_eq!(job.state(), &JobState::Idle);
    }

    #[test]
    fn test_state_serialization_tag() {
        let json = serde_json::to_value(JobState::Idle).unwrap();
        assert_eq!(json["state"], "idle");

        let state = JobState::Interrupted {
            finished_at: Utc::now(),
            position: 1600,
        };
        let round: JobState = serde_json::from_value(serde_json::to_value(&state).unwrap()).unwrap();
        assert_eq!(round, state);
    }
}
