//! Steps: the units of work a job runs in order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StepFailure;
use crate::job::parameters::JobParameters;
use crate::job::progress::ProgressReporter;
use crate::job::stop::StopSignal;

pub mod chunk;
pub mod tasklet;

pub use chunk::{ChunkState, ChunkStep, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
pub use tasklet::{ParameterEchoTasklet, Tasklet, TaskletStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Started,
    Completed,
    Failed,
    Stopped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Started => "STARTED",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Failed => "FAILED",
            StepStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step's contribution to a job execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepExecution {
    pub step_name: String,
    pub status: StepStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub commit_count: u64,
    /// Items dropped by a processor.
    pub filter_count: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status: StepStatus::Started,
            read_count: 0,
            write_count: 0,
            commit_count: 0,
            filter_count: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Run-scoped values handed to every step.
pub struct StepContext<'a> {
    pub job_name: &'a str,
    pub execution_id: i64,
    pub parameters: &'a JobParameters,
    pub stop: &'a StopSignal,
    pub progress: &'a dyn ProgressReporter,
}

pub trait Step: Send {
    fn name(&self) -> &str;

    /// Runs the step to completion.
    ///
    /// Counters are updated on `execution` as work progresses, so they stay
    /// accurate when the step fails part way. Returns `Completed` or
    /// `Stopped`; failures come back as `Err`.
    fn execute(
        &mut self,
        ctx: &StepContext<'_>,
        execution: &mut StepExecution,
    ) -> Result<StepStatus, StepFailure>;
}
