use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::parameters::JobParameters;
use crate::error::StepError;
use crate::step::StepExecution;

/// Status of a job execution.
///
/// `Started` is the only non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Started,
    Completed,
    Failed,
    Stopped,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Started => "STARTED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Stopped => "STOPPED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Started)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(BatchStatus::Started),
            "COMPLETED" => Ok(BatchStatus::Completed),
            "FAILED" => Ok(BatchStatus::Failed),
            "STOPPED" => Ok(BatchStatus::Stopped),
            other => Err(format!("unknown batch status '{}'", other)),
        }
    }
}

/// A logical run of a job for one set of identifying parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInstance {
    pub id: i64,
    pub job_name: String,
    pub job_key: String,
}

/// One physical attempt at a job instance.
#[derive(Debug)]
pub struct JobExecution {
    pub id: i64,
    pub instance: JobInstance,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepExecution>,
    /// The error of the step that failed the run, if any.
    pub failure: Option<StepError>,
}

impl JobExecution {
    pub fn is_successful(&self) -> bool {
        self.status == BatchStatus::Completed
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.step.as_str())
    }

    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_name == name)
    }
}
