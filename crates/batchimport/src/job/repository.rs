//! Storage of job instances and execution status.

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};

use super::execution::{BatchStatus, JobInstance};
use super::parameters::JobParameters;
use crate::db::{job_repo, Database, DatabaseError};

/// Status of the latest execution of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub id: i64,
    pub status: BatchStatus,
}

pub trait JobRepository: Send + Sync {
    /// Resolves the instance identified by the identifying subset of
    /// `parameters`, creating it on first use.
    fn get_or_create_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance, DatabaseError>;

    /// Looks up an existing instance without creating one.
    fn find_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<Option<JobInstance>, DatabaseError>;

    fn last_execution(
        &self,
        instance: &JobInstance,
    ) -> Result<Option<ExecutionSummary>, DatabaseError>;

    /// Records a new execution in `STARTED` status and returns its id.
    fn start_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
        started_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError>;

    fn finish_execution(
        &self,
        execution_id: i64,
        status: BatchStatus,
        ended_at: DateTime<Utc>,
        exit_message: Option<&str>,
    ) -> Result<(), DatabaseError>;

    fn execution_count(&self, instance: &JobInstance) -> Result<usize, DatabaseError>;
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Repository backed by the `batch_job_*` tables.
#[derive(Clone)]
pub struct SqliteJobRepository {
    db: Database,
}

impl SqliteJobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl JobRepository for SqliteJobRepository {
    fn get_or_create_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance, DatabaseError> {
        let (row, created) = job_repo::get_or_create_instance(
            &self.db,
            job_name,
            &parameters.job_key(),
            &timestamp(Utc::now()),
        )?;
        if created {
            log::debug!("Created job instance {} for '{}'", row.id, job_name);
        }
        Ok(JobInstance {
            id: row.id,
            job_name: row.job_name,
            job_key: row.job_key,
        })
    }

    fn find_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<Option<JobInstance>, DatabaseError> {
        let row = job_repo::find_instance(&self.db, job_name, &parameters.job_key())?;
        Ok(row.map(|row| JobInstance {
            id: row.id,
            job_name: row.job_name,
            job_key: row.job_key,
        }))
    }

    fn last_execution(
        &self,
        instance: &JobInstance,
    ) -> Result<Option<ExecutionSummary>, DatabaseError> {
        let Some(row) = job_repo::last_execution(&self.db, instance.id)? else {
            return Ok(None);
        };
        let status = row
            .status
            .parse::<BatchStatus>()
            .map_err(|reason| DatabaseError::Corrupt {
                table: "batch_job_executions",
                reason,
            })?;
        Ok(Some(ExecutionSummary { id: row.id, status }))
    }

    fn start_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
        started_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let parameters = serde_json::to_string(parameters).map_err(|e| DatabaseError::Corrupt {
            table: "batch_job_executions",
            reason: format!("parameters not serializable: {}", e),
        })?;
        job_repo::insert_execution(
            &self.db,
            instance.id,
            BatchStatus::Started.as_str(),
            &parameters,
            &timestamp(started_at),
        )
    }

    fn finish_execution(
        &self,
        execution_id: i64,
        status: BatchStatus,
        ended_at: DateTime<Utc>,
        exit_message: Option<&str>,
    ) -> Result<(), DatabaseError> {
        job_repo::finish_execution(
            &self.db,
            execution_id,
            status.as_str(),
            &timestamp(ended_at),
            exit_message,
        )
    }

    fn execution_count(&self, instance: &JobInstance) -> Result<usize, DatabaseError> {
        Ok(job_repo::executions_for_instance(&self.db, instance.id)?.len())
    }
}

#[derive(Default)]
struct InMemoryState {
    instances: Vec<JobInstance>,
    /// (execution id, instance id, status)
    executions: Vec<(i64, i64, BatchStatus)>,
}

/// Process-local repository; identity lasts as long as the value does.
#[derive(Default)]
pub struct InMemoryJobRepository {
    state: Mutex<InMemoryState>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn get_or_create_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance, DatabaseError> {
        let mut state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let job_key = parameters.job_key();
        if let Some(existing) = state
            .instances
            .iter()
            .find(|i| i.job_name == job_name && i.job_key == job_key)
        {
            return Ok(existing.clone());
        }
        let instance = JobInstance {
            id: state.instances.len() as i64 + 1,
            job_name: job_name.to_string(),
            job_key,
        };
        state.instances.push(instance.clone());
        Ok(instance)
    }

    fn find_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<Option<JobInstance>, DatabaseError> {
        let state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let job_key = parameters.job_key();
        Ok(state
            .instances
            .iter()
            .find(|i| i.job_name == job_name && i.job_key == job_key)
            .cloned())
    }

    fn last_execution(
        &self,
        instance: &JobInstance,
    ) -> Result<Option<ExecutionSummary>, DatabaseError> {
        let state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(state
            .executions
            .iter()
            .rev()
            .find(|(_, instance_id, _)| *instance_id == instance.id)
            .map(|(id, _, status)| ExecutionSummary {
                id: *id,
                status: *status,
            }))
    }

    fn start_execution(
        &self,
        instance: &JobInstance,
        _parameters: &JobParameters,
        _started_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let mut state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let id = state.executions.len() as i64 + 1;
        state
            .executions
            .push((id, instance.id, BatchStatus::Started));
        Ok(id)
    }

    fn finish_execution(
        &self,
        execution_id: i64,
        status: BatchStatus,
        _ended_at: DateTime<Utc>,
        _exit_message: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        if let Some(entry) = state
            .executions
            .iter_mut()
            .find(|(id, _, _)| *id == execution_id)
        {
            entry.2 = status;
        }
        Ok(())
    }

    fn execution_count(&self, instance: &JobInstance) -> Result<usize, DatabaseError> {
        let state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(state
            .executions
            .iter()
            .filter(|(_, instance_id, _)| *instance_id == instance.id)
            .count())
    }
}
