//! Sequential execution of a job's steps against a job repository.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use super::execution::{BatchStatus, JobExecution};
use super::parameters::{JobParameter, JobParameters, ParameterValue};
use super::progress::{NoopProgress, ProgressEvent, ProgressReporter};
use super::repository::JobRepository;
use super::stop::StopSignal;
use crate::error::{JobError, StepError};
use crate::step::{Step, StepContext, StepExecution, StepStatus};

/// Parameter injected under [`IdentityPolicy::FreshToken`].
pub const RUN_ID_KEY: &str = "run.id";

/// Exit message recorded on executions closed by [`JobRun::abandon_stale`].
pub const ABANDONED_MESSAGE: &str = "Abandoned: execution never finished";

/// How a run decides which job instance it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// The caller's identifying parameters decide the instance.
    #[default]
    Parameters,
    /// Every run gets a fresh identifying token, so every run is a new instance.
    FreshToken,
}

pub struct JobRun {
    name: String,
    steps: Vec<Box<dyn Step>>,
    repository: Arc<dyn JobRepository>,
    identity: IdentityPolicy,
    stop: StopSignal,
    progress: Arc<dyn ProgressReporter>,
}

pub struct JobRunBuilder {
    name: String,
    steps: Vec<Box<dyn Step>>,
    repository: Arc<dyn JobRepository>,
    identity: IdentityPolicy,
    stop: StopSignal,
    progress: Arc<dyn ProgressReporter>,
}

impl JobRunBuilder {
    /// Appends a step; steps run in the order they are added.
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> Result<JobRun, JobError> {
        if self.steps.is_empty() {
            return Err(JobError::NoSteps {
                job_name: self.name,
            });
        }
        Ok(JobRun {
            name: self.name,
            steps: self.steps,
            repository: self.repository,
            identity: self.identity,
            stop: self.stop,
            progress: self.progress,
        })
    }
}

impl JobRun {
    pub fn builder(name: impl Into<String>, repository: Arc<dyn JobRepository>) -> JobRunBuilder {
        JobRunBuilder {
            name: name.into(),
            steps: Vec::new(),
            repository,
            identity: IdentityPolicy::default(),
            stop: StopSignal::new(),
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle that stops the run at the next chunk or step boundary.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    fn resolve_parameters(&self, parameters: JobParameters) -> JobParameters {
        match self.identity {
            IdentityPolicy::FreshToken if !parameters.contains_key(RUN_ID_KEY) => parameters.with(
                RUN_ID_KEY,
                JobParameter {
                    value: ParameterValue::String(uuid::Uuid::new_v4().to_string()),
                    identifying: true,
                },
            ),
            _ => parameters,
        }
    }

    /// Closes out an execution left `STARTED` by a process that died.
    ///
    /// The execution is marked `FAILED`, so the next [`execute`](Self::execute)
    /// with the same parameters restarts the instance. Returns the id of the
    /// abandoned execution, or `None` when nothing was running. Only call this
    /// when no other process is running the instance.
    pub fn abandon_stale(&self, parameters: &JobParameters) -> Result<Option<i64>, JobError> {
        let Some(instance) = self.repository.find_instance(&self.name, parameters)? else {
            return Ok(None);
        };
        let Some(last) = self.repository.last_execution(&instance)? else {
            return Ok(None);
        };
        if last.status != BatchStatus::Started {
            return Ok(None);
        }

        warn!(
            job = %self.name,
            instance = instance.id,
            execution = last.id,
            "Abandoning stale execution"
        );
        self.repository.finish_execution(
            last.id,
            BatchStatus::Failed,
            Utc::now(),
            Some(ABANDONED_MESSAGE),
        )?;
        Ok(Some(last.id))
    }

    /// Runs every step in order and records the outcome.
    ///
    /// Step failures are reported through the returned execution's status
    /// and `failure`; `Err` is reserved for repository failures and for
    /// instances that may not run again.
    pub fn execute(&mut self, parameters: JobParameters) -> Result<JobExecution, JobError> {
        let parameters = self.resolve_parameters(parameters);
        let instance = self
            .repository
            .get_or_create_instance(&self.name, &parameters)?;

        if let Some(last) = self.repository.last_execution(&instance)? {
            match last.status {
                BatchStatus::Completed => {
                    return Err(JobError::InstanceAlreadyComplete {
                        job_name: self.name.clone(),
                        instance_id: instance.id,
                    })
                }
                BatchStatus::Started => {
                    return Err(JobError::AlreadyRunning {
                        job_name: self.name.clone(),
                        instance_id: instance.id,
                        execution_id: last.id,
                    })
                }
                BatchStatus::Failed | BatchStatus::Stopped => {
                    info!(
                        job = %self.name,
                        instance = instance.id,
                        previous = %last.status,
                        "Restarting job instance"
                    );
                }
            }
        }

        let started_at = Utc::now();
        let execution_id = self
            .repository
            .start_execution(&instance, &parameters, started_at)?;

        let _job_span = info_span!(
            "job",
            name = %self.name,
            instance = instance.id,
            execution = execution_id
        )
        .entered();
        info!("Job started");
        self.progress.report(ProgressEvent::JobStarted {
            job_name: self.name.clone(),
            instance_id: instance.id,
            execution_id,
        });

        let mut status = BatchStatus::Completed;
        let mut failure = None;
        let mut steps = Vec::with_capacity(self.steps.len());

        for step in self.steps.iter_mut() {
            if self.stop.is_stop_requested() {
                info!(step = step.name(), "Stop requested, skipping remaining steps");
                status = BatchStatus::Stopped;
                break;
            }

            let step_name = step.name().to_string();
            let _step_span = info_span!("step", name = %step_name).entered();
            self.progress.report(ProgressEvent::StepStarted {
                step: step_name.clone(),
            });

            let ctx = StepContext {
                job_name: &self.name,
                execution_id,
                parameters: &parameters,
                stop: &self.stop,
                progress: self.progress.as_ref(),
            };
            let mut step_execution = StepExecution::new(&step_name);
            let result = step.execute(&ctx, &mut step_execution);
            step_execution.ended_at = Some(Utc::now());

            match result {
                Ok(step_status) => {
                    step_execution.status = step_status;
                    info!(
                        status = %step_status,
                        read = step_execution.read_count,
                        written = step_execution.write_count,
                        commits = step_execution.commit_count,
                        "Step finished"
                    );
                }
                Err(cause) => {
                    step_execution.status = StepStatus::Failed;
                    let step_error = StepError::new(&step_name, cause);
                    error!(error = %step_error, "Step failed");
                    failure = Some(step_error);
                }
            }

            let step_status = step_execution.status;
            self.progress.report(ProgressEvent::StepFinished {
                step: step_name,
                status: step_status,
            });
            steps.push(step_execution);

            match step_status {
                StepStatus::Failed => {
                    status = BatchStatus::Failed;
                    break;
                }
                StepStatus::Stopped => {
                    status = BatchStatus::Stopped;
                    break;
                }
                StepStatus::Started | StepStatus::Completed => {}
            }
        }

        let ended_at = Utc::now();
        let exit_message = failure.as_ref().map(ToString::to_string);
        if let Err(e) = self.repository.finish_execution(
            execution_id,
            status,
            ended_at,
            exit_message.as_deref(),
        ) {
            warn!(error = %e, "Could not record job outcome");
            return Err(e.into());
        }

        info!(status = %status, "Job finished");
        self.progress.report(ProgressEvent::JobFinished {
            job_name: self.name.clone(),
            status,
        });

        Ok(JobExecution {
            id: execution_id,
            instance,
            parameters,
            status,
            started_at,
            ended_at: Some(ended_at),
            steps,
            failure,
        })
    }
}
