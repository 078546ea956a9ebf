//! Jobs: parameters, identity, execution tracking and the sequential runner.

pub mod execution;
pub mod parameters;
pub mod progress;
pub mod repository;
pub mod run;
pub mod stop;

pub use execution::{BatchStatus, JobExecution, JobInstance};
pub use parameters::{JobParameter, JobParameters, JobParametersBuilder, ParameterValue};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use repository::{ExecutionSummary, InMemoryJobRepository, JobRepository, SqliteJobRepository};
pub use run::{IdentityPolicy, JobRun, JobRunBuilder, ABANDONED_MESSAGE, RUN_ID_KEY};
pub use stop::StopSignal;
