//! Chunk-oriented batch import of delimited files into SQLite.
//!
//! A [`JobRun`] executes its steps in order. Chunk steps read records from an
//! [`ItemSource`], group them into chunks and hand each chunk to an
//! [`ItemSink`] that persists it atomically. Every run is recorded in a
//! [`JobRepository`] keyed by the job's identifying parameters.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod item;
pub mod job;
pub mod logging;
pub mod step;

pub use config::{load_config, load_config_from_str, ImportConfig, WriterKind};
pub use db::Database;
pub use error::{BatchError, JobError, MappingError, Result, SinkError, SourceError, StepError};
pub use import::{build_job, launch_parameters};
pub use item::{
    Chunk, FieldAccess, FieldSet, FieldSetMapper, ItemProcessor, ItemSink, ItemSource,
    SalesRecord, SalesRecordMapper,
};
pub use job::{
    BatchStatus, IdentityPolicy, JobExecution, JobParameters, JobRepository, JobRun,
    SqliteJobRepository, StopSignal,
};
pub use step::{ChunkStep, Step, StepExecution, StepStatus, TaskletStep};
