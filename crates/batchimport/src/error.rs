use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid SQL identifier '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier(String),
}

/// Field-level failure while turning a tokenized row into a typed record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Expected {expected} fields but found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Missing field '{field}'")]
    MissingField { field: String },

    #[error("Field '{field}' is not a valid {expected}: '{value}'")]
    InvalidNumber {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Field '{field}' is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("Field '{field}' must not be empty")]
    EmptyField { field: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source has not been opened")]
    NotOpen,

    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row at line {line} of '{path}': {reason}")]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Header mismatch: expected '{expected}', found '{found}'")]
    HeaderMismatch { expected: String, found: String },

    #[error("Mapping failed at line {line}: {source}")]
    Mapping {
        line: u64,
        #[source]
        source: MappingError,
    },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Database write failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Chunk of {rows} rows needs {needed} bound parameters, limit is {limit}")]
    TooManyParameters {
        rows: usize,
        needed: usize,
        limit: usize,
    },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Item rejected: {reason}")]
    Rejected { reason: String },
}

#[derive(Error, Debug)]
pub enum TaskletError {
    #[error("Tasklet failed: {0}")]
    Failed(String),

    #[error("Missing job parameter '{0}'")]
    MissingParameter(String),
}

/// Cause of a step failure, before the step name is attached.
#[derive(Error, Debug)]
pub enum StepFailure {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Tasklet(#[from] TaskletError),
}

#[derive(Error, Debug)]
#[error("Step '{step}' failed: {source}")]
pub struct StepError {
    pub step: String,
    #[source]
    pub source: StepFailure,
}

impl StepError {
    pub fn new(step: impl Into<String>, source: impl Into<StepFailure>) -> Self {
        Self {
            step: step.into(),
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job repository error: {0}")]
    Repository(#[from] DatabaseError),

    #[error("Job '{job_name}' has no steps")]
    NoSteps { job_name: String },

    #[error("Job instance {instance_id} of '{job_name}' already completed; change the identifying parameters to run again")]
    InstanceAlreadyComplete { job_name: String, instance_id: i64 },

    #[error("Job instance {instance_id} of '{job_name}' is already running (execution {execution_id})")]
    AlreadyRunning {
        job_name: String,
        instance_id: i64,
        execution_id: i64,
    },
}

pub type Result<T> = std::result::Result<T, BatchError>;
