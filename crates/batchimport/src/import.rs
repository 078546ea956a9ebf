//! Assembles the sales import job from an [`ImportConfig`].

use std::sync::Arc;

use chrono::{DateTime, Local, Timelike};

use crate::config::{ImportConfig, WriterKind};
use crate::db::Database;
use crate::error::{ConfigError, Result};
use crate::item::{
    BatchedInsertSink, FlatFileSettings, FlatFileSource, ItemSink, LogSink, MultiRowInsertSink,
    SalesRecord, SalesRecordMapper,
};
use crate::job::{JobParameters, JobRepository, JobRun, ProgressReporter, StopSignal};
use crate::step::{ChunkStep, ParameterEchoTasklet, TaskletStep};

pub const ECHO_STEP: &str = "echoParameters";
pub const LOAD_STEP: &str = "csvToDb";

fn build_sink(config: &ImportConfig, db: &Database) -> Box<dyn ItemSink<SalesRecord>> {
    let table = config.output.table.clone();
    match config.output.writer {
        WriterKind::Batched => Box::new(BatchedInsertSink::new(db.clone(), table)),
        WriterKind::MultiRow => Box::new(MultiRowInsertSink::new(db.clone(), table)),
        WriterKind::Log => Box::new(LogSink::new(LOAD_STEP)),
    }
}

/// Builds the two-step import job: echo the run parameters, then load the
/// file into the configured table in chunks.
pub fn build_job(
    config: &ImportConfig,
    db: &Database,
    repository: Arc<dyn JobRepository>,
    stop: StopSignal,
    progress: Arc<dyn ProgressReporter>,
) -> Result<JobRun> {
    crate::config::validate_config(config)?;

    let settings = FlatFileSettings {
        delimiter: config.input.delimiter as u8,
        lines_to_skip: config.input.lines_to_skip,
        names: Some(config.input.columns.clone()),
        validate_header: config.input.validate_header,
    };
    let mapper = SalesRecordMapper::new(config.input.field_access)
        .with_columns(config.input.columns.clone())
        .map_err(|e| ConfigError::Validation {
            message: format!("input.columns: {}", e),
        })?
        .with_sentinels(config.input.sentinels.clone());
    let source = FlatFileSource::new(&config.input.path, settings, mapper);

    let load = ChunkStep::new(
        LOAD_STEP,
        config.chunk_size,
        Box::new(source),
        build_sink(config, db),
    )?;

    let job = JobRun::builder(&config.job_name, repository)
        .identity(config.identity)
        .stop_signal(stop)
        .progress(progress)
        .step(TaskletStep::new(ECHO_STEP, ParameterEchoTasklet::default()))
        .step(load)
        .build()?;
    Ok(job)
}

/// Parameters a command-line launch attaches to every run.
///
/// `uuid` identifies the run (a fresh v4 unless `token` is given); `date`
/// and `hour` only describe it. `extra` pairs are identifying.
pub fn launch_parameters(
    token: Option<String>,
    now: DateTime<Local>,
    extra: &[(String, String)],
) -> JobParameters {
    let token = token.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut builder = JobParameters::builder()
        .add_string("uuid", token)
        .add_non_identifying_string("date", now.date_naive().to_string())
        .add_non_identifying_string("hour", format!("{}:{}", now.hour(), now.minute()));
    for (key, value) in extra {
        builder = builder.add_string(key.clone(), value.clone());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::BatchError;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, h, m, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_launch_parameters_shape() {
        let params = launch_parameters(Some("tok".to_string()), at(9, 5), &[]);
        assert_eq!(params.get_string("uuid"), Some("tok"));
        assert_eq!(params.get_string("date"), Some("2024-03-09"));
        assert_eq!(params.get_string("hour"), Some("9:5"));
        assert!(params.get("uuid").unwrap().identifying);
        assert!(!params.get("date").unwrap().identifying);
        assert!(!params.get("hour").unwrap().identifying);
    }

    #[test]
    fn test_same_token_same_key_regardless_of_time() {
        let a = launch_parameters(Some("tok".to_string()), at(9, 5), &[]);
        let b = launch_parameters(Some("tok".to_string()), at(17, 45), &[]);
        assert_eq!(a.job_key(), b.job_key());
    }

    #[test]
    fn test_fresh_tokens_differ() {
        let a = launch_parameters(None, at(9, 5), &[]);
        let b = launch_parameters(None, at(9, 5), &[]);
        assert_ne!(a.job_key(), b.job_key());
    }

    #[test]
    fn test_extra_parameters_are_identifying() {
        let extra = vec![("region".to_string(), "eu".to_string())];
        let params = launch_parameters(Some("tok".to_string()), at(9, 5), &extra);
        assert!(params.get("region").unwrap().identifying);
        assert_ne!(
            params.job_key(),
            launch_parameters(Some("tok".to_string()), at(9, 5), &[]).job_key()
        );
    }

    #[test]
    fn test_build_job_rejects_invalid_config() {
        let config = ImportConfig {
            chunk_size: 0,
            ..ImportConfig::default()
        };
        let db = Database::open_in_memory().unwrap();
        let result = build_job(
            &config,
            &db,
            Arc::new(crate::job::InMemoryJobRepository::new()),
            StopSignal::new(),
            Arc::new(crate::job::NoopProgress),
        );
        assert!(matches!(result, Err(BatchError::Config(_))));
    }
}
