//! batchimport - import a sales file into SQLite as a tracked batch job

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use batchimport::config::{load_config, validate_config, ImportConfig, WriterKind};
use batchimport::item::FieldAccess;
use batchimport::job::{
    BatchStatus, BroadcastProgress, IdentityPolicy, JobExecution, JobParameters, JobRun,
    NoopProgress, ProgressEvent, ProgressReporter, SqliteJobRepository, StopSignal,
};
use batchimport::logging::{init_logging, LogFormat};
use batchimport::{build_job, launch_parameters, Database};
use clap::{Parser, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(name = "batchimport", version, about = "Import a sales file into SQLite in chunks")]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(short, long, env = "BATCHIMPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Input file (overrides input.path)
    #[arg(long)]
    input: Option<String>,

    /// SQLite database file (overrides output.database)
    #[arg(long)]
    database: Option<String>,

    /// Items per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long, value_enum)]
    writer: Option<WriterArg>,

    #[arg(long, value_enum)]
    field_access: Option<FieldAccessArg>,

    #[arg(long, value_enum)]
    identity: Option<IdentityArg>,

    /// Reuse a run token instead of generating one, e.g. to restart a failed run
    #[arg(long)]
    run_token: Option<String>,

    /// Mark a run left STARTED by a crashed process as failed before restarting it
    #[arg(long, requires = "run_token")]
    abandon_stale: bool,

    /// Extra identifying job parameter
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// Print chunk progress to stderr
    #[arg(long)]
    progress: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WriterArg {
    Batched,
    MultiRow,
    Log,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FieldAccessArg {
    Named,
    Positional,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdentityArg {
    Parameters,
    FreshToken,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn resolve_config(cli: &Cli) -> Result<ImportConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ImportConfig::default(),
    };

    if let Some(input) = &cli.input {
        config.input.path = input.clone();
    }
    if let Some(database) = &cli.database {
        config.output.database = database.clone();
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(writer) = cli.writer {
        config.output.writer = match writer {
            WriterArg::Batched => WriterKind::Batched,
            WriterArg::MultiRow => WriterKind::MultiRow,
            WriterArg::Log => WriterKind::Log,
        };
    }
    if let Some(access) = cli.field_access {
        config.input.field_access = match access {
            FieldAccessArg::Named => FieldAccess::Named,
            FieldAccessArg::Positional => FieldAccess::Positional,
        };
    }
    if let Some(identity) = cli.identity {
        config.identity = match identity {
            IdentityArg::Parameters => IdentityPolicy::Parameters,
            IdentityArg::FreshToken => IdentityPolicy::FreshToken,
        };
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.log_json {
        config.logging.format = LogFormat::Json;
    }

    validate_config(&config).context("invalid configuration")?;
    Ok(config)
}

/// Prints committed chunks until the job finishes.
fn spawn_progress_printer(progress: &BroadcastProgress) -> thread::JoinHandle<()> {
    let mut rx = progress.subscribe();
    thread::spawn(move || loop {
        match rx.blocking_recv() {
            Ok(ProgressEvent::ChunkCommitted {
                step,
                chunk,
                items,
                write_count,
                ..
            }) => eprintln!("[{}] chunk {} +{} ({} written)", step, chunk, items, write_count),
            Ok(ProgressEvent::JobFinished { .. }) | Err(RecvError::Closed) => break,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
        }
    })
}

fn run(cli: &Cli, config: &ImportConfig) -> Result<JobExecution> {
    let db = Database::open(Path::new(&config.output.database))
        .with_context(|| format!("opening database {}", config.output.database))?;
    let repository = Arc::new(SqliteJobRepository::new(db.clone()));

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.request_stop()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let broadcast = cli.progress.then(BroadcastProgress::default);
    let printer = broadcast.as_ref().map(spawn_progress_printer);
    let progress: Arc<dyn ProgressReporter> = match &broadcast {
        Some(b) => Arc::new(b.clone()),
        None => Arc::new(NoopProgress),
    };

    let mut job = build_job(config, &db, repository, stop, progress)?;
    let parameters = launch_parameters(cli.run_token.clone(), chrono::Local::now(), &cli.params);
    let execution = abandon_if_requested(cli, &job, &parameters)
        .and_then(|()| job.execute(parameters).context("running import job"));

    // Dropping the senders closes the channel if the job bailed out early.
    drop(job);
    drop(broadcast);
    if let Some(printer) = printer {
        let _ = printer.join();
    }

    execution
}

fn abandon_if_requested(cli: &Cli, job: &JobRun, parameters: &JobParameters) -> Result<()> {
    if !cli.abandon_stale {
        return Ok(());
    }
    match job
        .abandon_stale(parameters)
        .context("abandoning stale execution")?
    {
        Some(id) => eprintln!("abandoned stale execution {}", id),
        None => eprintln!("no stale execution to abandon"),
    }
    Ok(())
}

fn report(execution: &JobExecution) -> ExitCode {
    println!("instanceId: {}", execution.instance.id);
    println!("status: {}", execution.status);
    for step in &execution.steps {
        println!(
            "step {}: {} (read {}, written {}, chunks {})",
            step.step_name, step.status, step.read_count, step.write_count, step.commit_count
        );
    }

    if let Some(failure) = &execution.failure {
        eprintln!("Error: {}", failure);
        let mut source = failure.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
    }

    match execution.status {
        BatchStatus::Completed => ExitCode::SUCCESS,
        BatchStatus::Stopped => ExitCode::from(130),
        BatchStatus::Failed | BatchStatus::Started => ExitCode::from(1),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    match run(&cli, &config) {
        Ok(execution) => report(&execution),
        Err(e) => {
            error!(error = %e, "Import could not run");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
