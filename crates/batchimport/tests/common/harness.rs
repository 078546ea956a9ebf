//! Test harness for isolated import runs.
//!
//! Each `TestHarness` owns a temporary directory holding the input files and
//! the SQLite database, so tests never share state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use batchimport::config::ImportConfig;
use batchimport::item::{SalesRecord, SalesTable};
use batchimport::job::{JobExecution, NoopProgress, SqliteJobRepository, StopSignal};
use batchimport::{build_job, Database, JobParameters};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory for input files.
    pub input_dir: PathBuf,
    /// SQLite file used by `config()` and `run()`.
    pub db_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        let db_path = temp_dir.path().join("db").join("batchimport.db");

        Self {
            temp_dir,
            input_dir,
            db_path,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write an input file and return its path.
    pub fn write_input(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    /// Write a config file into the temp directory.
    pub fn write_config(&self, filename: &str, config: &ImportConfig) -> PathBuf {
        let path = self.temp_path().join(filename);
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }

    /// Default configuration reading `input` and writing to this harness's database.
    pub fn config(&self, input: &Path) -> ImportConfig {
        let mut config = ImportConfig::default();
        config.input.path = input.to_string_lossy().into_owned();
        config.output.database = self.db_path.to_string_lossy().into_owned();
        config
    }

    pub fn open_db(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open database")
    }

    /// Run the import job once with the given parameters.
    pub fn run(
        &self,
        config: &ImportConfig,
        parameters: JobParameters,
    ) -> batchimport::Result<JobExecution> {
        self.run_with_stop(config, parameters, StopSignal::new())
    }

    pub fn run_with_stop(
        &self,
        config: &ImportConfig,
        parameters: JobParameters,
        stop: StopSignal,
    ) -> batchimport::Result<JobExecution> {
        let db = Database::open(Path::new(&config.output.database))?;
        let repository = Arc::new(SqliteJobRepository::new(db.clone()));
        let mut job = build_job(config, &db, repository, stop, Arc::new(NoopProgress))?;
        Ok(job.execute(parameters)?)
    }

    /// Create the destination table ahead of a run, e.g. to attach triggers.
    pub fn prepare_table(&self, table: &SalesTable) -> Database {
        let db = self.open_db();
        table.ensure(&db).expect("Failed to create table");
        db
    }

    /// Install a trigger that aborts any insert of the given rank.
    pub fn reject_rank(&self, table: &SalesTable, rank: u32) {
        let db = self.prepare_table(table);
        let sql = format!(
            "CREATE TRIGGER reject_rank_{rank} BEFORE INSERT ON {table}
             WHEN NEW.{column} = {rank}
             BEGIN SELECT RAISE(ABORT, 'rank {rank} rejected'); END;",
            rank = rank,
            table = table.table,
            column = table.columns[0],
        );
        db.with_conn(|conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .expect("Failed to create trigger");
    }

    pub fn row_count(&self, table: &SalesTable) -> i64 {
        table
            .count_rows(&self.open_db())
            .expect("Failed to count rows")
    }

    /// All persisted rows ordered by rank.
    pub fn read_records(&self, table: &SalesTable) -> Vec<SalesRecord> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            table.columns.join(", "),
            table.table,
            table.columns[0]
        );
        self.open_db()
            .with_conn(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(SalesRecord {
                            rank: row.get(0)?,
                            name: row.get(1)?,
                            platform: row.get(2)?,
                            year: row.get(3)?,
                            genre: row.get(4)?,
                            publisher: row.get(5)?,
                            na_sales: row.get(6)?,
                            eu_sales: row.get(7)?,
                            jp_sales: row.get(8)?,
                            other_sales: row.get(9)?,
                            global_sales: row.get(10)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .expect("Failed to read rows")
    }
}
