//! Job metadata repository: instances and executions.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job instance row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInstanceRow {
    pub id: i64,
    pub job_name: String,
    pub job_key: String,
    pub created_at: String,
}

impl JobInstanceRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_name: row.get("job_name")?,
            job_key: row.get("job_key")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A raw job execution row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobExecutionRow {
    pub id: i64,
    pub instance_id: i64,
    pub status: String,
    pub parameters: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub exit_message: Option<String>,
}

impl JobExecutionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            instance_id: row.get("instance_id")?,
            status: row.get("status")?,
            parameters: row.get("parameters")?,
            started_at: row.get("started_at")?,
            ended_at: row.get("ended_at")?,
            exit_message: row.get("exit_message")?,
        })
    }
}

/// Returns the instance for `(job_name, job_key)`, creating it on first use.
///
/// The boolean is true when the instance was created by this call.
pub fn get_or_create_instance(
    db: &Database,
    job_name: &str,
    job_key: &str,
    created_at: &str,
) -> Result<(JobInstanceRow, bool), DatabaseError> {
    db.with_transaction(|tx| {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO batch_job_instances (job_name, job_key, created_at)
             VALUES (?1, ?2, ?3)",
            params![job_name, job_key, created_at],
        )?;
        let row = tx.query_row(
            "SELECT * FROM batch_job_instances WHERE job_name = ?1 AND job_key = ?2",
            params![job_name, job_key],
            JobInstanceRow::from_row,
        )?;
        Ok((row, inserted > 0))
    })
}

/// Finds an instance by job name and key.
pub fn find_instance(
    db: &Database,
    job_name: &str,
    job_key: &str,
) -> Result<Option<JobInstanceRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM batch_job_instances WHERE job_name = ?1 AND job_key = ?2",
                params![job_name, job_key],
                JobInstanceRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Counts instances of a job.
pub fn count_instances(db: &Database, job_name: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM batch_job_instances WHERE job_name = ?1",
            params![job_name],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Inserts a new execution in the given status and returns its id.
pub fn insert_execution(
    db: &Database,
    instance_id: i64,
    status: &str,
    parameters: &str,
    started_at: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO batch_job_executions (instance_id, status, parameters, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![instance_id, status, parameters, started_at],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Records the terminal status of an execution.
pub fn finish_execution(
    db: &Database,
    execution_id: i64,
    status: &str,
    ended_at: &str,
    exit_message: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE batch_job_executions SET status = ?2, ended_at = ?3, exit_message = ?4
             WHERE id = ?1",
            params![execution_id, status, ended_at, exit_message],
        )?;
        Ok(())
    })
}

/// Returns the most recent execution of an instance.
pub fn last_execution(
    db: &Database,
    instance_id: i64,
) -> Result<Option<JobExecutionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM batch_job_executions WHERE instance_id = ?1
                 ORDER BY id DESC LIMIT 1",
                params![instance_id],
                JobExecutionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists all executions of an instance, oldest first.
pub fn executions_for_instance(
    db: &Database,
    instance_id: i64,
) -> Result<Vec<JobExecutionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM batch_job_executions WHERE instance_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![instance_id], JobExecutionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
