//! SQLite sinks for [`SalesRecord`]s.
//!
//! Each chunk is written inside one transaction; a failing row rolls the
//! whole chunk back.

use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};

use super::record::SalesRecord;
use super::{Chunk, ItemSink};
use crate::db::{is_valid_identifier, Database, DatabaseError};
use crate::error::SinkError;

/// Upper bound on bound parameters per statement in bundled SQLite.
pub const SQLITE_MAX_BIND_PARAMETERS: usize = 32766;

const RECORD_WIDTH: usize = 11;

/// Destination table and its column names, in record field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesTable {
    pub table: String,
    pub columns: Vec<String>,
}

impl Default for SalesTable {
    fn default() -> Self {
        Self {
            table: "video_game_sales".to_string(),
            columns: [
                "rank",
                "name",
                "platform",
                "year",
                "genre",
                "publisher",
                "na_sales",
                "eu_sales",
                "jp_sales",
                "other_sales",
                "global_sales",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl SalesTable {
    pub fn validate(&self) -> Result<(), SinkError> {
        if let Some(bad) = std::iter::once(&self.table)
            .chain(self.columns.iter())
            .find(|name| !is_valid_identifier(name))
        {
            return Err(SinkError::InvalidIdentifier(bad.clone()));
        }
        if self.columns.len() != RECORD_WIDTH {
            return Err(SinkError::InvalidIdentifier(format!(
                "{} columns configured, {} required",
                self.columns.len(),
                RECORD_WIDTH
            )));
        }
        Ok(())
    }

    pub fn create_table_sql(&self) -> String {
        let types = [
            "INTEGER NOT NULL",
            "TEXT NOT NULL",
            "TEXT NOT NULL",
            "INTEGER NOT NULL",
            "TEXT NOT NULL",
            "TEXT NOT NULL",
            "REAL NOT NULL",
            "REAL NOT NULL",
            "REAL NOT NULL",
            "REAL NOT NULL",
            "REAL NOT NULL",
        ];
        let columns: Vec<String> = self
            .columns
            .iter()
            .zip(types)
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            columns.join(", ")
        )
    }

    /// Creates the table when it does not exist yet.
    pub fn ensure(&self, db: &Database) -> Result<(), SinkError> {
        self.validate()?;
        let sql = self.create_table_sql();
        db.with_conn(|conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })?;
        Ok(())
    }

    /// `INSERT` statement with `rows` value groups.
    pub fn insert_sql(&self, rows: usize) -> String {
        let group = format!("({})", vec!["?"; self.columns.len()].join(", "));
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            vec![group; rows].join(", ")
        )
    }

    pub fn count_rows(&self, db: &Database) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        db.with_conn(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
    }

    /// Largest chunk a single multi-row statement can hold.
    pub fn max_rows_per_statement(&self) -> usize {
        SQLITE_MAX_BIND_PARAMETERS / self.columns.len().max(1)
    }
}

fn record_params(record: &SalesRecord) -> [&dyn ToSql; RECORD_WIDTH] {
    [
        &record.rank,
        &record.name,
        &record.platform,
        &record.year,
        &record.genre,
        &record.publisher,
        &record.na_sales,
        &record.eu_sales,
        &record.jp_sales,
        &record.other_sales,
        &record.global_sales,
    ]
}

/// Reuses one prepared statement per record inside the chunk transaction.
pub struct BatchedInsertSink {
    db: Database,
    table: SalesTable,
    sql: String,
}

impl BatchedInsertSink {
    pub fn new(db: Database, table: SalesTable) -> Self {
        let sql = table.insert_sql(1);
        Self { db, table, sql }
    }
}

impl ItemSink<SalesRecord> for BatchedInsertSink {
    fn open(&mut self) -> Result<(), SinkError> {
        self.table.ensure(&self.db)
    }

    fn write(&mut self, chunk: Chunk<SalesRecord>) -> Result<(), SinkError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare_cached(&self.sql)?;
            for record in chunk.iter() {
                stmt.execute(record_params(record).as_slice())?;
            }
            Ok(())
        })?;
        log::debug!("Inserted {} rows into {}", chunk.len(), self.table.table);
        Ok(())
    }
}

/// Writes a whole chunk with one multi-row `INSERT`.
pub struct MultiRowInsertSink {
    db: Database,
    table: SalesTable,
}

impl MultiRowInsertSink {
    pub fn new(db: Database, table: SalesTable) -> Self {
        Self { db, table }
    }
}

impl ItemSink<SalesRecord> for MultiRowInsertSink {
    fn open(&mut self) -> Result<(), SinkError> {
        self.table.ensure(&self.db)
    }

    fn write(&mut self, chunk: Chunk<SalesRecord>) -> Result<(), SinkError> {
        if chunk.is_empty() {
            return Ok(());
        }
        let needed = chunk.len() * self.table.columns.len();
        if needed > SQLITE_MAX_BIND_PARAMETERS {
            return Err(SinkError::TooManyParameters {
                rows: chunk.len(),
                needed,
                limit: SQLITE_MAX_BIND_PARAMETERS,
            });
        }

        let sql = self.table.insert_sql(chunk.len());
        let values: Vec<&dyn ToSql> = chunk.iter().flat_map(record_params).collect();
        self.db.with_transaction(|tx| {
            tx.execute(&sql, values.as_slice())?;
            Ok(())
        })?;
        log::debug!(
            "Inserted {} rows into {} in one statement",
            chunk.len(),
            self.table.table
        );
        Ok(())
    }
}
