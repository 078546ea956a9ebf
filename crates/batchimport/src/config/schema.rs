use serde::{Deserialize, Serialize};

use crate::item::{FieldAccess, SalesTable, SALES_COLUMNS};
use crate::job::IdentityPolicy;
use crate::logging::LogSettings;
use crate::step::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub version: String,
    #[serde(default = "default_job_name")]
    pub job_name: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub identity: IdentityPolicy,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LogSettings,
}

fn default_job_name() -> String {
    "importSales".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            job_name: default_job_name(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            identity: IdentityPolicy::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            logging: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_lines_to_skip")]
    pub lines_to_skip: usize,
    #[serde(default = "default_true")]
    pub validate_header: bool,
    #[serde(default)]
    pub field_access: FieldAccess,
    /// Column names of the file, in order.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    /// Markers read as "unknown year".
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,
}

fn default_input_path() -> String {
    "data/vgsales.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_lines_to_skip() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_columns() -> Vec<String> {
    SALES_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_sentinels() -> Vec<String> {
    vec!["NA".to_string(), "N/A".to_string()]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: ',',
            lines_to_skip: 1,
            validate_header: true,
            field_access: FieldAccess::default(),
            columns: default_columns(),
            sentinels: default_sentinels(),
        }
    }
}

/// Which sink writes the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterKind {
    #[default]
    Batched,
    MultiRow,
    /// Log chunks instead of persisting them.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// SQLite file holding both the imported rows and the job tables.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub writer: WriterKind,
    #[serde(default)]
    pub table: SalesTable,
}

fn default_database() -> String {
    "batchimport.db".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            writer: WriterKind::default(),
            table: SalesTable::default(),
        }
    }
}
