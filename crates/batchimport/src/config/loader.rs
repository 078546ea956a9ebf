use std::path::Path;

use crate::config::schema::{ImportConfig, WriterKind};
use crate::db::is_valid_identifier;
use crate::error::ConfigError;
use crate::item::sqlite_sink::SQLITE_MAX_BIND_PARAMETERS;
use crate::item::SALES_COLUMNS;
use crate::step::MAX_CHUNK_SIZE;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ImportConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ImportConfig, ConfigError> {
    let config: ImportConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Checks a config that was built or modified in code.
pub fn validate_config(config: &ImportConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.job_name.trim().is_empty() {
        return Err(invalid("job_name must not be empty"));
    }

    if config.chunk_size == 0 {
        return Err(invalid("chunk_size must be greater than 0"));
    }
    if config.chunk_size > MAX_CHUNK_SIZE {
        return Err(invalid(format!(
            "chunk_size {} exceeds the maximum of {}",
            config.chunk_size, MAX_CHUNK_SIZE
        )));
    }

    let input = &config.input;
    if !input.delimiter.is_ascii() || input.delimiter == '\n' || input.delimiter == '\r' {
        return Err(invalid(format!(
            "delimiter must be a single ASCII character other than a line break, got {:?}",
            input.delimiter
        )));
    }

    if input.columns.len() != SALES_COLUMNS.len() {
        return Err(invalid(format!(
            "input.columns must name {} columns, found {}",
            SALES_COLUMNS.len(),
            input.columns.len()
        )));
    }

    if input.sentinels.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid("input.sentinels must not contain empty markers"));
    }

    let table = &config.output.table;
    for name in std::iter::once(&table.table).chain(table.columns.iter()) {
        if !is_valid_identifier(name) {
            return Err(ConfigError::InvalidIdentifier(name.clone()));
        }
    }
    if table.columns.len() != SALES_COLUMNS.len() {
        return Err(invalid(format!(
            "output.table.columns must name {} columns, found {}",
            SALES_COLUMNS.len(),
            table.columns.len()
        )));
    }

    if config.output.writer == WriterKind::MultiRow {
        let needed = config.chunk_size.checked_mul(table.columns.len());
        if needed.map_or(true, |n| n > SQLITE_MAX_BIND_PARAMETERS) {
            return Err(invalid(format!(
                "multi_row writer cannot bind {} columns for chunk_size {}, SQLite allows {} parameters",
                table.columns.len(),
                config.chunk_size,
                SQLITE_MAX_BIND_PARAMETERS
            )));
        }
    }

    Ok(())
}
