//! Tokenized rows and typed access to their fields.

use std::fmt;
use std::sync::Arc;

use crate::error::MappingError;

/// Refers to a field by position or by declared column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for FieldRef<'_> {
    fn from(index: usize) -> Self {
        FieldRef::Index(index)
    }
}

impl<'a> From<&'a str> for FieldRef<'a> {
    fn from(name: &'a str) -> Self {
        FieldRef::Name(name)
    }
}

impl fmt::Display for FieldRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Index(i) => write!(f, "#{}", i),
            FieldRef::Name(n) => f.write_str(n),
        }
    }
}

/// The raw string fields of one row, optionally with column names.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    names: Option<Arc<[String]>>,
    values: Vec<String>,
}

impl FieldSet {
    /// A field set that only supports positional access.
    pub fn new(values: Vec<String>) -> Self {
        Self {
            names: None,
            values,
        }
    }

    /// A field set with declared column names.
    ///
    /// Fails when the number of values differs from the number of names.
    pub fn with_names(names: Arc<[String]>, values: Vec<String>) -> Result<Self, MappingError> {
        if names.len() != values.len() {
            return Err(MappingError::FieldCount {
                expected: names.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            names: Some(names),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    fn label(&self, field: FieldRef<'_>) -> String {
        match field {
            FieldRef::Index(i) => self
                .names
                .as_ref()
                .and_then(|n| n.get(i))
                .cloned()
                .unwrap_or_else(|| field.to_string()),
            FieldRef::Name(n) => n.to_string(),
        }
    }

    fn index_of(&self, field: FieldRef<'_>) -> Result<usize, MappingError> {
        let index = match field {
            FieldRef::Index(i) => Some(i),
            FieldRef::Name(name) => self
                .names
                .as_ref()
                .and_then(|names| names.iter().position(|n| n == name)),
        };
        index
            .filter(|i| *i < self.values.len())
            .ok_or_else(|| MappingError::MissingField {
                field: self.label(field),
            })
    }

    /// The raw text of a field.
    pub fn read_string<'n>(&self, field: impl Into<FieldRef<'n>>) -> Result<&str, MappingError> {
        let index = self.index_of(field.into())?;
        Ok(&self.values[index])
    }

    pub fn read_int<'n>(&self, field: impl Into<FieldRef<'n>>) -> Result<i64, MappingError> {
        let field = field.into();
        let raw = self.read_string(field)?.trim();
        raw.parse::<i64>()
            .map_err(|_| MappingError::InvalidNumber {
                field: self.label(field),
                value: raw.to_string(),
                expected: "integer",
            })
    }

    /// Parses an integer, resolving any of `sentinels` to zero.
    ///
    /// Sentinels are compared against the trimmed text exactly, so "NA"
    /// maps to 0 while "abc" is still a `MappingError`.
    pub fn read_int_or_sentinel<'n>(
        &self,
        field: impl Into<FieldRef<'n>>,
        sentinels: &[String],
    ) -> Result<i64, MappingError> {
        let field = field.into();
        let raw = self.read_string(field)?.trim();
        if sentinels.iter().any(|s| s == raw) {
            return Ok(0);
        }
        self.read_int(field)
    }

    pub fn read_float<'n>(&self, field: impl Into<FieldRef<'n>>) -> Result<f64, MappingError> {
        let field = field.into();
        let raw = self.read_string(field)?.trim();
        raw.parse::<f64>()
            .map_err(|_| MappingError::InvalidNumber {
                field: self.label(field),
                value: raw.to_string(),
                expected: "number",
            })
    }
}

/// Turns a tokenized row into a typed item.
pub trait FieldSetMapper<T>: Send {
    fn map(&self, fields: &FieldSet) -> Result<T, MappingError>;
}

/// Hands rows through as their raw string fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughMapper;

impl FieldSetMapper<Vec<String>> for PassThroughMapper {
    fn map(&self, fields: &FieldSet) -> Result<Vec<String>, MappingError> {
        Ok(fields.values().to_vec())
    }
}
