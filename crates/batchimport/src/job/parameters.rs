//! Job parameters and the identity key derived from them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A scalar job parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParameterValue {
    String(String),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Long(_) => "long",
            ParameterValue::Double(_) => "double",
            ParameterValue::Date(_) => "date",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => write!(f, "{}", s),
            ParameterValue::Long(v) => write!(f, "{}", v),
            // Debug formatting keeps the shortest round-trip representation.
            ParameterValue::Double(v) => write!(f, "{:?}", v),
            ParameterValue::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameter {
    pub value: ParameterValue,
    pub identifying: bool,
}

/// Immutable set of parameters for one job execution.
///
/// Keys are kept sorted so the identity key does not depend on the
/// order in which parameters were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    params: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.params.get(key)
    }

    /// Returns the value of a string parameter.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|p| p.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobParameter)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Only the parameters that take part in instance identity.
    pub fn identifying(&self) -> JobParameters {
        Self {
            params: self
                .params
                .iter()
                .filter(|(_, p)| p.identifying)
                .map(|(k, p)| (k.clone(), p.clone()))
                .collect(),
        }
    }

    /// Returns a copy of this set with one parameter added or replaced.
    pub fn with(&self, key: impl Into<String>, parameter: JobParameter) -> JobParameters {
        let mut params = self.params.clone();
        params.insert(key.into(), parameter);
        Self { params }
    }

    /// Stable hash of the identifying parameters.
    ///
    /// Two parameter sets share a key exactly when their identifying
    /// subsets have the same keys, types and values.
    pub fn job_key(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, param) in self.params.iter().filter(|(_, p)| p.identifying) {
            let value = param.value.to_string();
            for part in [key.as_str(), param.value.type_name(), value.as_str()] {
                // Length prefix keeps the encoding unambiguous.
                hasher.update((part.len() as u64).to_le_bytes());
                hasher.update(part.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Default)]
pub struct JobParametersBuilder {
    params: BTreeMap<String, JobParameter>,
}

impl JobParametersBuilder {
    pub fn add(mut self, key: impl Into<String>, value: ParameterValue, identifying: bool) -> Self {
        self.params
            .insert(key.into(), JobParameter { value, identifying });
        self
    }

    pub fn add_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, ParameterValue::String(value.into()), true)
    }

    /// Adds a string parameter that is carried along but not part of identity.
    pub fn add_non_identifying_string(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.add(key, ParameterValue::String(value.into()), false)
    }

    pub fn add_long(self, key: impl Into<String>, value: i64) -> Self {
        self.add(key, ParameterValue::Long(value), true)
    }

    pub fn add_double(self, key: impl Into<String>, value: f64) -> Self {
        self.add(key, ParameterValue::Double(value), true)
    }

    pub fn add_date(self, key: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.add(key, ParameterValue::Date(value), true)
    }

    pub fn build(self) -> JobParameters {
        JobParameters {
            params: self.params,
        }
    }
}
