//! Parameter Store (C1): a hierarchical, read-only key→value map loaded
//! once per run from a YAML document, plus `ParamRef` resolution.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// A tagged tree of parameter values, the statically-typed stand-in for a
/// dynamically-typed configuration value (§9 of the design doc).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// The parameter namespace for a run. Only top-level keys are valid
/// `ParamRef` targets — the store never descends into nested maps for
/// resolution, even though the values themselves may be nested (§9).
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    top_level: IndexMap<String, ParamValue>,
}

impl ParameterStore {
    pub fn new(top_level: IndexMap<String, ParamValue>) -> Self {
        Self { top_level }
    }

    /// Resolve a `ParamRef`: if `key` names a top-level parameter, return
    /// its value; otherwise return `None` so the caller can fall back to
    /// treating the string as a literal (§4.7 step 1).
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.top_level.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.top_level.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.top_level.iter()
    }
}

/// Load and expose the hierarchical parameter map rooted at `path`.
///
/// Fails with [`ConfigError::ConfigMissing`] if the file does not exist and
/// [`ConfigError::ConfigParseError`] if it does not parse as a YAML mapping.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<ParameterStore, ConfigError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    if !path.exists() {
        return Err(ConfigError::ConfigMissing { path });
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::parse(path.clone(), e))?;

    let top_level: IndexMap<String, ParamValue> =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::parse(path.clone(), source))?;

    Ok(ParameterStore::new(top_level))
}
