//! The uniform table value and the per-run `DataEnvironment` (§3, §9 option a).

use arrow_array::RecordBatch;
use indexmap::IndexMap;

/// A `DataRef` is just a non-empty string; we keep it as a plain `String`
/// newtype so the compiler stops accidental argument-name/DataRef mixups at
/// call sites that build `InputBinding`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataRef(String);

impl DataRef {
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.is_empty() {
            return Err("DataRef must be non-empty".to_string());
        }
        Ok(DataRef(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DataRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DataRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The uniform columnar table value used for every node input and output.
pub type TabularValue = RecordBatch;

/// The per-run memoization table: `DataRef -> TabularValue`.
///
/// Constructed empty, written only by the Runner, and returned as the run
/// result. Not a cache across runs — a scratchpad for exactly one
/// `run_pipeline` invocation.
#[derive(Debug, Default)]
pub struct DataEnvironment {
    values: IndexMap<String, TabularValue>,
}

impl DataEnvironment {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    pub fn get(&self, data_ref: &DataRef) -> Option<&TabularValue> {
        self.values.get(data_ref.as_str())
    }

    pub fn contains(&self, data_ref: &DataRef) -> bool {
        self.values.contains_key(data_ref.as_str())
    }

    pub fn insert(&mut self, data_ref: &DataRef, value: TabularValue) {
        self.values.insert(data_ref.as_str().to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TabularValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
