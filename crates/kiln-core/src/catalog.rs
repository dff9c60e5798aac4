//! Catalog (C2): mapping a dataset name to its typed loader descriptor, and
//! the credentials document the SQL loader consults (§3, §4.2).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, ConfigError};

/// Either a flag turning header-derived column names on/off, or an explicit
/// list of names to assign regardless of what the source file contains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ColumnNames {
    Inferred(bool),
    Explicit(Vec<String>),
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames::Inferred(true)
    }
}

fn default_separator() -> String {
    ",".to_string()
}

fn default_quote() -> String {
    "\"".to_string()
}

fn default_na_tokens() -> Vec<String> {
    vec!["".to_string(), "NA".to_string()]
}

/// CSV catalog entry. See §3 for field-by-field defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvEntry {
    pub path: String,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default = "default_quote")]
    pub quote: String,

    #[serde(default)]
    pub column_names: ColumnNames,

    #[serde(default)]
    pub column_types: Option<IndexMap<String, String>>,

    #[serde(default)]
    pub skip_rows: usize,

    #[serde(default)]
    pub max_rows: Option<usize>,

    #[serde(default = "default_na_tokens")]
    pub na_tokens: Vec<String>,

    #[serde(default)]
    pub trim_whitespace: bool,
}

/// Excel catalog entry: a single named sheet in a workbook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExcelEntry {
    pub path: String,
    pub sheet: String,
}

/// SQL catalog entry: a query file executed against a named database kind,
/// authenticating with a credentials-document entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SqlEntry {
    pub database_kind: String,
    pub sql_path: String,
    pub credentials_key: String,
}

/// Tagged union over the three supported catalog entry shapes.
///
/// The `type` discriminator in the YAML source selects the variant:
/// `CSVDataset`, `EXCELDataset`, or `SQLDataSet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CatalogEntry {
    #[serde(rename = "CSVDataset")]
    Csv(CsvEntry),
    #[serde(rename = "EXCELDataset")]
    Excel(ExcelEntry),
    #[serde(rename = "SQLDataSet")]
    Sql(SqlEntry),
}

/// A probe used to read the `type` discriminator before committing to a
/// specific `CatalogEntry` variant, so an unrecognized discriminator can be
/// reported as [`CatalogError::UnsupportedType`] rather than a generic YAML
/// parse failure.
#[derive(Debug, Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    type_name: String,
}

/// The full parsed catalog document: dataset name -> raw YAML value. Each
/// entry is only decoded into a [`CatalogEntry`] on lookup, so an unknown
/// discriminator in a dataset nobody asked for never breaks the whole load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(flatten)]
    raw_entries: IndexMap<String, serde_yaml::Value>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::ConfigMissing { path });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::parse(path.clone(), e))?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::parse(path, source))
    }

    /// Decode the entry named `name`, if present.
    ///
    /// A present-but-unrecognized `type` discriminator fails with
    /// [`CatalogError::UnsupportedType`]; a malformed field set for an
    /// otherwise-recognized discriminator fails with
    /// [`ConfigError::ConfigParseError`] wrapped as [`CatalogError::Config`].
    pub fn entry(&self, name: &str) -> Option<Result<CatalogEntry, CatalogError>> {
        self.raw_entries.get(name).map(|raw| decode_entry(name, raw))
    }
}

fn decode_entry(name: &str, raw: &serde_yaml::Value) -> Result<CatalogEntry, CatalogError> {
    let probe: TypeProbe =
        serde_yaml::from_value(raw.clone()).map_err(|source| CatalogError::Config(ConfigError::parse(PathBuf::new(), source)))?;

    match probe.type_name.as_str() {
        "CSVDataset" | "EXCELDataset" | "SQLDataSet" => serde_yaml::from_value(raw.clone())
            .map_err(|source| CatalogError::Config(ConfigError::parse(PathBuf::new(), source))),
        other => Err(CatalogError::UnsupportedType {
            name: name.to_string(),
            type_name: other.to_string(),
        }),
    }
}

/// Look up `name` in the catalog document at `catalog_path`.
///
/// This is the convenience single-shot form (§4.2); the Runner loads the
/// catalog once per run and calls [`Catalog::entry`] directly instead, to
/// avoid re-reading the file for every cache miss.
pub fn catalog_lookup(name: &str, catalog_path: impl AsRef<Path>) -> Result<CatalogEntry, CatalogError> {
    let catalog_path = catalog_path.as_ref().to_path_buf();
    let catalog = Catalog::load(&catalog_path)?;
    match catalog.entry(name) {
        Some(result) => result,
        None => Err(CatalogError::UnknownDataset {
            name: name.to_string(),
            catalog_path,
        }),
    }
}

/// A single credentials record: the fields a SQL loader needs to
/// authenticate. Unknown/extra fields in the source document are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CredentialsEntry {
    pub server: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub warehouse: Option<String>,
    pub account: Option<String>,
}

/// The full parsed credentials document: credentials-key -> record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(flatten)]
    entries: IndexMap<String, CredentialsEntry>,
}

impl Credentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::ConfigMissing { path });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::parse(path.clone(), e))?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::parse(path, source))
    }

    pub fn get(&self, key: &str) -> Option<&CredentialsEntry> {
        self.entries.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kiln-core-catalog-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn lookup_miss_names_dataset_and_path() {
        let dir = tempdir();
        let path = dir.join("catalog.yaml");
        std::fs::write(&path, "present:\n  type: CSVDataset\n  path: x.csv\n").unwrap();

        let err = catalog_lookup("absent_name", &path).unwrap_err();
        match err {
            CatalogError::UnknownDataset { name, catalog_path } => {
                assert_eq!(name, "absent_name");
                assert_eq!(catalog_path, path);
            }
            other => panic!("expected UnknownDataset, got {other:?}"),
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn csv_entry_round_trips_defaults() {
        let dir = tempdir();
        let path = dir.join("catalog.yaml");
        std::fs::write(&path, "raw:\n  type: CSVDataset\n  path: raw.csv\n").unwrap();

        let entry = catalog_lookup("raw", &path).unwrap();
        let CatalogEntry::Csv(csv) = &entry else {
            panic!("expected Csv variant");
        };
        assert_eq!(csv.separator, ",");
        assert_eq!(csv.quote, "\"");
        assert_eq!(csv.skip_rows, 0);
        assert_eq!(csv.na_tokens, vec!["".to_string(), "NA".to_string()]);

        let reserialized = serde_yaml::to_string(&entry).unwrap();
        let roundtripped: CatalogEntry = serde_yaml::from_str(&reserialized).unwrap();
        assert_eq!(entry, roundtripped);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unsupported_discriminator_is_named() {
        let dir = tempdir();
        let path = dir.join("catalog.yaml");
        std::fs::write(&path, "raw:\n  type: MONGODataset\n  path: raw\n").unwrap();

        let err = catalog_lookup("raw", &path).unwrap_err();
        match err {
            CatalogError::UnsupportedType { name, type_name } => {
                assert_eq!(name, "raw");
                assert_eq!(type_name, "MONGODataset");
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
        std::fs::remove_dir_all(dir).ok();
    }
}
