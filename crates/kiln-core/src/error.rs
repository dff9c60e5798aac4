//! Error taxonomy for the pipeline execution core.
//!
//! Each component (§4 of the design doc) gets its own failure variants so
//! callers can match on *what* went wrong without string-sniffing. Boundary
//! code (the CLI) collapses everything into `anyhow::Error`.

use std::path::PathBuf;

use thiserror::Error;

/// Failures loading the parameters, catalog, or credentials YAML documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    ConfigMissing { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParseError {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ConfigError {
    pub fn parse(path: PathBuf, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ConfigError::ConfigParseError {
            path,
            source: Box::new(source),
        }
    }
}

/// Failures resolving a dataset name against the catalog, or loading it.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown dataset '{name}' in catalog {catalog_path}")]
    UnknownDataset { name: String, catalog_path: PathBuf },

    #[error("unsupported catalog entry type '{type_name}' for dataset '{name}'")]
    UnsupportedType { name: String, type_name: String },
}

/// Failures inside a `DataSourceLoader` implementation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("credentials key '{key}' not found in {credentials_path}")]
    UnknownCredentials {
        key: String,
        credentials_path: PathBuf,
    },

    #[error("unsupported database kind '{kind}'")]
    UnsupportedDatabase { kind: String },

    #[error("sql query file not found: {path}")]
    SqlFileMissing { path: PathBuf },

    #[error("failed to read CSV source {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv_error::CsvError,
    },

    #[error("failed to read Excel sheet '{sheet}' from {path}: {details}")]
    Excel {
        path: PathBuf,
        sheet: String,
        details: String,
    },

    #[error("snowflake query against {account} failed: {details}")]
    Snowflake { account: String, details: String },

    #[error("failed to build arrow record batch: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A narrow indirection so `kiln-core` does not need a hard dependency on
/// the `csv` crate just to name its error type in a `#[source]` field; the
/// loader implementations (in `kiln-loaders`) box their real error into this.
pub mod csv_error {
    use std::fmt;

    #[derive(Debug)]
    pub struct CsvError(pub Box<dyn std::error::Error + Send + Sync>);

    impl fmt::Display for CsvError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for CsvError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(self.0.as_ref())
        }
    }
}

/// Construction-time failures for `create_node`.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node '{name}' is invalid: {reason}")]
    InvalidNode { name: String, reason: String },
}

/// Construction-time failures for `create_pipeline`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline item: {reason}")]
    InvalidPipeline { reason: String },
}

/// Failures resolving and running a named pipeline via `orchestrate`.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("no pipeline named '{name}' is registered in this project manifest")]
    UnknownPipeline { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Failures during `run_pipeline`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("node '{node}' failed to resolve input '{data_ref}': {source}")]
    InputResolutionFailed {
        node: String,
        data_ref: String,
        #[source]
        source: Box<RunError>,
    },

    #[error("node '{node}' is missing required argument '{arg}'")]
    MissingArgument { node: String, arg: String },

    #[error("node '{node}' output shape does not match its declared outputs: {details}")]
    OutputShapeMismatch { node: String, details: String },

    #[error("node '{node}' function call failed: {source}")]
    NodeCallFailed {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("run cancelled before node '{node}'")]
    Cancelled { node: String },
}
