//! Project manifest and the `orchestrate` convenience (§9 redesign): the
//! statically-typed replacement for "source the project's main script and
//! pull a pipeline out of a global registry." A project's binary builds one
//! `ProjectManifest` at startup, naming every pipeline it knows how to run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestrateError;
use crate::param::load_parameters;
use crate::pipeline::{Pipeline, Warning};
use crate::runner::{run_pipeline, DataSourceLoader};
use crate::select::SelectSpec;
use crate::DataEnvironment;

/// A zero-argument constructor for a [`Pipeline`], along with any
/// construction-time warnings (duplicate node names, etc.) it produced.
pub type PipelineFactory = Arc<dyn Fn() -> Result<(Pipeline, Vec<Warning>), crate::error::PipelineError> + Send + Sync>;

/// The config paths and named pipelines that make up one project.
#[derive(Clone)]
pub struct ProjectManifest {
    pub catalog_path: PathBuf,
    pub credentials_path: PathBuf,
    pub parameters_path: PathBuf,
    pipelines: IndexMap<String, PipelineFactory>,
}

impl ProjectManifest {
    pub fn new(catalog_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>, parameters_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            credentials_path: credentials_path.into(),
            parameters_path: parameters_path.into(),
            pipelines: IndexMap::new(),
        }
    }

    pub fn register(mut self, name: impl Into<String>, factory: PipelineFactory) -> Self {
        self.pipelines.insert(name.into(), factory);
        self
    }

    pub fn pipeline_names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(|s| s.as_str())
    }
}

/// Resolve `pipeline_name` from `manifest`, build it, load the manifest's
/// parameters document, and run the result against `loader` (§4, exposed
/// operation `orchestrate`).
pub async fn orchestrate(
    manifest: &ProjectManifest,
    pipeline_name: &str,
    select_spec: &SelectSpec,
    loader: Arc<dyn DataSourceLoader>,
    cancel: CancellationToken,
) -> Result<DataEnvironment, (DataEnvironment, OrchestrateError)> {
    let factory = manifest
        .pipelines
        .get(pipeline_name)
        .ok_or_else(|| (DataEnvironment::new(), OrchestrateError::UnknownPipeline { name: pipeline_name.to_string() }))?;

    let (pipeline, warnings) = factory().map_err(|e| (DataEnvironment::new(), OrchestrateError::from(e)))?;
    for warning in &warnings {
        tracing::warn!(%warning, "pipeline construction warning");
    }

    let parameters =
        load_parameters(&manifest.parameters_path).map_err(|e| (DataEnvironment::new(), OrchestrateError::from(e)))?;

    run_pipeline(
        &pipeline,
        &parameters,
        &manifest.catalog_path,
        &manifest.credentials_path,
        loader,
        select_spec,
        cancel,
    )
    .await
    .map_err(|(env, err)| (env, OrchestrateError::from(err)))
}
