//! Runner (C6): executes a selected pipeline node-by-node against a catalog,
//! a parameter store, and a pluggable dataset loader (§3, §4.7).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::data::{DataEnvironment, DataRef, TabularValue};
use crate::error::{LoadError, RunError};
use crate::node::{ArgValue, CallArgs, Node, NodeOutput, OutputBinding, ParamBinding};
use crate::param::ParameterStore;
use crate::pipeline::Pipeline;
use crate::select::{select, SelectSpec};

/// The pluggable dataset-materialization boundary (C7): given a resolved
/// catalog entry, produce the table it describes.
///
/// Implementations live in `kiln-loaders`; `kiln-core` only depends on this
/// trait, never on a concrete loader, so the execution core stays agnostic
/// to which source formats are compiled in.
#[async_trait]
pub trait DataSourceLoader: Send + Sync {
    async fn load(
        &self,
        entry: &CatalogEntry,
        credentials_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TabularValue, LoadError>;
}

/// Resolve a single node's declared parameter bindings against the store
/// (§4.7 step 1): a [`ParamBinding::Ref`] resolves against the store if
/// present, else falls back to treating the ref string as a literal.
fn resolve_param(binding: &ParamBinding, params: &ParameterStore) -> ArgValue {
    match binding {
        ParamBinding::Literal(value) => ArgValue::Param(value.clone()),
        ParamBinding::Ref(key) => match params.get(key) {
            Some(value) => ArgValue::Param(value.clone()),
            None => ArgValue::Param(crate::param::ParamValue::String(key.clone())),
        },
    }
}

/// Resolve a single input `DataRef` to a table, preferring an
/// already-materialized value in `env` over re-loading from the catalog
/// (§4.7 step 3, S4).
async fn resolve_input(
    data_ref: &DataRef,
    env: &DataEnvironment,
    catalog: &Catalog,
    catalog_path: &Path,
    credentials_path: &Path,
    loader: &dyn DataSourceLoader,
    cancel: &CancellationToken,
) -> Result<TabularValue, RunError> {
    if let Some(value) = env.get(data_ref) {
        return Ok(value.clone());
    }

    let entry = match catalog.entry(data_ref.as_str()) {
        Some(result) => result?,
        None => {
            return Err(RunError::Catalog(crate::error::CatalogError::UnknownDataset {
                name: data_ref.as_str().to_string(),
                catalog_path: catalog_path.to_path_buf(),
            }))
        }
    };

    let value = loader.load(&entry, credentials_path, cancel).await?;
    Ok(value)
}

/// Execute `pipeline`, after narrowing it to the nodes matching `select_spec`,
/// in declaration order (§4.7).
///
/// On success, returns the full [`DataEnvironment`] accumulated across every
/// executed node. On failure, returns the partial environment accumulated up
/// to (but not including) the failing node alongside the [`RunError`], so a
/// caller can inspect what did complete (§4.7 step 8, S8).
#[allow(clippy::too_many_arguments)]
pub async fn run_pipeline(
    pipeline: &Pipeline,
    parameters: &ParameterStore,
    catalog_path: impl AsRef<Path>,
    credentials_path: impl AsRef<Path>,
    loader: Arc<dyn DataSourceLoader>,
    select_spec: &SelectSpec,
    cancel: CancellationToken,
) -> Result<DataEnvironment, (DataEnvironment, RunError)> {
    let catalog_path = catalog_path.as_ref();
    let credentials_path = credentials_path.as_ref();
    let mut env = DataEnvironment::new();

    let catalog = match Catalog::load(catalog_path) {
        Ok(c) => c,
        Err(source) => {
            return Err((
                env,
                RunError::Catalog(crate::error::CatalogError::Config(source)),
            ))
        }
    };

    let (nodes, warnings) = select(pipeline, select_spec);
    for warning in &warnings {
        warn!(%warning, "selector warning");
    }
    info!(node_count = nodes.len(), "starting pipeline run");

    for node in nodes {
        if cancel.is_cancelled() {
            let err = RunError::Cancelled { node: node.name.clone() };
            return Err((env, err));
        }

        debug!(node = %node.name, "running node");
        match run_node(node, &env, parameters, &catalog, catalog_path, credentials_path, loader.as_ref(), &cancel).await {
            Ok(outputs) => {
                for (data_ref, value) in outputs {
                    env.insert(&data_ref, value);
                }
            }
            Err(err) => return Err((env, err)),
        }
    }

    info!(output_count = env.len(), "pipeline run complete");
    Ok(env)
}

#[allow(clippy::too_many_arguments)]
async fn run_node(
    node: &Node,
    env: &DataEnvironment,
    parameters: &ParameterStore,
    catalog: &Catalog,
    catalog_path: &Path,
    credentials_path: &Path,
    loader: &dyn DataSourceLoader,
    cancel: &CancellationToken,
) -> Result<Vec<(DataRef, TabularValue)>, RunError> {
    let mut call_args = CallArgs::new();

    for (arg_name, data_ref) in node.inputs.normalize() {
        let value = resolve_input(&data_ref, env, catalog, catalog_path, credentials_path, loader, cancel)
            .await
            .map_err(|source| RunError::InputResolutionFailed {
                node: node.name.clone(),
                data_ref: data_ref.as_str().to_string(),
                source: Box::new(source),
            })?;
        call_args.insert(arg_name, ArgValue::Table(value));
    }

    for (arg_name, binding) in &node.parameters {
        call_args.insert(arg_name.clone(), resolve_param(binding, parameters));
    }

    let formal_required: Vec<&str> = node
        .func
        .formal_params()
        .iter()
        .filter(|p| !p.has_default)
        .map(|p| p.name.as_str())
        .collect();
    for required in formal_required {
        if !call_args.contains(required) {
            return Err(RunError::MissingArgument {
                node: node.name.clone(),
                arg: required.to_string(),
            });
        }
    }

    let output = node
        .func
        .call(&call_args)
        .map_err(|source| RunError::NodeCallFailed {
            node: node.name.clone(),
            source,
        })?;

    match (&node.outputs, output) {
        (_, NodeOutput::None) => Ok(Vec::new()),
        (OutputBinding::Single(data_ref), NodeOutput::Single(value)) => Ok(vec![(data_ref.clone(), value)]),
        (OutputBinding::Named(mapping), NodeOutput::Named(mut values)) => {
            let mut results = Vec::with_capacity(mapping.len());
            for (return_key, data_ref) in mapping {
                let value = values.shift_remove(return_key).ok_or_else(|| RunError::OutputShapeMismatch {
                    node: node.name.clone(),
                    details: format!("function did not return a value for return key '{return_key}'"),
                })?;
                results.push((data_ref.clone(), value));
            }
            Ok(results)
        }
        (OutputBinding::Single(_), NodeOutput::Named(_)) => Err(RunError::OutputShapeMismatch {
            node: node.name.clone(),
            details: "node declares a single output but its function returned a named mapping".to_string(),
        }),
        (OutputBinding::Named(_), NodeOutput::Single(_)) => Err(RunError::OutputShapeMismatch {
            node: node.name.clone(),
            details: "node declares named outputs but its function returned a single table".to_string(),
        }),
    }
}
