//! # kiln-cli
//!
//! Command-line runner for a kiln project. Loads a project's catalog,
//! credentials, and parameters from its `conf/` directory, builds its
//! registered pipelines, and runs the one named on the command line
//! (optionally narrowed by tag, name, or node-range selection), printing a
//! summary of every dataset the run produced.
//!
//! ```bash
//! kiln run --project demos/quickstart --pipeline default
//! kiln run --project demos/quickstart --tags ingest
//! RUST_LOG=debug kiln run --project demos/quickstart --from-nodes clean_raw
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln_core::node::{create_node, ArgValue, DataBinding, FormalParam, NamedFn, NodeOutput, OutputBinding};
use kiln_core::{create_pipeline, orchestrate, DataRef, ProjectManifest, SelectSpec};
use kiln_loaders::StandardLoader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments for the kiln pipeline runner.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(about = "Run kiln data pipeline projects")]
struct Args {
    /// Root directory of the project; its `conf/base` and `conf/credentials`
    /// subdirectories hold the catalog, parameters, and credentials documents.
    #[arg(short, long, default_value = "demos/quickstart")]
    project: PathBuf,

    /// Name of the registered pipeline to run.
    #[arg(long, default_value = "default")]
    pipeline: String,

    /// Only run nodes carrying one of these tags.
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Only run nodes with one of these names.
    #[arg(long = "nodes", value_delimiter = ',')]
    node_names: Vec<String>,

    /// Run the nodes reachable downstream from these node names, inclusive.
    #[arg(long = "from-nodes", value_delimiter = ',')]
    from_nodes: Vec<String>,

    /// Run the nodes that can reach these node names, inclusive.
    #[arg(long = "to-nodes", value_delimiter = ',')]
    to_nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let manifest = build_manifest(&args.project)?;
    let select_spec = SelectSpec {
        tags: args.tags,
        node_names: args.node_names,
        from_nodes: args.from_nodes,
        to_nodes: args.to_nodes,
    };

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let loader: Arc<dyn kiln_core::DataSourceLoader> = Arc::new(StandardLoader);

    let mut run =
        tokio::spawn(async move { orchestrate(&manifest, &args.pipeline, &select_spec, loader, run_cancel).await });

    let outcome = tokio::select! {
        res = &mut run => res.context("orchestrate task panicked")?,
        _ = signal::ctrl_c() => {
            eprintln!("received Ctrl-C, cancelling run...");
            cancel.cancel();
            run.await.context("orchestrate task panicked")?
        }
    };

    match outcome {
        Ok(env) => {
            tracing::info!(datasets = env.len(), "run succeeded");
            for (name, batch) in env.iter() {
                println!("{name}: {} rows, {} columns", batch.num_rows(), batch.num_columns());
            }
            Ok(())
        }
        Err((env, err)) => {
            tracing::error!(completed = env.len(), error = %err, "run failed");
            Err(err.into())
        }
    }
}

/// Build the demo project's manifest: a two-node pipeline reading the
/// `raw_customers` CSV dataset and producing a row-count summary table.
/// A real project replaces this function with its own node functions; the
/// manifest-building pattern itself does not change.
fn build_manifest(project: &std::path::Path) -> Result<ProjectManifest> {
    let catalog_path = project.join("conf/base/catalog.yaml");
    let credentials_path = project.join("conf/credentials/credentials.yaml");
    let parameters_path = project.join("conf/base/parameters.yaml");

    let manifest = ProjectManifest::new(catalog_path, credentials_path, parameters_path).register(
        "default",
        Arc::new(|| {
            let summarize = Arc::new(NamedFn::new(
                "summarize_customers",
                vec![FormalParam::required("customers"), FormalParam::optional("min_rows")],
                |args| {
                    let table = args
                        .get("customers")
                        .and_then(ArgValue::as_table)
                        .ok_or_else(|| anyhow::anyhow!("missing 'customers' table"))?;
                    let min_rows = args
                        .get("min_rows")
                        .and_then(ArgValue::as_param)
                        .and_then(|p| p.as_i64())
                        .unwrap_or(0);
                    if (table.num_rows() as i64) < min_rows {
                        anyhow::bail!("expected at least {min_rows} rows, got {}", table.num_rows());
                    }
                    Ok(NodeOutput::Single(table.clone()))
                },
            ));

            let node = create_node(
                summarize,
                DataBinding::Mapping(indexmap_from([("customers", "raw_customers")])),
                OutputBinding::Single(DataRef::new("customer_summary").unwrap()),
                Some("summarize_customers".to_string()),
                Some(["ingest"].into_iter().map(str::to_string).collect()),
                Some(indexmap_params([("min_rows", kiln_core::ParamValue::Int(0))])),
            )
            .map_err(|e| kiln_core::error::PipelineError::InvalidPipeline { reason: e.to_string() })?;

            create_pipeline(vec![node.into()], Some("default".to_string()))
        }),
    );

    Ok(manifest)
}

fn indexmap_from<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> indexmap::IndexMap<String, DataRef> {
    pairs
        .into_iter()
        .map(|(arg, data_ref)| (arg.to_string(), DataRef::new(data_ref).unwrap()))
        .collect()
}

fn indexmap_params(
    pairs: impl IntoIterator<Item = (&'static str, kiln_core::ParamValue)>,
) -> indexmap::IndexMap<String, kiln_core::node::ParamBinding> {
    pairs
        .into_iter()
        .map(|(arg, value)| (arg.to_string(), kiln_core::node::ParamBinding::literal(value)))
        .collect()
}
