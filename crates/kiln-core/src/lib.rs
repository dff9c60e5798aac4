//! # kiln-core
//!
//! Core DAG types for the kiln pipeline execution framework: the
//! parameter store, the catalog, nodes, pipelines, the selector, and the
//! runner that ties them together.
//!
//! A project using `kiln-core` declares a set of [`node::NodeFn`]
//! implementations, wires them into a [`pipeline::Pipeline`] via
//! [`node::create_node`] and [`pipeline::create_pipeline`], and executes a
//! (possibly filtered) subset of that pipeline with
//! [`runner::run_pipeline`] against a catalog document, a credentials
//! document, a [`param::ParameterStore`], and a [`runner::DataSourceLoader`]
//! supplying the concrete dataset formats. Concrete loaders live in the
//! separate `kiln-loaders` crate so this crate stays free of any one
//! source-format dependency.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kiln_core::node::{create_node, DataBinding, FormalParam, NamedFn, NodeOutput, OutputBinding};
//! use kiln_core::data::DataRef;
//! use kiln_core::pipeline::create_pipeline;
//!
//! let greet = Arc::new(NamedFn::new("greet", vec![], |_args| Ok(NodeOutput::None)));
//! let node = create_node(
//!     greet,
//!     DataBinding::Sequence(vec![]),
//!     OutputBinding::Single(DataRef::new("greeting").unwrap()),
//!     None,
//!     None,
//!     None,
//! ).unwrap();
//! let (pipeline, warnings) = create_pipeline(vec![node.into()], None).unwrap();
//! assert!(warnings.is_empty());
//! assert_eq!(pipeline.len(), 1);
//! ```

pub mod catalog;
pub mod data;
pub mod error;
pub mod manifest;
pub mod node;
pub mod param;
pub mod pipeline;
pub mod runner;
pub mod select;

pub use catalog::{Catalog, CatalogEntry, Credentials};
pub use data::{DataEnvironment, DataRef, TabularValue};
pub use error::{CatalogError, ConfigError, LoadError, NodeError, OrchestrateError, PipelineError, RunError};
pub use manifest::{orchestrate, PipelineFactory, ProjectManifest};
pub use node::{create_node, Node, NodeFn};
pub use param::{load_parameters, ParamValue, ParameterStore};
pub use pipeline::{create_pipeline, Pipeline, Warning};
pub use runner::{run_pipeline, DataSourceLoader};
pub use select::{select, SelectSpec};
