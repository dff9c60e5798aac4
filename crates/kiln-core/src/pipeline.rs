//! Pipeline (C3): an ordered, composable collection of nodes (§3, §4.5).

use std::collections::HashSet;

use crate::error::PipelineError;
use crate::node::Node;

/// A warning surfaced by a construction or selection routine that does not
/// rise to the level of a hard error (§4.5, §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning(pub String);

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that can contribute nodes to a [`Pipeline`]: either a single
/// node, or another, already-built pipeline being composed in (§3).
pub enum PipelineItem {
    Node(Node),
    Pipeline(Pipeline),
}

impl From<Node> for PipelineItem {
    fn from(node: Node) -> Self {
        PipelineItem::Node(node)
    }
}

impl From<Pipeline> for PipelineItem {
    fn from(pipeline: Pipeline) -> Self {
        PipelineItem::Pipeline(pipeline)
    }
}

/// An ordered collection of nodes, flattened from whatever mix of nodes and
/// sub-pipelines it was built from.
#[derive(Debug, Default)]
pub struct Pipeline {
    name: Option<String>,
    nodes: Vec<Node>,
}

impl Pipeline {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build a [`Pipeline`] by flattening `items` in order.
///
/// Duplicate node names are not a hard error (a node may legitimately be
/// reused by name across sub-pipelines that are never composed together at
/// runtime) but produce a [`Warning`] per repeat occurrence, per §4.5/S6.
/// An empty `items` list is a valid, empty pipeline — §4.5 names only a
/// non-Node/non-Pipeline item as a construction failure, and `PipelineItem`
/// makes that case structurally unrepresentable.
pub fn create_pipeline(
    items: Vec<PipelineItem>,
    name: Option<String>,
) -> Result<(Pipeline, Vec<Warning>), PipelineError> {
    let mut nodes = Vec::new();
    for item in items {
        match item {
            PipelineItem::Node(node) => nodes.push(node),
            PipelineItem::Pipeline(mut pipeline) => nodes.append(&mut pipeline.nodes),
        }
    }

    let mut seen = HashSet::new();
    let mut warnings = Vec::new();
    for node in &nodes {
        if !seen.insert(node.name.clone()) {
            warnings.push(Warning(format!(
                "node name '{}' appears more than once in this pipeline",
                node.name
            )));
        }
    }

    Ok((Pipeline { name, nodes }, warnings))
}
