//! Selector (C5): tag/name/range-based filtering over an already-built
//! pipeline (§3, §4.6).

use std::collections::HashSet;

use crate::node::Node;
use crate::pipeline::{Pipeline, Warning};

/// A selection request. Every field left empty/unset means "do not filter
/// on this dimension." An empty `SelectSpec` selects the whole pipeline.
#[derive(Debug, Clone, Default)]
pub struct SelectSpec {
    pub tags: Vec<String>,
    pub node_names: Vec<String>,
    pub from_nodes: Vec<String>,
    pub to_nodes: Vec<String>,
}

impl SelectSpec {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.node_names.is_empty() && self.from_nodes.is_empty() && self.to_nodes.is_empty()
    }
}

/// Select the subset of `pipeline`'s nodes matching `spec`, applying the
/// filters in order and never reordering nodes (§4.6):
///
/// 1. **Tag filter.** If `tags` is non-empty, keep only nodes whose tag set
///    intersects `tags`.
/// 2. **Precedence.** If `node_names` is non-empty, `from_nodes`/`to_nodes`
///    are ignored (a warning is emitted if they were also supplied), and
///    only nodes named in `node_names` are kept; names with no match are
///    silently dropped.
/// 3. **Range filter** (only reached when `node_names` is empty): `start` is
///    the minimum index of a `from_nodes` match in the current list (or the
///    first index if `from_nodes` is empty), `end` is the maximum index of a
///    `to_nodes` match (or the last index if `to_nodes` is empty); the
///    result is the inclusive slice `[start, end]`. If either set was
///    specified but matched nothing, or if `start > end`, the result is
///    empty and a warning is emitted.
///
/// An empty `spec` selects every node in its original order.
pub fn select<'a>(pipeline: &'a Pipeline, spec: &SelectSpec) -> (Vec<&'a Node>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let mut current: Vec<&Node> = pipeline.nodes().iter().collect();

    if !spec.tags.is_empty() {
        let wanted: HashSet<&str> = spec.tags.iter().map(String::as_str).collect();
        current.retain(|node| node.tags.iter().any(|t| wanted.contains(t.as_str())));
    }

    if !spec.node_names.is_empty() {
        if !spec.from_nodes.is_empty() || !spec.to_nodes.is_empty() {
            warnings.push(Warning(
                "node_names was specified, so from_nodes/to_nodes are ignored".to_string(),
            ));
        }
        let wanted: HashSet<&str> = spec.node_names.iter().map(String::as_str).collect();
        current.retain(|node| wanted.contains(node.name.as_str()));
        return (current, warnings);
    }

    if !spec.from_nodes.is_empty() || !spec.to_nodes.is_empty() {
        let (range, range_warnings) = range_select(&current, &spec.from_nodes, &spec.to_nodes);
        warnings.extend(range_warnings);
        return (range, warnings);
    }

    (current, warnings)
}

/// Positional range filter over `current` (§4.6 step 3): `start`/`end` are
/// indices into `current`, not a data-dependency traversal — unconnected
/// nodes still fall inside `[start, end]` by position alone.
fn range_select<'a>(
    current: &[&'a Node],
    from_nodes: &[String],
    to_nodes: &[String],
) -> (Vec<&'a Node>, Vec<Warning>) {
    let mut warnings = Vec::new();

    if current.is_empty() {
        return (Vec::new(), warnings);
    }

    let start = if from_nodes.is_empty() {
        Some(0)
    } else {
        let matched = current
            .iter()
            .enumerate()
            .filter(|(_, n)| from_nodes.iter().any(|f| f == &n.name))
            .map(|(i, _)| i)
            .min();
        if matched.is_none() {
            warnings.push(Warning(format!("from_nodes {from_nodes:?} matched no node in the current selection")));
        }
        matched
    };

    let end = if to_nodes.is_empty() {
        Some(current.len() - 1)
    } else {
        let matched = current
            .iter()
            .enumerate()
            .filter(|(_, n)| to_nodes.iter().any(|t| t == &n.name))
            .map(|(i, _)| i)
            .max();
        if matched.is_none() {
            warnings.push(Warning(format!("to_nodes {to_nodes:?} matched no node in the current selection")));
        }
        matched
    };

    match (start, end) {
        (Some(s), Some(e)) if s <= e => (current[s..=e].to_vec(), warnings),
        _ => (Vec::new(), warnings),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::data::DataRef;
    use crate::node::{create_node, DataBinding, NamedFn, NodeOutput, OutputBinding};
    use crate::pipeline::create_pipeline;

    fn node_with(name: &str, inputs: Vec<&str>, output: &str, tags: &[&str]) -> Node {
        let func = Arc::new(NamedFn::new(
            name.to_string(),
            inputs.iter().map(|s| crate::node::FormalParam::required(*s)).collect(),
            |_args| Ok(NodeOutput::None),
        ));
        let binding = if inputs.is_empty() {
            DataBinding::Sequence(vec![])
        } else {
            DataBinding::Sequence(inputs.iter().map(|s| DataRef::new(*s).unwrap()).collect())
        };
        create_node(
            func,
            binding,
            OutputBinding::Single(DataRef::new(output).unwrap()),
            Some(name.to_string()),
            Some(tags.iter().map(|s| s.to_string()).collect::<HashSet<_>>()),
            None,
        )
        .unwrap()
    }

    fn chain() -> Pipeline {
        // a -> raw --(b)--> mid --(c)--> final
        let a = node_with("a", vec![], "raw", &["ingest"]);
        let b = node_with("b", vec!["raw"], "mid", &["transform"]);
        let c = node_with("c", vec!["mid"], "final", &["transform"]);
        create_pipeline(vec![a.into(), b.into(), c.into()], None).unwrap().0
    }

    /// `[a, b, c, d, e]` with no data-flow edges between any of them, so the
    /// range filter has nothing to traverse and must fall back to position.
    fn unconnected_five() -> Pipeline {
        let names = ["a", "b", "c", "d", "e"];
        let nodes: Vec<_> = names.iter().map(|n| node_with(n, vec![], n, &[]).into()).collect();
        create_pipeline(nodes, None).unwrap().0
    }

    #[test]
    fn empty_spec_selects_everything() {
        let pipeline = chain();
        let (selected, warnings) = select(&pipeline, &SelectSpec::default());
        assert_eq!(selected.len(), 3);
        assert!(warnings.is_empty());
    }

    #[test]
    fn tag_filter_keeps_matching_nodes_only() {
        let pipeline = chain();
        let spec = SelectSpec {
            tags: vec!["transform".to_string()],
            ..Default::default()
        };
        let (selected, _) = select(&pipeline, &spec);
        let names: HashSet<&str> = selected.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["b", "c"]));
    }

    #[test]
    fn unknown_node_name_is_silently_dropped() {
        let pipeline = chain();
        let spec = SelectSpec {
            node_names: vec!["ghost".to_string()],
            ..Default::default()
        };
        let (selected, warnings) = select(&pipeline, &spec);
        assert!(selected.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn node_names_takes_precedence_and_warns_when_range_also_set() {
        let pipeline = chain();
        let spec = SelectSpec {
            node_names: vec!["a".to_string()],
            from_nodes: vec!["b".to_string()],
            ..Default::default()
        };
        let (selected, warnings) = select(&pipeline, &spec);
        let names: HashSet<&str> = selected.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["a"]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn range_filter_selects_positional_slice_on_unconnected_nodes() {
        let pipeline = unconnected_five();
        let spec = SelectSpec {
            from_nodes: vec!["b".to_string()],
            to_nodes: vec!["d".to_string()],
            ..Default::default()
        };
        let (selected, warnings) = select(&pipeline, &spec);
        let names: Vec<&str> = selected.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn range_filter_with_unmatched_from_nodes_is_empty_with_warning() {
        let pipeline = unconnected_five();
        let spec = SelectSpec {
            from_nodes: vec!["z".to_string()],
            ..Default::default()
        };
        let (selected, warnings) = select(&pipeline, &spec);
        assert!(selected.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn from_nodes_includes_downstream_nodes_by_position() {
        let pipeline = chain();
        let spec = SelectSpec {
            from_nodes: vec!["b".to_string()],
            ..Default::default()
        };
        let (selected, _) = select(&pipeline, &spec);
        let names: HashSet<&str> = selected.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["b", "c"]));
    }
}
