//! Node (C4): an immutable descriptor binding a user function to named
//! inputs, outputs, parameter bindings, and tags (§3, §4.4).

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::data::{DataRef, TabularValue};
use crate::error::NodeError;
use crate::param::ParamValue;

/// A single formal parameter a [`NodeFn`] declares.
#[derive(Debug, Clone)]
pub struct FormalParam {
    pub name: String,
    pub has_default: bool,
}

impl FormalParam {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_default: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_default: true,
        }
    }
}

/// A single resolved call argument: either a table (from an input binding)
/// or a parameter value.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Table(TabularValue),
    Param(ParamValue),
}

impl ArgValue {
    pub fn as_table(&self) -> Option<&TabularValue> {
        match self {
            ArgValue::Table(t) => Some(t),
            ArgValue::Param(_) => None,
        }
    }

    pub fn as_param(&self) -> Option<&ParamValue> {
        match self {
            ArgValue::Param(p) => Some(p),
            ArgValue::Table(_) => None,
        }
    }
}

/// The ordered, resolved argument map a [`NodeFn`] is invoked with
/// (§4.7 step 4-5).
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: IndexMap<String, ArgValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What a [`NodeFn`] call produced, to be captured into the DataEnvironment
/// (§4.7 step 7).
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Nothing to store (not an error).
    None,
    /// A single table, for nodes declaring a single-DataRef output.
    Single(TabularValue),
    /// A named mapping of tables, for nodes declaring a named-mapping output.
    Named(IndexMap<String, TabularValue>),
}

/// The statically-typed capability trait replacing dynamic function
/// reflection (§9): a node's function declares its own formal parameters
/// and whether it accepts arbitrary extra named arguments, and implements
/// the call itself.
pub trait NodeFn: Send + Sync {
    /// Human-readable identifier used to derive a node's default `name`.
    fn identifier(&self) -> &str;

    /// The function's declared formal parameters, in order.
    fn formal_params(&self) -> &[FormalParam];

    /// Whether unmatched call-argument keys should flow into the call
    /// instead of being dropped with a warning (§4.7 step 5).
    fn is_variadic(&self) -> bool {
        false
    }

    /// Invoke the function with its matched arguments.
    fn call(&self, args: &CallArgs) -> anyhow::Result<NodeOutput>;
}

/// An ergonomic [`NodeFn`] built from a plain closure plus an explicit
/// formal-parameter declaration, for the common case where a user does not
/// want to hand-write a trait impl per node.
pub struct NamedFn<F>
where
    F: Fn(&CallArgs) -> anyhow::Result<NodeOutput> + Send + Sync,
{
    identifier: String,
    params: Vec<FormalParam>,
    variadic: bool,
    func: F,
}

impl<F> NamedFn<F>
where
    F: Fn(&CallArgs) -> anyhow::Result<NodeOutput> + Send + Sync,
{
    pub fn new(identifier: impl Into<String>, params: Vec<FormalParam>, func: F) -> Self {
        Self {
            identifier: identifier.into(),
            params,
            variadic: false,
            func,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

impl<F> NodeFn for NamedFn<F>
where
    F: Fn(&CallArgs) -> anyhow::Result<NodeOutput> + Send + Sync,
{
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn formal_params(&self) -> &[FormalParam] {
        &self.params
    }

    fn is_variadic(&self) -> bool {
        self.variadic
    }

    fn call(&self, args: &CallArgs) -> anyhow::Result<NodeOutput> {
        (self.func)(args)
    }
}

/// Surface form of `node.inputs`/`node.outputs` as accepted by
/// [`create_node`] (§3): a bare sequence of DataRefs (argument name =
/// DataRef) or an explicit mapping.
#[derive(Debug, Clone)]
pub enum DataBinding {
    Single(DataRef),
    Sequence(Vec<DataRef>),
    Mapping(IndexMap<String, DataRef>),
}

impl DataBinding {
    /// Normalize to an ordered `(arg_name -> DataRef)` mapping (§4.7 step 2).
    pub fn normalize(&self) -> IndexMap<String, DataRef> {
        match self {
            DataBinding::Single(r) => {
                let mut m = IndexMap::new();
                m.insert(r.as_str().to_string(), r.clone());
                m
            }
            DataBinding::Sequence(refs) => refs
                .iter()
                .map(|r| (r.as_str().to_string(), r.clone()))
                .collect(),
            DataBinding::Mapping(m) => m.clone(),
        }
    }

    fn data_refs(&self) -> Vec<&DataRef> {
        match self {
            DataBinding::Single(r) => vec![r],
            DataBinding::Sequence(refs) => refs.iter().collect(),
            DataBinding::Mapping(m) => m.values().collect(),
        }
    }
}

/// Surface form of `node.outputs`: either a single DataRef or an ordered
/// named mapping return-key -> DataRef (§3).
#[derive(Debug, Clone)]
pub enum OutputBinding {
    Single(DataRef),
    Named(IndexMap<String, DataRef>),
}

impl OutputBinding {
    fn data_refs(&self) -> Vec<&DataRef> {
        match self {
            OutputBinding::Single(r) => vec![r],
            OutputBinding::Named(m) => m.values().collect(),
        }
    }
}

/// A parameter binding: either a literal value, or a string that should be
/// looked up against the ParameterStore at run time, falling back to the
/// literal string if the lookup misses (§3, §4.7 step 1).
#[derive(Debug, Clone)]
pub enum ParamBinding {
    Literal(ParamValue),
    Ref(String),
}

impl ParamBinding {
    pub fn literal(value: impl Into<ParamValue>) -> Self {
        ParamBinding::Literal(value.into())
    }

    pub fn reference(key: impl Into<String>) -> Self {
        ParamBinding::Ref(key.into())
    }
}

/// An immutable node descriptor (§3, §4.4).
pub struct Node {
    pub name: String,
    pub func: Arc<dyn NodeFn>,
    pub inputs: DataBinding,
    pub outputs: OutputBinding,
    pub parameters: IndexMap<String, ParamBinding>,
    pub tags: HashSet<String>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("parameters", &self.parameters)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Build a [`Node`], validating the invariants in §3/§4.4.
#[allow(clippy::too_many_arguments)]
pub fn create_node(
    func: Arc<dyn NodeFn>,
    inputs: DataBinding,
    outputs: OutputBinding,
    name: Option<String>,
    tags: Option<HashSet<String>>,
    parameters: Option<IndexMap<String, ParamBinding>>,
) -> Result<Node, NodeError> {
    let name = match name {
        Some(n) if n.is_empty() => {
            return Err(NodeError::InvalidNode {
                name: func.identifier().to_string(),
                reason: "name must be non-empty if supplied".to_string(),
            })
        }
        Some(n) => n,
        None => func.identifier().to_string(),
    };

    for data_ref in inputs.data_refs().into_iter().chain(outputs.data_refs()) {
        if data_ref.as_str().is_empty() {
            return Err(NodeError::InvalidNode {
                name: name.clone(),
                reason: "every DataRef in inputs/outputs must be non-empty".to_string(),
            });
        }
    }

    let parameters = parameters.unwrap_or_default();
    let tags = tags.unwrap_or_default();

    let normalized_inputs = inputs.normalize();
    let input_args: HashSet<&str> = normalized_inputs.keys().map(|s| s.as_str()).collect();
    let param_args: HashSet<&str> = parameters.keys().map(|s| s.as_str()).collect();
    let overlap: Vec<&str> = input_args.intersection(&param_args).copied().collect();
    if !overlap.is_empty() {
        return Err(NodeError::InvalidNode {
            name,
            reason: format!(
                "inputs and parameters must bind disjoint argument names, overlap: {}",
                overlap.join(", ")
            ),
        });
    }

    if !func.is_variadic() {
        let formal: HashSet<&str> = func.formal_params().iter().map(|p| p.name.as_str()).collect();
        let mut unresolved: Vec<&str> = input_args
            .union(&param_args)
            .copied()
            .filter(|a| !formal.contains(a))
            .collect();
        unresolved.sort_unstable();
        if !unresolved.is_empty() {
            return Err(NodeError::InvalidNode {
                name,
                reason: format!(
                    "argument(s) {} do not match any formal parameter of '{}'",
                    unresolved.join(", "),
                    func.identifier()
                ),
            });
        }
    }

    Ok(Node {
        name,
        func,
        inputs,
        outputs,
        parameters,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_fn(params: Vec<&str>) -> Arc<dyn NodeFn> {
        Arc::new(NamedFn::new(
            "noop",
            params.into_iter().map(FormalParam::required).collect(),
            |_args| Ok(NodeOutput::None),
        ))
    }

    fn dref(s: &str) -> DataRef {
        DataRef::new(s).unwrap()
    }

    #[test]
    fn default_name_comes_from_function_identifier() {
        let node = create_node(
            noop_fn(vec![]),
            DataBinding::Mapping(IndexMap::new()),
            OutputBinding::Single(dref("out")),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(node.name, "noop");
    }

    #[test]
    fn rejects_overlapping_input_and_parameter_arg_names() {
        let mut inputs = IndexMap::new();
        inputs.insert("x".to_string(), dref("data_x"));
        let mut params = IndexMap::new();
        params.insert("x".to_string(), ParamBinding::literal("lit"));

        let err = create_node(
            noop_fn(vec!["x"]),
            DataBinding::Mapping(inputs),
            OutputBinding::Single(dref("out")),
            None,
            None,
            Some(params),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidNode { .. }));
    }

    #[test]
    fn rejects_unresolvable_argument_names() {
        let err = create_node(
            noop_fn(vec!["only_formal"]),
            DataBinding::Single(dref("not_a_formal")),
            OutputBinding::Single(dref("out")),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidNode { .. }));
    }

    #[test]
    fn variadic_function_accepts_any_argument_names() {
        let func: Arc<dyn NodeFn> = Arc::new(NamedFn::new("kwfunc", vec![], |_args| Ok(NodeOutput::None)).variadic());
        let node = create_node(
            func,
            DataBinding::Single(dref("anything")),
            OutputBinding::Single(dref("out")),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(node.name, "kwfunc");
    }
}
