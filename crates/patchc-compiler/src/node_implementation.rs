//! Contract between the compiler and node code generators.
//!
//! Each node type is a [`NodeImplementation`]: a set of fragment generators the
//! emitter calls while it walks the traversal plan. Every method has a default,
//! so a node type only writes the parts it needs. Types are looked up in a
//! [`NodeImplementations`] registry, and an unregistered type aborts the
//! compilation.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::graph::Node;
use crate::macros::Macros;
use crate::variable_names::{Globs, NodeVariableNames};

/// What a generator sees of its node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// The node being generated.
    pub node: &'a Node,
    /// Its (precompiled) variable names.
    pub names: &'a NodeVariableNames,
    /// Program-wide names.
    pub globs: &'a Globs,
    /// Target helpers.
    pub macros: &'a Macros,
}

impl NodeContext<'_> {
    /// Numeric argument, or `default` when absent.
    pub fn arg_f64(&self, name: &str, default: f64) -> f64 {
        self.node.arg_f64(name).unwrap_or(default)
    }

    /// Required string argument.
    pub fn arg_str(&self, name: &str) -> Result<&str, CompileError> {
        self.node
            .arg_str(name)
            .ok_or_else(|| CompileError::invalid_node(self.node.id.as_str(), format!("missing argument '{name}'")))
    }
}

/// Code run when an array a node depends on changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraysChanged {
    /// Array name.
    pub array_name: String,
    /// Code to run.
    pub code: String,
}

/// Optional lifecycle fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeEvents {
    /// Runs inside `configure`, after the globals are set.
    pub configure: Option<String>,
    /// Runs whenever the named array is set.
    pub arrays_changed: Option<ArraysChanged>,
}

/// Code generator for one node type.
pub trait NodeImplementation: Send + Sync {
    /// Names of the node's state variables.
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        Vec::new()
    }

    /// One-time declarations (state, helpers).
    fn declare(&self, _ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        Ok(String::new())
    }

    /// Per-frame code.
    fn loop_code(&self, _ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        Ok(String::new())
    }

    /// Receiver bodies per message inlet id. Each body should `return` once
    /// it has handled the message; falling through reaches the
    /// unsupported-message error.
    fn messages(&self, _ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        Ok(BTreeMap::new())
    }

    /// Lifecycle fragments.
    fn events(&self, _ctx: &NodeContext<'_>) -> Result<NodeEvents, CompileError> {
        Ok(NodeEvents::default())
    }

    /// Code shared by all nodes of this type, emitted once per snippet.
    fn shared_code(&self, _macros: &Macros) -> Vec<String> {
        Vec::new()
    }
}

/// Registry of node implementations by type tag.
#[derive(Default)]
pub struct NodeImplementations {
    implementations: BTreeMap<String, Box<dyn NodeImplementation>>,
}

impl NodeImplementations {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `implementation` for `node_type`, replacing any previous one.
    pub fn register(
        &mut self,
        node_type: impl Into<String>,
        implementation: impl NodeImplementation + 'static,
    ) -> &mut Self {
        self.implementations
            .insert(node_type.into(), Box::new(implementation));
        self
    }

    /// Implementation for `node_type`.
    pub fn get(&self, node_type: &str) -> Result<&dyn NodeImplementation, CompileError> {
        self.implementations
            .get(node_type)
            .map(|implementation| &**implementation)
            .ok_or_else(|| CompileError::UnknownNodeType(node_type.to_owned()))
    }

    /// True if `node_type` is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.implementations.contains_key(node_type)
    }

    /// Registered types, sorted.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.implementations.keys().map(String::as_str)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }
}

impl std::fmt::Debug for NodeImplementations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.implementations.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl NodeImplementation for Silent {}

    #[test]
    fn lookup_fails_fast() {
        let mut registry = NodeImplementations::new();
        registry.register("silent", Silent);
        assert!(registry.get("silent").is_ok());
        assert!(matches!(
            registry.get("loud"),
            Err(CompileError::UnknownNodeType(ref t)) if t == "loud"
        ));
        assert_eq!(registry.node_types().collect::<Vec<_>>(), vec!["silent"]);
    }

    #[test]
    fn defaults_are_empty() {
        let mut graph = crate::Graph::new();
        graph.add_node(Node::new("n", "silent")).unwrap();
        let names =
            crate::variable_names::generate(&graph, &NodeImplementations::new(), &[], &[]).unwrap();
        let macros = Macros::default();
        let ctx = NodeContext {
            node: graph.get("n").unwrap(),
            names: names.node("n").unwrap(),
            globs: &names.globs,
            macros: &macros,
        };
        assert!(Silent.state_variables(ctx.node).is_empty());
        assert_eq!(Silent.declare(&ctx).unwrap(), "");
        assert_eq!(Silent.loop_code(&ctx).unwrap(), "");
        assert!(Silent.messages(&ctx).unwrap().is_empty());
        assert_eq!(Silent.events(&ctx).unwrap(), NodeEvents::default());
        assert!(Silent.shared_code(&macros).is_empty());
    }
}
