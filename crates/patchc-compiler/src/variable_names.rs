//! Variable binding plan.
//!
//! Every name the generated program uses is decided here, before any code is
//! emitted. Per node there are five namespaces:
//!
//! | namespace | key | name |
//! |-----------|-----|------|
//! | `ins` | signal inlet id | `{prefix}_INS_{id}` |
//! | `outs` | signal outlet id | `{prefix}_OUTS_{id}` |
//! | `rcvs` | message inlet id | `{prefix}_RCVS_{id}` |
//! | `snds` | message outlet id | `{prefix}_SNDS_{id}` |
//! | `state` | state variable | `{prefix}_STATE_{name}` |
//!
//! where `prefix` is the node type and id joined by `_`, with the type
//! sanitized. Precompilation later rewrites some entries so that connected
//! portlets share one name.
//!
//! Lookups go through [`Namespace::get`], which fails with
//! [`CompileError::UnknownVariable`] instead of producing a dangling name.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CompileError;
use crate::graph::{Graph, PortletAddress, PortletKind};
use crate::node_implementation::NodeImplementations;

/// Checks that `part` can be embedded in a variable name.
pub fn assert_valid_name_part(part: &str) -> Result<&str, CompileError> {
    if is_valid_name_part(part) {
        Ok(part)
    } else {
        Err(CompileError::InvalidVariableName(part.to_owned()))
    }
}

/// True if `part` is non-empty and only contains `[a-zA-Z0-9_]`.
pub fn is_valid_name_part(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turns a node type into a name part: `~` becomes `_t`, anything else
/// outside `[a-zA-Z0-9_]` becomes `_`.
pub fn sanitize_node_type(node_type: &str) -> String {
    let mut out = String::with_capacity(node_type.len() + 2);
    for c in node_type.chars() {
        match c {
            '~' => out.push_str("_t"),
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

/// Ordered key to name mapping with checked lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Namespace {
    #[serde(skip)]
    label: String,
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

impl Namespace {
    /// Empty namespace; `label` shows up in lookup errors.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Label used in errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name bound to `key`.
    pub fn get(&self, key: &str) -> Result<&str, CompileError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| CompileError::unknown_variable(self.label.as_str(), key))
    }

    /// Binds or rebinds `key`.
    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>) {
        self.entries.insert(key.into(), name.into());
    }

    /// True if `key` is bound.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Bindings, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeVariableNames {
    /// Signal inlet storage.
    pub ins: Namespace,
    /// Signal outlet storage.
    pub outs: Namespace,
    /// Message receivers.
    pub rcvs: Namespace,
    /// Message senders.
    pub snds: Namespace,
    /// Node state.
    pub state: Namespace,
}

impl NodeVariableNames {
    fn new(prefix: &str) -> Self {
        Self {
            ins: Namespace::new(format!("{prefix}.ins")),
            outs: Namespace::new(format!("{prefix}.outs")),
            rcvs: Namespace::new(format!("{prefix}.rcvs")),
            snds: Namespace::new(format!("{prefix}.snds")),
            state: Namespace::new(format!("{prefix}.state")),
        }
    }
}

/// Program-wide names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Globs {
    /// Frame index inside the current block.
    pub iter_frame: &'static str,
    /// Absolute frame counter.
    pub frame: &'static str,
    /// Frames per block.
    pub block_size: &'static str,
    /// Sample rate.
    pub sample_rate: &'static str,
    /// Input channels of the current block.
    pub input: &'static str,
    /// Output channels of the current block.
    pub output: &'static str,
    /// Receiver that drops every message.
    pub null_message_receiver: &'static str,
    /// Message parameter of receivers and senders.
    pub m: &'static str,
}

impl Default for Globs {
    fn default() -> Self {
        Self {
            iter_frame: "F",
            frame: "FRAME",
            block_size: "BLOCK_SIZE",
            sample_rate: "SAMPLE_RATE",
            input: "INPUT",
            output: "OUTPUT",
            null_message_receiver: "SND_TO_NULL",
            m: "m",
        }
    }
}

/// The whole binding plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableNames {
    nodes: BTreeMap<String, NodeVariableNames>,
    /// Program-wide names.
    pub globs: Globs,
    inlet_callers: BTreeMap<String, BTreeMap<String, String>>,
    outlet_listeners: BTreeMap<String, BTreeMap<String, String>>,
}

impl VariableNames {
    /// Names of `node_id`.
    pub fn node(&self, node_id: &str) -> Result<&NodeVariableNames, CompileError> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| CompileError::unknown_variable("nodes", node_id))
    }

    /// Names of `node_id`, mutably.
    pub fn node_mut(&mut self, node_id: &str) -> Result<&mut NodeVariableNames, CompileError> {
        self.nodes
            .get_mut(node_id)
            .ok_or_else(|| CompileError::unknown_variable("nodes", node_id))
    }

    /// Host-callable function forwarding to an inlet.
    pub fn inlet_caller(&self, address: &PortletAddress) -> Result<&str, CompileError> {
        lookup(&self.inlet_callers, "inletCallers", address)
    }

    /// Host callback slot for an outlet.
    pub fn outlet_listener(&self, address: &PortletAddress) -> Result<&str, CompileError> {
        lookup(&self.outlet_listeners, "outletListeners", address)
    }

    /// True if `address` has an outlet listener.
    pub fn has_outlet_listener(&self, address: &PortletAddress) -> bool {
        self.outlet_listeners
            .get(&address.node_id)
            .is_some_and(|m| m.contains_key(&address.portlet_id))
    }

    /// Inlet caller names as `node id -> inlet id -> name`.
    pub fn inlet_callers(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.inlet_callers
    }

    /// Outlet listener names as `node id -> outlet id -> name`.
    pub fn outlet_listeners(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.outlet_listeners
    }
}

fn lookup<'a>(
    index: &'a BTreeMap<String, BTreeMap<String, String>>,
    label: &str,
    address: &PortletAddress,
) -> Result<&'a str, CompileError> {
    index
        .get(&address.node_id)
        .and_then(|m| m.get(&address.portlet_id))
        .map(String::as_str)
        .ok_or_else(|| CompileError::unknown_variable(label, address.to_string()))
}

/// Name prefix of a node.
pub fn node_prefix(node_type: &str, node_id: &str) -> Result<String, CompileError> {
    assert_valid_name_part(node_id)?;
    Ok(format!("{}_{node_id}", sanitize_node_type(node_type)))
}

/// Builds the binding plan for every node of `graph`.
pub fn generate(
    graph: &Graph,
    registry: &NodeImplementations,
    inlet_caller_specs: &[PortletAddress],
    outlet_listener_specs: &[PortletAddress],
) -> Result<VariableNames, CompileError> {
    let mut nodes = BTreeMap::new();
    // prefix -> node id that owns it
    let mut prefixes: BTreeMap<String, &str> = BTreeMap::new();

    for node in graph.nodes() {
        let prefix = node_prefix(&node.node_type, &node.id)?;
        if let Some(first) = prefixes.insert(prefix.clone(), &node.id) {
            return Err(CompileError::NamePrefixCollision {
                prefix,
                first: first.to_owned(),
                second: node.id.clone(),
            });
        }
        let mut names = NodeVariableNames::new(&prefix);

        for inlet in &node.inlets {
            let id = assert_valid_name_part(&inlet.id)?;
            match inlet.kind {
                PortletKind::Signal => names.ins.insert(id, format!("{prefix}_INS_{id}")),
                PortletKind::Message => names.rcvs.insert(id, format!("{prefix}_RCVS_{id}")),
            }
        }
        for outlet in &node.outlets {
            let id = assert_valid_name_part(&outlet.id)?;
            match outlet.kind {
                PortletKind::Signal => names.outs.insert(id, format!("{prefix}_OUTS_{id}")),
                PortletKind::Message => names.snds.insert(id, format!("{prefix}_SNDS_{id}")),
            }
        }

        if let Ok(implementation) = registry.get(&node.node_type) {
            for state in implementation.state_variables(node) {
                let name = assert_valid_name_part(&state)?;
                names.state.insert(name, format!("{prefix}_STATE_{name}"));
            }
        }

        tracing::trace!(node = %node.id, %prefix, "variable names");
        nodes.insert(node.id.clone(), names);
    }

    Ok(VariableNames {
        nodes,
        globs: Globs::default(),
        inlet_callers: portlet_index(inlet_caller_specs, "inletCaller")?,
        outlet_listeners: portlet_index(outlet_listener_specs, "outletListener")?,
    })
}

fn portlet_index(
    specs: &[PortletAddress],
    kind: &str,
) -> Result<BTreeMap<String, BTreeMap<String, String>>, CompileError> {
    let mut index: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for spec in specs {
        let node_id = assert_valid_name_part(&spec.node_id)?;
        let portlet_id = assert_valid_name_part(&spec.portlet_id)?;
        index
            .entry(node_id.to_owned())
            .or_default()
            .insert(portlet_id.to_owned(), format!("{kind}_{node_id}_{portlet_id}"));
    }
    Ok(index)
}
