//! Patch graph model.
//!
//! A [`Graph`] is an insertion-ordered set of [`Node`]s. Each node declares its
//! inlets and outlets, and stores outgoing edges on the source side as
//! `sinks: outlet id -> [PortletAddress]`. Sources of an inlet are found by
//! scanning the sinks of every node, in graph order.
//!
//! Signal inlets take at most one source; message inlets take any number.
//! [`Graph::connect`] enforces both that and matching portlet kinds.
//!
//! Graphs deserialize from a JSON array of nodes, which is how patch
//! front-ends hand them over.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;

/// Kind of data a portlet carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortletKind {
    /// One sample per frame.
    Signal,
    /// Discrete messages.
    Message,
}

impl fmt::Display for PortletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortletKind::Signal => write!(f, "signal"),
            PortletKind::Message => write!(f, "message"),
        }
    }
}

/// An inlet or outlet declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portlet {
    /// Portlet id, unique per node and direction.
    pub id: String,
    /// Signal or message.
    #[serde(rename = "type")]
    pub kind: PortletKind,
}

impl Portlet {
    /// Signal portlet.
    pub fn signal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: PortletKind::Signal,
        }
    }

    /// Message portlet.
    pub fn message(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: PortletKind::Message,
        }
    }
}

/// A `(node, portlet)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortletAddress {
    /// Node id.
    pub node_id: String,
    /// Portlet id on that node.
    pub portlet_id: String,
}

impl PortletAddress {
    /// Creates an address.
    pub fn new(node_id: impl Into<String>, portlet_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            portlet_id: portlet_id.into(),
        }
    }
}

impl fmt::Display for PortletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.portlet_id)
    }
}

/// One node of the patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node id, unique in the graph.
    pub id: String,
    /// Type tag, resolved against the node implementation registry.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Creation arguments, interpreted by the node's generator only.
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
    /// Inlets in declaration order.
    #[serde(default)]
    pub inlets: Vec<Portlet>,
    /// Outlets in declaration order.
    #[serde(default)]
    pub outlets: Vec<Portlet>,
    /// Outgoing edges per outlet id, in connection order.
    #[serde(default)]
    pub sinks: BTreeMap<String, Vec<PortletAddress>>,
    /// Root of the signal traversal (typically audio outputs).
    #[serde(default)]
    pub is_pulling_signal: bool,
    /// Root of the message traversal (nodes that emit messages on their own).
    #[serde(default)]
    pub is_pushing_messages: bool,
}

impl Node {
    /// Node without portlets or arguments.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            args: serde_json::Map::new(),
            inlets: Vec::new(),
            outlets: Vec::new(),
            sinks: BTreeMap::new(),
            is_pulling_signal: false,
            is_pushing_messages: false,
        }
    }

    /// Adds an argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Declares an inlet.
    pub fn with_inlet(mut self, portlet: Portlet) -> Self {
        self.inlets.push(portlet);
        self
    }

    /// Declares an outlet.
    pub fn with_outlet(mut self, portlet: Portlet) -> Self {
        self.outlets.push(portlet);
        self
    }

    /// Marks the node as a signal traversal root.
    pub fn pulling_signal(mut self) -> Self {
        self.is_pulling_signal = true;
        self
    }

    /// Marks the node as a message traversal root.
    pub fn pushing_messages(mut self) -> Self {
        self.is_pushing_messages = true;
        self
    }

    /// Inlet by id.
    pub fn inlet(&self, id: &str) -> Option<&Portlet> {
        self.inlets.iter().find(|p| p.id == id)
    }

    /// Outlet by id.
    pub fn outlet(&self, id: &str) -> Option<&Portlet> {
        self.outlets.iter().find(|p| p.id == id)
    }

    /// Sinks of an outlet, empty if unconnected.
    pub fn sinks_of(&self, outlet_id: &str) -> &[PortletAddress] {
        self.sinks.get(outlet_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inlets of one kind, in declaration order.
    pub fn inlets_of_kind(&self, kind: PortletKind) -> impl Iterator<Item = &Portlet> {
        self.inlets.iter().filter(move |p| p.kind == kind)
    }

    /// Outlets of one kind, in declaration order.
    pub fn outlets_of_kind(&self, kind: PortletKind) -> impl Iterator<Item = &Portlet> {
        self.outlets.iter().filter(move |p| p.kind == kind)
    }

    /// Numeric argument.
    pub fn arg_f64(&self, name: &str) -> Option<f64> {
        self.args.get(name).and_then(Value::as_f64)
    }

    /// String argument.
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }
}

/// Insertion-ordered collection of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node. Its `sinks` are kept as given; call [`Graph::validate`]
    /// once every node is in.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Node by id, or [`GraphError::NodeNotFound`].
    pub fn get(&self, id: &str) -> Result<&Node, GraphError> {
        self.node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Sinks of `node_id`'s outlet `outlet_id`, empty if either is unknown.
    pub fn sinks(&self, node_id: &str, outlet_id: &str) -> &[PortletAddress] {
        self.node(node_id)
            .map(|n| n.sinks_of(outlet_id))
            .unwrap_or(&[])
    }

    /// Sources feeding `node_id`'s inlet `inlet_id`, as `(source node, outlet)`
    /// addresses in graph order then outlet declaration order.
    pub fn sources(&self, node_id: &str, inlet_id: &str) -> Vec<PortletAddress> {
        let mut sources = Vec::new();
        for node in &self.nodes {
            for outlet in &node.outlets {
                let feeds = node
                    .sinks_of(&outlet.id)
                    .iter()
                    .any(|sink| sink.node_id == node_id && sink.portlet_id == inlet_id);
                if feeds {
                    sources.push(PortletAddress::new(node.id.as_str(), outlet.id.as_str()));
                }
            }
        }
        sources
    }

    /// Connects `source_node:outlet` to `sink_node:inlet`.
    pub fn connect(
        &mut self,
        source_node: &str,
        outlet: &str,
        sink_node: &str,
        inlet: &str,
    ) -> Result<(), GraphError> {
        let source = self.get(source_node)?;
        let source_kind = source
            .outlet(outlet)
            .ok_or_else(|| GraphError::outlet_not_found(source_node, outlet))?
            .kind;
        let sink_kind = self
            .get(sink_node)?
            .inlet(inlet)
            .ok_or_else(|| GraphError::inlet_not_found(sink_node, inlet))?
            .kind;

        if source_kind != sink_kind {
            return Err(GraphError::KindMismatch {
                source_node: source_node.to_owned(),
                outlet: outlet.to_owned(),
                source_kind,
                sink_node: sink_node.to_owned(),
                inlet: inlet.to_owned(),
                sink_kind,
            });
        }

        let address = PortletAddress::new(sink_node, inlet);
        if source.sinks_of(outlet).contains(&address) {
            return Err(GraphError::DuplicateConnection {
                source_node: source_node.to_owned(),
                outlet: outlet.to_owned(),
                sink_node: sink_node.to_owned(),
                inlet: inlet.to_owned(),
            });
        }
        if sink_kind == PortletKind::Signal && !self.sources(sink_node, inlet).is_empty() {
            return Err(GraphError::SignalInletTaken {
                node_id: sink_node.to_owned(),
                inlet: inlet.to_owned(),
            });
        }

        let i = self.index[source_node];
        self.nodes[i]
            .sinks
            .entry(outlet.to_owned())
            .or_default()
            .push(address);
        tracing::trace!(source_node, outlet, sink_node, inlet, "connect");
        Ok(())
    }

    /// Checks every stored edge: declared outlet, existing sink inlet of the
    /// same kind, and at most one source per signal inlet.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut signal_sources: HashMap<(&str, &str), usize> = HashMap::new();
        for node in &self.nodes {
            for (outlet_id, sinks) in &node.sinks {
                let source_kind = node
                    .outlet(outlet_id)
                    .ok_or_else(|| GraphError::outlet_not_found(node.id.as_str(), outlet_id.as_str()))?
                    .kind;
                for sink in sinks {
                    let sink_kind = self
                        .get(&sink.node_id)?
                        .inlet(&sink.portlet_id)
                        .ok_or_else(|| {
                            GraphError::inlet_not_found(sink.node_id.as_str(), sink.portlet_id.as_str())
                        })?
                        .kind;
                    if source_kind != sink_kind {
                        return Err(GraphError::KindMismatch {
                            source_node: node.id.clone(),
                            outlet: outlet_id.clone(),
                            source_kind,
                            sink_node: sink.node_id.clone(),
                            inlet: sink.portlet_id.clone(),
                            sink_kind,
                        });
                    }
                    if sink_kind == PortletKind::Signal {
                        let count = signal_sources
                            .entry((sink.node_id.as_str(), sink.portlet_id.as_str()))
                            .or_default();
                        *count += 1;
                        if *count > 1 {
                            return Err(GraphError::SignalInletTaken {
                                node_id: sink.node_id.clone(),
                                inlet: sink.portlet_id.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Node>> for Graph {
    type Error = GraphError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        graph.validate()?;
        Ok(graph)
    }
}

impl From<Graph> for Vec<Node> {
    fn from(graph: Graph) -> Self {
        graph.nodes
    }
}
