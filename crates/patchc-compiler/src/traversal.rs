//! Execution order planning.
//!
//! Two orders come out of a graph:
//!
//! - **loop order**: which nodes run per frame, and in which order. Signal
//!   producers come before their consumers, starting from the nodes that pull
//!   signal (audio outputs). Nodes reachable only through message edges from
//!   message-pushing roots follow, then nodes the host can call into.
//! - **declare order**: the loop order plus every node a looped node can
//!   reach through message edges, so every receiver a message can land in is
//!   declared.
//!
//! Nodes that both emit messages and write signal in the same frame have no
//! ordering guarantee relative to the signal they affect.

use std::collections::HashSet;

use crate::graph::{Graph, PortletAddress, PortletKind};

/// Result of [`plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalPlan {
    /// Nodes to declare, duplicate free.
    pub declare_order: Vec<String>,
    /// Nodes to run per frame, duplicate free.
    pub loop_order: Vec<String>,
}

/// Post-order walk through signal inlets: every node comes after the nodes
/// feeding its signal inlets. Cycles are cut where they close.
pub fn signal_nodes<'a>(graph: &Graph, roots: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut walk = Walk::default();
    for root in roots {
        walk.signal(graph, root);
    }
    walk.order
}

/// Pre-order walk through message outlets: every node comes before the nodes
/// it sends messages to, unless already reached by another path.
pub fn message_nodes<'a>(graph: &Graph, roots: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut walk = Walk::default();
    for root in roots {
        walk.message(graph, root);
    }
    walk.order
}

/// Computes declare and loop orders.
///
/// The loop order is signal traversal from pulling nodes first, then message
/// traversal from pushing nodes, then inlet callers. Signal first is what
/// puts the diamond `n1 -> {n2 (message), n3 (signal)}, n2 -> n4` in the
/// order `[n1, n3, n2, n4]`; a message-first walk would give
/// `[n1, n2, n4, n3]`.
pub fn plan(graph: &Graph, inlet_caller_specs: &[PortletAddress]) -> TraversalPlan {
    let pulling = graph
        .nodes()
        .iter()
        .filter(|n| n.is_pulling_signal)
        .map(|n| n.id.as_str());
    let pushing = graph
        .nodes()
        .iter()
        .filter(|n| n.is_pushing_messages)
        .map(|n| n.id.as_str());
    let callers: Vec<&str> = inlet_caller_specs
        .iter()
        .map(|spec| spec.node_id.as_str())
        .filter(|id| graph.node(id).is_some())
        .collect();

    let mut loop_order = Vec::new();
    let mut seen = HashSet::new();
    let candidates = signal_nodes(graph, pulling)
        .into_iter()
        .chain(message_nodes(graph, pushing))
        .chain(callers.iter().map(|&id| id.to_owned()));
    for id in candidates {
        if seen.insert(id.clone()) {
            loop_order.push(id);
        }
    }

    let mut declare_order = loop_order.clone();
    for id in message_nodes(graph, loop_order.iter().map(String::as_str)) {
        if seen.insert(id.clone()) {
            declare_order.push(id);
        }
    }

    tracing::debug!(
        declared = declare_order.len(),
        looped = loop_order.len(),
        "traversal planned"
    );
    TraversalPlan {
        declare_order,
        loop_order,
    }
}

#[derive(Default)]
struct Walk {
    order: Vec<String>,
    visited: HashSet<String>,
    path: HashSet<String>,
}

impl Walk {
    fn signal(&mut self, graph: &Graph, id: &str) {
        if self.visited.contains(id) || self.path.contains(id) {
            return;
        }
        let Some(node) = graph.node(id) else {
            return;
        };
        self.path.insert(id.to_owned());
        for inlet in node.inlets_of_kind(PortletKind::Signal) {
            for source in graph.sources(id, &inlet.id) {
                self.signal(graph, &source.node_id);
            }
        }
        self.path.remove(id);
        self.visited.insert(id.to_owned());
        self.order.push(id.to_owned());
    }

    fn message(&mut self, graph: &Graph, id: &str) {
        if self.visited.contains(id) {
            return;
        }
        let Some(node) = graph.node(id) else {
            return;
        };
        self.visited.insert(id.to_owned());
        self.order.push(id.to_owned());
        for outlet in node.outlets_of_kind(PortletKind::Message) {
            for sink in node.sinks_of(&outlet.id) {
                self.message(graph, &sink.node_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Portlet};

    // n1 -signal-> n3 (pulling), n1 -message-> n2 -message-> n4
    fn diamond() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(
                Node::new("n1", "src")
                    .with_outlet(Portlet::signal("0"))
                    .with_outlet(Portlet::message("1"))
                    .pushing_messages(),
            )
            .unwrap();
        graph
            .add_node(
                Node::new("n2", "relay")
                    .with_inlet(Portlet::message("0"))
                    .with_outlet(Portlet::message("0")),
            )
            .unwrap();
        graph
            .add_node(
                Node::new("n3", "out")
                    .with_inlet(Portlet::signal("0"))
                    .pulling_signal(),
            )
            .unwrap();
        graph
            .add_node(Node::new("n4", "sink").with_inlet(Portlet::message("0")))
            .unwrap();
        graph.connect("n1", "0", "n3", "0").unwrap();
        graph.connect("n1", "1", "n2", "0").unwrap();
        graph.connect("n2", "0", "n4", "0").unwrap();
        graph
    }

    #[test]
    fn diamond_loop_order() {
        let plan = plan(&diamond(), &[]);
        assert_eq!(plan.loop_order, vec!["n1", "n3", "n2", "n4"]);
        assert_eq!(plan.declare_order, plan.loop_order);
    }

    #[test]
    fn plan_is_deterministic() {
        let graph = diamond();
        assert_eq!(plan(&graph, &[]), plan(&graph, &[]));
    }

    #[test]
    fn signal_sources_come_first() {
        let mut graph = Graph::new();
        for id in ["out", "mid", "osc"] {
            graph
                .add_node(
                    Node::new(id, "x")
                        .with_inlet(Portlet::signal("0"))
                        .with_outlet(Portlet::signal("0")),
                )
                .unwrap();
        }
        graph.connect("osc", "0", "mid", "0").unwrap();
        graph.connect("mid", "0", "out", "0").unwrap();
        assert_eq!(signal_nodes(&graph, ["out"]), vec!["osc", "mid", "out"]);
    }

    #[test]
    fn signal_cycles_are_cut() {
        let mut graph = Graph::new();
        for id in ["a", "b"] {
            graph
                .add_node(
                    Node::new(id, "x")
                        .with_inlet(Portlet::signal("0"))
                        .with_outlet(Portlet::signal("0")),
                )
                .unwrap();
        }
        graph.connect("a", "0", "b", "0").unwrap();
        graph.connect("b", "0", "a", "0").unwrap();
        assert_eq!(signal_nodes(&graph, ["a"]), vec!["b", "a"]);
    }

    #[test]
    fn message_cycles_visit_once() {
        let mut graph = Graph::new();
        for id in ["a", "b"] {
            graph
                .add_node(
                    Node::new(id, "x")
                        .with_inlet(Portlet::message("0"))
                        .with_outlet(Portlet::message("0")),
                )
                .unwrap();
        }
        graph.connect("a", "0", "b", "0").unwrap();
        graph.connect("b", "0", "a", "0").unwrap();
        assert_eq!(message_nodes(&graph, ["a"]), vec!["a", "b"]);
    }

    #[test]
    fn inlet_callers_are_declared() {
        let mut graph = diamond();
        graph
            .add_node(
                Node::new("remote", "relay")
                    .with_inlet(Portlet::message("0"))
                    .with_outlet(Portlet::message("0")),
            )
            .unwrap();
        graph
            .add_node(Node::new("tail", "sink").with_inlet(Portlet::message("0")))
            .unwrap();
        graph.connect("remote", "0", "tail", "0").unwrap();

        let plan = plan(&graph, &[PortletAddress::new("remote", "0")]);
        assert_eq!(plan.loop_order, vec!["n1", "n3", "n2", "n4", "remote"]);
        assert_eq!(
            plan.declare_order,
            vec!["n1", "n3", "n2", "n4", "remote", "tail"]
        );
    }

    #[test]
    fn message_sinks_of_signal_nodes_are_declared() {
        let mut graph = diamond();
        graph
            .add_node(Node::new("meter", "sink").with_inlet(Portlet::message("0")))
            .unwrap();
        graph
            .add_node(
                Node::new("env", "env~")
                    .with_inlet(Portlet::signal("0"))
                    .with_outlet(Portlet::message("0"))
                    .pulling_signal(),
            )
            .unwrap();
        graph.connect("n1", "0", "env", "0").unwrap();
        graph.connect("env", "0", "meter", "0").unwrap();

        let plan = plan(&graph, &[]);
        assert!(!plan.loop_order.contains(&"meter".to_owned()));
        assert_eq!(plan.declare_order.last().map(String::as_str), Some("meter"));
    }

    #[test]
    fn unreachable_nodes_are_skipped() {
        let mut graph = diamond();
        graph.add_node(Node::new("lonely", "x")).unwrap();
        assert!(!plan(&graph, &[]).declare_order.contains(&"lonely".to_owned()));
    }

    #[test]
    fn empty_graph() {
        assert_eq!(plan(&Graph::new(), &[]), TraversalPlan::default());
    }
}
