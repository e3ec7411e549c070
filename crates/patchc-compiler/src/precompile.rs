//! Portlet precompilation.
//!
//! Connected portlets that would only copy data into each other are merged by
//! rebinding names in the [`VariableNames`] plan:
//!
//! - a signal inlet fed by an outlet reads the outlet's storage directly;
//! - a message outlet with exactly one sink and no listener calls the sink's
//!   receiver directly;
//! - a message outlet with no sink calls its listener, or the null receiver;
//! - a message inlet with no source and no inlet caller gets no receiver.
//!
//! Portlets handled this way are recorded in [`PrecompiledPortlets`] so the
//! emitter skips their declarations.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::graph::{Graph, PortletAddress, PortletKind};
use crate::variable_names::VariableNames;

/// Portlets that need no declaration of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecompiledPortlets {
    /// Node id to precompiled inlet ids, in declaration order.
    pub precompiled_inlets: BTreeMap<String, Vec<String>>,
    /// Node id to precompiled outlet ids, in declaration order.
    pub precompiled_outlets: BTreeMap<String, Vec<String>>,
}

impl PrecompiledPortlets {
    /// True if the inlet needs no storage or receiver.
    pub fn is_inlet_precompiled(&self, node_id: &str, inlet_id: &str) -> bool {
        contains(&self.precompiled_inlets, node_id, inlet_id)
    }

    /// True if the outlet needs no sender.
    pub fn is_outlet_precompiled(&self, node_id: &str, outlet_id: &str) -> bool {
        contains(&self.precompiled_outlets, node_id, outlet_id)
    }

    /// Total number of precompiled portlets.
    pub fn count(&self) -> usize {
        self.precompiled_inlets.values().map(Vec::len).sum::<usize>()
            + self.precompiled_outlets.values().map(Vec::len).sum::<usize>()
    }

    fn mark_inlet(&mut self, node_id: &str, inlet_id: &str) {
        mark(&mut self.precompiled_inlets, node_id, inlet_id);
    }

    fn mark_outlet(&mut self, node_id: &str, outlet_id: &str) {
        mark(&mut self.precompiled_outlets, node_id, outlet_id);
    }
}

fn contains(index: &BTreeMap<String, Vec<String>>, node_id: &str, portlet_id: &str) -> bool {
    index
        .get(node_id)
        .is_some_and(|ids| ids.iter().any(|id| id == portlet_id))
}

fn mark(index: &mut BTreeMap<String, Vec<String>>, node_id: &str, portlet_id: &str) {
    let ids = index.entry(node_id.to_owned()).or_default();
    if !ids.iter().any(|id| id == portlet_id) {
        ids.push(portlet_id.to_owned());
    }
}

/// Rebinds names of connected portlets for every node of `order`.
pub fn precompile(
    graph: &Graph,
    order: &[String],
    names: &mut VariableNames,
    inlet_caller_specs: &[PortletAddress],
    outlet_listener_specs: &[PortletAddress],
) -> Result<PrecompiledPortlets, CompileError> {
    let mut precompiled = PrecompiledPortlets::default();

    for node_id in order {
        let node = graph.get(node_id)?;

        for outlet in &node.outlets {
            let sinks = node.sinks_of(&outlet.id);
            match outlet.kind {
                PortletKind::Signal => {
                    let storage = names.node(node_id)?.outs.get(&outlet.id)?.to_owned();
                    for sink in sinks {
                        names
                            .node_mut(&sink.node_id)?
                            .ins
                            .insert(sink.portlet_id.as_str(), storage.as_str());
                        precompiled.mark_inlet(&sink.node_id, &sink.portlet_id);
                    }
                }
                PortletKind::Message => {
                    let address = PortletAddress::new(node_id.as_str(), outlet.id.as_str());
                    let has_listener = outlet_listener_specs.contains(&address);
                    let target = match (sinks, has_listener) {
                        ([sink], false) => Some(
                            names
                                .node(&sink.node_id)?
                                .rcvs
                                .get(&sink.portlet_id)?
                                .to_owned(),
                        ),
                        ([], true) => Some(names.outlet_listener(&address)?.to_owned()),
                        ([], false) => Some(names.globs.null_message_receiver.to_owned()),
                        _ => None,
                    };
                    if let Some(target) = target {
                        names
                            .node_mut(node_id)?
                            .snds
                            .insert(outlet.id.as_str(), target);
                        precompiled.mark_outlet(node_id, &outlet.id);
                    }
                }
            }
        }
    }

    for node_id in order {
        let node = graph.get(node_id)?;
        for inlet in node.inlets_of_kind(PortletKind::Message) {
            let address = PortletAddress::new(node_id.as_str(), inlet.id.as_str());
            if graph.sources(node_id, &inlet.id).is_empty()
                && !inlet_caller_specs.contains(&address)
            {
                precompiled.mark_inlet(node_id, &inlet.id);
            }
        }
    }

    tracing::debug!(count = precompiled.count(), "portlets precompiled");
    Ok(precompiled)
}
