//! Code emitter.
//!
//! Assembles the program text from the precompiled binding plan. Sections
//! come out in a fixed order:
//!
//! 1. runtime support bundle and shared node code
//! 2. globals
//! 3. node declarations (storage, receivers, `declare()` fragments)
//! 4. senders
//! 5. inlet callers
//! 6. outlet listeners
//! 7. embedded arrays
//! 8. `configure`
//! 9. `loop`
//! 10. array change subscriptions
//! 11. metadata block
//!
//! Every section is a function of an [`EmitContext`], so each one can be
//! checked in isolation.

mod declare;
mod io;
mod loop_code;
mod support;

use crate::error::CompileError;
use crate::graph::{Graph, Node};
use crate::macros::Macros;
use crate::metadata::EngineMetadata;
use crate::node_implementation::{NodeContext, NodeImplementation, NodeImplementations};
use crate::precompile::PrecompiledPortlets;
use crate::settings::CompilationSettings;
use crate::traversal::TraversalPlan;
use crate::variable_names::VariableNames;

pub use support::support_bundle;

/// Everything the sections read.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Source graph.
    pub graph: &'a Graph,
    /// Declare and loop orders.
    pub plan: &'a TraversalPlan,
    /// Precompiled binding plan.
    pub names: &'a VariableNames,
    /// Portlets without declarations of their own.
    pub precompiled: &'a PrecompiledPortlets,
    /// Node code generators.
    pub registry: &'a NodeImplementations,
    /// Target helpers.
    pub macros: &'a Macros,
    /// Settings the program is compiled with.
    pub settings: &'a CompilationSettings,
}

impl<'a> EmitContext<'a> {
    /// Node, generator context and implementation for `node_id`.
    pub(crate) fn node(
        &self,
        node_id: &str,
    ) -> Result<(NodeContext<'a>, &'a dyn NodeImplementation), CompileError> {
        let node: &'a Node = self.graph.get(node_id)?;
        let implementation = self.registry.get(&node.node_type)?;
        let ctx = NodeContext {
            node,
            names: self.names.node(node_id)?,
            globs: &self.names.globs,
            macros: self.macros,
        };
        Ok((ctx, implementation))
    }
}

/// Emits the whole program, metadata block included.
pub fn emit(ctx: &EmitContext<'_>, metadata: &EngineMetadata) -> Result<String, CompileError> {
    let sections = [
        support::support_bundle(ctx)?,
        declare::globals(ctx),
        declare::declarations(ctx)?,
        declare::senders(ctx)?,
        io::inlet_callers(ctx)?,
        io::outlet_listeners(ctx),
        io::embedded_arrays(ctx),
        loop_code::configure(ctx)?,
        loop_code::loop_function(ctx)?,
        loop_code::arrays_changed(ctx)?,
        metadata.to_comment_block()?,
    ];

    let mut code = String::new();
    for section in sections.iter().filter(|s| !s.trim().is_empty()) {
        code.push_str(section.trim_end());
        code.push_str("\n\n");
    }
    Ok(code)
}

/// Joins non-empty fragments with newlines.
pub(crate) fn join_lines<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .filter_map(|f| {
            let f = f.as_ref().trim_end();
            (!f.trim().is_empty()).then(|| f.to_owned())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A small generator library and graph shared by the section tests.

    use std::collections::BTreeMap;

    use super::*;
    use crate::graph::{Portlet, PortletAddress};
    use crate::node_implementation::{ArraysChanged, NodeEvents};
    use crate::precompile::precompile;
    use crate::traversal::plan;
    use crate::variable_names::generate;

    /// Copies its signal inlet to its signal outlet, counts messages.
    pub struct Relay;

    impl NodeImplementation for Relay {
        fn state_variables(&self, _node: &Node) -> Vec<String> {
            vec!["count".into()]
        }

        fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
            let count = ctx.names.state.get("count")?;
            Ok(ctx.macros.var(count, crate::macros::CodeType::Float, "0"))
        }

        fn loop_code(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
            match (ctx.names.outs.get("0"), ctx.names.ins.get("0")) {
                (Ok(out), Ok(input)) => Ok(format!("{out} = {input}")),
                _ => Ok(String::new()),
            }
        }

        fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
            let count = ctx.names.state.get("count")?;
            let mut messages = BTreeMap::new();
            if let Ok(snd) = ctx.names.snds.get("1") {
                messages.insert(
                    "1".to_owned(),
                    format!("if (msg_isBang(m)) {{\n    {count} += 1\n    {snd}(m)\n    return\n}}"),
                );
            }
            Ok(messages)
        }

        fn events(&self, ctx: &NodeContext<'_>) -> Result<NodeEvents, CompileError> {
            let count = ctx.names.state.get("count")?;
            Ok(NodeEvents {
                configure: Some(format!("{count} = 0")),
                arrays_changed: ctx.node.arg_str("array").map(|name| ArraysChanged {
                    array_name: name.to_owned(),
                    code: format!("{count} = commons_getArray(event).length"),
                }),
            })
        }

        fn shared_code(&self, _macros: &Macros) -> Vec<String> {
            vec!["// relay helpers".into()]
        }
    }

    pub fn registry() -> NodeImplementations {
        let mut registry = NodeImplementations::new();
        registry.register("relay", Relay);
        registry
    }

    pub fn relay(id: &str) -> Node {
        Node::new(id, "relay")
            .with_inlet(Portlet::signal("0"))
            .with_inlet(Portlet::message("1"))
            .with_outlet(Portlet::signal("0"))
            .with_outlet(Portlet::message("1"))
    }

    /// a -> b (signal and message), b pulls, a pushes, c hangs off a's
    /// message outlet too.
    pub fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(relay("a").pushing_messages()).unwrap();
        graph.add_node(relay("b").pulling_signal()).unwrap();
        graph
            .add_node(relay("c").with_arg("array", "table"))
            .unwrap();
        graph.connect("a", "0", "b", "0").unwrap();
        graph.connect("a", "1", "b", "1").unwrap();
        graph.connect("a", "1", "c", "1").unwrap();
        graph
    }

    /// Owned pieces an [`EmitContext`] borrows from.
    pub struct Fixture {
        pub graph: Graph,
        pub plan: TraversalPlan,
        pub names: VariableNames,
        pub precompiled: PrecompiledPortlets,
        pub registry: NodeImplementations,
        pub macros: Macros,
        pub settings: CompilationSettings,
    }

    impl Fixture {
        pub fn new(graph: Graph, settings: CompilationSettings) -> Self {
            let registry = registry();
            let plan = plan(&graph, &settings.inlet_caller_specs);
            let mut names = generate(
                &graph,
                &registry,
                &settings.inlet_caller_specs,
                &settings.outlet_listener_specs,
            )
            .unwrap();
            let precompiled = precompile(
                &graph,
                &plan.declare_order,
                &mut names,
                &settings.inlet_caller_specs,
                &settings.outlet_listener_specs,
            )
            .unwrap();
            let macros = Macros::new(settings.target, settings.audio.bit_depth);
            Self {
                graph,
                plan,
                names,
                precompiled,
                registry,
                macros,
                settings,
            }
        }

        pub fn ctx(&self) -> EmitContext<'_> {
            EmitContext {
                graph: &self.graph,
                plan: &self.plan,
                names: &self.names,
                precompiled: &self.precompiled,
                registry: &self.registry,
                macros: &self.macros,
                settings: &self.settings,
            }
        }
    }

    pub fn fixture() -> Fixture {
        Fixture::new(graph(), CompilationSettings::default())
    }

    pub fn address(node_id: &str, portlet_id: &str) -> PortletAddress {
        PortletAddress::new(node_id, portlet_id)
    }
}
