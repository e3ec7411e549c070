//! Compilation pipeline.
//!
//! `Graph` → traversal plan → variable names → portlet precompilation →
//! emitted code plus metadata.

use crate::emit::{EmitContext, emit};
use crate::error::{CompileError, GraphError};
use crate::graph::{Graph, PortletAddress, PortletKind};
use crate::macros::Macros;
use crate::metadata::{CompilationMetadata, EngineMetadata, VariableNamesIndex};
use crate::node_implementation::NodeImplementations;
use crate::precompile::precompile;
use crate::settings::CompilationSettings;
use crate::traversal::plan;
use crate::variable_names::generate;

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    /// Program text, metadata block included.
    pub code: String,
    /// The metadata embedded in `code`.
    pub metadata: EngineMetadata,
}

/// Compiles `graph` with the node types of `registry`.
///
/// # Errors
///
/// Fails on invalid settings or graph, on host hooks that name a missing
/// node or a portlet of the wrong kind, on node types missing from
/// `registry`, and on names that are not `[a-zA-Z0-9_]+`.
pub fn compile(
    graph: &Graph,
    registry: &NodeImplementations,
    settings: &CompilationSettings,
) -> Result<CompiledProgram, CompileError> {
    settings.validate()?;
    graph.validate()?;
    check_hooks(graph, settings)?;

    let plan = plan(graph, &settings.inlet_caller_specs);
    for node_id in &plan.declare_order {
        registry.get(&graph.get(node_id)?.node_type)?;
    }

    let mut names = generate(
        graph,
        registry,
        &settings.inlet_caller_specs,
        &settings.outlet_listener_specs,
    )?;
    let precompiled = precompile(
        graph,
        &plan.declare_order,
        &mut names,
        &settings.inlet_caller_specs,
        &settings.outlet_listener_specs,
    )?;

    let metadata = EngineMetadata {
        audio_settings: settings.audio,
        compilation: CompilationMetadata {
            inlet_caller_specs: settings.inlet_caller_specs.clone(),
            outlet_listener_specs: settings.outlet_listener_specs.clone(),
            variable_names_index: VariableNamesIndex {
                inlet_callers: names.inlet_callers().clone(),
                outlet_listeners: names.outlet_listeners().clone(),
            },
        },
    };

    let macros = Macros::new(settings.target, settings.audio.bit_depth);
    let ctx = EmitContext {
        graph,
        plan: &plan,
        names: &names,
        precompiled: &precompiled,
        registry,
        macros: &macros,
        settings,
    };
    let code = emit(&ctx, &metadata)?;

    tracing::debug!(
        target_lang = ?settings.target,
        nodes = plan.declare_order.len(),
        bytes = code.len(),
        "compiled"
    );
    Ok(CompiledProgram { code, metadata })
}

/// Inlet callers and outlet listeners must point at message portlets.
fn check_hooks(graph: &Graph, settings: &CompilationSettings) -> Result<(), GraphError> {
    let check = |spec: &PortletAddress, inlet: bool| -> Result<(), GraphError> {
        let node = graph.get(&spec.node_id)?;
        let portlet = if inlet {
            node.inlet(&spec.portlet_id)
        } else {
            node.outlet(&spec.portlet_id)
        };
        match portlet {
            Some(p) if p.kind == PortletKind::Message => Ok(()),
            _ if inlet => Err(GraphError::inlet_not_found(&*spec.node_id, &*spec.portlet_id)),
            _ => Err(GraphError::outlet_not_found(&*spec.node_id, &*spec.portlet_id)),
        }
    };
    for spec in &settings.inlet_caller_specs {
        check(spec, true)?;
    }
    for spec in &settings.outlet_listener_specs {
        check(spec, false)?;
    }
    Ok(())
}
