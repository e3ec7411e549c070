//! Globals, node declarations and senders.

use super::{EmitContext, join_lines};
use crate::error::CompileError;
use crate::graph::{PortletAddress, PortletKind};
use crate::macros::CodeType;

/// Frame counters, audio globals and the null receiver.
pub fn globals(ctx: &EmitContext<'_>) -> String {
    let macros = ctx.macros;
    let globs = &ctx.names.globs;
    join_lines([
        macros.var(globs.iter_frame, CodeType::Int, "0"),
        macros.var(globs.frame, CodeType::Int, "0"),
        macros.var(globs.block_size, CodeType::Int, "0"),
        macros.var(globs.sample_rate, CodeType::Float, "0"),
        macros.func(
            globs.null_message_receiver,
            &[(globs.m, CodeType::Message)],
            CodeType::Void,
            "",
        ),
    ])
}

/// Storage, receivers and `declare()` output of every node in declare order.
pub fn declarations(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let macros = ctx.macros;
    let m = ctx.names.globs.m;
    let mut blocks = Vec::with_capacity(ctx.plan.declare_order.len());

    for node_id in &ctx.plan.declare_order {
        let (node_ctx, implementation) = ctx.node(node_id)?;
        let node = node_ctx.node;
        let names = node_ctx.names;
        let mut lines = vec![format!("// {} {}", node.node_type, node.id)];

        for inlet in node.inlets_of_kind(PortletKind::Signal) {
            if !ctx.precompiled.is_inlet_precompiled(node_id, &inlet.id) {
                lines.push(macros.var(names.ins.get(&inlet.id)?, CodeType::Float, "0"));
            }
        }
        for outlet in node.outlets_of_kind(PortletKind::Signal) {
            if !ctx.precompiled.is_outlet_precompiled(node_id, &outlet.id) {
                lines.push(macros.var(names.outs.get(&outlet.id)?, CodeType::Float, "0"));
            }
        }

        let mut messages = implementation.messages(&node_ctx)?;
        for inlet in node.inlets_of_kind(PortletKind::Message) {
            if ctx.precompiled.is_inlet_precompiled(node_id, &inlet.id) {
                continue;
            }
            let fallback = format!(
                "throw new Error({} + msg_display({m}))",
                macros.string(&format!(
                    "[{}], id \"{}\", inlet \"{}\", unsupported message : ",
                    node.node_type, node.id, inlet.id
                ))
            );
            let body = join_lines([messages.remove(&inlet.id).unwrap_or_default(), fallback]);
            lines.push(macros.func(
                names.rcvs.get(&inlet.id)?,
                &[(m, CodeType::Message)],
                CodeType::Void,
                &body,
            ));
        }

        lines.push(implementation.declare(&node_ctx)?);
        tracing::trace!(node = %node_id, "declared");
        blocks.push(join_lines(lines));
    }
    Ok(blocks.join("\n\n"))
}

/// One sender per message outlet that still fans out after precompilation:
/// the outlet listener first, then every sink in sink order.
pub fn senders(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let macros = ctx.macros;
    let m = ctx.names.globs.m;
    let mut senders = Vec::new();

    for node_id in &ctx.plan.declare_order {
        let node = ctx.graph.get(node_id)?;
        let names = ctx.names.node(node_id)?;
        for outlet in node.outlets_of_kind(PortletKind::Message) {
            if ctx.precompiled.is_outlet_precompiled(node_id, &outlet.id) {
                continue;
            }
            let mut calls = Vec::new();
            let address = PortletAddress::new(node_id.as_str(), outlet.id.as_str());
            if ctx.names.has_outlet_listener(&address) {
                calls.push(format!("{}({m})", ctx.names.outlet_listener(&address)?));
            }
            for sink in node.sinks_of(&outlet.id) {
                let receiver = ctx.names.node(&sink.node_id)?.rcvs.get(&sink.portlet_id)?;
                calls.push(format!("{receiver}({m})"));
            }
            senders.push(macros.func(
                names.snds.get(&outlet.id)?,
                &[(m, CodeType::Message)],
                CodeType::Void,
                &calls.join("\n"),
            ));
        }
    }
    Ok(senders.join("\n\n"))
}
