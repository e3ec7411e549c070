//! Signal nodes: oscillator, gain, audio input and output, constant signal.

use std::collections::BTreeMap;

use patchc_compiler::{
    CodeType, CompileError, Macros, Node, NodeContext, NodeEvents, NodeImplementation, Portlet,
    PortletKind,
};

use crate::float_message_handler;

/// Cosine oscillator.
///
/// - message inlet `0`: frequency in Hz
/// - message inlet `1`: phase reset, in cycles
/// - signal outlet `0`
///
/// Argument `frequency` sets the initial frequency.
#[derive(Debug, Clone, Copy, Default)]
pub struct Osc;

impl Osc {
    /// Node type tag.
    pub const TYPE: &'static str = "osc~";

    /// Graph node with the oscillator's portlets.
    pub fn node(id: &str, frequency: f64) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("frequency", frequency)
            .with_inlet(Portlet::message("0"))
            .with_inlet(Portlet::message("1"))
            .with_outlet(Portlet::signal("0"))
    }
}

impl NodeImplementation for Osc {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        vec!["phase".into(), "frequency".into(), "step".into()]
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let state = &ctx.names.state;
        let frequency = ctx.macros.float(ctx.arg_f64("frequency", 0.0));
        Ok([
            ctx.macros.var(state.get("phase")?, CodeType::Float, "0"),
            ctx.macros.var(state.get("frequency")?, CodeType::Float, &frequency),
            ctx.macros.var(state.get("step")?, CodeType::Float, "0"),
        ]
        .join("\n"))
    }

    fn loop_code(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let state = &ctx.names.state;
        let (phase, frequency, step) = (state.get("phase")?, state.get("frequency")?, state.get("step")?);
        Ok(format!(
            "{} = {}\n{phase} += {step} * {frequency}",
            ctx.names.outs.get("0")?,
            ctx.macros.cast(&format!("Math.cos({phase})"), CodeType::Float),
        ))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let state = &ctx.names.state;
        let mut messages = BTreeMap::new();
        messages.insert(
            "0".to_owned(),
            float_message_handler(ctx, &format!("{} = value", state.get("frequency")?)),
        );
        messages.insert(
            "1".to_owned(),
            float_message_handler(ctx, &format!("{} = TWO_PI * value", state.get("phase")?)),
        );
        Ok(messages)
    }

    fn events(&self, ctx: &NodeContext<'_>) -> Result<NodeEvents, CompileError> {
        Ok(NodeEvents {
            configure: Some(format!(
                "{} = TWO_PI / {}",
                ctx.names.state.get("step")?,
                ctx.globs.sample_rate
            )),
            arrays_changed: None,
        })
    }

    fn shared_code(&self, macros: &Macros) -> Vec<String> {
        vec![two_pi(macros)]
    }
}

fn two_pi(macros: &Macros) -> String {
    macros.constant("TWO_PI", CodeType::Float, &macros.cast("2 * Math.PI", CodeType::Float))
}

/// Multiplies a signal by a number.
///
/// - signal inlet `0`
/// - message inlet `1`: right operand
/// - signal outlet `0`
///
/// Argument `value` sets the initial right operand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl Mul {
    /// Node type tag.
    pub const TYPE: &'static str = "*~";

    /// Graph node multiplying by `value`.
    pub fn node(id: &str, value: f64) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("value", value)
            .with_inlet(Portlet::signal("0"))
            .with_inlet(Portlet::message("1"))
            .with_outlet(Portlet::signal("0"))
    }
}

impl NodeImplementation for Mul {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        vec!["right".into()]
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let value = ctx.macros.float(ctx.arg_f64("value", 0.0));
        Ok(ctx.macros.var(ctx.names.state.get("right")?, CodeType::Float, &value))
    }

    fn loop_code(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        Ok(format!(
            "{} = {} * {}",
            ctx.names.outs.get("0")?,
            ctx.names.ins.get("0")?,
            ctx.names.state.get("right")?
        ))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let assign = format!("{} = value", ctx.names.state.get("right")?);
        Ok(BTreeMap::from([("1".to_owned(), float_message_handler(ctx, &assign))]))
    }
}

/// Constant signal set by messages.
///
/// - message inlet `0`: new value
/// - signal outlet `0`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sig;

impl Sig {
    /// Node type tag.
    pub const TYPE: &'static str = "sig~";

    /// Graph node starting at `value`.
    pub fn node(id: &str, value: f64) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("value", value)
            .with_inlet(Portlet::message("0"))
            .with_outlet(Portlet::signal("0"))
    }
}

impl NodeImplementation for Sig {
    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        // The outlet storage is the state: it is declared before this runs.
        let value = ctx.macros.float(ctx.arg_f64("value", 0.0));
        Ok(format!("{} = {value}", ctx.names.outs.get("0")?))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let assign = format!("{} = value", ctx.names.outs.get("0")?);
        Ok(BTreeMap::from([("0".to_owned(), float_message_handler(ctx, &assign))]))
    }
}

/// Audio output: signal inlet `i` goes to output channel `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dac;

impl Dac {
    /// Node type tag.
    pub const TYPE: &'static str = "dac~";

    /// Pulling graph node with `channels` signal inlets.
    pub fn node(id: &str, channels: usize) -> Node {
        (0..channels)
            .fold(Node::new(id, Self::TYPE), |node, i| {
                node.with_inlet(Portlet::signal(i.to_string()))
            })
            .pulling_signal()
    }
}

impl NodeImplementation for Dac {
    fn loop_code(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let mut lines = Vec::new();
        for (channel, inlet) in ctx.node.inlets_of_kind(PortletKind::Signal).enumerate() {
            lines.push(format!(
                "{}[{channel}][{}] = {}",
                ctx.globs.output,
                ctx.globs.iter_frame,
                ctx.names.ins.get(&inlet.id)?
            ));
        }
        Ok(lines.join("\n"))
    }
}

/// Audio input: input channel `i` goes to signal outlet `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adc;

impl Adc {
    /// Node type tag.
    pub const TYPE: &'static str = "adc~";

    /// Graph node with `channels` signal outlets.
    pub fn node(id: &str, channels: usize) -> Node {
        (0..channels).fold(Node::new(id, Self::TYPE), |node, i| {
            node.with_outlet(Portlet::signal(i.to_string()))
        })
    }
}

impl NodeImplementation for Adc {
    fn loop_code(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let mut lines = Vec::new();
        for (channel, outlet) in ctx.node.outlets_of_kind(PortletKind::Signal).enumerate() {
            lines.push(format!(
                "{} = {}[{channel}][{}]",
                ctx.names.outs.get(&outlet.id)?,
                ctx.globs.input,
                ctx.globs.iter_frame
            ));
        }
        Ok(lines.join("\n"))
    }
}
