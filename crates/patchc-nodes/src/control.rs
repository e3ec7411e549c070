//! Control nodes: number storage, clock, load trigger, table lookup.

use std::collections::BTreeMap;

use patchc_compiler::{
    ArraysChanged, CodeType, CompileError, Node, NodeContext, NodeEvents, NodeImplementation,
    Portlet,
};

use crate::float_message_handler;

/// Stores a number.
///
/// - message inlet `0`: float stores and outputs, bang outputs
/// - message inlet `1`: float stores silently
/// - message outlet `0`
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatBox;

impl FloatBox {
    /// Node type tag.
    pub const TYPE: &'static str = "float";

    /// Graph node holding `value`.
    pub fn node(id: &str, value: f64) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("value", value)
            .with_inlet(Portlet::message("0"))
            .with_inlet(Portlet::message("1"))
            .with_outlet(Portlet::message("0"))
    }
}

impl NodeImplementation for FloatBox {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        vec!["value".into()]
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let value = ctx.macros.float(ctx.arg_f64("value", 0.0));
        Ok(ctx.macros.var(ctx.names.state.get("value")?, CodeType::Float, &value))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let stored = ctx.names.state.get("value")?;
        let snd = ctx.names.snds.get("0")?;
        let output = format!("{snd}(msg_floats([{stored}]))");
        let hot = format!(
            "{}\nif (msg_isBang({m})) {{\n    {output}\n    return\n}}",
            float_message_handler(ctx, &format!("{stored} = value\n{output}")),
            m = ctx.globs.m,
        );
        let cold = float_message_handler(ctx, &format!("{stored} = value"));
        Ok(BTreeMap::from([("0".to_owned(), hot), ("1".to_owned(), cold)]))
    }
}

/// Bangs at a fixed interval, scheduled on frame events.
///
/// - message inlet `0`: bang or non-zero starts, `0` or `stop` stops
/// - message inlet `1`: interval in milliseconds
/// - message outlet `0`
#[derive(Debug, Clone, Copy, Default)]
pub struct Metro;

impl Metro {
    /// Node type tag.
    pub const TYPE: &'static str = "metro";

    /// Graph node ticking every `interval_ms`.
    pub fn node(id: &str, interval_ms: f64) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("interval", interval_ms)
            .with_inlet(Portlet::message("0"))
            .with_inlet(Portlet::message("1"))
            .with_outlet(Portlet::message("0"))
            .pushing_messages()
    }
}

impl NodeImplementation for Metro {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        ["interval", "skedId", "tick", "stop"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        let macros = ctx.macros;
        let state = &ctx.names.state;
        let (interval, sked_id, tick, stop) = (
            state.get("interval")?,
            state.get("skedId")?,
            state.get("tick")?,
            state.get("stop")?,
        );
        let delay = macros.cast(
            &format!(
                "Math.max(1, Math.round({interval} * {} / 1000))",
                ctx.globs.sample_rate
            ),
            CodeType::Int,
        );
        let tick_body = format!(
            "{}(msg_bang())\n{sked_id} = commons_waitFrame({} + {delay}, {tick})",
            ctx.names.snds.get("0")?,
            ctx.globs.frame,
        );
        Ok([
            macros.var(
                interval,
                CodeType::Float,
                &macros.float(ctx.arg_f64("interval", 1000.0)),
            ),
            macros.var(sked_id, CodeType::Int, "SKED_ID_NULL"),
            macros.func(tick, &[("event", CodeType::String)], CodeType::Void, &tick_body),
            macros.func(
                stop,
                &[],
                CodeType::Void,
                &format!("commons_cancelWaitFrame({sked_id})\n{sked_id} = SKED_ID_NULL"),
            ),
        ]
        .join("\n"))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let state = &ctx.names.state;
        let (interval, tick, stop) = (state.get("interval")?, state.get("tick")?, state.get("stop")?);
        let m = ctx.globs.m;
        let control = format!(
            "if (msg_isBang({m}) || (msg_isMatching({m}, [MSG_FLOAT_TOKEN]) && msg_readFloatToken({m}, 0) !== 0)) {{\n    \
             {stop}()\n    {tick}(\"\")\n    return\n}}\n\
             if ((msg_isMatching({m}, [MSG_FLOAT_TOKEN]) && msg_readFloatToken({m}, 0) === 0)\n    \
             || (msg_isMatching({m}, [MSG_STRING_TOKEN]) && msg_readStringToken({m}, 0) === \"stop\")) {{\n    \
             {stop}()\n    return\n}}"
        );
        let rate = float_message_handler(ctx, &format!("{interval} = value"));
        Ok(BTreeMap::from([("0".to_owned(), control), ("1".to_owned(), rate)]))
    }
}

/// Bangs once the engine is configured.
///
/// - message outlet `0`
#[derive(Debug, Clone, Copy, Default)]
pub struct Loadbang;

impl Loadbang {
    /// Node type tag.
    pub const TYPE: &'static str = "loadbang";

    /// Pushing graph node with one message outlet.
    pub fn node(id: &str) -> Node {
        Node::new(id, Self::TYPE)
            .with_outlet(Portlet::message("0"))
            .pushing_messages()
    }
}

impl NodeImplementation for Loadbang {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        vec!["fire".into()]
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        Ok(ctx.macros.func(
            ctx.names.state.get("fire")?,
            &[("event", CodeType::String)],
            CodeType::Void,
            &format!("{}(msg_bang())", ctx.names.snds.get("0")?),
        ))
    }

    fn events(&self, ctx: &NodeContext<'_>) -> Result<NodeEvents, CompileError> {
        Ok(NodeEvents {
            configure: Some(format!(
                "commons_waitEngineConfigure({})",
                ctx.names.state.get("fire")?
            )),
            arrays_changed: None,
        })
    }
}

/// Reads a value from a named array.
///
/// - message inlet `0`: index, rounded and clamped to the array
/// - message outlet `0`
///
/// Argument `array` names the array; reads give `0` until it is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tabread;

impl Tabread {
    /// Node type tag.
    pub const TYPE: &'static str = "tabread";

    /// Graph node reading `array`.
    pub fn node(id: &str, array: &str) -> Node {
        Node::new(id, Self::TYPE)
            .with_arg("array", array)
            .with_inlet(Portlet::message("0"))
            .with_outlet(Portlet::message("0"))
    }
}

impl NodeImplementation for Tabread {
    fn state_variables(&self, _node: &Node) -> Vec<String> {
        vec!["array".into()]
    }

    fn declare(&self, ctx: &NodeContext<'_>) -> Result<String, CompileError> {
        // Fails early when the argument is missing.
        ctx.arg_str("array")?;
        Ok(ctx.macros.var(
            ctx.names.state.get("array")?,
            CodeType::FloatArray,
            "new FloatArray(0)",
        ))
    }

    fn messages(&self, ctx: &NodeContext<'_>) -> Result<BTreeMap<String, String>, CompileError> {
        let array = ctx.names.state.get("array")?;
        let snd = ctx.names.snds.get("0")?;
        let index = ctx.macros.constant(
            "index",
            CodeType::Int,
            &ctx.macros.cast(
                &format!("Math.min(Math.max(0, Math.round(value)), {array}.length - 1)"),
                CodeType::Int,
            ),
        );
        let body = format!(
            "if ({array}.length === 0) {{\n    {snd}(msg_floats([0]))\n}} else {{\n    \
             {index}\n    {snd}(msg_floats([{array}[index]]))\n}}"
        );
        Ok(BTreeMap::from([("0".to_owned(), float_message_handler(ctx, &body))]))
    }

    fn events(&self, ctx: &NodeContext<'_>) -> Result<NodeEvents, CompileError> {
        Ok(NodeEvents {
            configure: None,
            arrays_changed: Some(ArraysChanged {
                array_name: ctx.arg_str("array")?.to_owned(),
                code: format!("{} = commons_getArray(event)", ctx.names.state.get("array")?),
            }),
        })
    }
}
