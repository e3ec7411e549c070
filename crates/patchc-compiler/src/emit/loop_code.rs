//! `configure`, `loop` and array change subscriptions.

use super::io::EMBED_ARRAYS;
use super::{EmitContext, join_lines};
use crate::error::CompileError;
use crate::macros::{CodeType, indent};
use crate::variable_names::node_prefix;

/// `configure(sampleRate, blockSize)`: sets the globals, installs embedded
/// arrays, runs node configure events, then emits the engine configure event.
///
/// Events run over the declare order, which starts with the loop order: looped
/// nodes configure in loop order, then nodes that only receive messages, whose
/// receivers read the same state.
pub fn configure(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let globs = &ctx.names.globs;
    let mut body = vec![
        format!("{} = sampleRate", globs.sample_rate),
        format!("{} = blockSize", globs.block_size),
        format!("{} = 0", globs.iter_frame),
        format!("{} = 0", globs.frame),
        format!("{EMBED_ARRAYS}()"),
    ];
    for node_id in &ctx.plan.declare_order {
        let (node_ctx, implementation) = ctx.node(node_id)?;
        if let Some(code) = implementation.events(&node_ctx)?.configure {
            body.push(code);
        }
    }
    body.push("_commons_emitEngineConfigure()".to_owned());

    let function = ctx.macros.func(
        "configure",
        &[("sampleRate", CodeType::Float), ("blockSize", CodeType::Int)],
        CodeType::Void,
        &join_lines(body),
    );
    Ok(ctx.macros.export(&function))
}

/// `loop(INPUT, OUTPUT)`: one iteration per frame of the block.
pub fn loop_function(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let globs = &ctx.names.globs;
    let mut frame = vec![format!("_commons_emitFrame({})", globs.frame)];
    for node_id in &ctx.plan.loop_order {
        let (node_ctx, implementation) = ctx.node(node_id)?;
        frame.push(implementation.loop_code(&node_ctx)?);
    }
    frame.push(format!("{}++", globs.frame));

    let f = globs.iter_frame;
    let body = format!(
        "for ({f} = 0; {f} < {}; {f}++) {{\n{}\n}}",
        globs.block_size,
        indent(&join_lines(frame))
    );
    let function = ctx.macros.func(
        "loop",
        &[(globs.input, CodeType::Channels), (globs.output, CodeType::Channels)],
        CodeType::Void,
        &body,
    );
    Ok(ctx.macros.export(&function))
}

/// A named handler per node reacting to array changes, subscribed at load.
/// Same node order as [`configure`].
pub fn arrays_changed(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let mut handlers = Vec::new();
    for node_id in &ctx.plan.declare_order {
        let (node_ctx, implementation) = ctx.node(node_id)?;
        let Some(changed) = implementation.events(&node_ctx)?.arrays_changed else {
            continue;
        };
        let handler = format!(
            "{}_ARRAYS_CHANGED",
            node_prefix(&node_ctx.node.node_type, node_id)?
        );
        handlers.push(format!(
            "{}\ncommons_subscribeArrayChanges({}, {handler})",
            ctx.macros.func(
                &handler,
                &[("event", CodeType::String)],
                CodeType::Void,
                &changed.code,
            ),
            ctx.macros.string(&changed.array_name),
        ));
    }
    Ok(handlers.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::macros::Target;
    use crate::settings::CompilationSettings;

    #[test]
    fn configure_runs_events_in_loop_order() {
        let fixture = fixture();
        assert_eq!(
            configure(&fixture.ctx()).unwrap(),
            "function configure(sampleRate, blockSize) {\n    SAMPLE_RATE = sampleRate\n    \
             BLOCK_SIZE = blockSize\n    F = 0\n    FRAME = 0\n    _embedArrays()\n    \
             relay_a_STATE_count = 0\n    relay_b_STATE_count = 0\n    \
             relay_c_STATE_count = 0\n    _commons_emitEngineConfigure()\n}"
        );
    }

    /// p pulls signal and sends to q, which only receives.
    fn receiver_only() -> Fixture {
        let mut graph = crate::graph::Graph::new();
        graph.add_node(relay("p").pulling_signal()).unwrap();
        graph.add_node(relay("q").with_arg("array", "table")).unwrap();
        graph.connect("p", "1", "q", "1").unwrap();
        Fixture::new(graph, CompilationSettings::default())
    }

    #[test]
    fn receiver_only_nodes_get_events_but_no_loop() {
        let fixture = receiver_only();
        assert_eq!(fixture.plan.loop_order, vec!["p"]);
        assert_eq!(fixture.plan.declare_order, vec!["p", "q"]);

        let code = configure(&fixture.ctx()).unwrap();
        let p = code.find("relay_p_STATE_count = 0").unwrap();
        let q = code.find("relay_q_STATE_count = 0").unwrap();
        assert!(p < q);
        assert!(arrays_changed(&fixture.ctx()).unwrap().contains("function relay_q_ARRAYS_CHANGED(event)"));
        assert!(!loop_function(&fixture.ctx()).unwrap().contains("relay_q_OUTS_0"));
    }

    #[test]
    fn loop_wraps_fragments_in_frame_events() {
        let fixture = fixture();
        let code = loop_function(&fixture.ctx()).unwrap();
        assert!(code.starts_with("function loop(INPUT, OUTPUT) {\n    for (F = 0; F < BLOCK_SIZE; F++) {"));
        let emit = code.find("_commons_emitFrame(FRAME)").unwrap();
        let a = code.find("relay_a_OUTS_0 = relay_a_INS_0").unwrap();
        let b = code.find("relay_b_OUTS_0 = relay_a_OUTS_0").unwrap();
        let tick = code.find("FRAME++").unwrap();
        assert!(emit < a && a < b && b < tick);
    }

    #[test]
    fn assemblyscript_entry_points_are_exported() {
        let settings = CompilationSettings::default().with_target(Target::AssemblyScript);
        let fixture = Fixture::new(graph(), settings);
        assert!(configure(&fixture.ctx()).unwrap().starts_with(
            "export function configure(sampleRate: Float, blockSize: i32): void {"
        ));
        assert!(loop_function(&fixture.ctx()).unwrap().starts_with(
            "export function loop(INPUT: Array<FloatArray>, OUTPUT: Array<FloatArray>): void {"
        ));
    }

    #[test]
    fn array_handlers_are_subscribed() {
        let fixture = fixture();
        assert_eq!(
            arrays_changed(&fixture.ctx()).unwrap(),
            "function relay_c_ARRAYS_CHANGED(event) {\n    \
             relay_c_STATE_count = commons_getArray(event).length\n}\n\
             commons_subscribeArrayChanges(\"table\", relay_c_ARRAYS_CHANGED)"
        );
    }
}
