//! Host-facing sections: inlet callers, outlet listeners, embedded arrays.

use super::{EmitContext, join_lines};
use crate::error::CompileError;
use crate::macros::CodeType;

/// Name of the function that installs the embedded arrays.
pub const EMBED_ARRAYS: &str = "_embedArrays";

/// Exported functions forwarding host messages to inlet receivers.
pub fn inlet_callers(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let m = ctx.names.globs.m;
    let mut callers = Vec::new();
    for spec in &ctx.settings.inlet_caller_specs {
        let receiver = ctx.names.node(&spec.node_id)?.rcvs.get(&spec.portlet_id)?;
        let caller = ctx.macros.func(
            ctx.names.inlet_caller(spec)?,
            &[(m, CodeType::Message)],
            CodeType::Void,
            &format!("{receiver}({m})"),
        );
        callers.push(ctx.macros.export(&caller));
    }
    Ok(callers.join("\n\n"))
}

/// Callback slots the host fills to receive outlet messages.
pub fn outlet_listeners(ctx: &EmitContext<'_>) -> String {
    let m = ctx.names.globs.m;
    join_lines(
        ctx.names
            .outlet_listeners()
            .values()
            .flat_map(|by_outlet| by_outlet.values())
            .map(|name| ctx.macros.message_callback_slot(name, m)),
    )
}

/// `_embedArrays()`, called first thing in `configure`.
pub fn embedded_arrays(ctx: &EmitContext<'_>) -> String {
    let macros = ctx.macros;
    let mut body = Vec::new();
    for (i, (name, data)) in ctx.settings.arrays.iter().enumerate() {
        let local = format!("array_{i}");
        let values: Vec<String> = data.iter().map(|&v| macros.float(v)).collect();
        body.push(macros.constant(
            &local,
            CodeType::FloatArray,
            &format!("new FloatArray({})", data.len()),
        ));
        if !values.is_empty() {
            body.push(format!("{local}.set([{}])", values.join(", ")));
        }
        body.push(format!("commons_setArray({}, {local})", macros.string(name)));
    }
    macros.func(EMBED_ARRAYS, &[], CodeType::Void, &body.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::macros::Target;
    use crate::settings::CompilationSettings;

    #[test]
    fn inlet_caller_forwards_to_receiver() {
        let settings = CompilationSettings::default().with_inlet_caller("c", "1");
        let fixture = Fixture::new(graph(), settings);
        assert_eq!(
            inlet_callers(&fixture.ctx()).unwrap(),
            "function inletCaller_c_1(m) {\n    relay_c_RCVS_1(m)\n}"
        );
    }

    #[test]
    fn assemblyscript_inlet_caller_is_exported() {
        let settings = CompilationSettings::default()
            .with_target(Target::AssemblyScript)
            .with_inlet_caller("a", "1");
        let fixture = Fixture::new(graph(), settings);
        let code = inlet_callers(&fixture.ctx()).unwrap();
        assert!(code.starts_with("export function inletCaller_a_1(m: Message): void {"));
    }

    #[test]
    fn inlet_caller_on_signal_inlet_fails() {
        let settings = CompilationSettings::default().with_inlet_caller("c", "0");
        let fixture = Fixture::new(graph(), settings);
        assert!(matches!(
            inlet_callers(&fixture.ctx()),
            Err(CompileError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn listener_slots() {
        let settings = CompilationSettings::default().with_outlet_listener("b", "1");
        let fixture = Fixture::new(graph(), settings);
        assert_eq!(
            outlet_listeners(&fixture.ctx()),
            "let outletListener_b_1 = (m) => {}"
        );
        assert_eq!(outlet_listeners(&self::fixture().ctx()), "");
    }

    #[test]
    fn arrays_are_set_from_literals() {
        let settings = CompilationSettings::default()
            .with_array("table", vec![0.0, 0.5])
            .with_array("empty", vec![]);
        let fixture = Fixture::new(graph(), settings);
        let code = embedded_arrays(&fixture.ctx());
        assert!(code.starts_with("function _embedArrays() {"));
        assert!(code.contains("const array_0 = new FloatArray(0)"));
        assert!(code.contains("commons_setArray(\"empty\", array_0)"));
        assert!(code.contains("array_1.set([0.0, 0.5])"));
        assert!(code.contains("commons_setArray(\"table\", array_1)"));
    }

    #[test]
    fn no_arrays_still_defines_function() {
        assert_eq!(embedded_arrays(&fixture().ctx()), "function _embedArrays() {}");
    }
}
