//! Runtime support bundle.
//!
//! The helpers compiled programs call (`msg_*`, `buf_*`, `sked_*`,
//! `commons_*`, `fs_*`) ship as static sources per target, behind the
//! target prelude that defines `Float` and `FloatArray`.

use std::collections::HashSet;

use super::{EmitContext, join_lines};
use crate::error::CompileError;
use crate::macros::Target;

const CORE_JS: &str = include_str!("bundle/core.js");
const COMMONS_JS: &str = include_str!("bundle/commons.js");
const FS_JS: &str = include_str!("bundle/fs.js");

const CORE_TS: &str = include_str!("bundle/core.ts");
const COMMONS_TS: &str = include_str!("bundle/commons.ts");
const FS_TS: &str = include_str!("bundle/fs.ts");

/// Prelude, support sources, then the shared code of every node type in
/// declare order, each snippet once.
pub fn support_bundle(ctx: &EmitContext<'_>) -> Result<String, CompileError> {
    let [core, commons, fs] = match ctx.macros.target() {
        Target::JavaScript => [CORE_JS, COMMONS_JS, FS_JS],
        Target::AssemblyScript => [CORE_TS, COMMONS_TS, FS_TS],
    };

    let mut seen = HashSet::new();
    let mut shared = Vec::new();
    for node_id in &ctx.plan.declare_order {
        let node = ctx.graph.get(node_id)?;
        for snippet in ctx.registry.get(&node.node_type)?.shared_code(ctx.macros) {
            if seen.insert(snippet.clone()) {
                shared.push(snippet);
            }
        }
    }
    tracing::trace!(snippets = shared.len(), "shared node code");

    let mut parts = vec![ctx.macros.prelude(), core.to_owned(), commons.to_owned(), fs.to_owned()];
    parts.push(join_lines(shared));
    Ok(join_lines(parts))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::settings::CompilationSettings;
    use patchc_runtime::BitDepth;

    #[test]
    fn javascript_bundle() {
        let fixture = fixture();
        let code = support_bundle(&fixture.ctx()).unwrap();
        assert!(code.starts_with("const FloatArray = Float64Array"));
        assert!(code.contains("function sked_emit(skeduler, event)"));
        assert!(code.contains("function commons_setArray(name, array)"));
        assert!(code.contains("function x_fs_onSoundStreamData(id, block)"));
        assert!(!code.contains("DataView"));
    }

    #[test]
    fn assemblyscript_bundle_follows_bit_depth() {
        let settings = CompilationSettings::default()
            .with_target(Target::AssemblyScript)
            .with_bit_depth(BitDepth::F32);
        let fixture = Fixture::new(graph(), settings);
        let code = support_bundle(&fixture.ctx()).unwrap();
        assert!(code.contains("type Float = f32"));
        assert!(code.contains("const FLOAT_BYTES: i32 = 4"));
        assert!(code.contains("view.getFloat32(offset, true)"));
        assert!(code.contains("class Message"));
        assert!(code.contains("export function x_fs_onReadSoundFileResponse"));
    }

    /// Source of `function {name}(` up to the next top-level closing brace.
    fn function_source<'a>(source: &'a str, name: &str) -> &'a str {
        let start = source
            .find(&format!("function {name}("))
            .unwrap_or_else(|| panic!("`{name}` not found"));
        let end = source[start..].find("\n}").unwrap() + start + 2;
        &source[start..end]
    }

    #[test]
    fn token_tags_match_runtime() {
        use patchc_runtime::TokenType;
        for (source, ty) in [(CORE_TS, ": i32"), (CORE_JS, "")] {
            let float = format!("const MSG_FLOAT_TOKEN{ty} = {}", TokenType::Float.tag());
            let string = format!("const MSG_STRING_TOKEN{ty} = {}", TokenType::String.tag());
            assert!(source.contains(&float), "{float}");
            assert!(source.contains(&string), "{string}");
        }
    }

    #[test]
    fn assemblyscript_header_matches_runtime() {
        use patchc_runtime::{HEADER_CELL_BYTES, header_cells};
        assert!(function_source(CORE_TS, "_msg_headerLength")
            .contains("return (2 + 2 * tokenCount) * 4"));
        for tokens in 0..5 {
            assert_eq!(header_cells(tokens) * HEADER_CELL_BYTES, (2 + 2 * tokens) * 4);
        }
    }

    #[test]
    fn assemblyscript_strings_use_one_cell_per_code_point() {
        let strings = function_source(CORE_TS, "msg_strings");
        assert!(strings.contains("template.push(_msg_codePointCount(values[i]))"));
        assert!(!strings.contains(".length)"));

        let write = function_source(CORE_TS, "msg_writeStringToken");
        assert!(write.contains("unit += codePoint > 0xffff ? 2 : 1"));
        assert!(!write.contains("codePointAt(c)"));

        // same sizing as the native codec, surrogate pairs included
        let native: patchc_runtime::Message<f64> = patchc_runtime::Message::strings(&["a😀"]);
        assert_eq!(native.as_bytes().len(), 4 * 4 + 2 * 4);
    }

    #[test]
    fn display_renders_whole_floats_once() {
        let native: patchc_runtime::Message<f64> = patchc_runtime::Message::floats(&[1.0, 0.5]);
        assert_eq!(native.to_string(), "[1.0, 0.5]");

        // AssemblyScript prints `1.0` by itself, JavaScript prints `1`
        let ts = function_source(CORE_TS, "msg_display");
        assert!(ts.contains("tokens.push(value.toString())"));
        assert!(!ts.contains("'.0'"));
        let js = function_source(CORE_JS, "msg_display");
        assert!(js.contains("Number.isInteger(token) ? token.toFixed(1) : token.toString()"));
    }

    #[test]
    fn shared_code_is_deduplicated() {
        let fixture = fixture();
        let code = support_bundle(&fixture.ctx()).unwrap();
        assert_eq!(code.matches("// relay helpers").count(), 1);
    }
}
