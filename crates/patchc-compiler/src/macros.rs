//! Per-target code building blocks.
//!
//! Generators never write target syntax for declarations by hand. They go
//! through [`Macros`], resolved once per compilation from the target and bit
//! depth, so the same node implementation emits JavaScript or AssemblyScript.
//!
//! Statement bodies are written in the common subset of both languages.

use patchc_runtime::BitDepth;
use serde::{Deserialize, Serialize};

/// Output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Plain JavaScript, messages as token arrays.
    #[default]
    JavaScript,
    /// AssemblyScript, messages in the binary layout.
    AssemblyScript,
}

/// Type of a declared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeType {
    /// Sample or message float in the program's bit depth.
    Float,
    /// 32-bit integer.
    Int,
    /// Boolean.
    Boolean,
    /// String.
    String,
    /// Message.
    Message,
    /// Array of floats.
    FloatArray,
    /// One float array per channel.
    Channels,
    /// Skeduler callback.
    SkedCallback,
    /// No value.
    Void,
}

/// Declaration helpers for one target and bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macros {
    target: Target,
    bit_depth: BitDepth,
}

impl Macros {
    /// Macros for `target` at `bit_depth`.
    pub fn new(target: Target, bit_depth: BitDepth) -> Self {
        Self { target, bit_depth }
    }

    /// Output language.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Float width.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Native typed array matching the bit depth.
    pub fn native_float_array(&self) -> &'static str {
        match self.bit_depth {
            BitDepth::F32 => "Float32Array",
            BitDepth::F64 => "Float64Array",
        }
    }

    /// Aliases the rest of the program relies on (`Float`, `FloatArray`),
    /// plus the float accessors of binary messages for AssemblyScript.
    pub fn prelude(&self) -> String {
        let array = self.native_float_array();
        match self.target {
            Target::JavaScript => format!("const FloatArray = {array}"),
            Target::AssemblyScript => {
                let (float, bits) = match self.bit_depth {
                    BitDepth::F32 => ("f32", 32),
                    BitDepth::F64 => ("f64", 64),
                };
                let bytes = self.bit_depth.bytes();
                format!(
                    "type Float = {float}\n\
                     type FloatArray = {array}\n\
                     const FLOAT_BYTES: i32 = {bytes}\n\
                     function _msg_getFloat(view: DataView, offset: i32): Float {{\n    \
                     return view.getFloat{bits}(offset, true)\n}}\n\
                     function _msg_setFloat(view: DataView, offset: i32, value: Float): void {{\n    \
                     view.setFloat{bits}(offset, value, true)\n}}"
                )
            }
        }
    }

    /// Type annotation for `code_type`, empty for JavaScript.
    pub fn type_name(&self, code_type: CodeType) -> &'static str {
        if self.target == Target::JavaScript {
            return "";
        }
        match code_type {
            CodeType::Float => "Float",
            CodeType::Int => "i32",
            CodeType::Boolean => "boolean",
            CodeType::String => "string",
            CodeType::Message => "Message",
            CodeType::FloatArray => "FloatArray",
            CodeType::Channels => "Array<FloatArray>",
            CodeType::SkedCallback => "SkedCallback",
            CodeType::Void => "void",
        }
    }

    /// `name` with its type annotation, if the target has one.
    pub fn typed(&self, name: &str, code_type: CodeType) -> String {
        match self.target {
            Target::JavaScript => name.to_owned(),
            Target::AssemblyScript => format!("{name}: {}", self.type_name(code_type)),
        }
    }

    /// Mutable variable declaration.
    pub fn var(&self, name: &str, code_type: CodeType, init: &str) -> String {
        format!("let {} = {init}", self.typed(name, code_type))
    }

    /// Constant declaration.
    pub fn constant(&self, name: &str, code_type: CodeType, init: &str) -> String {
        format!("const {} = {init}", self.typed(name, code_type))
    }

    /// Function declaration.
    pub fn func(&self, name: &str, params: &[(&str, CodeType)], ret: CodeType, body: &str) -> String {
        let params: Vec<String> = params
            .iter()
            .map(|&(param, code_type)| self.typed(param, code_type))
            .collect();
        let signature = match self.target {
            Target::JavaScript => format!("function {name}({})", params.join(", ")),
            Target::AssemblyScript => format!(
                "function {name}({}): {}",
                params.join(", "),
                self.type_name(ret)
            ),
        };
        if body.trim().is_empty() {
            format!("{signature} {{}}")
        } else {
            format!("{signature} {{\n{}\n}}", indent(body))
        }
    }

    /// `expr` converted to `code_type`; JavaScript leaves it as is.
    pub fn cast(&self, expr: &str, code_type: CodeType) -> String {
        match self.target {
            Target::JavaScript => expr.to_owned(),
            Target::AssemblyScript => format!("<{}>({expr})", self.type_name(code_type)),
        }
    }

    /// Makes a declaration visible to the host.
    pub fn export(&self, declaration: &str) -> String {
        match self.target {
            Target::JavaScript => declaration.to_owned(),
            Target::AssemblyScript => format!("export {declaration}"),
        }
    }

    /// Host-provided message callback named `name`.
    pub fn message_callback_slot(&self, name: &str, m: &str) -> String {
        match self.target {
            Target::JavaScript => format!("let {name} = ({m}) => {{}}"),
            Target::AssemblyScript => format!("declare function {name}({m}: Message): void"),
        }
    }

    /// Float literal that both targets parse as a float.
    pub fn float(&self, value: f64) -> String {
        if value.is_finite() {
            format!("{value:?}")
        } else {
            "0.0".to_owned()
        }
    }

    /// String literal.
    pub fn string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('"');
        for c in value.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }
}

impl Default for Macros {
    fn default() -> Self {
        Self::new(Target::default(), BitDepth::default())
    }
}

/// Indents every non-empty line by four spaces.
pub fn indent(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_is_untyped() {
        let macros = Macros::new(Target::JavaScript, BitDepth::F64);
        assert_eq!(macros.var("x", CodeType::Float, "0"), "let x = 0");
        assert_eq!(
            macros.func("f", &[("m", CodeType::Message)], CodeType::Void, ""),
            "function f(m) {}"
        );
        assert_eq!(macros.export("function g() {}"), "function g() {}");
        assert_eq!(macros.prelude(), "const FloatArray = Float64Array");
    }

    #[test]
    fn assemblyscript_is_typed() {
        let macros = Macros::new(Target::AssemblyScript, BitDepth::F32);
        assert_eq!(macros.var("x", CodeType::Float, "0"), "let x: Float = 0");
        assert_eq!(
            macros.func("f", &[("m", CodeType::Message)], CodeType::Void, "g(m)"),
            "function f(m: Message): void {\n    g(m)\n}"
        );
        assert_eq!(macros.export("const a = 1"), "export const a = 1");
        assert_eq!(macros.cast("x / 2", CodeType::Int), "<i32>(x / 2)");
        assert_eq!(Macros::default().cast("x / 2", CodeType::Int), "x / 2");
        assert!(macros.prelude().contains("type Float = f32"));
    }

    #[test]
    fn literals() {
        let macros = Macros::default();
        assert_eq!(macros.float(440.0), "440.0");
        assert_eq!(macros.float(f64::NAN), "0.0");
        assert_eq!(macros.string("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn target_serde_names() {
        let target: Target = serde_json::from_str("\"assemblyscript\"").unwrap();
        assert_eq!(target, Target::AssemblyScript);
        assert_eq!(serde_json::to_string(&Target::JavaScript).unwrap(), "\"javascript\"");
    }
}
