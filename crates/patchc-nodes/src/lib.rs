//! Reference node implementations for the patchc compiler.
//!
//! A handful of node types written against the
//! [`NodeImplementation`] contract, enough to build and test complete
//! patches: oscillators through gain to the audio output, clocks driving
//! number boxes, table lookups following array changes.
//!
//! # Features
//!
//! - **Signal nodes**: `osc~`, `*~`, `sig~`, `adc~`, `dac~`
//! - **Control nodes**: `float`, `metro`, `loadbang`, `tabread`
//! - **Node builders**: each type builds its own graph node with the right portlets
//! - **Descriptors**: type tags, descriptions and categories for listings
//!
//! # Example
//!
//! ```rust
//! use patchc_compiler::{CompilationSettings, Graph, compile};
//! use patchc_nodes::{Dac, Osc, registry};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Osc::node("osc", 440.0)).unwrap();
//! graph.add_node(Dac::node("dac", 2)).unwrap();
//! graph.connect("osc", "0", "dac", "0").unwrap();
//! graph.connect("osc", "0", "dac", "1").unwrap();
//!
//! let program = compile(&graph, &registry(), &CompilationSettings::default()).unwrap();
//! assert!(program.code.contains("OUTPUT[1][F] = osc_t_osc_OUTS_0"));
//! ```

mod control;
mod signal;

pub use control::{FloatBox, Loadbang, Metro, Tabread};
pub use signal::{Adc, Dac, Mul, Osc, Sig};

use patchc_compiler::{CodeType, NodeContext, NodeImplementations};

/// Kind of node, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Runs every frame and produces or consumes signal.
    Signal,
    /// Reacts to messages only.
    Control,
}

/// Describes a node type of the library.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Type tag used in graphs.
    pub node_type: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
}

const DESCRIPTORS: &[NodeDescriptor] = &[
    NodeDescriptor {
        node_type: Osc::TYPE,
        description: "Cosine oscillator",
        category: NodeCategory::Signal,
    },
    NodeDescriptor {
        node_type: Mul::TYPE,
        description: "Signal times a number",
        category: NodeCategory::Signal,
    },
    NodeDescriptor {
        node_type: Sig::TYPE,
        description: "Constant signal set by messages",
        category: NodeCategory::Signal,
    },
    NodeDescriptor {
        node_type: Adc::TYPE,
        description: "Audio input channels",
        category: NodeCategory::Signal,
    },
    NodeDescriptor {
        node_type: Dac::TYPE,
        description: "Audio output channels",
        category: NodeCategory::Signal,
    },
    NodeDescriptor {
        node_type: FloatBox::TYPE,
        description: "Stores and outputs a number",
        category: NodeCategory::Control,
    },
    NodeDescriptor {
        node_type: Metro::TYPE,
        description: "Bangs at a fixed interval",
        category: NodeCategory::Control,
    },
    NodeDescriptor {
        node_type: Loadbang::TYPE,
        description: "Bangs once the engine is configured",
        category: NodeCategory::Control,
    },
    NodeDescriptor {
        node_type: Tabread::TYPE,
        description: "Reads a value from a named array",
        category: NodeCategory::Control,
    },
];

/// Descriptors of every node type in the library.
pub fn descriptors() -> &'static [NodeDescriptor] {
    DESCRIPTORS
}

/// Descriptors of one category.
pub fn descriptors_in_category(category: NodeCategory) -> impl Iterator<Item = &'static NodeDescriptor> {
    DESCRIPTORS.iter().filter(move |d| d.category == category)
}

/// Registry with every node type of the library.
pub fn registry() -> NodeImplementations {
    let mut registry = NodeImplementations::new();
    registry
        .register(Osc::TYPE, Osc)
        .register(Mul::TYPE, Mul)
        .register(Sig::TYPE, Sig)
        .register(Adc::TYPE, Adc)
        .register(Dac::TYPE, Dac)
        .register(FloatBox::TYPE, FloatBox)
        .register(Metro::TYPE, Metro)
        .register(Loadbang::TYPE, Loadbang)
        .register(Tabread::TYPE, Tabread);
    registry
}

/// Receiver fragment handling a single float, bound to `value` in `body`.
pub(crate) fn float_message_handler(ctx: &NodeContext<'_>, body: &str) -> String {
    let m = ctx.globs.m;
    let value = ctx
        .macros
        .constant("value", CodeType::Float, &format!("msg_readFloatToken({m}, 0)"));
    format!(
        "if (msg_isMatching({m}, [MSG_FLOAT_TOKEN])) {{\n{}\n    return\n}}",
        patchc_compiler::macros::indent(&format!("{value}\n{body}"))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_descriptor_is_registered() {
        let registry = registry();
        assert_eq!(registry.len(), descriptors().len());
        for descriptor in descriptors() {
            assert!(registry.contains(descriptor.node_type), "{}", descriptor.node_type);
        }
    }

    #[test]
    fn categories_partition_the_library() {
        let signal = descriptors_in_category(NodeCategory::Signal).count();
        let control = descriptors_in_category(NodeCategory::Control).count();
        assert_eq!(signal, 5);
        assert_eq!(signal + control, descriptors().len());
    }
}
