//! Compiler from dataflow patch graphs to block-based audio programs.
//!
//! A patch is a graph of nodes with signal and message portlets. The compiler
//! decides in which order nodes run, merges connected portlets that would
//! only copy data into each other, and emits a program (JavaScript or
//! AssemblyScript) exposing `configure(sampleRate, blockSize)` and
//! `loop(INPUT, OUTPUT)`.
//!
//! # Features
//!
//! - **Graph model**: typed portlets, validated connections, JSON round-trip
//! - **Traversal**: deterministic declare and loop orders
//! - **Precompilation**: signal inlets read their source directly, single-sink
//!   message outlets call their receiver directly
//! - **Node implementations**: pluggable per-type code generators
//! - **Settings**: serde structs loadable from TOML
//! - **Metadata**: audio settings and host hook names embedded as JSON
//!
//! # Example
//!
//! ```rust
//! use patchc_compiler::{CompilationSettings, Graph, Node, NodeImplementations, compile};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node::new("n0", "nop")).unwrap();
//!
//! let mut registry = NodeImplementations::new();
//! struct Nop;
//! impl patchc_compiler::NodeImplementation for Nop {}
//! registry.register("nop", Nop);
//!
//! let program = compile(&graph, &registry, &CompilationSettings::default()).unwrap();
//! assert!(program.code.contains("function configure(sampleRate, blockSize)"));
//! ```

mod compile;
mod error;
mod metadata;
mod settings;

/// Code emitter sections.
pub mod emit;

/// Graph model.
pub mod graph;

/// Per-target code building blocks.
pub mod macros;

/// Node code generator contract and registry.
pub mod node_implementation;

/// Portlet precompilation.
pub mod precompile;

/// Declare and loop orders.
pub mod traversal;

/// Variable binding plan.
pub mod variable_names;

pub use compile::{CompiledProgram, compile};
pub use error::{CompileError, GraphError, SettingsError};
pub use graph::{Graph, Node, Portlet, PortletAddress, PortletKind};
pub use macros::{CodeType, Macros, Target};
pub use metadata::{
    CompilationMetadata, EngineMetadata, METADATA_BEGIN, METADATA_END, PortletNameIndex,
    VariableNamesIndex, read_metadata,
};
pub use node_implementation::{
    ArraysChanged, NodeContext, NodeEvents, NodeImplementation, NodeImplementations,
};
pub use precompile::{PrecompiledPortlets, precompile};
pub use settings::{AudioSettings, ChannelCount, CompilationSettings, MAX_CHANNELS};
pub use traversal::{TraversalPlan, plan};
pub use variable_names::{
    Globs, Namespace, NodeVariableNames, VariableNames, generate as generate_names,
};

/// Re-export of the runtime float width.
pub use patchc_runtime::BitDepth;
