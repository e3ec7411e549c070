//! Error types for graph construction, settings and compilation.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::PortletKind;

/// Errors raised while building or validating a [`Graph`](crate::Graph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Node id not present in the graph
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// Node id used twice
    #[error("node '{0}' already exists")]
    DuplicateNode(String),

    /// Portlet id not declared on the node
    #[error("node '{node_id}' has no {direction} '{portlet_id}'")]
    PortletNotFound {
        /// Node that was searched.
        node_id: String,
        /// Missing portlet id.
        portlet_id: String,
        /// `"inlet"` or `"outlet"`.
        direction: &'static str,
    },

    /// Outlet and inlet kinds differ
    #[error(
        "cannot connect {source_kind} outlet '{source_node}:{outlet}' to {sink_kind} inlet '{sink_node}:{inlet}'"
    )]
    KindMismatch {
        /// Source node id.
        source_node: String,
        /// Source outlet id.
        outlet: String,
        /// Kind of the outlet.
        source_kind: PortletKind,
        /// Sink node id.
        sink_node: String,
        /// Sink inlet id.
        inlet: String,
        /// Kind of the inlet.
        sink_kind: PortletKind,
    },

    /// A signal inlet can only have one source
    #[error("signal inlet '{node_id}:{inlet}' already has a source")]
    SignalInletTaken {
        /// Sink node id.
        node_id: String,
        /// Sink inlet id.
        inlet: String,
    },

    /// Same edge added twice
    #[error("connection '{source_node}:{outlet}' -> '{sink_node}:{inlet}' already exists")]
    DuplicateConnection {
        /// Source node id.
        source_node: String,
        /// Source outlet id.
        outlet: String,
        /// Sink node id.
        sink_node: String,
        /// Sink inlet id.
        inlet: String,
    },
}

impl GraphError {
    /// Create a missing inlet error.
    pub fn inlet_not_found(node_id: impl Into<String>, portlet_id: impl Into<String>) -> Self {
        GraphError::PortletNotFound {
            node_id: node_id.into(),
            portlet_id: portlet_id.into(),
            direction: "inlet",
        }
    }

    /// Create a missing outlet error.
    pub fn outlet_not_found(node_id: impl Into<String>, portlet_id: impl Into<String>) -> Self {
        GraphError::PortletNotFound {
            node_id: node_id.into(),
            portlet_id: portlet_id.into(),
            direction: "outlet",
        }
    }
}

/// Errors raised while loading or validating [`CompilationSettings`](crate::CompilationSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Channel count out of range
    #[error("invalid {direction} channel count {count}")]
    InvalidChannelCount {
        /// `"input"` or `"output"`.
        direction: &'static str,
        /// Value found.
        count: u32,
    },

    /// A name used to build variable names is not `[a-zA-Z0-9_]+`
    #[error("invalid name '{name}' in {field}")]
    InvalidName {
        /// Settings field holding the name.
        field: &'static str,
        /// Offending name.
        name: String,
    },
}

impl SettingsError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::ReadFile {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// No generator registered for a node type
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Name part with characters outside `[a-zA-Z0-9_]`
    #[error("invalid variable name part '{0}'")]
    InvalidVariableName(String),

    /// Lookup of a variable that was never bound
    #[error("unknown variable '{key}' in namespace '{namespace}'")]
    UnknownVariable {
        /// Namespace searched.
        namespace: String,
        /// Missing key.
        key: String,
    },

    /// Two nodes whose type and id produce the same variable prefix
    #[error("nodes '{first}' and '{second}' share the variable prefix '{prefix}'")]
    NamePrefixCollision {
        /// Colliding prefix.
        prefix: String,
        /// Node that took the prefix first.
        first: String,
        /// Node rejected for reusing it.
        second: String,
    },

    /// A node generator rejected its node
    #[error("node '{node_id}': {reason}")]
    InvalidNode {
        /// Node id.
        node_id: String,
        /// What the generator objected to.
        reason: String,
    },

    /// Graph errors
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Settings errors
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Metadata (de)serialization failure
    #[error("metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compiled code has no metadata block
    #[error("no metadata block found in compiled code")]
    MetadataNotFound,
}

impl CompileError {
    /// Create an unknown variable error.
    pub fn unknown_variable(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        CompileError::UnknownVariable {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Create an invalid node error.
    pub fn invalid_node(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidNode {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    // --- factory methods ---

    #[test]
    fn read_file_factory_produces_correct_variant() {
        let err = SettingsError::read_file("/some/path.toml", mock_io_err());
        assert!(
            matches!(err, SettingsError::ReadFile { ref path, .. } if path == std::path::Path::new("/some/path.toml"))
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn portlet_factories_set_direction() {
        assert!(matches!(
            GraphError::inlet_not_found("n1", "3"),
            GraphError::PortletNotFound { direction: "inlet", .. }
        ));
        assert!(matches!(
            GraphError::outlet_not_found("n1", "3"),
            GraphError::PortletNotFound { direction: "outlet", .. }
        ));
    }

    // --- display ---

    #[test]
    fn prefix_collision_display() {
        let err = CompileError::NamePrefixCollision {
            prefix: "osc_t_1".into(),
            first: "1".into(),
            second: "t_1".into(),
        };
        assert_eq!(
            err.to_string(),
            "nodes '1' and 't_1' share the variable prefix 'osc_t_1'"
        );
    }

    #[test]
    fn unknown_variable_display() {
        let err = CompileError::unknown_variable("osc_t_n0.ins", "7");
        assert_eq!(
            err.to_string(),
            "unknown variable '7' in namespace 'osc_t_n0.ins'"
        );
    }

    #[test]
    fn kind_mismatch_display() {
        let err = GraphError::KindMismatch {
            source_node: "a".into(),
            outlet: "0".into(),
            source_kind: PortletKind::Signal,
            sink_node: "b".into(),
            inlet: "1".into(),
            sink_kind: PortletKind::Message,
        };
        assert_eq!(
            err.to_string(),
            "cannot connect signal outlet 'a:0' to message inlet 'b:1'"
        );
    }

    // --- conversions ---

    #[test]
    fn graph_error_converts_with_source() {
        let err: CompileError = GraphError::NodeNotFound("x".into()).into();
        assert!(matches!(err, CompileError::Graph(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn settings_error_converts() {
        let err: CompileError = SettingsError::InvalidChannelCount {
            direction: "output",
            count: 0,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "settings error: invalid output channel count 0"
        );
    }
}
