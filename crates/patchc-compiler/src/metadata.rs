//! Engine metadata embedded in compiled programs.
//!
//! Hosts need the audio settings and the names of the host-facing functions
//! without recompiling. The emitter writes the metadata as JSON between two
//! marker lines inside a block comment; [`read_metadata`] finds it again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::graph::PortletAddress;
use crate::settings::AudioSettings;

/// Opening marker of the metadata block.
pub const METADATA_BEGIN: &str = "PATCHC_METADATA_BEGIN";

/// Closing marker of the metadata block.
pub const METADATA_END: &str = "PATCHC_METADATA_END";

/// Host function names as `node id -> portlet id -> name`.
pub type PortletNameIndex = BTreeMap<String, BTreeMap<String, String>>;

/// Names of the host-facing functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableNamesIndex {
    /// Inlet caller function names.
    pub inlet_callers: PortletNameIndex,
    /// Outlet listener slot names.
    pub outlet_listeners: PortletNameIndex,
}

/// Compilation part of the metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationMetadata {
    /// Inlets the host may call into.
    pub inlet_caller_specs: Vec<PortletAddress>,
    /// Outlets the host listens to.
    pub outlet_listener_specs: Vec<PortletAddress>,
    /// Generated names for both.
    pub variable_names_index: VariableNamesIndex,
}

/// Everything a host needs to drive a compiled program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetadata {
    /// Audio format.
    pub audio_settings: AudioSettings,
    /// Host hooks.
    pub compilation: CompilationMetadata,
}

impl EngineMetadata {
    /// Renders the metadata as a comment block.
    pub fn to_comment_block(&self) -> Result<String, CompileError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!("/* {METADATA_BEGIN}\n{json}\n{METADATA_END} */"))
    }
}

/// Extracts the metadata from compiled code.
pub fn read_metadata(code: &str) -> Result<EngineMetadata, CompileError> {
    let start = code
        .find(METADATA_BEGIN)
        .ok_or(CompileError::MetadataNotFound)?
        + METADATA_BEGIN.len();
    let len = code[start..]
        .find(METADATA_END)
        .ok_or(CompileError::MetadataNotFound)?;
    Ok(serde_json::from_str(code[start..start + len].trim())?)
}
