//! Compilation settings.
//!
//! Settings are plain serde structs, so they can be built in code or loaded
//! from TOML:
//!
//! ```toml
//! target = "assemblyscript"
//! inletCallerSpecs = [{ nodeId = "n1", portletId = "0" }]
//!
//! [audio]
//! bitDepth = 32
//! channelCount = { in = 1, out = 2 }
//!
//! [arrays]
//! table = [0.0, 0.5, 1.0]
//! ```
//!
//! Every missing field takes its default: 64-bit floats, two input and two
//! output channels, JavaScript output, no host hooks, no embedded arrays.

use std::collections::BTreeMap;
use std::path::Path;

use patchc_runtime::BitDepth;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::graph::PortletAddress;
use crate::macros::Target;
use crate::variable_names::is_valid_name_part;

/// Upper bound on channel counts.
pub const MAX_CHANNELS: u32 = 64;

/// Input and output channel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelCount {
    /// Input channels.
    #[serde(rename = "in")]
    pub input: u32,
    /// Output channels.
    #[serde(rename = "out")]
    pub output: u32,
}

impl Default for ChannelCount {
    fn default() -> Self {
        Self {
            input: 2,
            output: 2,
        }
    }
}

/// Audio format of the compiled program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    /// Float width of samples and message floats.
    pub bit_depth: BitDepth,
    /// Channel counts.
    pub channel_count: ChannelCount,
}

/// Everything that shapes a compilation besides the graph itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilationSettings {
    /// Audio format.
    pub audio: AudioSettings,
    /// Output language.
    pub target: Target,
    /// Message inlets the host may call into.
    pub inlet_caller_specs: Vec<PortletAddress>,
    /// Message outlets the host listens to.
    pub outlet_listener_specs: Vec<PortletAddress>,
    /// Arrays embedded in the program, set at configure time.
    pub arrays: BTreeMap<String, Vec<f64>>,
}

impl CompilationSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builder: set the target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Builder: set the bit depth.
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.audio.bit_depth = bit_depth;
        self
    }

    /// Builder: add an inlet caller.
    pub fn with_inlet_caller(mut self, node_id: &str, inlet_id: &str) -> Self {
        self.inlet_caller_specs
            .push(PortletAddress::new(node_id, inlet_id));
        self
    }

    /// Builder: add an outlet listener.
    pub fn with_outlet_listener(mut self, node_id: &str, outlet_id: &str) -> Self {
        self.outlet_listener_specs
            .push(PortletAddress::new(node_id, outlet_id));
        self
    }

    /// Builder: embed an array.
    pub fn with_array(mut self, name: impl Into<String>, data: Vec<f64>) -> Self {
        self.arrays.insert(name.into(), data);
        self
    }

    /// Checks channel counts and that host hook ids are valid name parts.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let ChannelCount { input, output } = self.audio.channel_count;
        if input > MAX_CHANNELS {
            return Err(SettingsError::InvalidChannelCount {
                direction: "input",
                count: input,
            });
        }
        if output == 0 || output > MAX_CHANNELS {
            return Err(SettingsError::InvalidChannelCount {
                direction: "output",
                count: output,
            });
        }

        let specs = self
            .inlet_caller_specs
            .iter()
            .map(|s| ("inletCallerSpecs", s))
            .chain(
                self.outlet_listener_specs
                    .iter()
                    .map(|s| ("outletListenerSpecs", s)),
            );
        for (field, spec) in specs {
            for part in [&spec.node_id, &spec.portlet_id] {
                if !is_valid_name_part(part) {
                    return Err(SettingsError::InvalidName {
                        field,
                        name: part.clone(),
                    });
                }
            }
        }

        // Array names end up inside string literals.
        for name in self.arrays.keys() {
            if name.is_empty() || name.contains(['"', '\\', '\n']) {
                return Err(SettingsError::InvalidName {
                    field: "arrays",
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}
