//! Machine and assembler options.
//!
//! Options can be built in code or read from JSON. Missing fields take
//! their defaults, so `{"wrap_memory": true}` is a complete config file.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Options shared by the assembler and the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Wrap out-of-range addresses modulo the memory size instead of failing.
    pub wrap_memory: bool,

    /// Wrap out-of-range values written to the accumulator or memory.
    /// When off, such values are stored as they are.
    pub wrap_values: bool,

    /// Enable non-standard instructions (currently `OTC`).
    pub extensions: bool,

    /// Append a `HLT` after the last source line when assembling.
    pub append_trailing_halt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wrap_memory: false,
            wrap_values: true,
            extensions: true,
            append_trailing_halt: false,
        }
    }
}

impl Config {
    /// Parse a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> String {
        // A struct of bools always serializes
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Errors that can occur while loading a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config: {0}")]
    Parse(String),
}
