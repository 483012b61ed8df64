//! # Runtime Configuration Module
//!
//! Pipeline behaviour that operators may want to change without recompiling.
//!
//! ## Environment Variables
//!
//! ### `BRRTKIT_SERVER_NAME`
//!
//! Value of the `Server` header on every response.
//! Default: `brrtkit <version>`
//!
//! ### `BRRTKIT_INCLUDE_TRACES`
//!
//! When `true`, 500 responses built from unexpected failures carry the error
//! cause chain in their body. Keep this off in production.
//! Default: `false`
//!
//! ### `BRRTKIT_ENVELOPE`
//!
//! JSON body shape: `standard`, `detailed` or `plain`.
//! Default: `standard`
//!
//! ## YAML
//!
//! The same settings load from a file; missing keys keep their defaults:
//!
//! ```yaml
//! server_name: my-api
//! include_traces: true
//! envelope: detailed
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use brrtkit::runtime_config::PipelineConfig;
//!
//! let config = PipelineConfig::from_env();
//! println!("Server: {}", config.server_name);
//! ```

use std::env;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::server::{Envelope, SERVER_NAME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Runtime configuration of the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// `Server` header value
    pub server_name: String,
    /// Put error cause chains into 500 bodies
    pub include_traces: bool,
    /// Envelope applied to JSON bodies of coerced and error responses
    pub envelope: Envelope,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            server_name: SERVER_NAME.to_string(),
            include_traces: false,
            envelope: Envelope::Standard,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_name: env::var("BRRTKIT_SERVER_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.server_name),
            include_traces: env::var("BRRTKIT_INCLUDE_TRACES")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.include_traces),
            envelope: env::var("BRRTKIT_ENVELOPE")
                .map(|s| Envelope::parse(&s))
                .unwrap_or(defaults.envelope),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a struct.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
