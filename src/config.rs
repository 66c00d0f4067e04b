//! Assistant configuration.
//!
//! A single TOML file under the platform config directory covers the
//! gateway connection and voice behavior. Missing file or missing keys
//! fall back to defaults so a fresh install works with zero setup
//! beyond the gateway URL.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};
use crate::transport::GatewayConfig;

/// Voice behavior settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speak completed assistant replies aloud.
    #[serde(default = "default_true")]
    pub speak_replies: bool,
    /// Milliseconds between recognition end and the automatic send.
    #[serde(default = "default_auto_send_delay_ms")]
    pub auto_send_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_auto_send_delay_ms() -> u64 {
    500
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speak_replies: true,
            auto_send_delay_ms: default_auto_send_delay_ms(),
        }
    }
}

/// Top-level assistant configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Gateway connection settings.
    #[serde(default = "default_gateway")]
    pub gateway: GatewayConfig,
    /// Voice behavior settings.
    #[serde(default)]
    pub voice: VoiceConfig,
}

fn default_gateway() -> GatewayConfig {
    GatewayConfig::new("")
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway(),
            voice: VoiceConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Default config file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dasom")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| AssistantError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Write configuration, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| AssistantError::Config(format!("config serialize: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
