//! Voice personas and the persisted persona selection.
//!
//! A persona is a named bundle of synthesis parameters (pitch, rate,
//! voice identity hint). Three personas ship built in; the active
//! selection is a single key held in a [`PersonaStore`] and read
//! whenever the assistant speaks, so a settings screen can swap voices
//! without touching the voice channel.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// Persona used when nothing is persisted or the stored key is unknown.
pub const DEFAULT_PERSONA_ID: &str = "deep-male";

/// Synthesis parameters for one voice persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePersona {
    /// Pitch multiplier (1.0 = engine default).
    pub pitch: f32,
    /// Speaking rate multiplier (1.0 = engine default).
    pub rate: f32,
    /// Substring used to pick a matching system voice.
    pub voice_hint: String,
}

/// The built-in persona table.
#[must_use]
pub fn builtin_personas() -> Vec<(&'static str, VoicePersona)> {
    vec![
        (
            "deep-male",
            VoicePersona {
                pitch: 0.7,
                rate: 0.85,
                voice_hint: "Daniel".to_owned(),
            },
        ),
        (
            "calm-female",
            VoicePersona {
                pitch: 1.08,
                rate: 0.9,
                voice_hint: "Samantha".to_owned(),
            },
        ),
        (
            "neutral-male",
            VoicePersona {
                pitch: 0.92,
                rate: 0.93,
                voice_hint: "Aaron".to_owned(),
            },
        ),
    ]
}

/// Look up a persona by id, falling back to the default for unknown ids.
#[must_use]
pub fn persona(id: &str) -> VoicePersona {
    let personas = builtin_personas();
    personas
        .iter()
        .find(|(key, _)| *key == id)
        .or_else(|| personas.iter().find(|(key, _)| *key == DEFAULT_PERSONA_ID))
        .map(|(_, p)| p.clone())
        .unwrap_or(VoicePersona {
            pitch: 1.0,
            rate: 1.0,
            voice_hint: String::new(),
        })
}

/// Narrow process-wide store for the active persona key.
pub trait PersonaStore: Send + Sync {
    /// The currently selected persona id.
    fn active_persona_id(&self) -> String;

    /// Persist a new selection.
    ///
    /// # Errors
    ///
    /// Returns an error when the selection cannot be persisted.
    fn set_active_persona_id(&self, id: &str) -> Result<()>;
}

/// On-disk schema for the voice settings file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct VoiceSettings {
    #[serde(default)]
    active_persona: Option<String>,
}

/// Persona selection persisted as a TOML file.
#[derive(Debug)]
pub struct FilePersonaStore {
    path: PathBuf,
}

impl FilePersonaStore {
    /// Create a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dasom")
            .join("voice.toml")
    }

    fn read_settings(path: &Path) -> VoiceSettings {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| toml::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

impl PersonaStore for FilePersonaStore {
    fn active_persona_id(&self) -> String {
        Self::read_settings(&self.path)
            .active_persona
            .unwrap_or_else(|| DEFAULT_PERSONA_ID.to_owned())
    }

    fn set_active_persona_id(&self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let settings = VoiceSettings {
            active_persona: Some(id.to_owned()),
        };
        let raw = toml::to_string_pretty(&settings)
            .map_err(|e| AssistantError::Config(format!("voice settings serialize: {e}")))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-memory persona selection for tests and embedded use.
#[derive(Debug)]
pub struct MemoryPersonaStore {
    active: Mutex<String>,
}

impl MemoryPersonaStore {
    /// Create a store with the given initial selection.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            active: Mutex::new(id.into()),
        }
    }
}

impl Default for MemoryPersonaStore {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA_ID)
    }
}

impl PersonaStore for MemoryPersonaStore {
    fn active_persona_id(&self) -> String {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_active_persona_id(&self, id: &str) -> Result<()> {
        *self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = id.to_owned();
        Ok(())
    }
}
