//! Local state document and its export/import formats.

use crate::clock;
use crate::connection::ConnectionProfile;
use crate::error::{DuetError, Result};
use crate::participant::{GenerationConfig, Slot};
use crate::persona::Persona;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Format version written into export documents.
pub const EXPORT_VERSION: u32 = 1;

/// Everything the application restores at startup.
///
/// Older documents used `endpoints`/`characters`/`modelA`/`modelB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    #[serde(default, alias = "endpoints")]
    pub connection_profiles: Vec<ConnectionProfile>,
    #[serde(default, alias = "characters")]
    pub personas: Vec<Persona>,
    #[serde(alias = "modelA", default = "default_config_a")]
    pub config_a: GenerationConfig,
    #[serde(alias = "modelB", default = "default_config_b")]
    pub config_b: GenerationConfig,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub active_session_id: Option<String>,
}

fn default_config_a() -> GenerationConfig {
    GenerationConfig::default_for(Slot::A)
}

fn default_config_b() -> GenerationConfig {
    GenerationConfig::default_for(Slot::B)
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            connection_profiles: Vec::new(),
            personas: Vec::new(),
            config_a: default_config_a(),
            config_b: default_config_b(),
            sessions: Vec::new(),
            active_session_id: None,
        }
    }
}

/// Export document: the whole persisted state plus export metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateExport {
    pub connection_profiles: Vec<ConnectionProfile>,
    pub personas: Vec<Persona>,
    pub config_a: GenerationConfig,
    pub config_b: GenerationConfig,
    pub sessions: Vec<Session>,
    pub active_session_id: Option<String>,
    /// RFC 3339
    pub exported_at: String,
    pub version: u32,
}

impl StateExport {
    pub fn from_document(document: &StateDocument) -> Self {
        Self {
            connection_profiles: document.connection_profiles.clone(),
            personas: document.personas.clone(),
            config_a: document.config_a.clone(),
            config_b: document.config_b.clone(),
            sessions: document.sessions.clone(),
            active_session_id: document.active_session_id.clone(),
            exported_at: clock::now_rfc3339(),
            version: EXPORT_VERSION,
        }
    }
}

/// A validated import document.
///
/// Only `sessions` is required; every other field replaces the current
/// value only when present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateImport {
    #[serde(default, alias = "endpoints")]
    pub connection_profiles: Option<Vec<ConnectionProfile>>,
    #[serde(default, alias = "characters")]
    pub personas: Option<Vec<Persona>>,
    #[serde(default, alias = "modelA")]
    pub config_a: Option<GenerationConfig>,
    #[serde(default, alias = "modelB")]
    pub config_b: Option<GenerationConfig>,
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub active_session_id: Option<String>,
}

impl StateImport {
    /// Parses and validates an import document.
    ///
    /// # Errors
    ///
    /// Returns [`DuetError::ImportValidation`] if the text is not a JSON
    /// object with a `sessions` array, if any field has the wrong shape, or
    /// if any session breaks its invariants. Nothing is applied on error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| DuetError::import_validation(format!("not valid JSON: {e}")))?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| DuetError::import_validation("document is not a JSON object"))?;
        if !object.get("sessions").is_some_and(|s| s.is_array()) {
            return Err(DuetError::import_validation("missing sessions"));
        }
        object.remove("exportedAt");
        object.remove("version");

        let import: StateImport = serde_json::from_value(value)
            .map_err(|e| DuetError::import_validation(e.to_string()))?;
        import.validate()?;
        Ok(import)
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for session in &self.sessions {
            session
                .validate()
                .map_err(|e| DuetError::import_validation(e.to_string()))?;
            if !ids.insert(session.id.as_str()) {
                return Err(DuetError::import_validation(format!(
                    "duplicate session id '{}'",
                    session.id
                )));
            }
        }
        for config in self.config_a.iter().chain(self.config_b.iter()) {
            config
                .validate()
                .map_err(|e| DuetError::import_validation(e.to_string()))?;
        }
        Ok(())
    }

    /// Replaces the fields of `document` present in this import.
    pub fn apply_to(self, document: &mut StateDocument) {
        if let Some(profiles) = self.connection_profiles {
            document.connection_profiles = profiles;
        }
        if let Some(personas) = self.personas {
            document.personas = personas;
        }
        if let Some(mut config) = self.config_a {
            config.slot = Slot::A;
            document.config_a = config;
        }
        if let Some(mut config) = self.config_b {
            config.slot = Slot::B;
            document.config_b = config;
        }
        document.active_session_id = self
            .active_session_id
            .filter(|id| self.sessions.iter().any(|s| &s.id == id));
        document.sessions = self.sessions;
    }
}
