use super::slot::Slot;
use crate::error::{DuetError, Result};
use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint for fresh installs.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Default model identifier for fresh installs.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// A resolved, immutable generation configuration for one slot.
///
/// Produced by resolving a persona and its connection profile at selection
/// time. Sessions keep their own copy so that editing a persona later does
/// not rewrite the attribution of an existing transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Slot this configuration occupies (older documents call this `id`)
    #[serde(alias = "id")]
    pub slot: Slot,
    /// Display name used as the message sender name
    pub name: String,
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Bearer token; empty selects mock mode
    #[serde(default)]
    pub api_key: String,
    /// Model identifier sent with each request
    pub model: String,
    /// System prompt for every request made by this slot
    #[serde(default)]
    pub system_prompt: String,
}

impl GenerationConfig {
    /// The built-in configuration for a slot.
    pub fn default_for(slot: Slot) -> Self {
        let (name, system_prompt) = match slot {
            Slot::A => (
                "Model A (Skeptic)",
                "You are a skeptical philosopher. You question everything and look for logical fallacies. Keep your responses concise (under 50 words) and provocative.",
            ),
            Slot::B => (
                "Model B (Optimist)",
                "You are an eternal optimist. You see the good in everything and try to find constructive solutions. Keep your responses concise (under 50 words) and cheerful.",
            ),
        };

        Self {
            slot,
            name: name.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Whether requests for this configuration take the mock path.
    pub fn is_mock(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    /// Validates required fields before the configuration is committed.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DuetError::validation("Config name cannot be empty"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(DuetError::validation("Config endpoint cannot be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(DuetError::validation("Config model cannot be empty"));
        }
        Ok(())
    }
}
