//! Connection profile creation and update request models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ConnectionProfile;
use crate::clock;
use crate::error::{DuetError, Result};

/// Request to create a new connection profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConnectionProfile {
    pub name: String,
    pub url: String,
    /// May be empty (mock mode)
    #[serde(default)]
    pub api_key: String,
    pub model: String,
}

impl NewConnectionProfile {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DuetError::validation("Profile name cannot be empty"));
        }

        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DuetError::validation(format!(
                "Profile URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }

        if self.model.trim().is_empty() {
            return Err(DuetError::validation("Profile model cannot be empty"));
        }

        Ok(())
    }

    /// Validates the request and converts it into a profile with a fresh UUID.
    pub fn into_profile(self) -> Result<ConnectionProfile> {
        self.validate()?;

        Ok(ConnectionProfile {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            url: self.url.trim().to_string(),
            api_key: self.api_key,
            model: self.model,
            created_at: clock::now_millis(),
        })
    }
}

/// Field-level update for an existing connection profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ConnectionProfilePatch {
    /// Returns the patched profile after validating it; `profile` is untouched.
    pub fn apply_to(&self, profile: &ConnectionProfile) -> Result<ConnectionProfile> {
        let candidate = NewConnectionProfile {
            name: self.name.clone().unwrap_or_else(|| profile.name.clone()),
            url: self.url.clone().unwrap_or_else(|| profile.url.clone()),
            api_key: self.api_key.clone().unwrap_or_else(|| profile.api_key.clone()),
            model: self.model.clone().unwrap_or_else(|| profile.model.clone()),
        };
        candidate.validate()?;

        Ok(ConnectionProfile {
            id: profile.id.clone(),
            name: candidate.name,
            url: candidate.url.trim().to_string(),
            api_key: candidate.api_key,
            model: candidate.model,
            created_at: profile.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewConnectionProfile {
        NewConnectionProfile {
            name: "OpenRouter".to_string(),
            url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn test_empty_api_key_is_allowed() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let req = NewConnectionProfile {
            url: "ftp://example.com".to_string(),
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_patch_updates_key_only() {
        let profile = request().into_profile().unwrap();
        let patch = ConnectionProfilePatch {
            api_key: Some("sk-live".to_string()),
            ..Default::default()
        };

        let patched = patch.apply_to(&profile).unwrap();
        assert_eq!(patched.api_key, "sk-live");
        assert_eq!(patched.url, profile.url);
        assert_eq!(patched.created_at, profile.created_at);
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut profile = request().into_profile().unwrap();
        profile.api_key = "sk-secret".to_string();
        let rendered = format!("{profile:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}
