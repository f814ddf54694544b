//! Persona creation and update request models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Persona;
use crate::clock;
use crate::error::{DuetError, Result};

/// Request to create a new persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersona {
    /// Display name (required)
    pub name: String,

    /// System prompt (required)
    pub system_prompt: String,

    /// Connection profile id (required, not checked for existence)
    pub connection_profile_id: String,
}

impl NewPersona {
    /// Validate the request and return an error describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DuetError::validation(
                "Persona name is required and cannot be empty",
            ));
        }

        if self.system_prompt.trim().is_empty() {
            return Err(DuetError::validation(
                "Persona system prompt is required and cannot be empty",
            ));
        }

        if self.connection_profile_id.trim().is_empty() {
            return Err(DuetError::validation(
                "Persona must reference a connection profile",
            ));
        }

        Ok(())
    }

    /// Validates the request and converts it into a Persona with a fresh UUID.
    pub fn into_persona(self) -> Result<Persona> {
        self.validate()?;

        Ok(Persona {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            system_prompt: self.system_prompt,
            connection_profile_id: self.connection_profile_id,
            created_at: clock::now_millis(),
        })
    }
}

/// Field-level update for an existing persona.
///
/// `None` leaves a field unchanged. The patch is applied to a copy and
/// validated before it replaces the stored persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_profile_id: Option<String>,
}

impl PersonaPatch {
    /// Returns the patched persona, or an error if a required field would
    /// become empty. `persona` itself is never modified.
    pub fn apply_to(&self, persona: &Persona) -> Result<Persona> {
        let patched = Persona {
            id: persona.id.clone(),
            name: self.name.clone().unwrap_or_else(|| persona.name.clone()),
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| persona.system_prompt.clone()),
            connection_profile_id: self
                .connection_profile_id
                .clone()
                .unwrap_or_else(|| persona.connection_profile_id.clone()),
            created_at: persona.created_at,
        };

        NewPersona {
            name: patched.name.clone(),
            system_prompt: patched.system_prompt.clone(),
            connection_profile_id: patched.connection_profile_id.clone(),
        }
        .validate()?;

        Ok(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewPersona {
        NewPersona {
            name: "Skeptic".to_string(),
            system_prompt: "Question everything.".to_string(),
            connection_profile_id: "c1".to_string(),
        }
    }

    #[test]
    fn test_validate_success() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let req = NewPersona {
            name: "  ".to_string(),
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_into_persona_generates_uuid() {
        let persona = request().into_persona().unwrap();
        assert!(Uuid::parse_str(&persona.id).is_ok());
        assert_eq!(persona.connection_profile_id, "c1");
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let persona = request().into_persona().unwrap();
        let patch = PersonaPatch {
            name: Some("Cynic".to_string()),
            ..Default::default()
        };

        let patched = patch.apply_to(&persona).unwrap();
        assert_eq!(patched.name, "Cynic");
        assert_eq!(patched.system_prompt, persona.system_prompt);
        assert_eq!(patched.id, persona.id);
    }

    #[test]
    fn test_patch_rejects_blank_prompt() {
        let persona = request().into_persona().unwrap();
        let patch = PersonaPatch {
            system_prompt: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.apply_to(&persona).is_err());
    }
}
