use super::config::GenerationConfig;
use super::slot::Slot;
use crate::connection::ConnectionProfile;
use crate::error::{DuetError, Result};
use crate::persona::Persona;

/// Resolves a persona and its connection profile into a slot configuration.
///
/// Pure lookup: the caller decides what to do with the result. On failure
/// the caller must keep its previous configuration untouched.
///
/// # Errors
///
/// - [`DuetError::UnknownPersona`] if `persona_id` is not in `personas`
/// - [`DuetError::DanglingProfile`] if the persona's profile was deleted
pub fn resolve(
    slot: Slot,
    persona_id: &str,
    personas: &[Persona],
    profiles: &[ConnectionProfile],
) -> Result<GenerationConfig> {
    let persona = personas
        .iter()
        .find(|p| p.id == persona_id)
        .ok_or_else(|| DuetError::UnknownPersona {
            persona_id: persona_id.to_string(),
        })?;

    let profile = profiles
        .iter()
        .find(|c| c.id == persona.connection_profile_id)
        .ok_or_else(|| DuetError::DanglingProfile {
            persona_id: persona.id.clone(),
            profile_id: persona.connection_profile_id.clone(),
        })?;

    Ok(GenerationConfig {
        slot,
        name: persona.name.clone(),
        endpoint: profile.url.clone(),
        api_key: profile.api_key.clone(),
        model: profile.model.clone(),
        system_prompt: persona.system_prompt.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> ConnectionProfile {
        ConnectionProfile {
            id: id.to_string(),
            name: "OpenRouter".to_string(),
            url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            created_at: 1,
        }
    }

    fn persona(id: &str, profile_id: &str) -> Persona {
        Persona {
            id: id.to_string(),
            name: "Socrates".to_string(),
            system_prompt: "Ask questions.".to_string(),
            connection_profile_id: profile_id.to_string(),
            created_at: 2,
        }
    }

    #[test]
    fn test_resolve_success() {
        let config = resolve(
            Slot::B,
            "p1",
            &[persona("p1", "c1")],
            &[profile("c1")],
        )
        .unwrap();

        assert_eq!(config.slot, Slot::B);
        assert_eq!(config.name, "Socrates");
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.system_prompt, "Ask questions.");
    }

    #[test]
    fn test_resolve_unknown_persona() {
        let err = resolve(Slot::A, "missing", &[], &[profile("c1")]).unwrap_err();
        assert!(matches!(err, DuetError::UnknownPersona { .. }));
    }

    #[test]
    fn test_resolve_dangling_profile() {
        let err = resolve(Slot::A, "p1", &[persona("p1", "gone")], &[profile("c1")]).unwrap_err();
        assert_eq!(
            err,
            DuetError::DanglingProfile {
                persona_id: "p1".to_string(),
                profile_id: "gone".to_string(),
            }
        );
    }
}
