//! In-memory session collection.
//!
//! Owns every session plus the single active-session pointer. Persistence
//! of the collection is handled by the application layer, which serializes
//! it as part of the state document.

use super::model::{DEFAULT_TOPIC, Session};
use crate::error::{DuetError, Result};
use crate::participant::GenerationConfig;

/// Result of deleting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the deleted session was the active one
    pub was_active: bool,
    /// Session activated in its place, if any
    pub activated: Option<String>,
}

/// Collection of sessions with exactly zero or one active session.
///
/// Sessions are kept newest-first: `create` prepends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRepository {
    sessions: Vec<Session>,
    active_session_id: Option<String>,
}

impl SessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the collection from persisted parts.
    ///
    /// An active id that does not match any session is dropped.
    pub fn from_parts(sessions: Vec<Session>, active_session_id: Option<String>) -> Self {
        let active_session_id =
            active_session_id.filter(|id| sessions.iter().any(|s| &s.id == id));
        Self {
            sessions,
            active_session_id,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn active(&self) -> Option<&Session> {
        let id = self.active_session_id.as_deref()?;
        self.get(id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        let id = self.active_session_id.clone()?;
        self.get_mut(&id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Creates a session, prepends it, and makes it active.
    ///
    /// A missing or blank topic falls back to [`DEFAULT_TOPIC`].
    pub fn create(
        &mut self,
        topic: Option<&str>,
        config_a: GenerationConfig,
        config_b: GenerationConfig,
    ) -> &Session {
        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC);
        let session = Session::new(topic, config_a, config_b);

        tracing::debug!("[SessionRepository] Created session {}", session.id);
        self.active_session_id = Some(session.id.clone());
        self.sessions.insert(0, session);
        &self.sessions[0]
    }

    /// Makes `id` the active session.
    ///
    /// # Errors
    ///
    /// Returns [`DuetError::NotFound`] if no session has that id.
    pub fn switch_to(&mut self, id: &str) -> Result<&Session> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DuetError::not_found("Session", id))?;

        self.active_session_id = Some(id.to_string());
        Ok(&self.sessions[index])
    }

    /// Deletes `id`.
    ///
    /// When the active session is deleted, the most recently created
    /// remaining session becomes active, or none if the collection is empty.
    pub fn delete(&mut self, id: &str) -> Result<DeleteOutcome> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DuetError::not_found("Session", id))?;
        self.sessions.remove(index);

        let was_active = self.active_session_id.as_deref() == Some(id);
        if !was_active {
            return Ok(DeleteOutcome {
                was_active,
                activated: None,
            });
        }

        let mut newest: Option<&Session> = None;
        for session in &self.sessions {
            if newest.is_none_or(|n| session.created_at > n.created_at) {
                newest = Some(session);
            }
        }
        self.active_session_id = newest.map(|s| s.id.clone());

        tracing::debug!(
            "[SessionRepository] Deleted active session {}, now active: {:?}",
            id,
            self.active_session_id
        );
        Ok(DeleteOutcome {
            was_active,
            activated: self.active_session_id.clone(),
        })
    }

    /// Renames `id`, bumping its `updated_at`.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DuetError::validation("Session title cannot be empty"));
        }
        let session = self
            .get_mut(id)
            .ok_or_else(|| DuetError::not_found("Session", id))?;
        session.rename(title);
        Ok(())
    }

    /// Replaces the whole collection.
    ///
    /// The active pointer survives only if its session is still present.
    pub fn replace_all(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
        let dangling = self
            .active_session_id
            .as_deref()
            .is_some_and(|id| !self.sessions.iter().any(|s| s.id == id));
        if dangling {
            self.active_session_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Slot;

    fn configs() -> (GenerationConfig, GenerationConfig) {
        (
            GenerationConfig::default_for(Slot::A),
            GenerationConfig::default_for(Slot::B),
        )
    }

    fn create(repo: &mut SessionRepository, topic: &str) -> String {
        let (a, b) = configs();
        repo.create(Some(topic), a, b).id.clone()
    }

    #[test]
    fn test_create_prepends_and_activates() {
        let mut repo = SessionRepository::new();
        let first = create(&mut repo, "one");
        let second = create(&mut repo, "two");

        assert_eq!(repo.sessions()[0].id, second);
        assert_eq!(repo.sessions()[1].id, first);
        assert_eq!(repo.active_session_id(), Some(second.as_str()));
    }

    #[test]
    fn test_create_defaults_topic() {
        let mut repo = SessionRepository::new();
        let (a, b) = configs();
        let session = repo.create(Some("   "), a, b);
        assert_eq!(session.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_switch_to_unknown_fails() {
        let mut repo = SessionRepository::new();
        create(&mut repo, "one");
        let err = repo.switch_to("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_only_session_clears_active() {
        let mut repo = SessionRepository::new();
        let id = create(&mut repo, "only");

        let outcome = repo.delete(&id).unwrap();
        assert!(outcome.was_active);
        assert_eq!(outcome.activated, None);
        assert!(repo.active().is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_delete_active_activates_newest_remaining() {
        let mut repo = SessionRepository::new();
        let oldest = create(&mut repo, "oldest");
        let middle = create(&mut repo, "middle");
        let newest = create(&mut repo, "newest");
        repo.get_mut(&oldest).unwrap().created_at = 1;
        repo.get_mut(&middle).unwrap().created_at = 2;
        repo.get_mut(&newest).unwrap().created_at = 3;

        repo.switch_to(&oldest).unwrap();
        let outcome = repo.delete(&oldest).unwrap();
        assert_eq!(outcome.activated.as_deref(), Some(newest.as_str()));
    }

    #[test]
    fn test_delete_non_active_keeps_pointer() {
        let mut repo = SessionRepository::new();
        let other = create(&mut repo, "other");
        let active = create(&mut repo, "active");

        let outcome = repo.delete(&other).unwrap();
        assert!(!outcome.was_active);
        assert_eq!(repo.active_session_id(), Some(active.as_str()));
    }

    #[test]
    fn test_rename_rejects_blank_title() {
        let mut repo = SessionRepository::new();
        let id = create(&mut repo, "one");
        assert!(repo.rename(&id, "").is_err());
        repo.rename(&id, "renamed").unwrap();
        assert_eq!(repo.get(&id).unwrap().topic, "renamed");
    }

    #[test]
    fn test_replace_all_drops_dangling_active() {
        let mut repo = SessionRepository::new();
        create(&mut repo, "one");
        repo.replace_all(Vec::new());
        assert!(repo.active_session_id().is_none());
    }

    #[test]
    fn test_from_parts_drops_unknown_active() {
        let repo = SessionRepository::from_parts(Vec::new(), Some("ghost".to_string()));
        assert!(repo.active_session_id().is_none());
    }
}
