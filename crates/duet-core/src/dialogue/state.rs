use crate::participant::Slot;
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Turn status of the active session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueStatus {
    /// Nothing generated yet, or reset
    #[default]
    Idle,
    /// A generation call is in flight; acts as the re-entry gate
    Generating,
    /// Last turn succeeded; waiting for the next step
    Paused,
    /// Last turn failed; recoverable by starting or stepping again
    Error,
}

/// Live dialogue state, scoped to the active session.
///
/// Reset whenever the active session changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueState {
    pub status: DialogueStatus,
    pub next_turn_slot: Slot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DialogueState {
    /// Idle state positioned for the next turn of `session`.
    pub fn for_session(session: &Session) -> Self {
        Self {
            status: DialogueStatus::Idle,
            next_turn_slot: session.next_turn_slot(),
            last_error: None,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.status == DialogueStatus::Generating
    }

    pub fn begin_generation(&mut self) {
        self.status = DialogueStatus::Generating;
        self.last_error = None;
    }

    /// Records a successful turn by `slot` and hands the turn over.
    pub fn complete_turn(&mut self, slot: Slot) {
        self.status = DialogueStatus::Paused;
        self.next_turn_slot = slot.other();
        self.last_error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = DialogueStatus::Error;
        self.last_error = Some(message.into());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_cycle() {
        let mut state = DialogueState::default();
        assert_eq!(state.next_turn_slot, Slot::A);

        state.begin_generation();
        assert!(state.is_generating());

        state.complete_turn(Slot::A);
        assert_eq!(state.status, DialogueStatus::Paused);
        assert_eq!(state.next_turn_slot, Slot::B);
    }

    #[test]
    fn test_failure_keeps_slot_and_records_error() {
        let mut state = DialogueState::default();
        state.complete_turn(Slot::A);
        state.begin_generation();
        state.fail("HTTP 500");

        assert_eq!(state.status, DialogueStatus::Error);
        assert_eq!(state.next_turn_slot, Slot::B);
        assert_eq!(state.last_error.as_deref(), Some("HTTP 500"));

        state.begin_generation();
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DialogueStatus::Generating).unwrap();
        assert_eq!(json, "\"generating\"");
    }
}
