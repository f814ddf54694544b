//! Session domain model.

use super::message::Message;
use crate::clock;
use crate::error::{DuetError, Result};
use crate::participant::{GenerationConfig, Slot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Topic given to sessions created without one.
pub const DEFAULT_TOPIC: &str = "New Conversation";
/// Preview shown for sessions without messages.
pub const EMPTY_PREVIEW: &str = "Empty conversation";
/// Number of characters of the latest message kept in the preview.
pub const PREVIEW_CHARS: usize = 50;

/// One persisted conversation: the unit of local persistence and of sync.
///
/// `updated_at` is bumped on every mutation made through the methods below
/// and is the only key used for conflict resolution, so mutations must go
/// through them rather than through the public fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable title; also the seed topic of the dialogue
    pub topic: String,
    /// Transcript in insertion order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time in milliseconds (older documents call this `timestamp`)
    #[serde(alias = "timestamp")]
    pub created_at: i64,
    /// Last mutation time in milliseconds
    #[serde(default)]
    pub updated_at: i64,
    /// Short excerpt of the latest message
    #[serde(default)]
    pub preview: String,
    /// Slot A configuration used for this transcript
    #[serde(alias = "modelA", default = "default_config_a")]
    pub config_a: GenerationConfig,
    /// Slot B configuration used for this transcript
    #[serde(alias = "modelB", default = "default_config_b")]
    pub config_b: GenerationConfig,
}

fn default_config_a() -> GenerationConfig {
    GenerationConfig::default_for(Slot::A)
}

fn default_config_b() -> GenerationConfig {
    GenerationConfig::default_for(Slot::B)
}

impl Session {
    /// Creates an empty session seeded with the given slot configurations.
    pub fn new(topic: impl Into<String>, config_a: GenerationConfig, config_b: GenerationConfig) -> Self {
        let now = clock::now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            preview: EMPTY_PREVIEW.to_string(),
            config_a,
            config_b,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The slot whose turn it is, derived from the last message's sender.
    pub fn next_turn_slot(&self) -> Slot {
        match self.last_message() {
            Some(last) if last.sender_slot == self.config_a.slot => self.config_b.slot,
            _ => self.config_a.slot,
        }
    }

    pub fn config_for(&self, slot: Slot) -> &GenerationConfig {
        match slot {
            Slot::A => &self.config_a,
            Slot::B => &self.config_b,
        }
    }

    /// Stores a copy of `config` in the matching slot.
    pub fn set_config(&mut self, config: GenerationConfig) {
        match config.slot {
            Slot::A => self.config_a = config,
            Slot::B => self.config_b = config,
        }
        self.touch();
    }

    /// Appends a message and returns it.
    ///
    /// The timestamp never goes below the previous message's timestamp.
    pub fn append_message(&mut self, sender_slot: Slot, sender_name: &str, content: &str) -> &Message {
        let previous = self.last_message().map(|m| m.timestamp).unwrap_or(i64::MIN);
        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_slot,
            sender_name: sender_name.to_string(),
            content: content.to_string(),
            timestamp: clock::not_before(previous, clock::now_millis()),
        };
        self.messages.push(message);
        self.refresh_preview();
        self.touch();
        &self.messages[self.messages.len() - 1]
    }

    /// Removes the message with `message_id` and everything after it.
    ///
    /// Returns the removed target message, or `None` (and leaves the session
    /// untouched) if no such message exists.
    pub fn truncate_from(&mut self, message_id: &str) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == message_id)?;
        let mut removed = self.messages.split_off(index);
        self.refresh_preview();
        self.touch();
        Some(removed.swap_remove(0))
    }

    /// Removes every message.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.refresh_preview();
        self.touch();
    }

    pub fn rename(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
        self.touch();
    }

    /// Bumps `updated_at` to a value strictly greater than before.
    pub fn touch(&mut self) {
        self.updated_at = clock::bump_after(self.updated_at, clock::now_millis());
    }

    fn refresh_preview(&mut self) {
        self.preview = match self.last_message() {
            Some(last) => preview_of(&last.content),
            None => EMPTY_PREVIEW.to_string(),
        };
    }

    /// Checks the structural invariants of a session read from outside
    /// (import documents, remote rows).
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DuetError::validation("Session id cannot be empty"));
        }

        let mut seen = HashSet::new();
        let mut previous = i64::MIN;
        for message in &self.messages {
            if message.id.trim().is_empty() {
                return Err(DuetError::validation(format!(
                    "Session '{}' contains a message without id",
                    self.id
                )));
            }
            if !seen.insert(message.id.as_str()) {
                return Err(DuetError::validation(format!(
                    "Session '{}' contains duplicate message id '{}'",
                    self.id, message.id
                )));
            }
            if message.timestamp < previous {
                return Err(DuetError::validation(format!(
                    "Session '{}' has out-of-order message '{}'",
                    self.id, message.id
                )));
            }
            previous = message.timestamp;
        }

        Ok(())
    }
}

/// Builds the preview text for a message body.
pub(crate) fn preview_of(content: &str) -> String {
    let excerpt: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{excerpt}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            "Cats vs Dogs",
            GenerationConfig::default_for(Slot::A),
            GenerationConfig::default_for(Slot::B),
        )
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = session();
        assert!(s.messages.is_empty());
        assert_eq!(s.preview, EMPTY_PREVIEW);
        assert_eq!(s.next_turn_slot(), Slot::A);
    }

    #[test]
    fn test_append_bumps_updated_at_and_preview() {
        let mut s = session();
        let before = s.updated_at;
        s.append_message(Slot::A, "Skeptic", "Are cats really better?");

        assert!(s.updated_at > before);
        assert_eq!(s.preview, "Are cats really better?...");
        assert_eq!(s.next_turn_slot(), Slot::B);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let preview = preview_of(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let mut s = session();
        for i in 0..20 {
            let slot = if i % 2 == 0 { Slot::A } else { Slot::B };
            s.append_message(slot, "x", "y");
        }
        assert!(s.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_truncate_from_removes_target_and_tail() {
        let mut s = session();
        s.append_message(Slot::A, "a", "one");
        let target = s.append_message(Slot::B, "b", "two").id.clone();
        s.append_message(Slot::A, "a", "three");

        let removed = s.truncate_from(&target).unwrap();
        assert_eq!(removed.content, "two");
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.preview, "one...");
    }

    #[test]
    fn test_truncate_unknown_id_is_noop() {
        let mut s = session();
        s.append_message(Slot::A, "a", "one");
        let updated = s.updated_at;
        assert!(s.truncate_from("missing").is_none());
        assert_eq!(s.updated_at, updated);
    }

    #[test]
    fn test_rename_bumps_updated_at() {
        let mut s = session();
        let before = s.updated_at;
        s.rename("Tabs vs Spaces");
        assert_eq!(s.topic, "Tabs vs Spaces");
        assert!(s.updated_at > before);
    }

    #[test]
    fn test_validate_rejects_out_of_order() {
        let mut s = session();
        s.append_message(Slot::A, "a", "one");
        s.append_message(Slot::B, "b", "two");
        s.messages[1].timestamp = s.messages[0].timestamp - 10;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_legacy_session_shape() {
        let json = r#"{
            "id": "s1",
            "topic": "Legacy",
            "messages": [
                {"id": "m1", "senderId": "modelA", "senderName": "A", "content": "hi", "timestamp": 5}
            ],
            "timestamp": 1,
            "preview": "hi...",
            "modelA": {"id": "modelA", "name": "A", "endpoint": "https://x", "apiKey": "", "model": "m", "systemPrompt": ""}
        }"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.created_at, 1);
        assert_eq!(s.messages[0].sender_slot, Slot::A);
        assert_eq!(s.config_b.slot, Slot::B);
    }
}
