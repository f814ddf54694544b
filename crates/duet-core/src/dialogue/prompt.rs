//! Chat request construction for each turn.

use crate::participant::GenerationConfig;
use crate::session::Message;
use serde::{Deserialize, Serialize};

/// Number of most recent transcript messages sent as history.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One entry of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The seed instruction given to slot A when a dialogue starts.
pub fn opening_prompt(topic: &str) -> String {
    format!("The topic is: \"{topic}\". Start a conversation about this.")
}

/// Request for the opening turn.
pub fn opening_request(config: &GenerationConfig, topic: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(config.system_prompt.clone()),
        ChatMessage::user(opening_prompt(topic)),
    ]
}

/// Request for a follow-up turn by `config.slot`.
///
/// The acting slot's own messages become `assistant` entries and the other
/// slot's become `user` entries, so each participant sees the dialogue from
/// its own side.
pub fn turn_request(config: &GenerationConfig, transcript: &[Message]) -> Vec<ChatMessage> {
    let start = transcript.len().saturating_sub(HISTORY_WINDOW);
    let mut request = Vec::with_capacity(transcript.len() - start + 1);
    request.push(ChatMessage::system(config.system_prompt.clone()));

    for message in &transcript[start..] {
        if message.sender_slot == config.slot {
            request.push(ChatMessage::assistant(message.content.clone()));
        } else {
            request.push(ChatMessage::user(message.content.clone()));
        }
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Slot;

    fn message(i: usize, slot: Slot) -> Message {
        Message {
            id: format!("m{i}"),
            sender_slot: slot,
            sender_name: slot.to_string(),
            content: format!("message {i}"),
            timestamp: i as i64,
        }
    }

    #[test]
    fn test_opening_request() {
        let config = GenerationConfig::default_for(Slot::A);
        let request = opening_request(&config, "Cats vs Dogs");

        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, ChatRole::System);
        assert_eq!(request[0].content, config.system_prompt);
        assert_eq!(
            request[1].content,
            "The topic is: \"Cats vs Dogs\". Start a conversation about this."
        );
    }

    #[test]
    fn test_turn_request_maps_roles_from_actor_perspective() {
        let config = GenerationConfig::default_for(Slot::B);
        let transcript = vec![message(0, Slot::A), message(1, Slot::B), message(2, Slot::A)];
        let request = turn_request(&config, &transcript);

        let roles: Vec<ChatRole> = request.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User
            ]
        );
    }

    #[test]
    fn test_turn_request_keeps_last_ten() {
        let config = GenerationConfig::default_for(Slot::A);
        let transcript: Vec<Message> = (0..15)
            .map(|i| message(i, if i % 2 == 0 { Slot::A } else { Slot::B }))
            .collect();
        let request = turn_request(&config, &transcript);

        assert_eq!(request.len(), HISTORY_WINDOW + 1);
        assert_eq!(request[1].content, "message 5");
        assert_eq!(request.last().unwrap().content, "message 14");
    }
}
