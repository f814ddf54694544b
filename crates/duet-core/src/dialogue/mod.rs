//! Live dialogue state and prompt construction.
//!
//! # Module Structure
//!
//! - `state`: Turn status of the active session (`DialogueState`)
//! - `prompt`: Chat message types and request builders for each turn
//!
//! # Usage
//!
//! ```ignore
//! use duet_core::dialogue::{DialogueState, DialogueStatus, opening_request, turn_request};
//! ```

mod prompt;
mod state;

// Re-export public API
pub use prompt::{
    ChatMessage, ChatRole, HISTORY_WINDOW, opening_prompt, opening_request, turn_request,
};
pub use state::{DialogueState, DialogueStatus};
