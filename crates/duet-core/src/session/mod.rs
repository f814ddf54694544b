//! Session domain module.
//!
//! This module contains the session model, its messages, and the in-memory
//! repository that owns the session collection and the active-session
//! pointer.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`)
//! - `message`: Transcript message type (`Message`)
//! - `repository`: In-memory collection with create/switch/delete/rename
//!
//! # Usage
//!
//! ```ignore
//! use duet_core::session::{Message, Session, SessionRepository};
//! ```

mod message;
mod model;
mod repository;

// Re-export public API
pub use message::Message;
pub use model::{DEFAULT_TOPIC, EMPTY_PREVIEW, PREVIEW_CHARS, Session};
pub use repository::{DeleteOutcome, SessionRepository};
