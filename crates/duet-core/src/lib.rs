//! Domain layer of Duet: two slots taking turns in a persisted dialogue.
//!
//! This crate holds the models, the pure rules (resolution, merge,
//! prompt construction) and the trait seams implemented by the
//! infrastructure and interaction crates. It performs no I/O.

pub mod clock;
pub mod config;
pub mod connection;
pub mod dialogue;
pub mod error;
pub mod generation;
pub mod participant;
pub mod persona;
pub mod session;
pub mod shared;
pub mod state;
pub mod sync;

// Re-export common error type
pub use error::{DuetError, Result};
