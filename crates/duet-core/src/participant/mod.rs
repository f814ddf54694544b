//! Participant domain module.
//!
//! A dialogue has exactly two participant positions, [`Slot::A`] and
//! [`Slot::B`]. Each slot is occupied by a [`GenerationConfig`], a snapshot
//! resolved from a persona and its connection profile.
//!
//! - `slot`: the stable slot identity
//! - `config`: generation configuration snapshot and defaults
//! - `resolver`: persona + profile resolution

mod config;
mod resolver;
mod slot;

pub use config::{DEFAULT_ENDPOINT, DEFAULT_MODEL, GenerationConfig};
pub use resolver::resolve;
pub use slot::Slot;
