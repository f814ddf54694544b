//! Application layer for Duet.
//!
//! This crate coordinates the domain types from `duet-core` with the
//! storage, remote and generation seams they define:
//!
//! - [`store::AppStore`]: owns the in-memory state and persists it
//! - [`turn_engine::TurnEngine`]: drives the two-slot dialogue
//! - [`sync::SyncCoordinator`]: pushes and pulls against the remote store
//! - [`shared_fetcher::SharedTranscriptFetcher`]: loads shared transcripts

pub mod shared_fetcher;
pub mod store;
pub mod sync;
pub mod turn_engine;

pub use shared_fetcher::{CachePolicy, SharedTranscriptFetcher};
pub use store::{AppState, AppStore, StoreChange};
pub use sync::{DebounceTimer, SyncCoordinator};
pub use turn_engine::{TurnEngine, TurnOutcome};
