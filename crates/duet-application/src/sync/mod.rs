//! Remote synchronization: debounced push, sign-in pull and merge.
//!
//! - `debounce`: trailing-edge timer with real cancellation
//! - `coordinator`: owns the timers and the sync status

mod coordinator;
mod debounce;

pub use coordinator::SyncCoordinator;
pub use debounce::DebounceTimer;
