//! Session synchronization domain.
//!
//! # Module Structure
//!
//! - `merge`: Pure local/remote reconciliation (`merge`)
//! - `state`: Authentication and sync status (`SyncState`)
//! - `remote`: Remote persistence contract and row types (`RemoteStore`)

mod merge;
mod remote;
mod state;

// Re-export public API
pub use merge::{MergeOutcome, merge};
pub use remote::{RemoteStore, SessionRow, SettingsRecord, SettingsSnapshot, millis_to_rfc3339};
pub use state::{SyncState, SyncStatus};
