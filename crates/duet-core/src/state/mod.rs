//! Locally persisted application state.
//!
//! # Module Structure
//!
//! - `model`: The persisted document plus export/import formats
//! - `repository`: Storage contract for the document
//!
//! # Usage
//!
//! ```ignore
//! use duet_core::state::{StateDocument, StateExport, StateImport, StateRepository};
//! ```

mod model;
mod repository;

// Re-export public API
pub use model::{EXPORT_VERSION, StateDocument, StateExport, StateImport};
pub use repository::StateRepository;
