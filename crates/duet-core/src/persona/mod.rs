//! Persona domain module.
//!
//! A persona is a reusable display name + system prompt bound to a
//! connection profile. The binding is a weak reference: deleting the
//! profile leaves the persona in place, and resolution reports the dangling
//! reference instead.
//!
//! # Module Structure
//!
//! - `model`: Core persona domain model (`Persona`)
//! - `request`: Validated create request and field-level patch
//!
//! # Usage
//!
//! ```ignore
//! use duet_core::persona::{NewPersona, Persona, PersonaPatch};
//! ```

mod model;
pub mod request;

// Re-export public API
pub use model::Persona;
pub use request::{NewPersona, PersonaPatch};
