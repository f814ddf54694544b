//! Connection profile domain module.
//!
//! A connection profile is a reusable endpoint URL + credential + model
//! identifier. Personas reference profiles by id.

mod model;
pub mod request;

pub use model::ConnectionProfile;
pub use request::{ConnectionProfilePatch, NewConnectionProfile};
