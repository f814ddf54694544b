//! Data Transfer Objects (DTOs) for the remote REST tables.
//!
//! Column names follow the database (snake_case); the JSON payload columns
//! (`settings`, `content`) carry the camelCase domain documents unchanged.
//! These types are private to the infrastructure layer.

mod remote;

pub use remote::{
    ProfileRowDto, ProfileSettingsDto, SessionContentDto, SessionRowDto, SharedSessionDto,
};
