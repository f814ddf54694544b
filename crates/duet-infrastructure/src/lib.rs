pub mod config_service;
pub mod dto;
pub mod json_state_repository;
pub mod paths;
pub mod rest_remote_store;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_state_repository::JsonStateRepository;
pub use crate::paths::DuetPaths;
pub use crate::rest_remote_store::RestRemoteStore;
