//! Unified path management for Duet files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/duet/              # Config directory (dirs::config_dir)
//! ├── config.toml              # Application configuration
//! ├── state.json               # Profiles, personas, slot configs, sessions
//! └── logs/                    # Application logs
//!     └── duet.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for duet_core::DuetError {
    fn from(err: PathError) -> Self {
        duet_core::DuetError::config(err.to_string())
    }
}

const APP_DIR: &str = "duet";

/// Resolves every file location from one root directory.
///
/// The root is `<platform config dir>/duet` unless overridden, which tests
/// and the `--home` CLI flag use.
#[derive(Debug, Clone)]
pub struct DuetPaths {
    root: PathBuf,
}

impl DuetPaths {
    /// Creates paths rooted at `base_override`, or at the platform default.
    pub fn new(base_override: Option<PathBuf>) -> Result<Self, PathError> {
        let root = match base_override {
            Some(base) => base,
            None => dirs::config_dir()
                .ok_or(PathError::ConfigDirNotFound)?
                .join(APP_DIR),
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_root() {
        let paths = DuetPaths::new(Some(PathBuf::from("/tmp/duet-test"))).unwrap();
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/duet-test/config.toml"));
        assert_eq!(paths.state_file(), PathBuf::from("/tmp/duet-test/state.json"));
        assert_eq!(paths.logs_dir(), PathBuf::from("/tmp/duet-test/logs"));
    }
}
