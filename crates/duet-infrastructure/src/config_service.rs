//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `config.toml` and applies environment
//! overrides for the remote store credentials.

use crate::paths::DuetPaths;
use crate::storage::{AtomicFile, FileFormat};
use duet_core::config::AppConfig;
use duet_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Environment variable overriding `remote.url`.
pub const ENV_REMOTE_URL: &str = "DUET_REMOTE_URL";
/// Environment variable overriding `remote.anon_key`.
pub const ENV_REMOTE_ANON_KEY: &str = "DUET_REMOTE_ANON_KEY";
/// Environment variable overriding `remote.access_token`.
pub const ENV_REMOTE_ACCESS_TOKEN: &str = "DUET_REMOTE_ACCESS_TOKEN";

/// Configuration service that loads and caches the application config.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicFile<AppConfig>>,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::new(path, FileFormat::Toml)),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_paths(paths: &DuetPaths) -> Self {
        Self::new(paths.config_file())
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// A missing file yields defaults. A malformed file is an error rather
    /// than a silent fallback.
    pub fn get_config(&self) -> Result<AppConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut loaded = self.file.load()?.unwrap_or_default();
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());
        tracing::debug!("[ConfigService] Loaded config from {:?}", self.file.path());

        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes `config` to disk and refreshes the cache.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        self.file.replace(config)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
    }
}

/// Applies non-empty environment values on top of the file configuration.
fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = value(ENV_REMOTE_URL) {
        config.remote.url = Some(url);
    }
    if let Some(key) = value(ENV_REMOTE_ANON_KEY) {
        config.remote.anon_key = Some(key);
    }
    if let Some(token) = value(ENV_REMOTE_ACCESS_TOKEN) {
        config.remote.access_token = Some(token);
    }
}
