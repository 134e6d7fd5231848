//! Backend endpoint configuration.
//!
//! Loads `config.toml` from the Lodge config directory and applies
//! environment-variable overrides. Environment wins over file so a
//! developer can point an installed build at a staging backend without
//! editing files.
//!
//! Recognized variables: `LODGE_BACKEND_URL`, `LODGE_ANON_KEY`,
//! `LODGE_POLL_INTERVAL_SECS`.

use std::env;
use std::path::PathBuf;

use lodge_core::Result;
use serde::{Deserialize, Serialize};

use crate::paths::LodgePaths;
use crate::storage::AtomicTomlFile;

const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend project (auth, rest and functions endpoints
    /// hang off this).
    pub base_url: String,
    /// Public anonymous API key sent with every request.
    pub anon_key: String,
    /// Poll interval of the notification feed, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            anon_key: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Loads and caches the backend configuration.
pub struct ConfigService {
    config: BackendConfig,
}

impl ConfigService {
    /// Loads configuration from the default location with env overrides.
    ///
    /// A missing config file yields local-development defaults rather than
    /// an error; a malformed file is an error.
    pub fn load() -> Result<Self> {
        let path = LodgePaths::config_file()
            .map_err(|err| lodge_core::LodgeError::config(err.to_string()))?;
        Self::load_from(path)
    }

    /// Loads configuration from an explicit path with env overrides.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let file = AtomicTomlFile::<BackendConfig>::new(path);
        let mut config = file.load()?.unwrap_or_default();
        apply_env_overrides(&mut config);
        Ok(Self { config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

fn apply_env_overrides(config: &mut BackendConfig) {
    apply_overrides(config, |name| env::var(name).ok());
}

/// Applies overrides from a variable lookup. Split from the environment so
/// the precedence rules are testable without mutating process state.
fn apply_overrides<F>(config: &mut BackendConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("LODGE_BACKEND_URL") {
        if !url.is_empty() {
            config.base_url = url;
        }
    }
    if let Some(key) = lookup("LODGE_ANON_KEY") {
        if !key.is_empty() {
            config.anon_key = key;
        }
    }
    if let Some(interval) = lookup("LODGE_POLL_INTERVAL_SECS") {
        if let Ok(secs) = interval.parse::<u64>() {
            config.poll_interval_secs = secs;
        }
    }
}
