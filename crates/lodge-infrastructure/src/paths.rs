//! Unified path management for Lodge local files.
//!
//! All Lodge configuration and state live under the platform config
//! directory; logs go to the platform data directory. Centralizing the
//! layout here keeps every storage service consistent across platforms.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/lodge/             # Config directory
//! ├── config.toml              # Backend endpoint configuration
//! └── session.toml             # Persisted session credential
//!
//! ~/.local/share/lodge/        # Data directory
//! └── logs/                    # Application logs
//!     └── lodge.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for Lodge.
pub struct LodgePaths;

impl LodgePaths {
    /// Returns the Lodge configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/lodge/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("lodge"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the Lodge data directory (for larger files such as logs).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join("lodge"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Path of the backend endpoint configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Path of the persisted session credential.
    pub fn session_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("session.toml"))
    }

    /// Directory for application log files.
    pub fn log_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_file_lives_under_config_dir() {
        let config_dir = LodgePaths::config_dir().unwrap();
        let session_file = LodgePaths::session_file().unwrap();
        assert!(session_file.starts_with(&config_dir));
        assert_eq!(session_file.file_name().unwrap(), "session.toml");
    }

    #[test]
    fn test_log_dir_lives_under_data_dir() {
        let data_dir = LodgePaths::data_dir().unwrap();
        assert!(LodgePaths::log_dir().unwrap().starts_with(&data_dir));
    }
}
