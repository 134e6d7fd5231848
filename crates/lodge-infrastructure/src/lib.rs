//! Infrastructure layer of the Lodge client core: local persistence,
//! backend configuration and logging bootstrap.

pub mod config_service;
pub mod logging;
pub mod paths;
pub mod session_storage;
pub mod storage;

pub use config_service::{BackendConfig, ConfigService};
pub use session_storage::FileSessionStorage;
