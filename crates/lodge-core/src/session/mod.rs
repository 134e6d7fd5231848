//! Session domain: credential model, transition events, and the traits the
//! session store depends on.

pub mod event;
pub mod gateway;
pub mod model;
pub mod storage;

pub use event::AuthEvent;
pub use gateway::AuthGateway;
pub use model::{Credentials, IdentityClaims, Session};
pub use storage::SessionTokenStorage;
