//! Profile domain: the member record, roles, and the repository trait.

pub mod model;
pub mod repository;

pub use model::{AccessMode, NewProfile, Profile, Role};
pub use repository::ProfileRepository;
