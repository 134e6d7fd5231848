//! Orchestration layer of the Lodge client core.
//!
//! Wires the domain traits into the running application: the session
//! store, the profile resolver, the view-state controller, the
//! notification fan-out and the environment advisors. Everything here is
//! backend-agnostic; concrete transports come from `lodge-backend` (or
//! mocks in tests).

pub mod account_check;
pub mod advisors;
pub mod controller;
pub mod notification_center;
pub mod profile_resolver;
pub mod session_store;

pub use advisors::{Advisory, ConnectivityAdvisor, InstallAdvisor};
pub use controller::AppController;
pub use notification_center::NotificationCenter;
pub use profile_resolver::{ProfileResolver, Resolution};
pub use session_store::{SessionStore, SessionStoreOptions};
