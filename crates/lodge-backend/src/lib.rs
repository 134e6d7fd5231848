//! Backend layer of the Lodge client core.
//!
//! HTTP implementations of the traits in `lodge-core`, targeting a hosted
//! backend-as-a-service: REST auth endpoints, auto-generated table REST,
//! serverless functions, and an explicit polling feed standing in for the
//! service's websocket transport.

pub mod auth_client;
pub mod claims;
pub mod functions_client;
mod http;
pub mod notification_client;
pub mod profile_client;
pub mod realtime;

pub use auth_client::HttpAuthGateway;
pub use functions_client::HttpFunctionInvoker;
pub use http::TokenCell;
pub use notification_client::HttpNotificationRepository;
pub use profile_client::HttpProfileRepository;
pub use realtime::PollingNotificationFeed;
