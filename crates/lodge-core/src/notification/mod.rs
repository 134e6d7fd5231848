//! Notification domain: the record model, the request/response repository,
//! and the push-side feed contract.

pub mod feed;
pub mod model;
pub mod repository;

pub use feed::{FeedHandle, NotificationFeed};
pub use model::Notification;
pub use repository::NotificationRepository;
