//! Subscription and monitor routing
//!
//! Topic subscriptions and whole-feed monitors are both reference counted
//! per subscriber. Data for (feed, topic) goes to the union of the topic's
//! subscribers and the feed's monitors.

pub mod entry;
pub mod manager;
pub mod repository;

pub use entry::RefCount;
pub use manager::SubscriptionManager;
pub use repository::SubscriptionRepository;
