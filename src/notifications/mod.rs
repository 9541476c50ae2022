//! Subscription-change notifications

pub mod manager;
pub mod repository;

pub use manager::NotificationManager;
pub use repository::NotificationRepository;
