//! Publisher tracking and stale-topic detection

pub mod manager;
pub mod repository;

pub use manager::PublisherManager;
pub use repository::PublisherRepository;
