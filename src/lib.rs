//! Feedbus distributor
//!
//! An in-memory feed/topic publish-subscribe broker. Clients connect over
//! TCP, subscribe to (feed, topic) pairs or monitor whole feeds, publish
//! multicast or unicast data, and may register to be told when other clients
//! subscribe to a feed.
//!
//! # Architecture
//!
//! ```text
//!  client ──► Interactor read task ─┐
//!  client ──► Interactor read task ─┼──► event queue ──► Dispatcher task
//!  heartbeat timer ─────────────────┘                     │
//!                                          ┌──────────────┼──────────────┐
//!                                          ▼              ▼              ▼
//!                                   Subscriptions   Notifications   Publishers
//!                                          │              │              │
//!                                          └──── Delivery (write queues) ┘
//!                                                         │
//!  client ◄── Interactor write task ◄─────────────────────┘
//! ```
//!
//! Only the dispatcher task touches the routing tables, so they are plain
//! collections without locks.
//!
//! # Example
//!
//! ```no_run
//! use feedbus_distributor::{DistributorConfig, DistributorServer};
//!
//! # async fn example() -> feedbus_distributor::Result<()> {
//! let config = DistributorConfig::default();
//! let server = DistributorServer::bind(config).await?;
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

pub mod delivery;
pub mod error;
pub mod interactor;
pub mod notifications;
pub mod protocol;
pub mod publishers;
pub mod server;
pub mod stats;
pub mod subscriptions;

pub use delivery::{Delivery, SlowConsumerPolicy};
pub use error::{ConfigError, DeliveryError, Error, ProtocolError, Result};
pub use interactor::{Interactor, InteractorHandle, InteractorId, InteractorManager};
pub use protocol::{FeedTopic, Message, MessageReader, MessageWriter};
pub use server::{DistributorConfig, DistributorServer, InteractorEvent};
pub use stats::{DistributorStats, StatsSnapshot};
