//! Distributor server
//!
//! ```text
//!   accept loop ──► Connected ─┐
//!   read tasks  ──► Message ───┤
//!               ──► Closed ────┼──► event queue ──► Dispatcher
//!               ──► Faulted ───┤                   (all routing state)
//!   heartbeat   ──► Message ───┘
//! ```

pub mod config;
pub mod dispatcher;
pub mod event;
pub mod listener;

pub use config::DistributorConfig;
pub use dispatcher::Dispatcher;
pub use event::InteractorEvent;
pub use listener::DistributorServer;
