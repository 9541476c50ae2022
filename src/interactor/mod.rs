//! Connected clients
//!
//! Every accepted connection becomes an [`Interactor`], owned by the
//! [`InteractorManager`]. The routing tables refer to it through an
//! [`InteractorHandle`], which carries the id and the sending side of the
//! interactor's write queue.

pub mod connection;
pub mod handle;
pub mod manager;

pub use connection::Interactor;
pub use handle::{InteractorHandle, InteractorId};
pub use manager::InteractorManager;
