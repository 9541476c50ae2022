//! Events carried on the shared event queue

use crate::error::Error;
use crate::interactor::{Interactor, InteractorHandle};
use crate::protocol::Message;

/// Everything the dispatcher reacts to
#[derive(Debug)]
pub enum InteractorEvent {
    /// A newly accepted connection, not yet started
    Connected(Interactor),

    /// A message to route. `from` is `None` for server-generated traffic
    /// such as heartbeats.
    Message {
        from: Option<InteractorHandle>,
        message: Message,
    },

    /// The peer closed its stream cleanly
    Closed(InteractorHandle),

    /// Reading or writing failed
    Faulted(InteractorHandle, Error),

    /// Stop dispatching and close every interactor
    Shutdown,
}
