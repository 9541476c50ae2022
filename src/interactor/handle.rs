//! Interactor identity and routing handle

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::protocol::Message;

/// Opaque unique id of a connected peer
///
/// Sent to other clients as the `client_id` of forwarded subscriptions and
/// used by publishers to address unicast data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractorId(String);

impl InteractorId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InteractorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for InteractorId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for InteractorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cheap cloneable reference to a connected peer
///
/// The routing tables hold handles, never the interactor itself. Equality and
/// hashing use the id alone.
#[derive(Clone)]
pub struct InteractorHandle {
    id: InteractorId,
    peer_addr: SocketAddr,
    sender: mpsc::Sender<Message>,
}

impl InteractorHandle {
    pub fn new(id: InteractorId, peer_addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            peer_addr,
            sender,
        }
    }

    pub fn id(&self) -> &InteractorId {
        &self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Outbound write queue
    pub(crate) fn sender(&self) -> &mpsc::Sender<Message> {
        &self.sender
    }

    /// True once the write task has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for InteractorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InteractorHandle {}

impl Hash for InteractorHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for InteractorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractorHandle")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

impl fmt::Display for InteractorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.peer_addr)
    }
}
