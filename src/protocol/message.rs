//! Wire message types
//!
//! Six message kinds travel between clients and the distributor. Clients send
//! subscription, monitor and notification requests plus data; the distributor
//! sends data and forwarded subscription requests.

use std::fmt;

use bytes::Bytes;

use super::constants::*;

/// Message kind, one per wire tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    MulticastData,
    UnicastData,
    ForwardedSubscriptionRequest,
    NotificationRequest,
    SubscriptionRequest,
    MonitorRequest,
}

impl MessageType {
    /// Wire tag for this kind
    pub fn tag(self) -> u8 {
        match self {
            MessageType::MulticastData => TAG_MULTICAST_DATA,
            MessageType::UnicastData => TAG_UNICAST_DATA,
            MessageType::ForwardedSubscriptionRequest => TAG_FORWARDED_SUBSCRIPTION_REQUEST,
            MessageType::NotificationRequest => TAG_NOTIFICATION_REQUEST,
            MessageType::SubscriptionRequest => TAG_SUBSCRIPTION_REQUEST,
            MessageType::MonitorRequest => TAG_MONITOR_REQUEST,
        }
    }

    /// Kind for a wire tag, if known
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_MULTICAST_DATA => Some(MessageType::MulticastData),
            TAG_UNICAST_DATA => Some(MessageType::UnicastData),
            TAG_FORWARDED_SUBSCRIPTION_REQUEST => Some(MessageType::ForwardedSubscriptionRequest),
            TAG_NOTIFICATION_REQUEST => Some(MessageType::NotificationRequest),
            TAG_SUBSCRIPTION_REQUEST => Some(MessageType::SubscriptionRequest),
            TAG_MONITOR_REQUEST => Some(MessageType::MonitorRequest),
            _ => None,
        }
    }
}

/// Routing key: a topic within a feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedTopic {
    pub feed: String,
    pub topic: String,
}

impl FeedTopic {
    pub fn new(feed: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feed, self.topic)
    }
}

/// Empty payloads share the wire encoding of "no payload", so fold them together.
fn normalize_payload(data: Option<Bytes>) -> Option<Bytes> {
    data.filter(|d| !d.is_empty())
}

/// Data for every subscriber of a feed and topic
///
/// An absent payload with `is_image` set tells subscribers their cached
/// image for the topic is no longer valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastData {
    pub feed: String,
    pub topic: String,
    /// Full image (true) or delta (false)
    pub is_image: bool,
    pub data: Option<Bytes>,
}

impl MulticastData {
    pub fn new(
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_image: bool,
        data: Option<Bytes>,
    ) -> Self {
        Self {
            feed: feed.into(),
            topic: topic.into(),
            is_image,
            data: normalize_payload(data),
        }
    }

    /// Invalidation sent when a topic loses its last publisher
    pub fn stale(feed_topic: &FeedTopic) -> Self {
        Self::new(feed_topic.feed.clone(), feed_topic.topic.clone(), true, None)
    }

    /// Empty image on the admin feed
    pub fn heartbeat() -> Self {
        Self::new(ADMIN_FEED, HEARTBEAT_TOPIC, true, None)
    }

    pub fn feed_topic(&self) -> FeedTopic {
        FeedTopic::new(self.feed.clone(), self.topic.clone())
    }
}

/// Data for a single subscriber of a feed and topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicastData {
    /// Id of the receiving client
    pub client_id: String,
    pub feed: String,
    pub topic: String,
    pub is_image: bool,
    pub data: Option<Bytes>,
}

impl UnicastData {
    pub fn new(
        client_id: impl Into<String>,
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_image: bool,
        data: Option<Bytes>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            feed: feed.into(),
            topic: topic.into(),
            is_image,
            data: normalize_payload(data),
        }
    }

    pub fn feed_topic(&self) -> FeedTopic {
        FeedTopic::new(self.feed.clone(), self.topic.clone())
    }
}

/// Subscription change forwarded to clients registered for notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedSubscriptionRequest {
    /// Id of the client whose subscription changed
    pub client_id: String,
    pub feed: String,
    pub topic: String,
    pub is_add: bool,
}

impl ForwardedSubscriptionRequest {
    pub fn new(
        client_id: impl Into<String>,
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_add: bool,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            feed: feed.into(),
            topic: topic.into(),
            is_add,
        }
    }
}

/// Ask to be told about subscription changes on a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub feed: String,
    pub is_add: bool,
}

impl NotificationRequest {
    pub fn new(feed: impl Into<String>, is_add: bool) -> Self {
        Self {
            feed: feed.into(),
            is_add,
        }
    }
}

/// Subscribe to, or unsubscribe from, a feed and topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub feed: String,
    pub topic: String,
    pub is_add: bool,
}

impl SubscriptionRequest {
    pub fn new(feed: impl Into<String>, topic: impl Into<String>, is_add: bool) -> Self {
        Self {
            feed: feed.into(),
            topic: topic.into(),
            is_add,
        }
    }
}

/// Subscribe to, or unsubscribe from, every topic on a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRequest {
    pub feed: String,
    pub is_add: bool,
}

impl MonitorRequest {
    pub fn new(feed: impl Into<String>, is_add: bool) -> Self {
        Self {
            feed: feed.into(),
            is_add,
        }
    }
}

/// A decoded wire message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    MulticastData(MulticastData),
    UnicastData(UnicastData),
    ForwardedSubscriptionRequest(ForwardedSubscriptionRequest),
    NotificationRequest(NotificationRequest),
    SubscriptionRequest(SubscriptionRequest),
    MonitorRequest(MonitorRequest),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::MulticastData(_) => MessageType::MulticastData,
            Message::UnicastData(_) => MessageType::UnicastData,
            Message::ForwardedSubscriptionRequest(_) => MessageType::ForwardedSubscriptionRequest,
            Message::NotificationRequest(_) => MessageType::NotificationRequest,
            Message::SubscriptionRequest(_) => MessageType::SubscriptionRequest,
            Message::MonitorRequest(_) => MessageType::MonitorRequest,
        }
    }
}

impl From<MulticastData> for Message {
    fn from(m: MulticastData) -> Self {
        Message::MulticastData(m)
    }
}

impl From<UnicastData> for Message {
    fn from(m: UnicastData) -> Self {
        Message::UnicastData(m)
    }
}

impl From<ForwardedSubscriptionRequest> for Message {
    fn from(m: ForwardedSubscriptionRequest) -> Self {
        Message::ForwardedSubscriptionRequest(m)
    }
}

impl From<NotificationRequest> for Message {
    fn from(m: NotificationRequest) -> Self {
        Message::NotificationRequest(m)
    }
}

impl From<SubscriptionRequest> for Message {
    fn from(m: SubscriptionRequest) -> Self {
        Message::SubscriptionRequest(m)
    }
}

impl From<MonitorRequest> for Message {
    fn from(m: MonitorRequest) -> Self {
        Message::MonitorRequest(m)
    }
}
