//! Feedbus wire protocol
//!
//! Each message is a one byte type tag followed by its fields. Strings carry
//! a 16-bit length, payloads a 32-bit length where zero means "no payload".

pub mod codec;
pub mod constants;
pub mod message;
pub mod stream;

pub use codec::{decode, encode, Decoder, Encoder};
pub use message::{
    FeedTopic, ForwardedSubscriptionRequest, Message, MessageType, MonitorRequest,
    MulticastData, NotificationRequest, SubscriptionRequest, UnicastData,
};
pub use stream::{MessageReader, MessageWriter};
