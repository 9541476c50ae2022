//! Error types
//!
//! Per-connection failures (`Protocol`, `Io`) are contained to the connection
//! that raised them. `Config` errors surface at startup only.

use std::time::Duration;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unrecognised wire data
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Outbound queue rejected a message
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl Error {
    /// True when the stream simply ended.
    ///
    /// Such errors are treated as a normal disconnect. Resets, aborts and
    /// broken pipes are faults.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

/// Wire protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// First byte of a message is not a known message type
    #[error("unknown message type tag {0}")]
    UnknownMessageType(u8),

    /// Stream ended part way through a message
    #[error("stream ended mid-message ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// String field was not valid UTF-8
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// String field does not fit a 16-bit length prefix
    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    /// Payload length prefix is negative or above the configured maximum
    #[error("invalid payload length {length} (max {max})")]
    InvalidPayloadLength { length: i64, max: usize },
}

/// Errors delivering a message onto an interactor's write queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Write queue full and the policy does not wait
    #[error("write queue full")]
    QueueFull,

    /// Write queue stayed full for the whole timeout
    #[error("write queue still full after {0:?}")]
    TimedOut(Duration),

    /// Write task has exited
    #[error("write queue closed")]
    Closed,
}

impl DeliveryError {
    /// True when the recipient is alive but not keeping up.
    pub fn is_slow_consumer(&self) -> bool {
        matches!(self, DeliveryError::QueueFull | DeliveryError::TimedOut(_))
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    /// Queue capacity of zero
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}
