//! Wire protocol constants

/// Message type tags (first byte of every message)
pub const TAG_MULTICAST_DATA: u8 = 0;
pub const TAG_UNICAST_DATA: u8 = 1;
pub const TAG_FORWARDED_SUBSCRIPTION_REQUEST: u8 = 2;
pub const TAG_NOTIFICATION_REQUEST: u8 = 3;
pub const TAG_SUBSCRIPTION_REQUEST: u8 = 4;
pub const TAG_MONITOR_REQUEST: u8 = 5;

/// Strings carry a 16-bit length prefix
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Default cap on a single payload accepted from a peer (16MB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Reserved feed carrying server heartbeats
pub const ADMIN_FEED: &str = "__admin__";

/// Topic on [`ADMIN_FEED`] carrying server heartbeats
pub const HEARTBEAT_TOPIC: &str = "heartbeat";
