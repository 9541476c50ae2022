//! Binary encoder and decoder
//!
//! Layout of every message:
//!
//! ```text
//! +-----+----------------------------+
//! | tag |  body (fields in order)    |
//! +-----+----------------------------+
//!   u8
//!
//! string:  u16 BE length + UTF-8 bytes
//! bool:    u8 (0 = false)
//! payload: i32 BE length + bytes, length 0 = absent
//! ```
//!
//! There is no outer framing: the decoder walks the fields and reports
//! "need more bytes" until a whole message is buffered.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::*;
use super::message::*;
use crate::error::ProtocolError;

/// Message encoder
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append one message
    pub fn encode(&mut self, message: &Message) -> Result<(), ProtocolError> {
        self.buf.put_u8(message.message_type().tag());

        match message {
            Message::MulticastData(m) => {
                self.write_string(&m.feed)?;
                self.write_string(&m.topic)?;
                self.write_bool(m.is_image);
                self.write_payload(m.data.as_ref())?;
            }
            Message::UnicastData(m) => {
                self.write_string(&m.client_id)?;
                self.write_string(&m.feed)?;
                self.write_string(&m.topic)?;
                self.write_bool(m.is_image);
                self.write_payload(m.data.as_ref())?;
            }
            Message::ForwardedSubscriptionRequest(m) => {
                self.write_string(&m.client_id)?;
                self.write_string(&m.feed)?;
                self.write_string(&m.topic)?;
                self.write_bool(m.is_add);
            }
            Message::NotificationRequest(m) => {
                self.write_string(&m.feed)?;
                self.write_bool(m.is_add);
            }
            Message::SubscriptionRequest(m) => {
                self.write_string(&m.feed)?;
                self.write_string(&m.topic)?;
                self.write_bool(m.is_add);
            }
            Message::MonitorRequest(m) => {
                self.write_string(&m.feed)?;
                self.write_bool(m.is_add);
            }
        }

        Ok(())
    }

    /// Take the encoded bytes, leaving the encoder empty
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn write_string(&mut self, s: &str) -> Result<(), ProtocolError> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(ProtocolError::StringTooLong(bytes.len()));
        }
        self.buf.put_u16(bytes.len() as u16);
        self.buf.put_slice(bytes);
        Ok(())
    }

    fn write_bool(&mut self, b: bool) {
        self.buf.put_u8(u8::from(b));
    }

    fn write_payload(&mut self, data: Option<&Bytes>) -> Result<(), ProtocolError> {
        match data {
            Some(data) => {
                let len = i32::try_from(data.len()).map_err(|_| {
                    ProtocolError::InvalidPayloadLength {
                        length: data.len() as i64,
                        max: i32::MAX as usize,
                    }
                })?;
                self.buf.put_i32(len);
                self.buf.put_slice(data);
            }
            None => self.buf.put_i32(0),
        }
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a decode attempt stopped
enum Stop {
    /// Buffer ends before the message does
    Incomplete,
    Invalid(ProtocolError),
}

impl From<ProtocolError> for Stop {
    fn from(e: ProtocolError) -> Self {
        Stop::Invalid(e)
    }
}

type Step<T> = std::result::Result<T, Stop>;

/// Message decoder
#[derive(Debug, Clone)]
pub struct Decoder {
    max_payload_size: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_max_payload_size(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a decoder rejecting payloads larger than `max_payload_size`
    pub fn with_max_payload_size(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Try to decode one message from the front of `buf`
    ///
    /// Returns `Ok(None)` when `buf` holds only part of a message, otherwise
    /// the message and the number of bytes it occupied.
    pub fn try_decode(&self, buf: &[u8]) -> Result<Option<(Message, usize)>, ProtocolError> {
        let mut cursor = buf;
        match self.decode_message(&mut cursor) {
            Ok(message) => Ok(Some((message, buf.len() - cursor.len()))),
            Err(Stop::Incomplete) => Ok(None),
            Err(Stop::Invalid(e)) => Err(e),
        }
    }

    fn decode_message(&self, buf: &mut &[u8]) -> Step<Message> {
        let tag = read_u8(buf)?;
        let kind = MessageType::from_tag(tag).ok_or(ProtocolError::UnknownMessageType(tag))?;

        let message = match kind {
            MessageType::MulticastData => {
                let feed = read_string(buf)?;
                let topic = read_string(buf)?;
                let is_image = read_bool(buf)?;
                let data = self.read_payload(buf)?;
                Message::MulticastData(MulticastData::new(feed, topic, is_image, data))
            }
            MessageType::UnicastData => {
                let client_id = read_string(buf)?;
                let feed = read_string(buf)?;
                let topic = read_string(buf)?;
                let is_image = read_bool(buf)?;
                let data = self.read_payload(buf)?;
                Message::UnicastData(UnicastData::new(client_id, feed, topic, is_image, data))
            }
            MessageType::ForwardedSubscriptionRequest => {
                let client_id = read_string(buf)?;
                let feed = read_string(buf)?;
                let topic = read_string(buf)?;
                let is_add = read_bool(buf)?;
                Message::ForwardedSubscriptionRequest(ForwardedSubscriptionRequest::new(
                    client_id, feed, topic, is_add,
                ))
            }
            MessageType::NotificationRequest => {
                let feed = read_string(buf)?;
                let is_add = read_bool(buf)?;
                Message::NotificationRequest(NotificationRequest::new(feed, is_add))
            }
            MessageType::SubscriptionRequest => {
                let feed = read_string(buf)?;
                let topic = read_string(buf)?;
                let is_add = read_bool(buf)?;
                Message::SubscriptionRequest(SubscriptionRequest::new(feed, topic, is_add))
            }
            MessageType::MonitorRequest => {
                let feed = read_string(buf)?;
                let is_add = read_bool(buf)?;
                Message::MonitorRequest(MonitorRequest::new(feed, is_add))
            }
        };

        Ok(message)
    }

    fn read_payload(&self, buf: &mut &[u8]) -> Step<Option<Bytes>> {
        if buf.remaining() < 4 {
            return Err(Stop::Incomplete);
        }
        let len = buf.get_i32();
        if len < 0 || len as usize > self.max_payload_size {
            return Err(ProtocolError::InvalidPayloadLength {
                length: len as i64,
                max: self.max_payload_size,
            }
            .into());
        }
        let len = len as usize;
        if len == 0 {
            return Ok(None);
        }
        if buf.remaining() < len {
            return Err(Stop::Incomplete);
        }
        let data = Bytes::copy_from_slice(&buf[..len]);
        buf.advance(len);
        Ok(Some(data))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u8(buf: &mut &[u8]) -> Step<u8> {
    if buf.is_empty() {
        return Err(Stop::Incomplete);
    }
    Ok(buf.get_u8())
}

fn read_bool(buf: &mut &[u8]) -> Step<bool> {
    Ok(read_u8(buf)? != 0)
}

fn read_string(buf: &mut &[u8]) -> Step<String> {
    if buf.remaining() < 2 {
        return Err(Stop::Incomplete);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(Stop::Incomplete);
    }
    let s = std::str::from_utf8(&buf[..len])
        .map_err(|_| ProtocolError::InvalidUtf8)?
        .to_owned();
    buf.advance(len);
    Ok(s)
}

/// Convenience function to encode a single message
pub fn encode(message: &Message) -> Result<Bytes, ProtocolError> {
    let mut encoder = Encoder::new();
    encoder.encode(message)?;
    Ok(encoder.finish())
}

/// Convenience function to decode a single complete message
///
/// A buffer holding only part of a message is reported as truncated.
pub fn decode(data: &[u8]) -> Result<Message, ProtocolError> {
    match Decoder::new().try_decode(data)? {
        Some((message, _)) => Ok(message),
        None => Err(ProtocolError::Truncated {
            buffered: data.len(),
        }),
    }
}
