//! Async message reader and writer over byte streams

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::codec::{Decoder, Encoder};
use super::message::Message;
use crate::error::{ProtocolError, Result};

const READ_CHUNK: usize = 8 * 1024;

/// Reads whole messages from an `AsyncRead`
pub struct MessageReader<R> {
    inner: R,
    buf: BytesMut,
    decoder: Decoder,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_decoder(inner, Decoder::new())
    }

    pub fn with_decoder(inner: R, decoder: Decoder) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            decoder,
        }
    }

    /// Read the next message
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between messages.
    /// A stream ending inside a message is [`ProtocolError::Truncated`].
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some((message, consumed)) = self.decoder.try_decode(&self.buf)? {
                self.buf.advance(consumed);
                return Ok(Some(message));
            }

            self.buf.reserve(READ_CHUNK);
            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated {
                    buffered: self.buf.len(),
                }
                .into());
            }
        }
    }

    /// Bytes received but not yet decoded
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes messages to an `AsyncWrite`
pub struct MessageWriter<W> {
    inner: W,
    encoder: Encoder,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            encoder: Encoder::new(),
        }
    }

    /// Encode and write one message
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        self.encoder.encode(message)?;
        let bytes = self.encoder.finish();
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }

    /// Underlying stream, for writing raw bytes
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio_test::io::Builder;

    use super::*;
    use crate::error::Error;
    use crate::protocol::codec::encode;
    use crate::protocol::message::*;

    #[tokio::test]
    async fn test_read_split_across_reads() {
        let msg: Message =
            MulticastData::new("LSE", "SBRY", true, Some(Bytes::from_static(b"image"))).into();
        let bytes = encode(&msg).unwrap();

        let mock = Builder::new()
            .read(&bytes[..3])
            .read(&bytes[3..9])
            .read(&bytes[9..])
            .build();
        let mut reader = MessageReader::new(mock);

        assert_eq!(reader.read_message().await.unwrap(), Some(msg));
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_several_in_one_chunk() {
        let first: Message = SubscriptionRequest::new("LSE", "SBRY", true).into();
        let second: Message = NotificationRequest::new("LSE", true).into();
        let mut bytes = encode(&first).unwrap().to_vec();
        bytes.extend_from_slice(&encode(&second).unwrap());

        let mock = Builder::new().read(&bytes).build();
        let mut reader = MessageReader::new(mock);

        assert_eq!(reader.read_message().await.unwrap(), Some(first));
        assert_eq!(reader.read_message().await.unwrap(), Some(second));
        assert_eq!(reader.buffered(), 0);
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_eof_mid_message() {
        let bytes = encode(&SubscriptionRequest::new("LSE", "SBRY", true).into()).unwrap();

        let mock = Builder::new().read(&bytes[..5]).build();
        let mut reader = MessageReader::new(mock);

        match reader.read_message().await {
            Err(Error::Protocol(ProtocolError::Truncated { buffered })) => assert_eq!(buffered, 5),
            other => panic!("expected truncated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tag_is_error() {
        let mock = Builder::new().read(&[42, 0, 0]).build();
        let mut reader = MessageReader::new(mock);

        assert!(matches!(
            reader.read_message().await,
            Err(Error::Protocol(ProtocolError::UnknownMessageType(42)))
        ));
    }

    #[tokio::test]
    async fn test_read_io_error() {
        let mock = Builder::new()
            .read_error(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            .build();
        let mut reader = MessageReader::new(mock);

        let err = reader.read_message().await.unwrap_err();
        assert!(matches!(&err, Error::Io(e) if e.kind() == std::io::ErrorKind::ConnectionReset));
        assert!(!err.is_disconnect());
    }

    #[tokio::test]
    async fn test_write_message() {
        let msg: Message = ForwardedSubscriptionRequest::new("id-1", "LSE", "SBRY", false).into();
        let bytes = encode(&msg).unwrap();

        let mock = Builder::new().write(&bytes).build();
        let mut writer = MessageWriter::new(mock);
        writer.write_message(&msg).await.unwrap();
    }
}
