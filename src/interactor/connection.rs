//! Per-connection actor
//!
//! An [`Interactor`] owns one client stream and two tasks:
//!
//! ```text
//!   socket ──► read task ──► event queue ──► dispatcher
//!                                               │
//!   socket ◄── write task ◄── write queue ◄─────┘
//! ```
//!
//! The read task decodes messages and pushes them onto the shared event
//! queue, reporting `Closed` on a clean end of stream and `Faulted` on any
//! error. The write task drains the interactor's private queue onto the
//! socket. Both watch a shutdown signal so [`Interactor::close`] can stop
//! them even when they are blocked.

use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::handle::{InteractorHandle, InteractorId};
use crate::protocol::{Decoder, Message, MessageReader, MessageWriter};
use crate::server::config::DistributorConfig;
use crate::server::event::InteractorEvent;

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Stream halves and queues waiting for `start`
struct Parts {
    reader: MessageReader<BoxReader>,
    writer: MessageWriter<BoxWriter>,
    write_rx: mpsc::Receiver<Message>,
    events: mpsc::Sender<InteractorEvent>,
}

/// One connected client
pub struct Interactor {
    handle: InteractorHandle,
    shutdown_tx: watch::Sender<bool>,
    parts: Option<Parts>,
    read_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
}

impl Interactor {
    /// Wrap an accepted stream. Nothing is read or written until [`start`](Self::start).
    pub fn new<S>(
        stream: S,
        peer_addr: SocketAddr,
        events: mpsc::Sender<InteractorEvent>,
        config: &DistributorConfig,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (write_tx, write_rx) = mpsc::channel(config.write_queue_capacity);
        let (shutdown_tx, _) = watch::channel(false);

        let reader: BoxReader = Box::new(read_half);
        let writer: BoxWriter = Box::new(write_half);

        Self {
            handle: InteractorHandle::new(InteractorId::generate(), peer_addr, write_tx),
            shutdown_tx,
            parts: Some(Parts {
                reader: MessageReader::with_decoder(
                    reader,
                    Decoder::with_max_payload_size(config.max_payload_size),
                ),
                writer: MessageWriter::new(writer),
                write_rx,
                events,
            }),
            read_task: None,
            write_task: None,
        }
    }

    pub fn handle(&self) -> &InteractorHandle {
        &self.handle
    }

    pub fn id(&self) -> &InteractorId {
        self.handle.id()
    }

    pub fn is_started(&self) -> bool {
        self.parts.is_none()
    }

    /// Spawn the read and write tasks. Calling it twice has no effect.
    pub fn start(&mut self) {
        let Some(parts) = self.parts.take() else {
            return;
        };

        self.write_task = Some(tokio::spawn(write_loop(
            self.handle.clone(),
            parts.writer,
            parts.write_rx,
            parts.events.clone(),
            self.shutdown_tx.subscribe(),
        )));

        self.read_task = Some(tokio::spawn(read_loop(
            self.handle.clone(),
            parts.reader,
            parts.events,
            self.shutdown_tx.subscribe(),
        )));
    }

    /// Stop both tasks and release the stream
    ///
    /// The write task is joined first so nothing more is sent, then the read
    /// task. Teardown problems are logged, not returned.
    pub async fn close(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.parts = None;

        if let Some(task) = self.write_task.take() {
            if let Err(e) = task.await {
                tracing::warn!(interactor = %self.handle.id(), error = %e, "Write task failed");
            }
        }

        if let Some(task) = self.read_task.take() {
            if let Err(e) = task.await {
                tracing::warn!(interactor = %self.handle.id(), error = %e, "Read task failed");
            }
        }

        tracing::debug!(interactor = %self.handle, "Interactor closed");
    }
}

impl fmt::Debug for Interactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactor")
            .field("handle", &self.handle)
            .field("started", &self.is_started())
            .finish()
    }
}

/// Push an event unless shutdown wins first. Returns false when the loop should stop.
async fn emit(
    events: &mpsc::Sender<InteractorEvent>,
    event: InteractorEvent,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = shutdown.changed() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

async fn read_loop(
    handle: InteractorHandle,
    mut reader: MessageReader<BoxReader>,
    events: mpsc::Sender<InteractorEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = reader.read_message() => result,
        };

        match result {
            Ok(Some(message)) => {
                tracing::trace!(
                    interactor = %handle.id(),
                    kind = ?message.message_type(),
                    "Message received"
                );
                let event = InteractorEvent::Message {
                    from: Some(handle.clone()),
                    message,
                };
                if !emit(&events, event, &mut shutdown).await {
                    break;
                }
            }
            Ok(None) => {
                emit(&events, InteractorEvent::Closed(handle.clone()), &mut shutdown).await;
                break;
            }
            Err(e) => {
                emit(&events, InteractorEvent::Faulted(handle.clone(), e), &mut shutdown).await;
                break;
            }
        }
    }

    tracing::debug!(interactor = %handle.id(), "Read loop exited");
}

async fn write_loop(
    handle: InteractorHandle,
    mut writer: MessageWriter<BoxWriter>,
    mut write_rx: mpsc::Receiver<Message>,
    events: mpsc::Sender<InteractorEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.changed() => break,
            message = write_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = writer.write_message(&message) => result,
        };

        if let Err(e) = result {
            emit(&events, InteractorEvent::Faulted(handle.clone(), e), &mut shutdown).await;
            break;
        }
    }

    write_rx.close();
    if let Err(e) = writer.shutdown().await {
        tracing::trace!(interactor = %handle.id(), error = %e, "Write shutdown failed");
    }

    tracing::debug!(interactor = %handle.id(), "Write loop exited");
}
