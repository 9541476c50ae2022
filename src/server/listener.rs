//! Distributor server
//!
//! Runs the TCP accept loop, the heartbeat and stats tasks, and the single
//! dispatcher task that owns all routing state.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::interactor::Interactor;
use crate::protocol::MulticastData;
use crate::server::config::DistributorConfig;
use crate::server::dispatcher::Dispatcher;
use crate::server::event::InteractorEvent;
use crate::stats::DistributorStats;

/// Feedbus distributor
pub struct DistributorServer {
    config: DistributorConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    stats: Arc<DistributorStats>,
}

impl DistributorServer {
    /// Validate the configuration and bind the listening socket
    pub async fn bind(config: DistributorConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            listener,
            local_addr,
            stats: Arc::new(DistributorStats::new()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    /// Live counters
    pub fn stats(&self) -> Arc<DistributorStats> {
        Arc::clone(&self.stats)
    }

    /// Run the server until the process is stopped
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` completes the accept loop stops, queued events are
    /// drained up to a shutdown sentinel, and every interactor is closed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.local_addr, "Distributor listening");

        let (event_tx, event_rx) = mpsc::channel(self.config.event_queue_capacity);

        let dispatcher = Dispatcher::new(&self.config, Arc::clone(&self.stats));
        let dispatcher_task = tokio::spawn(dispatcher.run(event_rx));
        let heartbeat_task = self.spawn_heartbeat(event_tx.clone());
        let stats_task = self.spawn_stats_reporter();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&event_tx) => result,
        };

        for task in [heartbeat_task, stats_task].into_iter().flatten() {
            task.abort();
        }

        if event_tx.send(InteractorEvent::Shutdown).await.is_err() {
            tracing::warn!("Dispatcher already stopped");
        }
        drop(event_tx);

        if let Err(e) = dispatcher_task.await {
            tracing::error!(error = %e, "Dispatcher task failed");
        }

        tracing::info!("Distributor stopped");
        result
    }

    async fn accept_loop(&self, event_tx: &mpsc::Sender<InteractorEvent>) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, event_tx).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        event_tx: &mpsc::Sender<InteractorEvent>,
    ) {
        self.stats.record_accept();

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let interactor = Interactor::new(socket, peer_addr, event_tx.clone(), &self.config);
        tracing::debug!(interactor = %interactor.id(), peer = %peer_addr, "New connection");

        if event_tx
            .send(InteractorEvent::Connected(interactor))
            .await
            .is_err()
        {
            tracing::error!(peer = %peer_addr, "Event queue closed, dropping connection");
        }
    }

    fn spawn_heartbeat(&self, event_tx: mpsc::Sender<InteractorEvent>) -> Option<JoinHandle<()>> {
        let period = self.config.heartbeat_interval;
        if period.is_zero() {
            tracing::info!("Heartbeat disabled");
            return None;
        }

        let stats = Arc::clone(&self.stats);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let event = InteractorEvent::Message {
                    from: None,
                    message: MulticastData::heartbeat().into(),
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
                stats.record_heartbeat();
            }
        }))
    }

    fn spawn_stats_reporter(&self) -> Option<JoinHandle<()>> {
        let period = self.config.stats_interval;
        if period.is_zero() {
            return None;
        }

        let stats = Arc::clone(&self.stats);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                let s = stats.snapshot();
                tracing::info!(
                    uptime_secs = s.uptime.as_secs(),
                    active_connections = s.active_connections,
                    total_connections = s.total_connections,
                    faulted_connections = s.faulted_connections,
                    messages = s.messages_dispatched,
                    heartbeats = s.heartbeats_sent,
                    dropped = s.dropped_deliveries,
                    subscriptions = s.subscription_entries,
                    monitors = s.monitor_entries,
                    notifications = s.notification_registrations,
                    "Distributor stats"
                );
            }
        }))
    }
}
