//! Event dispatcher
//!
//! A single task drains the event queue in arrival order and owns every
//! routing table, so none of them need locks. Lifecycle events drive the
//! interactor manager; messages are routed by type to the subscription,
//! notification and publisher managers.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::config::DistributorConfig;
use super::event::InteractorEvent;
use crate::delivery::Delivery;
use crate::error::Error;
use crate::interactor::{InteractorHandle, InteractorManager};
use crate::notifications::NotificationManager;
use crate::protocol::Message;
use crate::publishers::PublisherManager;
use crate::stats::DistributorStats;
use crate::subscriptions::SubscriptionManager;

pub struct Dispatcher {
    interactors: InteractorManager,
    subscriptions: SubscriptionManager,
    notifications: NotificationManager,
    publishers: PublisherManager,
    delivery: Delivery,
    stats: Arc<DistributorStats>,
    disconnect_slow_consumers: bool,
}

impl Dispatcher {
    pub fn new(config: &DistributorConfig, stats: Arc<DistributorStats>) -> Self {
        Self {
            interactors: InteractorManager::new(),
            subscriptions: SubscriptionManager::new(),
            notifications: NotificationManager::new(),
            publishers: PublisherManager::new(),
            delivery: Delivery::new(config.slow_consumer_policy, Arc::clone(&stats)),
            stats,
            disconnect_slow_consumers: config.disconnect_slow_consumers,
        }
    }

    pub fn interactors(&self) -> &InteractorManager {
        &self.interactors
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn publishers(&self) -> &PublisherManager {
        &self.publishers
    }

    /// Drain the queue until the shutdown sentinel, then close every interactor
    pub async fn run(mut self, mut events: mpsc::Receiver<InteractorEvent>) {
        tracing::debug!("Dispatcher started");

        loop {
            match events.recv().await {
                Some(event) => {
                    if !self.handle_event(event).await {
                        break;
                    }
                }
                None => {
                    tracing::error!("Event queue closed without shutdown");
                    break;
                }
            }
        }

        self.interactors.close_all().await;
        self.stats.set_routing(0, 0, 0);
        tracing::debug!("Dispatcher stopped");
    }

    /// Process one event. Returns false once shutdown has been requested.
    pub async fn handle_event(&mut self, event: InteractorEvent) -> bool {
        match event {
            InteractorEvent::Connected(interactor) => {
                self.interactors.add_interactor(interactor);
                self.stats.record_connect();
            }
            InteractorEvent::Message { from, message } => {
                self.dispatch_message(from, message).await;
            }
            InteractorEvent::Closed(handle) => {
                self.close_interactor(&handle, None).await;
            }
            InteractorEvent::Faulted(handle, error) => {
                if error.is_disconnect() {
                    tracing::debug!(interactor = %handle.id(), error = %error, "Peer disconnected");
                    self.close_interactor(&handle, None).await;
                } else {
                    self.close_interactor(&handle, Some(error)).await;
                }
            }
            InteractorEvent::Shutdown => {
                tracing::info!(interactors = self.interactors.len(), "Dispatcher shutting down");
                return false;
            }
        }

        self.remove_slow_consumers().await;
        self.publish_routing_stats();
        true
    }

    async fn dispatch_message(&mut self, from: Option<InteractorHandle>, message: Message) {
        if let Some(sender) = &from {
            // Anything still queued from an interactor we've already removed
            if !self.interactors.contains(sender.id()) {
                tracing::debug!(interactor = %sender.id(), "Ignoring message from removed interactor");
                return;
            }
            self.stats.record_message();
        }

        match message {
            Message::MulticastData(data) => {
                self.subscriptions
                    .send_multicast_data(from.as_ref(), data, &mut self.publishers, &mut self.delivery)
                    .await;
            }
            Message::UnicastData(data) => {
                self.subscriptions
                    .send_unicast_data(from.as_ref(), data, &mut self.publishers, &mut self.delivery)
                    .await;
            }
            Message::SubscriptionRequest(request) => {
                let Some(sender) = &from else { return };
                self.subscriptions
                    .request_subscription(sender, request, &self.notifications, &mut self.delivery)
                    .await;
            }
            Message::MonitorRequest(request) => {
                let Some(sender) = &from else { return };
                self.subscriptions.request_monitor(sender, &request);
            }
            Message::NotificationRequest(request) => {
                let Some(sender) = &from else { return };
                if self.notifications.request_notification(sender, &request) {
                    self.subscriptions
                        .replay_subscriptions(sender, &request.feed, &mut self.delivery)
                        .await;
                }
            }
            Message::ForwardedSubscriptionRequest(request) => {
                tracing::warn!(
                    interactor = ?from.as_ref().map(|h| h.id().to_string()),
                    client_id = %request.client_id,
                    "Ignoring forwarded subscription request from a client"
                );
            }
        }
    }

    /// Remove an interactor and everything routed through it
    ///
    /// Does nothing if the interactor was already removed.
    async fn close_interactor(&mut self, handle: &InteractorHandle, error: Option<Error>) {
        let removed = match &error {
            None => self.interactors.close_interactor(handle.id()).await,
            Some(error) => self.interactors.fault_interactor(handle.id(), error).await,
        };
        let Some(handle) = removed else {
            return;
        };
        self.stats.record_disconnect();
        if error.is_some() {
            self.stats.record_fault();
        }

        self.notifications.close_interactor(&handle);
        self.subscriptions
            .close_interactor(&handle, &self.notifications, &mut self.delivery)
            .await;

        let stale = self.publishers.close_interactor(&handle);
        self.subscriptions.send_stale(&stale, &mut self.delivery).await;
    }

    /// Fault every recipient that could not keep up during the last event
    ///
    /// Cleanup can itself overflow other queues, so repeat until none are left.
    async fn remove_slow_consumers(&mut self) {
        loop {
            let slow = self.delivery.take_slow_consumers();
            if slow.is_empty() || !self.disconnect_slow_consumers {
                return;
            }

            for (handle, error) in slow {
                self.close_interactor(&handle, Some(Error::Delivery(error))).await;
            }
        }
    }

    fn publish_routing_stats(&self) {
        let repository = self.subscriptions.repository();
        self.stats.set_routing(
            repository.subscription_entries(),
            repository.monitor_entries(),
            self.notifications.repository().registrations(),
        );
    }
}
