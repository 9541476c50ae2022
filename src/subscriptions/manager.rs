//! Subscription manager
//!
//! Applies subscribe and monitor requests, resolves data to its recipients
//! and cleans up after departing interactors. Every topic subscription
//! change is forwarded to the notification side, which decides who hears
//! about it.

use std::collections::BTreeSet;

use super::repository::SubscriptionRepository;
use crate::delivery::Delivery;
use crate::interactor::InteractorHandle;
use crate::notifications::NotificationManager;
use crate::protocol::{
    FeedTopic, ForwardedSubscriptionRequest, Message, MonitorRequest, MulticastData,
    SubscriptionRequest, UnicastData,
};
use crate::publishers::PublisherManager;

#[derive(Debug, Default)]
pub struct SubscriptionManager {
    repository: SubscriptionRepository,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(&self) -> &SubscriptionRepository {
        &self.repository
    }

    /// Add or remove a topic subscription and forward the change
    pub async fn request_subscription(
        &mut self,
        subscriber: &InteractorHandle,
        request: SubscriptionRequest,
        notifications: &NotificationManager,
        delivery: &mut Delivery,
    ) {
        tracing::info!(
            interactor = %subscriber.id(),
            feed = %request.feed,
            topic = %request.topic,
            is_add = request.is_add,
            "Subscription request"
        );

        if request.is_add {
            self.repository
                .add_subscription(subscriber, &request.feed, &request.topic);
        } else {
            self.repository
                .remove_subscription(subscriber, &request.feed, &request.topic, false);
        }

        let forward = ForwardedSubscriptionRequest::new(
            subscriber.id().as_str(),
            request.feed,
            request.topic,
            request.is_add,
        );
        notifications.forward_subscription(forward, delivery).await;
    }

    /// Add or remove a feed monitor. Monitors are not forwarded.
    pub fn request_monitor(&mut self, monitor: &InteractorHandle, request: &MonitorRequest) {
        tracing::info!(
            interactor = %monitor.id(),
            feed = %request.feed,
            is_add = request.is_add,
            "Monitor request"
        );

        if request.is_add {
            self.repository.add_monitor(monitor, &request.feed);
        } else {
            self.repository.remove_monitor(monitor, &request.feed, false);
        }
    }

    /// Send data to every subscriber and monitor of its feed and topic
    pub async fn send_multicast_data(
        &self,
        publisher: Option<&InteractorHandle>,
        data: MulticastData,
        publishers: &mut PublisherManager,
        delivery: &mut Delivery,
    ) {
        let subscribers = self.repository.subscribers_of(&data.feed, &data.topic);
        tracing::trace!(
            feed = %data.feed,
            topic = %data.topic,
            recipients = subscribers.len(),
            "Multicast"
        );

        publishers
            .send_multicast_data(publisher, &subscribers, data, delivery)
            .await;
    }

    /// Send data to one client, if it is subscribed to the feed and topic
    ///
    /// Returns whether the message reached the target's write queue. When the
    /// target is not a current subscriber nothing is sent and no publisher is
    /// recorded.
    pub async fn send_unicast_data(
        &self,
        publisher: Option<&InteractorHandle>,
        data: UnicastData,
        publishers: &mut PublisherManager,
        delivery: &mut Delivery,
    ) -> bool {
        let subscriber = self
            .repository
            .subscribers_of(&data.feed, &data.topic)
            .into_iter()
            .find(|s| s.id().as_str() == data.client_id);

        let Some(subscriber) = subscriber else {
            tracing::debug!(
                client_id = %data.client_id,
                feed = %data.feed,
                topic = %data.topic,
                "Unicast target is not subscribed"
            );
            return false;
        };

        publishers
            .send_unicast_data(publisher, &subscriber, data, delivery)
            .await
            .is_ok()
    }

    /// Tell a new notification registrant about every existing subscription on the feed
    pub async fn replay_subscriptions(
        &self,
        registrant: &InteractorHandle,
        feed: &str,
        delivery: &mut Delivery,
    ) {
        for (topic, subscribers) in self.repository.subscribers_to_feed(feed) {
            for subscriber in subscribers {
                let forward =
                    ForwardedSubscriptionRequest::new(subscriber.id().as_str(), feed, topic.as_str(), true);
                if delivery.send(registrant, forward.into()).await.is_err() {
                    // The registrant is gone or stalled; the rest would fail too
                    return;
                }
            }
        }
    }

    /// Invalidate topics that lost their last publisher
    pub async fn send_stale(&self, stale: &[FeedTopic], delivery: &mut Delivery) {
        for feed_topic in stale {
            let subscribers = self
                .repository
                .subscribers_of(&feed_topic.feed, &feed_topic.topic);
            if subscribers.is_empty() {
                continue;
            }

            tracing::debug!(feed_topic = %feed_topic, recipients = subscribers.len(), "Stale publisher");
            let message = Message::from(MulticastData::stale(feed_topic));
            delivery.send_all(&subscribers, &message).await;
        }
    }

    /// Remove every subscription and monitor held by a departing interactor
    ///
    /// Registrants are told the interactor left each (feed, topic) it was
    /// subscribed to.
    pub async fn close_interactor(
        &mut self,
        interactor: &InteractorHandle,
        notifications: &NotificationManager,
        delivery: &mut Delivery,
    ) {
        tracing::debug!(interactor = %interactor.id(), "Removing subscriptions");

        let feed_topics: BTreeSet<FeedTopic> =
            self.repository.feed_topics_of(interactor).into_iter().collect();
        for feed_topic in &feed_topics {
            self.repository
                .remove_subscription(interactor, &feed_topic.feed, &feed_topic.topic, true);
        }

        for feed in self.repository.monitored_feeds_of(interactor) {
            self.repository.remove_monitor(interactor, &feed, true);
        }

        for feed_topic in feed_topics {
            let forward = ForwardedSubscriptionRequest::new(
                interactor.id().as_str(),
                feed_topic.feed,
                feed_topic.topic,
                false,
            );
            notifications.forward_subscription(forward, delivery).await;
        }
    }
}
