//! Publisher manager
//!
//! Records who published what, then performs the actual sends. On a
//! publisher's departure it reports the (feed, topic) pairs that have gone
//! stale so the subscription side can invalidate them.

use super::repository::PublisherRepository;
use crate::delivery::Delivery;
use crate::error::DeliveryError;
use crate::interactor::InteractorHandle;
use crate::protocol::{FeedTopic, Message, MulticastData, UnicastData};

#[derive(Debug, Default)]
pub struct PublisherManager {
    repository: PublisherRepository,
}

impl PublisherManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(&self) -> &PublisherRepository {
        &self.repository
    }

    /// Record the publisher, then send to each subscriber
    pub async fn send_multicast_data(
        &mut self,
        publisher: Option<&InteractorHandle>,
        subscribers: &[InteractorHandle],
        data: MulticastData,
        delivery: &mut Delivery,
    ) {
        if let Some(publisher) = publisher {
            self.repository.add_publisher(publisher, data.feed_topic());
        }

        if subscribers.is_empty() {
            return;
        }

        let message = Message::from(data);
        delivery.send_all(subscribers, &message).await;
    }

    /// Record the publisher, then send to a single subscriber
    ///
    /// The publisher is recorded even when delivery fails.
    pub async fn send_unicast_data(
        &mut self,
        publisher: Option<&InteractorHandle>,
        subscriber: &InteractorHandle,
        data: UnicastData,
        delivery: &mut Delivery,
    ) -> Result<(), DeliveryError> {
        if let Some(publisher) = publisher {
            self.repository.add_publisher(publisher, data.feed_topic());
        }

        delivery.send(subscriber, data.into()).await
    }

    /// Forget a departing interactor's publications, returning stale pairs
    pub fn close_interactor(&mut self, publisher: &InteractorHandle) -> Vec<FeedTopic> {
        let stale = self.repository.remove_publisher(publisher);
        if !stale.is_empty() {
            tracing::debug!(interactor = %publisher.id(), stale = stale.len(), "Publisher removed");
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::delivery::SlowConsumerPolicy;
    use crate::interactor::handle::testing::{drain, handle};
    use crate::stats::DistributorStats;

    fn delivery() -> Delivery {
        Delivery::new(SlowConsumerPolicy::Drop, Arc::new(DistributorStats::new()))
    }

    #[tokio::test]
    async fn test_multicast_records_and_sends() {
        let mut manager = PublisherManager::new();
        let mut delivery = delivery();
        let (p, _rx_p) = handle("p", 1);
        let (s, mut rx_s) = handle("s", 4);

        let data = MulticastData::new("LSE", "SBRY", true, Some(Bytes::from_static(b"x")));
        manager
            .send_multicast_data(Some(&p), &[s.clone()], data.clone(), &mut delivery)
            .await;

        assert_eq!(drain(&mut rx_s), vec![Message::from(data)]);
        assert_eq!(
            manager.repository().publishers_of(&FeedTopic::new("LSE", "SBRY")),
            vec![p.clone()]
        );
        assert_eq!(manager.close_interactor(&p), vec![FeedTopic::new("LSE", "SBRY")]);
    }

    #[tokio::test]
    async fn test_anonymous_publish_not_recorded() {
        let mut manager = PublisherManager::new();
        let mut delivery = delivery();
        let (s, mut rx_s) = handle("s", 4);

        manager
            .send_multicast_data(None, &[s], MulticastData::heartbeat(), &mut delivery)
            .await;

        assert_eq!(drain(&mut rx_s).len(), 1);
        assert!(manager.repository().is_empty());
    }

    #[tokio::test]
    async fn test_unicast_records_and_sends() {
        let mut manager = PublisherManager::new();
        let mut delivery = delivery();
        let (p, _rx_p) = handle("p", 1);
        let (s, mut rx_s) = handle("s", 4);

        let data = UnicastData::new("s", "LSE", "VOD", false, None);
        manager
            .send_unicast_data(Some(&p), &s, data.clone(), &mut delivery)
            .await
            .unwrap();

        assert_eq!(drain(&mut rx_s), vec![Message::from(data)]);
        assert_eq!(manager.repository().feed_topics_of(&p), vec![FeedTopic::new("LSE", "VOD")]);
    }

    #[tokio::test]
    async fn test_unicast_reports_delivery_failure() {
        let mut manager = PublisherManager::new();
        let mut delivery = delivery();
        let (p, _rx_p) = handle("p", 1);
        let (s, mut rx_s) = handle("s", 1);

        let data = UnicastData::new("s", "LSE", "VOD", true, None);
        assert!(manager
            .send_unicast_data(Some(&p), &s, data.clone(), &mut delivery)
            .await
            .is_ok());
        assert_eq!(
            manager
                .send_unicast_data(Some(&p), &s, data.clone(), &mut delivery)
                .await,
            Err(DeliveryError::QueueFull)
        );

        assert_eq!(drain(&mut rx_s).len(), 1);
        assert_eq!(manager.repository().feed_topics_of(&p), vec![FeedTopic::new("LSE", "VOD")]);
    }
}
