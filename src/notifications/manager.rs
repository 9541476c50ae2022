//! Notification manager
//!
//! Tracks registrants and forwards subscription changes to them. A new
//! registration is reported to the caller, which replays the feed's current
//! subscriptions to the registrant.

use super::repository::NotificationRepository;
use crate::delivery::Delivery;
use crate::interactor::InteractorHandle;
use crate::protocol::{ForwardedSubscriptionRequest, Message, NotificationRequest};

#[derive(Debug, Default)]
pub struct NotificationManager {
    repository: NotificationRepository,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(&self) -> &NotificationRepository {
        &self.repository
    }

    /// Apply a notification request
    ///
    /// Returns true when `notifiable` was newly registered for the feed.
    pub fn request_notification(
        &mut self,
        notifiable: &InteractorHandle,
        request: &NotificationRequest,
    ) -> bool {
        tracing::info!(
            interactor = %notifiable.id(),
            feed = %request.feed,
            is_add = request.is_add,
            "Notification request"
        );

        if request.is_add {
            self.repository.add_request(notifiable, &request.feed)
        } else {
            self.repository.remove_request(notifiable, &request.feed);
            false
        }
    }

    /// Send a subscription change to every registrant of its feed
    pub async fn forward_subscription(
        &self,
        request: ForwardedSubscriptionRequest,
        delivery: &mut Delivery,
    ) {
        let notifiables = self.repository.notifiables(&request.feed);
        if notifiables.is_empty() {
            return;
        }

        tracing::debug!(
            client_id = %request.client_id,
            feed = %request.feed,
            topic = %request.topic,
            is_add = request.is_add,
            recipients = notifiables.len(),
            "Forwarding subscription"
        );

        let message = Message::from(request);
        delivery.send_all(&notifiables, &message).await;
    }

    /// Forget every registration held by a departing interactor
    pub fn close_interactor(&mut self, notifiable: &InteractorHandle) {
        let feeds = self.repository.remove_interactor(notifiable);
        if !feeds.is_empty() {
            tracing::debug!(interactor = %notifiable.id(), feeds = ?feeds, "Removed notification requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::delivery::SlowConsumerPolicy;
    use crate::interactor::handle::testing::{drain, handle};
    use crate::stats::DistributorStats;

    fn delivery() -> Delivery {
        Delivery::new(SlowConsumerPolicy::Drop, Arc::new(DistributorStats::new()))
    }

    #[test]
    fn test_new_registration_reported_once() {
        let mut manager = NotificationManager::new();
        let (n, _rx) = handle("n", 1);

        assert!(manager.request_notification(&n, &NotificationRequest::new("LSE", true)));
        assert!(!manager.request_notification(&n, &NotificationRequest::new("LSE", true)));
        assert!(!manager.request_notification(&n, &NotificationRequest::new("LSE", false)));
        assert!(manager.repository().is_empty());
    }

    #[tokio::test]
    async fn test_forward_only_to_feed_registrants() {
        let mut manager = NotificationManager::new();
        let mut delivery = delivery();
        let (lse, mut rx_lse) = handle("lse", 4);
        let (nyse, mut rx_nyse) = handle("nyse", 4);

        manager.request_notification(&lse, &NotificationRequest::new("LSE", true));
        manager.request_notification(&nyse, &NotificationRequest::new("NYSE", true));

        let forward = ForwardedSubscriptionRequest::new("sub", "LSE", "SBRY", true);
        manager.forward_subscription(forward.clone(), &mut delivery).await;

        assert_eq!(drain(&mut rx_lse), vec![Message::from(forward)]);
        assert!(drain(&mut rx_nyse).is_empty());
    }

    #[tokio::test]
    async fn test_forward_survives_dead_registrant() {
        let mut manager = NotificationManager::new();
        let mut delivery = delivery();
        let (dead, rx_dead) = handle("dead", 4);
        let (live, mut rx_live) = handle("live", 4);
        drop(rx_dead);

        manager.request_notification(&dead, &NotificationRequest::new("LSE", true));
        manager.request_notification(&live, &NotificationRequest::new("LSE", true));

        let forward = ForwardedSubscriptionRequest::new("sub", "LSE", "SBRY", false);
        manager.forward_subscription(forward, &mut delivery).await;

        assert_eq!(drain(&mut rx_live).len(), 1);
    }

    #[test]
    fn test_close_interactor() {
        let mut manager = NotificationManager::new();
        let (n, _rx) = handle("n", 1);

        manager.request_notification(&n, &NotificationRequest::new("LSE", true));
        manager.request_notification(&n, &NotificationRequest::new("NYSE", true));
        manager.close_interactor(&n);

        assert!(manager.repository().is_empty());
    }
}
