//! Outbound delivery onto interactor write queues
//!
//! Every message the dispatcher sends goes through [`Delivery::send`], which
//! applies the configured [`SlowConsumerPolicy`]. A failure is logged and
//! counted for that recipient only; callers carry on with the rest of a
//! fan-out. Recipients that failed for being slow are remembered so the
//! dispatcher can disconnect them once the current event is done.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

use crate::error::DeliveryError;
use crate::interactor::InteractorHandle;
use crate::protocol::Message;
use crate::stats::DistributorStats;

/// What to do when a recipient's write queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowConsumerPolicy {
    /// Wait for space. One stalled peer stalls all routing.
    Block,
    /// Wait up to the given time, then drop the message
    Timeout(Duration),
    /// Drop the message immediately
    Drop,
}

impl Default for SlowConsumerPolicy {
    fn default() -> Self {
        SlowConsumerPolicy::Timeout(Duration::from_secs(5))
    }
}

/// Sends messages to interactors under a slow-consumer policy
pub struct Delivery {
    policy: SlowConsumerPolicy,
    stats: Arc<DistributorStats>,
    slow_consumers: Vec<(InteractorHandle, DeliveryError)>,
}

impl Delivery {
    pub fn new(policy: SlowConsumerPolicy, stats: Arc<DistributorStats>) -> Self {
        Self {
            policy,
            stats,
            slow_consumers: Vec::new(),
        }
    }

    pub fn policy(&self) -> SlowConsumerPolicy {
        self.policy
    }

    /// Queue one message for one recipient
    pub async fn send(
        &mut self,
        recipient: &InteractorHandle,
        message: Message,
    ) -> Result<(), DeliveryError> {
        let sender = recipient.sender();

        let result = match self.policy {
            SlowConsumerPolicy::Block => sender
                .send(message)
                .await
                .map_err(|_| DeliveryError::Closed),
            SlowConsumerPolicy::Timeout(timeout) => match sender.send_timeout(message, timeout).await {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => Err(DeliveryError::TimedOut(timeout)),
                Err(SendTimeoutError::Closed(_)) => Err(DeliveryError::Closed),
            },
            SlowConsumerPolicy::Drop => sender.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::QueueFull,
                TrySendError::Closed(_) => DeliveryError::Closed,
            }),
        };

        if let Err(e) = &result {
            self.stats.record_dropped();
            tracing::warn!(interactor = %recipient.id(), error = %e, "Delivery failed");

            if e.is_slow_consumer() && !self.slow_consumers.iter().any(|(h, _)| h == recipient) {
                self.slow_consumers.push((recipient.clone(), e.clone()));
            }
        }

        result
    }

    /// Queue the same message for each recipient, returning how many accepted it
    pub async fn send_all<'a, I>(&mut self, recipients: I, message: &Message) -> usize
    where
        I: IntoIterator<Item = &'a InteractorHandle>,
    {
        let mut delivered = 0;
        for recipient in recipients {
            if self.send(recipient, message.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Recipients that timed out or overflowed since the last call, with the first failure
    pub fn take_slow_consumers(&mut self) -> Vec<(InteractorHandle, DeliveryError)> {
        std::mem::take(&mut self.slow_consumers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactor::handle::testing::{drain, handle};
    use crate::protocol::MonitorRequest;

    fn message() -> Message {
        MonitorRequest::new("LSE", true).into()
    }

    #[tokio::test]
    async fn test_send_ok() {
        let stats = Arc::new(DistributorStats::new());
        let mut delivery = Delivery::new(SlowConsumerPolicy::Block, stats.clone());
        let (h, mut rx) = handle("a", 4);

        delivery.send(&h, message()).await.unwrap();
        assert_eq!(drain(&mut rx), vec![message()]);
        assert_eq!(stats.snapshot().dropped_deliveries, 0);
    }

    #[tokio::test]
    async fn test_drop_policy_full_queue() {
        let stats = Arc::new(DistributorStats::new());
        let mut delivery = Delivery::new(SlowConsumerPolicy::Drop, stats.clone());
        let (h, _rx) = handle("a", 1);

        delivery.send(&h, message()).await.unwrap();
        assert_eq!(delivery.send(&h, message()).await, Err(DeliveryError::QueueFull));
        assert_eq!(delivery.send(&h, message()).await, Err(DeliveryError::QueueFull));

        assert_eq!(stats.snapshot().dropped_deliveries, 2);
        assert_eq!(delivery.take_slow_consumers(), vec![(h, DeliveryError::QueueFull)]);
        assert!(delivery.take_slow_consumers().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_policy() {
        let stats = Arc::new(DistributorStats::new());
        let timeout = Duration::from_millis(50);
        let mut delivery = Delivery::new(SlowConsumerPolicy::Timeout(timeout), stats);
        let (h, _rx) = handle("a", 1);

        delivery.send(&h, message()).await.unwrap();
        assert_eq!(
            delivery.send(&h, message()).await,
            Err(DeliveryError::TimedOut(timeout))
        );
        assert_eq!(delivery.take_slow_consumers().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_is_not_slow() {
        let stats = Arc::new(DistributorStats::new());
        let mut delivery = Delivery::new(SlowConsumerPolicy::default(), stats);
        let (h, rx) = handle("a", 1);
        drop(rx);

        assert_eq!(delivery.send(&h, message()).await, Err(DeliveryError::Closed));
        assert!(delivery.take_slow_consumers().is_empty());
    }

    #[tokio::test]
    async fn test_send_all_continues_past_failures() {
        let stats = Arc::new(DistributorStats::new());
        let mut delivery = Delivery::new(SlowConsumerPolicy::Drop, stats);
        let (a, mut rx_a) = handle("a", 4);
        let (b, rx_b) = handle("b", 4);
        let (c, mut rx_c) = handle("c", 4);
        drop(rx_b);

        let delivered = delivery.send_all([&a, &b, &c], &message()).await;
        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_c).len(), 1);
    }
}
