//! Subscription routing table
//!
//! ```text
//! subscriptions: feed ─► topic ─► subscriber ─► RefCount
//! monitors:      feed ─► subscriber ─► RefCount
//! ```
//!
//! Empty inner maps are removed as soon as they empty, so a missing key
//! always means "nobody is interested".

use std::collections::{HashMap, HashSet};

use super::entry::{self, RefCount};
use crate::interactor::InteractorHandle;
use crate::protocol::FeedTopic;

type Subscribers = HashMap<InteractorHandle, RefCount>;

/// Who wants which feed and topic
#[derive(Debug, Default)]
pub struct SubscriptionRepository {
    subscriptions: HashMap<String, HashMap<String, Subscribers>>,
    monitors: HashMap<String, Subscribers>,
}

impl SubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic subscription. Returns the subscriber's new count.
    pub fn add_subscription(&mut self, subscriber: &InteractorHandle, feed: &str, topic: &str) -> u32 {
        let topics = self.subscriptions.entry(feed.to_owned()).or_default();
        let subscribers = topics.entry(topic.to_owned()).or_default();
        entry::increment(subscribers, subscriber.clone())
    }

    /// Remove a topic subscription
    ///
    /// Decrements the count, or drops the entry outright with `force_all`.
    /// Returns true when the entry is gone.
    pub fn remove_subscription(
        &mut self,
        subscriber: &InteractorHandle,
        feed: &str,
        topic: &str,
        force_all: bool,
    ) -> bool {
        let Some(topics) = self.subscriptions.get_mut(feed) else {
            return false;
        };
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };

        let removed = entry::decrement(subscribers, subscriber, force_all);

        if subscribers.is_empty() {
            topics.remove(topic);
        }
        if topics.is_empty() {
            self.subscriptions.remove(feed);
        }

        removed
    }

    /// Add a feed monitor. Returns the monitor's new count.
    pub fn add_monitor(&mut self, monitor: &InteractorHandle, feed: &str) -> u32 {
        let monitors = self.monitors.entry(feed.to_owned()).or_default();
        entry::increment(monitors, monitor.clone())
    }

    /// Remove a feed monitor, with the same counting as subscriptions
    pub fn remove_monitor(&mut self, monitor: &InteractorHandle, feed: &str, force_all: bool) -> bool {
        let Some(monitors) = self.monitors.get_mut(feed) else {
            return false;
        };

        let removed = entry::decrement(monitors, monitor, force_all);

        if monitors.is_empty() {
            self.monitors.remove(feed);
        }

        removed
    }

    /// Recipients for data on (feed, topic): topic subscribers plus feed monitors
    pub fn subscribers_of(&self, feed: &str, topic: &str) -> Vec<InteractorHandle> {
        let mut recipients: HashSet<&InteractorHandle> = HashSet::new();

        if let Some(subscribers) = self.subscriptions.get(feed).and_then(|t| t.get(topic)) {
            recipients.extend(subscribers.keys());
        }
        if let Some(monitors) = self.monitors.get(feed) {
            recipients.extend(monitors.keys());
        }

        recipients.into_iter().cloned().collect()
    }

    /// Every topic on a feed with its explicit subscribers
    pub fn subscribers_to_feed(&self, feed: &str) -> Vec<(String, Vec<InteractorHandle>)> {
        self.subscriptions
            .get(feed)
            .map(|topics| {
                topics
                    .iter()
                    .map(|(topic, subscribers)| (topic.clone(), subscribers.keys().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every (feed, topic) the subscriber holds
    pub fn feed_topics_of(&self, subscriber: &InteractorHandle) -> Vec<FeedTopic> {
        let mut feed_topics = Vec::new();
        for (feed, topics) in &self.subscriptions {
            for (topic, subscribers) in topics {
                if subscribers.contains_key(subscriber) {
                    feed_topics.push(FeedTopic::new(feed.clone(), topic.clone()));
                }
            }
        }
        feed_topics
    }

    /// Every feed the subscriber monitors
    pub fn monitored_feeds_of(&self, subscriber: &InteractorHandle) -> Vec<String> {
        self.monitors
            .iter()
            .filter(|(_, monitors)| monitors.contains_key(subscriber))
            .map(|(feed, _)| feed.clone())
            .collect()
    }

    /// Outstanding add count for one subscription (0 when absent)
    pub fn subscription_count(&self, subscriber: &InteractorHandle, feed: &str, topic: &str) -> u32 {
        self.subscriptions
            .get(feed)
            .and_then(|topics| topics.get(topic))
            .and_then(|subscribers| subscribers.get(subscriber))
            .map_or(0, |count| count.get())
    }

    /// Outstanding add count for one monitor (0 when absent)
    pub fn monitor_count(&self, monitor: &InteractorHandle, feed: &str) -> u32 {
        self.monitors
            .get(feed)
            .and_then(|monitors| monitors.get(monitor))
            .map_or(0, |count| count.get())
    }

    /// Number of (feed, topic, subscriber) entries
    pub fn subscription_entries(&self) -> usize {
        self.subscriptions
            .values()
            .flat_map(|topics| topics.values())
            .map(HashMap::len)
            .sum()
    }

    /// Number of (feed, monitor) entries
    pub fn monitor_entries(&self) -> usize {
        self.monitors.values().map(HashMap::len).sum()
    }

    pub fn feed_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty() && self.monitors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactor::handle::testing::handle;

    fn ids(mut handles: Vec<InteractorHandle>) -> Vec<String> {
        handles.sort_by(|a, b| a.id().cmp(b.id()));
        handles.iter().map(|h| h.id().to_string()).collect()
    }

    #[test]
    fn test_refcount_then_remove() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx) = handle("a", 1);

        for _ in 0..3 {
            repo.add_subscription(&a, "LSE", "SBRY");
        }
        assert_eq!(repo.subscription_count(&a, "LSE", "SBRY"), 3);

        assert!(!repo.remove_subscription(&a, "LSE", "SBRY", false));
        assert!(!repo.remove_subscription(&a, "LSE", "SBRY", false));
        assert!(repo.remove_subscription(&a, "LSE", "SBRY", false));

        assert!(repo.is_empty());
        assert_eq!(repo.feed_count(), 0);
    }

    #[test]
    fn test_force_all() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx) = handle("a", 1);

        for _ in 0..4 {
            repo.add_subscription(&a, "LSE", "SBRY");
            repo.add_monitor(&a, "LSE");
        }
        assert!(repo.remove_subscription(&a, "LSE", "SBRY", true));
        assert!(repo.remove_monitor(&a, "LSE", true));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_subscribers_include_monitors() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_monitor(&b, "LSE");
        assert_eq!(ids(repo.subscribers_of("LSE", "SBRY")), vec!["a", "b"]);

        repo.remove_subscription(&a, "LSE", "SBRY", false);
        assert_eq!(ids(repo.subscribers_of("LSE", "SBRY")), vec!["b"]);

        // Monitors see topics nobody subscribed to explicitly
        assert_eq!(ids(repo.subscribers_of("LSE", "VOD")), vec!["b"]);
        assert!(repo.subscribers_of("NYSE", "IBM").is_empty());
    }

    #[test]
    fn test_subscriber_and_monitor_counted_once() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx) = handle("a", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_monitor(&a, "LSE");
        assert_eq!(repo.subscribers_of("LSE", "SBRY").len(), 1);
    }

    #[test]
    fn test_pruning_keeps_siblings() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_subscription(&b, "LSE", "SBRY");
        repo.add_subscription(&a, "LSE", "VOD");

        repo.remove_subscription(&a, "LSE", "SBRY", false);
        assert_eq!(ids(repo.subscribers_of("LSE", "SBRY")), vec!["b"]);
        assert_eq!(repo.subscription_entries(), 2);

        repo.remove_subscription(&b, "LSE", "SBRY", false);
        repo.remove_subscription(&a, "LSE", "VOD", false);
        assert!(repo.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        assert!(!repo.remove_subscription(&b, "LSE", "SBRY", false));
        assert!(!repo.remove_subscription(&a, "NYSE", "SBRY", false));
        assert!(!repo.remove_monitor(&a, "LSE", false));
        assert_eq!(repo.subscription_entries(), 1);
    }

    #[test]
    fn test_reverse_lookups() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "F1", "T1");
        repo.add_subscription(&a, "F2", "T2");
        repo.add_subscription(&b, "F2", "T2");
        repo.add_monitor(&a, "F3");

        let mut topics = repo.feed_topics_of(&a);
        topics.sort();
        assert_eq!(topics, vec![FeedTopic::new("F1", "T1"), FeedTopic::new("F2", "T2")]);
        assert_eq!(repo.monitored_feeds_of(&a), vec!["F3".to_string()]);
        assert!(repo.monitored_feeds_of(&b).is_empty());
    }

    #[test]
    fn test_subscribers_to_feed() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_subscription(&b, "LSE", "SBRY");
        repo.add_subscription(&b, "LSE", "VOD");
        repo.add_monitor(&a, "LSE");

        let mut by_topic = repo.subscribers_to_feed("LSE");
        by_topic.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(by_topic.len(), 2);
        assert_eq!(by_topic[0].0, "SBRY");
        assert_eq!(ids(by_topic[0].1.clone()), vec!["a", "b"]);
        assert_eq!(by_topic[1].0, "VOD");
        assert_eq!(ids(by_topic[1].1.clone()), vec!["b"]);

        assert!(repo.subscribers_to_feed("NYSE").is_empty());
    }

    #[test]
    fn test_entry_counts() {
        let mut repo = SubscriptionRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_subscription(&a, "LSE", "SBRY");
        repo.add_subscription(&b, "LSE", "VOD");
        repo.add_monitor(&a, "LSE");
        repo.add_monitor(&b, "NYSE");

        assert_eq!(repo.subscription_entries(), 2);
        assert_eq!(repo.monitor_entries(), 2);
        assert_eq!(repo.monitor_count(&a, "LSE"), 1);
    }
}
