//! Publisher records
//!
//! A two-way many-to-many map between interactors and the (feed, topic)
//! pairs they have published to. Its only question is which pairs lose
//! their last publisher when an interactor goes away.

use std::collections::{HashMap, HashSet};

use crate::interactor::InteractorHandle;
use crate::protocol::FeedTopic;

#[derive(Debug, Default)]
pub struct PublisherRepository {
    topics_by_publisher: HashMap<InteractorHandle, HashSet<FeedTopic>>,
    publishers_by_topic: HashMap<FeedTopic, HashSet<InteractorHandle>>,
}

impl PublisherRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `publisher` has sent on `feed_topic`
    pub fn add_publisher(&mut self, publisher: &InteractorHandle, feed_topic: FeedTopic) {
        if let Some(topics) = self.topics_by_publisher.get(publisher) {
            if topics.contains(&feed_topic) {
                return;
            }
        }

        self.publishers_by_topic
            .entry(feed_topic.clone())
            .or_default()
            .insert(publisher.clone());
        self.topics_by_publisher
            .entry(publisher.clone())
            .or_default()
            .insert(feed_topic);
    }

    /// Forget a publisher, returning the pairs left with no publisher at all
    pub fn remove_publisher(&mut self, publisher: &InteractorHandle) -> Vec<FeedTopic> {
        let Some(topics) = self.topics_by_publisher.remove(publisher) else {
            return Vec::new();
        };

        let mut stale = Vec::new();
        for feed_topic in topics {
            if let Some(publishers) = self.publishers_by_topic.get_mut(&feed_topic) {
                publishers.remove(publisher);
                if publishers.is_empty() {
                    self.publishers_by_topic.remove(&feed_topic);
                    stale.push(feed_topic);
                }
            }
        }
        stale
    }

    pub fn publishers_of(&self, feed_topic: &FeedTopic) -> Vec<InteractorHandle> {
        self.publishers_by_topic
            .get(feed_topic)
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn feed_topics_of(&self, publisher: &InteractorHandle) -> Vec<FeedTopic> {
        self.topics_by_publisher
            .get(publisher)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.topics_by_publisher.is_empty()
    }
}
