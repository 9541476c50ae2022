//! Notification registrations: feed ─► set of registrants

use std::collections::{HashMap, HashSet};

use crate::interactor::InteractorHandle;

/// Interactors wanting to hear about subscription changes, per feed
#[derive(Debug, Default)]
pub struct NotificationRepository {
    feeds: HashMap<String, HashSet<InteractorHandle>>,
}

impl NotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for a feed. Returns true only for a new registration.
    pub fn add_request(&mut self, notifiable: &InteractorHandle, feed: &str) -> bool {
        self.feeds
            .entry(feed.to_owned())
            .or_default()
            .insert(notifiable.clone())
    }

    /// Unregister from a feed. Returns true if it was registered.
    pub fn remove_request(&mut self, notifiable: &InteractorHandle, feed: &str) -> bool {
        let Some(notifiables) = self.feeds.get_mut(feed) else {
            return false;
        };

        let removed = notifiables.remove(notifiable);
        if notifiables.is_empty() {
            self.feeds.remove(feed);
        }
        removed
    }

    /// Drop every registration held by an interactor, returning the feeds it left
    pub fn remove_interactor(&mut self, notifiable: &InteractorHandle) -> Vec<String> {
        let mut left = Vec::new();
        self.feeds.retain(|feed, notifiables| {
            if notifiables.remove(notifiable) {
                left.push(feed.clone());
            }
            !notifiables.is_empty()
        });
        left
    }

    /// Registrants for a feed
    pub fn notifiables(&self, feed: &str) -> Vec<InteractorHandle> {
        self.feeds
            .get(feed)
            .map(|n| n.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_registered(&self, notifiable: &InteractorHandle, feed: &str) -> bool {
        self.feeds
            .get(feed)
            .is_some_and(|n| n.contains(notifiable))
    }

    /// Number of (feed, registrant) pairs
    pub fn registrations(&self) -> usize {
        self.feeds.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactor::handle::testing::handle;

    #[test]
    fn test_add_is_idempotent() {
        let mut repo = NotificationRepository::new();
        let (n, _rx) = handle("n", 1);

        assert!(repo.add_request(&n, "LSE"));
        assert!(!repo.add_request(&n, "LSE"));
        assert_eq!(repo.registrations(), 1);
        assert!(repo.is_registered(&n, "LSE"));
    }

    #[test]
    fn test_remove_prunes_feed() {
        let mut repo = NotificationRepository::new();
        let (n, _rx) = handle("n", 1);

        repo.add_request(&n, "LSE");
        assert!(repo.remove_request(&n, "LSE"));
        assert!(!repo.remove_request(&n, "LSE"));
        assert!(repo.is_empty());
        assert!(repo.notifiables("LSE").is_empty());
    }

    #[test]
    fn test_remove_interactor() {
        let mut repo = NotificationRepository::new();
        let (a, _rx_a) = handle("a", 1);
        let (b, _rx_b) = handle("b", 1);

        repo.add_request(&a, "LSE");
        repo.add_request(&a, "NYSE");
        repo.add_request(&b, "NYSE");

        let mut left = repo.remove_interactor(&a);
        left.sort();
        assert_eq!(left, vec!["LSE".to_string(), "NYSE".to_string()]);

        assert!(repo.notifiables("LSE").is_empty());
        assert_eq!(repo.notifiables("NYSE"), vec![b]);
        assert_eq!(repo.registrations(), 1);
    }
}
