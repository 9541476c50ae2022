//! Statistics for the distributor
//!
//! Counters are updated from the accept loop, the heartbeat task and the
//! dispatcher, and read by anyone holding the `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live distributor counters
#[derive(Debug)]
pub struct DistributorStats {
    started_at: Instant,
    active_connections: AtomicU64,
    total_connections: AtomicU64,
    faulted_connections: AtomicU64,
    messages_dispatched: AtomicU64,
    heartbeats_sent: AtomicU64,
    dropped_deliveries: AtomicU64,
    subscription_entries: AtomicU64,
    monitor_entries: AtomicU64,
    notification_registrations: AtomicU64,
}

impl DistributorStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            active_connections: AtomicU64::new(0),
            total_connections: AtomicU64::new(0),
            faulted_connections: AtomicU64::new(0),
            messages_dispatched: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
            dropped_deliveries: AtomicU64::new(0),
            subscription_entries: AtomicU64::new(0),
            monitor_entries: AtomicU64::new(0),
            notification_registrations: AtomicU64::new(0),
        }
    }

    /// A connection was accepted
    pub fn record_accept(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// An interactor was registered with the dispatcher
    pub fn record_connect(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// An interactor was removed
    pub fn record_disconnect(&self) {
        // Saturate rather than wrap if a disconnect is ever double counted
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    /// An interactor was removed because of an error rather than a clean close
    pub fn record_fault(&self) {
        self.faulted_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// A client message was routed
    pub fn record_message(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// A message could not be placed on a recipient's write queue
    pub fn record_dropped(&self) {
        self.dropped_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the current size of the routing tables
    pub fn set_routing(&self, subscriptions: usize, monitors: usize, notifications: usize) {
        self.subscription_entries
            .store(subscriptions as u64, Ordering::Relaxed);
        self.monitor_entries.store(monitors as u64, Ordering::Relaxed);
        self.notification_registrations
            .store(notifications as u64, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            faulted_connections: self.faulted_connections.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
            subscription_entries: self.subscription_entries.load(Ordering::Relaxed),
            monitor_entries: self.monitor_entries.load(Ordering::Relaxed),
            notification_registrations: self.notification_registrations.load(Ordering::Relaxed),
        }
    }
}

impl Default for DistributorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`DistributorStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stats were created
    pub uptime: Duration,
    /// Interactors currently registered
    pub active_connections: u64,
    /// Connections accepted since start
    pub total_connections: u64,
    /// Interactors removed after a fault
    pub faulted_connections: u64,
    /// Client messages routed
    pub messages_dispatched: u64,
    /// Heartbeats enqueued
    pub heartbeats_sent: u64,
    /// Messages not delivered to a recipient
    pub dropped_deliveries: u64,
    /// (feed, topic, subscriber) entries
    pub subscription_entries: u64,
    /// (feed, monitor) entries
    pub monitor_entries: u64,
    /// (feed, registrant) notification entries
    pub notification_registrations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = DistributorStats::new().snapshot();
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.total_connections, 0);
        assert_eq!(snapshot.messages_dispatched, 0);
        assert_eq!(snapshot.dropped_deliveries, 0);
    }

    #[test]
    fn test_connection_counters() {
        let stats = DistributorStats::new();
        stats.record_accept();
        stats.record_accept();
        stats.record_connect();
        stats.record_connect();
        stats.record_disconnect();
        stats.record_fault();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_connections, 2);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.faulted_connections, 1);
    }

    #[test]
    fn test_disconnect_saturates() {
        let stats = DistributorStats::new();
        stats.record_disconnect();
        assert_eq!(stats.active_connections(), 0);
    }

    #[test]
    fn test_routing_gauges() {
        let stats = DistributorStats::new();
        stats.set_routing(3, 1, 2);
        stats.set_routing(2, 1, 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.subscription_entries, 2);
        assert_eq!(snapshot.monitor_entries, 1);
        assert_eq!(snapshot.notification_registrations, 0);
    }

    #[test]
    fn test_message_counters() {
        let stats = DistributorStats::new();
        stats.record_message();
        stats.record_heartbeat();
        stats.record_dropped();
        stats.record_dropped();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_dispatched, 1);
        assert_eq!(snapshot.heartbeats_sent, 1);
        assert_eq!(snapshot.dropped_deliveries, 2);
    }
}
