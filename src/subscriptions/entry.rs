//! Reference-counted routing entries
//!
//! Subscribing twice to the same topic needs two unsubscribes to undo. The
//! same counting applies to topic subscriptions and feed monitors, so both
//! tables share these helpers.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Number of outstanding adds for one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefCount {
    count: u32,
}

impl RefCount {
    pub fn get(self) -> u32 {
        self.count
    }
}

/// Increment the count for `key`, creating it at one. Returns the new count.
pub fn increment<K: Hash + Eq>(map: &mut HashMap<K, RefCount>, key: K) -> u32 {
    let entry = map.entry(key).or_insert(RefCount { count: 0 });
    entry.count = entry.count.saturating_add(1);
    entry.count
}

/// Decrement the count for `key`, removing the entry when it reaches zero
///
/// With `force_all` the entry is removed whatever its count. Returns true
/// when the entry was removed.
pub fn decrement<K, Q>(map: &mut HashMap<K, RefCount>, key: &Q, force_all: bool) -> bool
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    let Some(entry) = map.get_mut(key) else {
        return false;
    };

    entry.count = entry.count.saturating_sub(1);
    if force_all || entry.count == 0 {
        map.remove(key);
        true
    } else {
        false
    }
}
