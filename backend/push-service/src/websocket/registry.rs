//! Channel registry
//!
//! Tracks which users currently have open push channels. A user can hold
//! several channels at once (one per browser tab); each channel belongs to
//! exactly one user for its whole lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Channel, ChannelId, UserId};
use crate::metrics;

#[derive(Default)]
struct Inner {
    /// user_id -> channels keyed by channel id
    by_user: HashMap<UserId, HashMap<ChannelId, Channel>>,
    /// channel_id -> owning user
    owners: HashMap<ChannelId, UserId>,
}

/// Thread-safe registry of open channels
///
/// Cloning is cheap and every clone sees the same state. Critical sections
/// are short and never span an `.await`.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `channel` to the set of `user_id`
    ///
    /// Returns `false` when the channel is already registered, either for
    /// this user (set semantics) or for another one (ownership is fixed).
    pub fn register(&self, user_id: &UserId, channel: Channel) -> bool {
        let channel_id = channel.id();
        let mut guard = self.inner.write();

        if let Some(owner) = guard.owners.get(&channel_id) {
            if owner != user_id {
                tracing::warn!(
                    channel_id = %channel_id,
                    owner = %owner,
                    requested = %user_id,
                    "refusing to move channel to another user"
                );
            }
            return false;
        }

        guard.owners.insert(channel_id, user_id.clone());
        let channels = guard.by_user.entry(user_id.clone()).or_default();
        channels.insert(channel_id, channel);
        let count = channels.len();
        drop(guard);

        metrics::channel_opened();
        tracing::debug!(
            user_id = %user_id,
            channel_id = %channel_id,
            user_channels = count,
            "registered channel"
        );
        true
    }

    /// Remove a channel from the set of `user_id`
    ///
    /// Unknown channels are ignored. Empty user entries are pruned.
    pub fn unregister(&self, user_id: &UserId, channel_id: ChannelId) -> bool {
        let mut guard = self.inner.write();

        if guard.owners.get(&channel_id) != Some(user_id) {
            return false;
        }
        guard.owners.remove(&channel_id);

        let remaining = match guard.by_user.get_mut(user_id) {
            Some(channels) => {
                channels.remove(&channel_id);
                channels.len()
            }
            None => 0,
        };
        if remaining == 0 {
            guard.by_user.remove(user_id);
        }
        drop(guard);

        metrics::channel_closed();
        tracing::debug!(
            user_id = %user_id,
            channel_id = %channel_id,
            remaining,
            "unregistered channel"
        );
        true
    }

    /// Snapshot of the channels currently open for `user_id`
    pub fn channels_for(&self, user_id: &UserId) -> Vec<Channel> {
        let guard = self.inner.read();
        guard
            .by_user
            .get(user_id)
            .map(|channels| channels.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every open channel
    pub fn all_channels(&self) -> Vec<Channel> {
        let guard = self.inner.read();
        guard
            .by_user
            .values()
            .flat_map(|channels| channels.values().cloned())
            .collect()
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.inner.read().by_user.contains_key(user_id)
    }

    pub fn connection_count(&self, user_id: &UserId) -> usize {
        let guard = self.inner.read();
        guard.by_user.get(user_id).map(HashMap::len).unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.inner.read().owners.len()
    }

    pub fn connected_users_count(&self) -> usize {
        self.inner.read().by_user.len()
    }

    pub fn connected_user_ids(&self) -> Vec<UserId> {
        let guard = self.inner.read();
        let mut ids: Vec<UserId> = guard.by_user.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every channel. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut guard = self.inner.write();
        let removed = guard.owners.len();
        guard.by_user.clear();
        guard.owners.clear();
        drop(guard);

        metrics::channels_cleared(removed);
        removed
    }
}

/// Ownership of one registry entry
///
/// Unregisters its channel exactly once: on the first call to
/// [`Registration::close`] or when dropped, whichever happens first.
pub struct Registration {
    registry: ChannelRegistry,
    user_id: UserId,
    channel_id: ChannelId,
    active: bool,
}

impl Registration {
    /// Register `channel` for `user_id` and return the guard owning the entry
    pub fn new(registry: ChannelRegistry, user_id: UserId, channel: Channel) -> Self {
        let channel_id = channel.id();
        let active = registry.register(&user_id, channel);
        Self {
            registry,
            user_id,
            channel_id,
            active,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remove the channel from the registry. Later calls do nothing.
    pub fn close(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.registry.unregister(&self.user_id, self.channel_id)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.close();
    }
}
