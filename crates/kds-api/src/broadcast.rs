//! Broadcast registry: the live set of subscriber channels.
//!
//! The registry is an explicitly instantiated object owned by the server's
//! composition root, with lifecycle equal to the process. Each streaming
//! connection registers one channel; `publish` fans an event out to all of
//! them and prunes any channel whose write fails. A write failure represents
//! a normal client-disconnect race, never an application error, so `publish`
//! never fails for its caller.
//!
//! Channels are mutated from multiple connection tasks, so the set is
//! mutex-guarded; `publish` snapshots the set under the lock and performs the
//! writes outside it, then removes failed channels after the full pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use ulid::Ulid;

use kds_core::event::KitchenEvent;

/// Identifier of a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Ulid);

impl ChannelId {
    fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned by single-channel writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("channel closed")
    }
}

impl std::error::Error for ChannelClosed {}

type ChannelMap = HashMap<ChannelId, mpsc::UnboundedSender<KitchenEvent>>;

/// The set of currently-subscribed output channels.
#[derive(Debug, Default)]
pub struct BroadcastRegistry {
    channels: Mutex<ChannelMap>,
}

impl BroadcastRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new channel, returning its id and the receiving end.
    pub fn register(&self) -> (ChannelId, mpsc::UnboundedReceiver<KitchenEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ChannelId::generate();
        self.lock().insert(id, tx);
        tracing::debug!(channel = %id, total = self.len(), "channel registered");
        (id, rx)
    }

    /// Removes a channel. Idempotent: unknown or already-removed channels
    /// are ignored.
    pub fn unregister(&self, id: ChannelId) {
        if self.lock().remove(&id).is_some() {
            tracing::debug!(channel = %id, total = self.len(), "channel unregistered");
        }
    }

    /// Delivers an event to every registered channel.
    ///
    /// Channels whose write fails are removed after the full delivery pass;
    /// individual failures are isolated and never affect delivery to the
    /// remaining channels. Returns the number of successful deliveries.
    pub fn publish(&self, event: &KitchenEvent) -> usize {
        let snapshot: Vec<(ChannelId, mpsc::UnboundedSender<KitchenEvent>)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut failed = Vec::new();
        let mut delivered = 0;
        for (id, tx) in snapshot {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut channels = self.lock();
            for id in &failed {
                channels.remove(id);
                tracing::debug!(channel = %id, "channel dropped after failed write");
            }
        }

        delivered
    }

    /// Writes an event to a single channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] when the channel is not registered or its
    /// receiving end has been dropped.
    pub fn send_to(&self, id: ChannelId, event: &KitchenEvent) -> Result<(), ChannelClosed> {
        let tx = self.lock().get(&id).cloned().ok_or(ChannelClosed)?;
        tx.send(event.clone()).map_err(|_| ChannelClosed)
    }

    /// Returns the number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether the registry has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelMap> {
        // A poisoned lock only means another task panicked mid-mutation of a
        // plain map; the map itself is still usable.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_all_registered_channels() {
        let registry = BroadcastRegistry::new();
        let (_id1, mut rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();

        let delivered = registry.publish(&KitchenEvent::heartbeat());
        assert_eq!(delivered, 2);
        assert!(matches!(rx1.try_recv(), Ok(KitchenEvent::Heartbeat { .. })));
        assert!(matches!(rx2.try_recv(), Ok(KitchenEvent::Heartbeat { .. })));
    }

    #[test]
    fn failing_channels_are_pruned_and_others_still_delivered() {
        let registry = BroadcastRegistry::new();
        let (id1, rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();
        let (id3, rx3) = registry.register();

        // Dropped receivers make the corresponding writes fail.
        drop(rx1);
        drop(rx3);

        let delivered = registry.publish(&KitchenEvent::heartbeat());
        assert_eq!(delivered, 1);
        assert!(matches!(rx2.try_recv(), Ok(KitchenEvent::Heartbeat { .. })));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.send_to(id1, &KitchenEvent::heartbeat()),
            Err(ChannelClosed)
        );
        assert_eq!(
            registry.send_to(id3, &KitchenEvent::heartbeat()),
            Err(ChannelClosed)
        );
    }

    #[test]
    fn publish_with_no_channels_is_a_no_op() {
        let registry = BroadcastRegistry::new();
        assert_eq!(registry.publish(&KitchenEvent::heartbeat()), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = BroadcastRegistry::new();
        let (id, _rx) = registry.register();

        registry.unregister(id);
        registry.unregister(id);
        assert!(registry.is_empty());

        // Unregistering a never-registered channel is also safe.
        let other = BroadcastRegistry::new();
        let (foreign, _rx2) = other.register();
        registry.unregister(foreign);
        assert!(registry.is_empty());
    }

    #[test]
    fn send_to_delivers_to_one_channel_only() {
        let registry = BroadcastRegistry::new();
        let (id1, mut rx1) = registry.register();
        let (_id2, mut rx2) = registry.register();

        registry
            .send_to(id1, &KitchenEvent::connected())
            .expect("send should succeed");
        assert!(matches!(rx1.try_recv(), Ok(KitchenEvent::Connected { .. })));
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn send_to_dropped_receiver_fails() {
        let registry = BroadcastRegistry::new();
        let (id, rx) = registry.register();
        drop(rx);
        assert_eq!(
            registry.send_to(id, &KitchenEvent::heartbeat()),
            Err(ChannelClosed)
        );
    }
}
