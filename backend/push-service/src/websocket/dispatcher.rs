//! Notification dispatcher
//!
//! Serializes a payload once and queues the identical text on every open
//! channel of the addressee. Delivery is best-effort and at-most-once:
//! users without an open channel are skipped, and a channel that closed
//! after lookup is skipped without affecting the others.

use serde::Serialize;

use super::{Channel, ChannelRegistry, UserId};
use crate::metrics;

/// Per-call delivery summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// Channels a send was attempted on
    pub attempted: usize,
    /// Sends that were queued successfully
    pub delivered: usize,
    /// Sends rejected because the channel had closed or the payload could
    /// not be serialized
    pub failed: usize,
}

impl DeliveryOutcome {
    /// No channel was open for the addressee
    pub fn is_offline(&self) -> bool {
        self.attempted == 0
    }

    /// Every channel was attempted and none could be reached
    fn undeliverable(channels: usize) -> Self {
        Self {
            attempted: channels,
            delivered: 0,
            failed: channels,
        }
    }

    fn label(&self) -> &'static str {
        match (self.attempted, self.delivered) {
            (0, _) => "offline",
            (_, 0) => "failed",
            (a, d) if a == d => "delivered",
            _ => "partial",
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: ChannelRegistry,
}

impl Dispatcher {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Push `payload` to every open channel of `user_id`
    ///
    /// Fire-and-forget: nothing is reported back to the caller.
    pub fn notify<T: Serialize + ?Sized>(&self, user_id: &UserId, payload: &T) {
        self.notify_with_outcome(user_id, payload);
    }

    /// Same as [`Dispatcher::notify`], but reports what happened
    ///
    /// Lets callers tell an offline user (`attempted == 0`) apart from a
    /// user whose channels all failed.
    pub fn notify_with_outcome<T: Serialize + ?Sized>(
        &self,
        user_id: &UserId,
        payload: &T,
    ) -> DeliveryOutcome {
        let channels = self.registry.channels_for(user_id);
        if channels.is_empty() {
            tracing::debug!(user_id = %user_id, "user offline, dropping notification");
            metrics::record_notification("offline");
            return DeliveryOutcome::default();
        }

        let outcome = match serde_json::to_string(payload) {
            Ok(frame) => fan_out(&channels, &frame),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "failed to serialize notification");
                DeliveryOutcome::undeliverable(channels.len())
            }
        };
        metrics::record_notification(outcome.label());
        tracing::debug!(
            user_id = %user_id,
            attempted = outcome.attempted,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "dispatched notification"
        );
        outcome
    }

    /// Push `payload` to every open channel of every user
    pub fn broadcast<T: Serialize + ?Sized>(&self, payload: &T) -> DeliveryOutcome {
        let channels = self.registry.all_channels();
        if channels.is_empty() {
            return DeliveryOutcome::default();
        }

        let outcome = match serde_json::to_string(payload) {
            Ok(frame) => fan_out(&channels, &frame),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize broadcast");
                DeliveryOutcome::undeliverable(channels.len())
            }
        };
        tracing::info!(
            attempted = outcome.attempted,
            delivered = outcome.delivered,
            "broadcast sent"
        );
        outcome
    }
}

fn fan_out(channels: &[Channel], frame: &str) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome {
        attempted: channels.len(),
        ..DeliveryOutcome::default()
    };

    for channel in channels {
        match channel.send(frame.to_owned()) {
            Ok(()) => outcome.delivered += 1,
            Err(e) => {
                // Closed between lookup and send; its session is unregistering it
                tracing::debug!(channel_id = %channel.id(), error = %e, "skipping channel");
                outcome.failed += 1;
            }
        }
    }

    if outcome.failed > 0 {
        metrics::record_send_failures(outcome.failed);
    }
    outcome
}
