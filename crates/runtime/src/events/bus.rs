use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use spell_core::{CastNotification, NotificationSink};

/// Topics for notification routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Cast start, pushback and spell-go
    Cast,
    /// Channel start and updates
    Channel,
    /// Failures and interruptions
    Failure,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Cast, Topic::Channel, Topic::Failure];

    pub fn of(notification: &CastNotification) -> Self {
        match notification {
            CastNotification::CastStart { .. }
            | CastNotification::CastDelayed { .. }
            | CastNotification::SpellGo { .. } => Topic::Cast,
            CastNotification::ChannelStart { .. } | CastNotification::ChannelUpdate { .. } => {
                Topic::Channel
            }
            CastNotification::CastFailed { .. } | CastNotification::Interrupted { .. } => {
                Topic::Failure
            }
        }
    }
}

/// Topic-based notification bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// notifications they care about. Publishing never blocks; notifications
/// without subscribers are dropped.
#[derive(Clone)]
pub struct NotificationBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<CastNotification>>>,
}

impl NotificationBus {
    /// Creates a new bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish a notification to its corresponding topic
    pub fn publish(&self, notification: CastNotification) {
        let topic = Topic::of(&notification);
        if let Some(tx) = self.channels.get(&topic)
            && tx.send(notification).is_err()
        {
            tracing::trace!(target: "runtime::driver", ?topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> Option<broadcast::Receiver<CastNotification>> {
        self.channels.get(&topic).map(broadcast::Sender::subscribe)
    }

    /// Subscribe to multiple topics
    ///
    /// Returns receivers for each requested topic.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<CastNotification>> {
        topics
            .iter()
            .filter_map(|topic| self.subscribe(*topic).map(|rx| (*topic, rx)))
            .collect()
    }

    /// Current subscriber count for a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels
            .get(&topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for NotificationBus {
    fn notify(&self, notification: CastNotification) {
        self.publish(notification);
    }
}
