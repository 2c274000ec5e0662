//! Typed event bus.
//!
//! Subsystems publish [`GameEvent`]s on named [`Topic`]s; UI panels and
//! other subsystems subscribe with a callback. Subscriber lists are explicit
//! and ordered by subscription, so delivery order is deterministic.

use std::collections::BTreeMap;

use caravan_types::{ChangeReason, DeathCause, LocationRecord, SubscriptionId, WorldMode};
use serde::Serialize;
use tracing::trace;

/// Named channels events are published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    /// `location:changed`
    LocationChanged,
    /// `world:changed`
    WorldChanged,
    /// `vitals:death`
    Death,
}

impl Topic {
    /// Wire name of the topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocationChanged => "location:changed",
            Self::WorldChanged => "world:changed",
            Self::Death => "vitals:death",
        }
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published by the simulation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The player's location changed.
    LocationChanged {
        /// The new canonical location.
        location: LocationRecord,
        /// The location before the change, if any.
        previous_location: Option<LocationRecord>,
        /// Why the location changed.
        reason: ChangeReason,
        /// World mode the location belongs to.
        world: WorldMode,
    },
    /// The player entered or left the doom overlay.
    WorldChanged {
        /// The new world mode.
        world: WorldMode,
        /// The world mode before the change.
        previous_world: WorldMode,
        /// Why the mode changed.
        reason: ChangeReason,
    },
    /// The player died.
    Death {
        /// What killed the player.
        cause: DeathCause,
    },
}

impl GameEvent {
    /// The topic this event is published on.
    pub const fn topic(&self) -> Topic {
        match self {
            Self::LocationChanged { .. } => Topic::LocationChanged,
            Self::WorldChanged { .. } => Topic::WorldChanged,
            Self::Death { .. } => Topic::Death,
        }
    }
}

type Handler = Box<dyn FnMut(&GameEvent) + Send>;

/// Publish/subscribe hub with explicit, ordered subscriber lists.
#[derive(Default)]
pub struct EventBus {
    subscribers: BTreeMap<Topic, Vec<(SubscriptionId, Handler)>>,
    published: u64,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .subscribers
            .iter()
            .map(|(topic, subs)| (topic.as_str(), subs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .field("published", &self.published)
            .finish()
    }
}

impl EventBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. Returns a handle for unsubscribing.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        let id = SubscriptionId::new();
        self.subscribers
            .entry(topic)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subs in self.subscribers.values_mut() {
            if let Some(pos) = subs.iter().position(|(sub_id, _)| *sub_id == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every subscriber of its topic, in subscription order.
    pub fn publish(&mut self, event: &GameEvent) {
        let topic = event.topic();
        self.published = self.published.saturating_add(1);
        let Some(subs) = self.subscribers.get_mut(&topic) else {
            return;
        };
        trace!(topic = %topic, subscribers = subs.len(), "event published");
        for (_, handler) in subs.iter_mut() {
            handler(event);
        }
    }

    /// Number of subscribers on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers.get(&topic).map_or(0, Vec::len)
    }

    /// Total events published since creation.
    pub const fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use caravan_types::LocationId;

    use super::*;

    fn death() -> GameEvent {
        GameEvent::Death {
            cause: DeathCause::Starvation,
        }
    }

    #[test]
    fn topic_names() {
        assert_eq!(Topic::LocationChanged.as_str(), "location:changed");
        assert_eq!(Topic::WorldChanged.to_string(), "world:changed");
        assert_eq!(death().topic(), Topic::Death);
    }

    #[test]
    fn delivers_only_to_matching_topic_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let first = Arc::clone(&log);
        bus.subscribe(Topic::Death, move |_| {
            if let Ok(mut l) = first.lock() {
                l.push("first");
            }
        });
        let second = Arc::clone(&log);
        bus.subscribe(Topic::Death, move |_| {
            if let Ok(mut l) = second.lock() {
                l.push("second");
            }
        });
        let other = Arc::clone(&log);
        bus.subscribe(Topic::WorldChanged, move |_| {
            if let Ok(mut l) = other.lock() {
                l.push("world");
            }
        });

        bus.publish(&death());
        let seen = log.lock().map(|l| l.clone()).unwrap_or_default();
        assert_eq!(seen, vec!["first", "second"]);
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Arc::new(Mutex::new(0_u32));
        let mut bus = EventBus::new();
        let c = Arc::clone(&count);
        let id = bus.subscribe(Topic::Death, move |_| {
            if let Ok(mut n) = c.lock() {
                *n = n.saturating_add(1);
            }
        });

        bus.publish(&death());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&death());

        assert_eq!(count.lock().map(|n| *n).unwrap_or(0), 1);
        assert_eq!(bus.subscriber_count(Topic::Death), 0);
    }

    #[test]
    fn location_event_serializes_with_type_tag() {
        let event = GameEvent::LocationChanged {
            location: LocationRecord::opaque(LocationId::new("somewhere")),
            previous_location: None,
            reason: ChangeReason::Travel,
            world: WorldMode::Normal,
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "location_changed");
        assert_eq!(json["world"], "normal");
        assert_eq!(json["reason"], "travel");
    }
}
