use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::{PathPoint, SosAlert};

/// Category of a broadcast alert, so watcher UIs can style the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SafeZone,
    DangerZone,
    Deviation,
}

/// Events broadcast to watchers of a trip.
///
/// Fire-and-forget: there is no acknowledgment and no replay. A watcher who
/// subscribes after an event was published never sees it; catch-up is the
/// periodic trip-record poll on the watcher side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TripEvent {
    LocationUpdated { point: PathPoint },
    SosRaised { alert: SosAlert },
    SosCleared,
    Alert { message: String, kind: AlertKind },
    TripEnded,
}

/// In-process publish/subscribe channel keyed by trip id.
///
/// Each trip gets its own bounded broadcast channel; slow subscribers lag
/// and lose events rather than exerting backpressure on the traveler.
pub struct Relay {
    capacity: usize,
    topics: Mutex<HashMap<Uuid, broadcast::Sender<TripEvent>>>,
}

impl Relay {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a trip's event stream. Only events published after this
    /// call are delivered.
    pub fn subscribe(&self, trip_id: Uuid) -> broadcast::Receiver<TripEvent> {
        let mut topics = self.topics.lock().expect("relay lock poisoned");
        topics
            .entry(trip_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Broadcast an event to all current subscribers of the trip.
    pub fn publish(&self, trip_id: Uuid, event: TripEvent) {
        let sender = {
            let mut topics = self.topics.lock().expect("relay lock poisoned");
            topics
                .entry(trip_id)
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .clone()
        };
        // A send error only means nobody is subscribed right now.
        if sender.send(event).is_err() {
            debug!(%trip_id, "relay publish with no subscribers");
        }
    }

    /// Drop the trip's channel; outstanding receivers observe a closed
    /// stream once they drain buffered events.
    pub fn close(&self, trip_id: Uuid) {
        let mut topics = self.topics.lock().expect("relay lock poisoned");
        topics.remove(&trip_id);
    }

    /// Number of trips with an open channel.
    pub fn topic_count(&self) -> usize {
        self.topics.lock().expect("relay lock poisoned").len()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(64)
    }
}
