//! # safewalk-trips
//!
//! Trip lifecycle and real-time alerting coordination for a personal-safety
//! application. A traveler starts a monitored trip; a per-trip coordinator
//! watches the position stream, evaluates geofences and route deviation,
//! runs the safe-check and SOS grace-period countdowns, and broadcasts
//! lifecycle events over a per-trip relay channel that trusted contacts'
//! tracking views subscribe to, reconciling against the persisted trip
//! record when relay events are missed.
//!
//! Transports (HTTP/WebSocket surfaces, device sensors) and rendering are
//! the embedding application's concern: positions arrive on a channel, and
//! everything to display leaves on the notification channel.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod geo;
pub mod models;
pub mod relay;
pub mod store;
pub mod watcher;

pub use config::AppConfig;
pub use coordinator::{
    start_trip, Notification, TripCommand, TripHandle, TripSettings, GRACE_PERIOD_SECS,
    ROUTE_DEVIATION_METERS,
};
pub use error::{Result, TripError};
pub use geo::GeoPoint;
pub use relay::{AlertKind, Relay, TripEvent};
pub use store::{ContactStore, MemoryStore, PgStore, TripStore, ZoneStore};
pub use watcher::{watch_trip, TrackingView, WatcherHandle};
