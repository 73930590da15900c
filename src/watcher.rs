use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, TripError};
use crate::models::{PathPoint, TripRecord, TripStatus};
use crate::relay::{AlertKind, Relay, TripEvent};
use crate::store::TripStore;

/// A watcher's view of a trip: the most recent published location and the
/// status banner, converged from relay events and periodic record polls.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingView {
    pub trip_id: Uuid,
    pub status: TripStatus,
    pub last_position: Option<PathPoint>,
    pub path_len: usize,
    pub last_alert: Option<(String, AlertKind)>,
    /// Timestamp of the newest information folded in; polls older than this
    /// are discarded (last-write-wins).
    pub seen_at: DateTime<Utc>,
}

impl TrackingView {
    fn from_record(record: &TripRecord) -> Self {
        Self {
            trip_id: record.id,
            status: record.status,
            last_position: record.last_point().copied(),
            path_len: record.path.len(),
            last_alert: None,
            seen_at: record.updated_at,
        }
    }

    /// Fold one live relay event into the view.
    pub fn apply_event(&mut self, event: TripEvent) {
        match event {
            TripEvent::LocationUpdated { point } => {
                self.last_position = Some(point);
                self.path_len += 1;
            }
            TripEvent::SosRaised { .. } => self.status = TripStatus::Sos,
            TripEvent::SosCleared => self.status = TripStatus::Active,
            TripEvent::Alert { message, kind } => self.last_alert = Some((message, kind)),
            TripEvent::TripEnded => self.status = TripStatus::Completed,
        }
        self.seen_at = Utc::now();
    }

    /// Fold a freshly polled record into the view. The poll wins only when
    /// the record is at least as recent as what the view already saw, so a
    /// stale read never rolls back live events.
    pub fn apply_record(&mut self, record: &TripRecord) {
        if record.updated_at < self.seen_at {
            return;
        }
        self.status = record.status;
        self.last_position = record.last_point().copied();
        self.path_len = record.path.len();
        self.seen_at = record.updated_at;
    }
}

/// Handle to a running watcher task.
pub struct WatcherHandle {
    pub view: watch::Receiver<TrackingView>,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    /// Wait for the watcher to observe trip completion.
    pub async fn finished(self) {
        let _ = self.join.await;
    }
}

/// Follow a trip as a watcher: subscribe to its relay channel, poll the
/// persisted record every `poll_interval` as the catch-up path, and publish
/// the converged [`TrackingView`]. The task exits once the view reaches
/// `completed`.
///
/// The initial record read must succeed (a watcher cannot join a trip that
/// does not exist); everything afterwards is best-effort.
pub async fn watch_trip(
    store: Arc<dyn TripStore>,
    relay: Arc<Relay>,
    trip_id: Uuid,
    poll_interval: Duration,
) -> Result<WatcherHandle> {
    let record = store
        .get_trip(trip_id)
        .await?
        .ok_or(TripError::TripNotFound(trip_id))?;
    let view = TrackingView::from_record(&record);
    let (tx, rx) = watch::channel(view.clone());

    // An already-completed trip has nothing left to stream; subscribing
    // would re-create the relay channel the coordinator closed.
    let join = if record.status == TripStatus::Completed {
        tokio::spawn(async {})
    } else {
        let events = relay.subscribe(trip_id);
        tokio::spawn(run_watcher(store, events, tx, view, poll_interval))
    };
    Ok(WatcherHandle { view: rx, join })
}

async fn run_watcher(
    store: Arc<dyn TripStore>,
    mut events: broadcast::Receiver<TripEvent>,
    tx: watch::Sender<TrackingView>,
    mut view: TrackingView,
    poll_interval: Duration,
) {
    let mut poll = tokio::time::interval_at(
        tokio::time::Instant::now() + poll_interval,
        poll_interval,
    );
    let mut relay_open = true;
    let trip_id = view.trip_id;

    while view.status != TripStatus::Completed {
        tokio::select! {
            event = events.recv(), if relay_open => match event {
                Ok(event) => view.apply_event(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Dropped events are recovered by the next poll.
                    debug!(%trip_id, missed, "watcher lagged behind relay");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(%trip_id, "relay channel closed");
                    relay_open = false;
                }
            },
            _ = poll.tick() => {
                match store.get_trip(trip_id).await {
                    Ok(Some(record)) => view.apply_record(&record),
                    Ok(None) => warn!(%trip_id, "trip record disappeared"),
                    // Poll failures are non-fatal; live events keep flowing.
                    Err(e) => warn!(%trip_id, "trip poll failed: {e}"),
                }
            }
        }
        if tx.send(view.clone()).is_err() {
            // Nobody is displaying this view anymore.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{start_trip, TripSettings};
    use crate::geo::GeoPoint;
    use crate::models::SosAlert;
    use crate::store::MemoryStore;
    use tokio::sync::mpsc;

    fn record(status: TripStatus) -> TripRecord {
        TripRecord {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            status,
            started_at: Utc::now(),
            ended_at: None,
            start_location: GeoPoint::new(26.76, 83.37),
            destination: None,
            path: Vec::new(),
            sos_alerts: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn point(lat: f64, lng: f64) -> PathPoint {
        PathPoint {
            lat,
            lng,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn events_fold_into_the_view() {
        let mut view = TrackingView::from_record(&record(TripStatus::Active));
        view.apply_event(TripEvent::LocationUpdated {
            point: point(26.77, 83.38),
        });
        assert_eq!(view.path_len, 1);
        assert_eq!(view.last_position.unwrap().lat, 26.77);

        view.apply_event(TripEvent::SosRaised {
            alert: SosAlert {
                timestamp: Utc::now(),
                location: GeoPoint::new(26.77, 83.38),
            },
        });
        assert_eq!(view.status, TripStatus::Sos);

        view.apply_event(TripEvent::SosCleared);
        assert_eq!(view.status, TripStatus::Active);

        view.apply_event(TripEvent::TripEnded);
        assert_eq!(view.status, TripStatus::Completed);
    }

    #[test]
    fn stale_poll_does_not_roll_back_live_events() {
        let mut rec = record(TripStatus::Active);
        let mut view = TrackingView::from_record(&rec);

        // A live event arrives after the record was read.
        view.apply_event(TripEvent::SosRaised {
            alert: SosAlert {
                timestamp: Utc::now(),
                location: GeoPoint::new(26.77, 83.38),
            },
        });
        // Re-polling the same stale record must not clear SOS.
        view.apply_record(&rec);
        assert_eq!(view.status, TripStatus::Sos);

        // A fresher record does win.
        rec.status = TripStatus::Completed;
        rec.updated_at = Utc::now();
        view.apply_record(&rec);
        assert_eq!(view.status, TripStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_follows_a_live_trip() {
        let store = Arc::new(MemoryStore::new());
        let relay = Arc::new(Relay::default());
        let (pos_tx, pos_rx) = mpsc::channel(16);
        let (notif_tx, _notif_rx) = mpsc::unbounded_channel();

        let handle = start_trip(
            store.clone(),
            store.clone(),
            relay.clone(),
            Uuid::new_v4(),
            GeoPoint::new(26.7606, 83.3732),
            TripSettings::default(),
            pos_rx,
            notif_tx,
        )
        .await
        .unwrap();

        let watcher = watch_trip(
            store.clone(),
            relay.clone(),
            handle.trip_id,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        let mut view_rx = watcher.view.clone();

        pos_tx.send(GeoPoint::new(26.7620, 83.3732)).await.unwrap();
        loop {
            view_rx.changed().await.unwrap();
            if view_rx.borrow().last_position.is_some() {
                break;
            }
        }
        assert_eq!(view_rx.borrow().last_position.unwrap().lat, 26.7620);

        handle.end_trip();
        handle.finished().await;
        loop {
            if view_rx.borrow().status == TripStatus::Completed {
                break;
            }
            if view_rx.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(view_rx.borrow().status, TripStatus::Completed);
        watcher.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_watcher_converges_via_poll() {
        let store = Arc::new(MemoryStore::new());
        let relay = Arc::new(Relay::default());

        // Status changes in the store with no relay traffic at all, as if
        // every live event had been missed.
        let rec = store
            .create_trip(Uuid::new_v4(), GeoPoint::new(26.76, 83.37), None)
            .await
            .unwrap();
        let watcher = watch_trip(
            store.clone(),
            relay.clone(),
            rec.id,
            Duration::from_secs(3),
        )
        .await
        .unwrap();
        let mut view_rx = watcher.view.clone();
        assert_eq!(view_rx.borrow().status, TripStatus::Active);

        store
            .set_status(rec.id, TripStatus::Completed, Some(Utc::now()))
            .await
            .unwrap();

        loop {
            if view_rx.borrow().status == TripStatus::Completed {
                break;
            }
            if view_rx.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(view_rx.borrow().status, TripStatus::Completed);
        watcher.finished().await;
    }

    #[tokio::test]
    async fn watching_a_finished_trip_leaves_the_relay_alone() {
        let store = Arc::new(MemoryStore::new());
        let relay = Arc::new(Relay::default());

        let rec = store
            .create_trip(Uuid::new_v4(), GeoPoint::new(26.76, 83.37), None)
            .await
            .unwrap();
        store
            .set_status(rec.id, TripStatus::Completed, Some(Utc::now()))
            .await
            .unwrap();

        let watcher = watch_trip(
            store.clone(),
            relay.clone(),
            rec.id,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(watcher.view.borrow().status, TripStatus::Completed);
        // No channel is opened for a trip that already ended.
        assert_eq!(relay.topic_count(), 0);
        watcher.finished().await;
    }

    #[tokio::test]
    async fn watching_an_unknown_trip_fails() {
        let store = Arc::new(MemoryStore::new());
        let relay = Arc::new(Relay::default());
        let err = watch_trip(store, relay, Uuid::new_v4(), Duration::from_secs(5)).await;
        assert!(matches!(err, Err(TripError::TripNotFound(_))));
    }
}
