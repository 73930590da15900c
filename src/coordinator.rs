use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::geo::{cross_track_meters, GeoPoint};
use crate::models::{Destination, PathPoint, SafeCheckInterval, SosAlert, TripStatus, Zone, ZoneKind};
use crate::relay::{AlertKind, Relay, TripEvent};
use crate::store::{TripStore, ZoneStore};

/// Cancellable window between an SOS trigger and actual escalation.
pub const GRACE_PERIOD_SECS: u64 = 5;

/// Perpendicular distance from the start->destination line beyond which the
/// traveler counts as off route.
pub const ROUTE_DEVIATION_METERS: f64 = 500.0;

/// Options chosen by the traveler when starting a trip.
#[derive(Debug, Clone, Default)]
pub struct TripSettings {
    pub destination: Option<Destination>,
    pub safe_check: Option<SafeCheckInterval>,
}

/// User actions delivered to a running coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCommand {
    /// Manual SOS press: starts the grace-period countdown.
    TriggerSos,
    /// Cancel a running grace-period countdown.
    CancelGrace,
    /// "I'm safe" while in SOS: clears back to active.
    ConfirmSafe,
    /// End the trip from any non-terminal state.
    EndTrip,
}

/// Values pushed to the notification/display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ZoneAlert {
        zone: String,
        kind: ZoneKind,
        message: String,
    },
    /// Level-triggered route-deviation flag, reported on change.
    RouteDeviation {
        deviating: bool,
        distance_m: f64,
    },
    /// Remaining whole seconds on the safe-check countdown.
    SafeCheckRemaining(u64),
    /// Remaining whole seconds on the SOS grace-period countdown.
    GraceRemaining(u64),
    SosRaised,
    SosCleared,
    TripEnded,
}

/// Handle to a running trip coordinator.
pub struct TripHandle {
    pub trip_id: Uuid,
    commands: mpsc::UnboundedSender<TripCommand>,
    join: JoinHandle<()>,
}

impl TripHandle {
    pub fn trigger_sos(&self) {
        let _ = self.commands.send(TripCommand::TriggerSos);
    }

    pub fn cancel_grace(&self) {
        let _ = self.commands.send(TripCommand::CancelGrace);
    }

    pub fn confirm_safe(&self) {
        let _ = self.commands.send(TripCommand::ConfirmSafe);
    }

    pub fn end_trip(&self) {
        let _ = self.commands.send(TripCommand::EndTrip);
    }

    /// Wait for the coordinator task to finish (it exits once the trip
    /// completes).
    pub async fn finished(self) {
        let _ = self.join.await;
    }
}

/// Start a monitored trip.
///
/// Creates the trip record (status `active`, empty path), snapshots the
/// owner's zones, and spawns the coordinator task. The task owns all trip
/// state; position samples arrive on `positions`, user actions through the
/// returned [`TripHandle`], and everything the display layer should render
/// goes out on `notifications`.
///
/// Store failures after this point are best-effort (logged and dropped);
/// only the initial record creation is allowed to fail the start.
pub async fn start_trip(
    store: Arc<dyn TripStore>,
    zones: Arc<dyn ZoneStore>,
    relay: Arc<Relay>,
    owner: Uuid,
    start_location: GeoPoint,
    settings: TripSettings,
    positions: mpsc::Receiver<GeoPoint>,
    notifications: mpsc::UnboundedSender<Notification>,
) -> Result<TripHandle> {
    let record = store
        .create_trip(owner, start_location, settings.destination.clone())
        .await?;
    info!(trip_id = %record.id, %owner, "trip started");

    // Zones are read-only for the life of the trip; a failed listing is
    // non-fatal and simply disables geofence alerts.
    let zone_snapshot = match zones.list_zones(owner).await {
        Ok(zs) => zs,
        Err(e) => {
            warn!(trip_id = %record.id, "failed to load zones: {e}");
            Vec::new()
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator {
        trip_id: record.id,
        status: TripStatus::Active,
        start_location,
        destination: settings.destination,
        zones: zone_snapshot,
        inside_zones: HashSet::new(),
        off_route: false,
        last_position: None,
        safe_check: settings.safe_check.map(|interval| SafeCheck {
            full_secs: interval.as_secs(),
            remaining: interval.as_secs(),
        }),
        grace: None,
        store,
        relay,
        notify: notifications,
    };

    let join = tokio::spawn(coordinator.run(positions, cmd_rx));
    Ok(TripHandle {
        trip_id: record.id,
        commands: cmd_tx,
        join,
    })
}

#[derive(Debug)]
struct SafeCheck {
    full_secs: u64,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraceCause {
    SafeCheckExpired,
    Manual,
}

#[derive(Debug)]
struct Grace {
    remaining: u64,
    cause: GraceCause,
}

/// Per-trip state machine. Single task, single writer: the position sampler,
/// safe-check countdown, and grace countdown are `select!` arms on one loop,
/// so state mutations are serialized without locks.
struct Coordinator {
    trip_id: Uuid,
    status: TripStatus,
    start_location: GeoPoint,
    destination: Option<Destination>,
    zones: Vec<Zone>,
    /// Ids of zones the traveler is currently inside; makes enter/exit
    /// edge-triggered rather than firing on every sample.
    inside_zones: HashSet<Uuid>,
    off_route: bool,
    last_position: Option<GeoPoint>,
    safe_check: Option<SafeCheck>,
    grace: Option<Grace>,
    store: Arc<dyn TripStore>,
    relay: Arc<Relay>,
    notify: mpsc::UnboundedSender<Notification>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut positions: mpsc::Receiver<GeoPoint>,
        mut commands: mpsc::UnboundedReceiver<TripCommand>,
    ) {
        let period = Duration::from_secs(1);
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut positions_open = true;

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    // A dropped handle ends monitoring, same as an explicit
                    // end: nobody is left to cancel an escalation.
                    let cmd = cmd.unwrap_or(TripCommand::EndTrip);
                    if self.handle_command(cmd).await {
                        break;
                    }
                }
                pos = positions.recv(), if positions_open => {
                    match pos {
                        Some(p) => self.handle_position(p).await,
                        None => {
                            // Sensor gone: non-fatal, timers keep running.
                            debug!(trip_id = %self.trip_id, "position source closed");
                            positions_open = false;
                        }
                    }
                }
                _ = tick.tick() => self.handle_tick().await,
            }
        }
    }

    /// Returns true once the trip is completed and the task should exit.
    async fn handle_command(&mut self, cmd: TripCommand) -> bool {
        match cmd {
            TripCommand::TriggerSos => {
                if self.status == TripStatus::Sos || self.grace.is_some() {
                    // Idempotent escalation: already escalated or counting.
                    debug!(trip_id = %self.trip_id, "SOS trigger ignored");
                } else {
                    self.start_grace(GraceCause::Manual);
                }
                false
            }
            TripCommand::CancelGrace => {
                if let Some(grace) = self.grace.take() {
                    info!(trip_id = %self.trip_id, "SOS countdown cancelled");
                    // A safe-check that already expired restarts from the
                    // full interval; a cancelled manual SOS leaves it where
                    // it paused.
                    if grace.cause == GraceCause::SafeCheckExpired {
                        self.reset_safe_check();
                    }
                }
                false
            }
            TripCommand::ConfirmSafe => {
                if self.status == TripStatus::Sos {
                    self.status = TripStatus::Active;
                    self.reset_safe_check();
                    self.persist_status(None).await;
                    self.relay.publish(self.trip_id, TripEvent::SosCleared);
                    let _ = self.notify.send(Notification::SosCleared);
                    info!(trip_id = %self.trip_id, "SOS cleared, trip active again");
                }
                false
            }
            TripCommand::EndTrip => {
                self.end_trip().await;
                true
            }
        }
    }

    async fn handle_position(&mut self, position: GeoPoint) {
        let point = PathPoint {
            lat: position.lat,
            lng: position.lng,
            timestamp: Utc::now(),
        };
        self.last_position = Some(position);

        // Path appends are best-effort: the in-memory coordinator stays
        // authoritative when the store is unreachable.
        if let Err(e) = self.store.append_point(self.trip_id, point).await {
            warn!(trip_id = %self.trip_id, "failed to persist path point: {e}");
        }
        self.relay
            .publish(self.trip_id, TripEvent::LocationUpdated { point });

        self.evaluate_zones(position, chrono::Local::now().time());
        self.evaluate_deviation(position);
    }

    fn evaluate_zones(&mut self, position: GeoPoint, time_of_day: NaiveTime) {
        for zone in &self.zones {
            // A zone outside its daily window is skipped outright for this
            // sample: no enter, no exit, membership untouched.
            if !zone.is_active_at(time_of_day) {
                continue;
            }
            let inside = zone.contains(position);
            let was_inside = self.inside_zones.contains(&zone.id);

            if inside && !was_inside {
                self.inside_zones.insert(zone.id);
                let (message, kind) = match zone.kind {
                    ZoneKind::Danger => (
                        format!("Caution: you are entering danger zone '{}'", zone.name),
                        AlertKind::DangerZone,
                    ),
                    ZoneKind::Safe => (
                        format!("You have entered safe zone '{}'", zone.name),
                        AlertKind::SafeZone,
                    ),
                };
                let _ = self.notify.send(Notification::ZoneAlert {
                    zone: zone.name.clone(),
                    kind: zone.kind,
                    message: message.clone(),
                });
                self.relay
                    .publish(self.trip_id, TripEvent::Alert { message, kind });
            } else if !inside && was_inside {
                self.inside_zones.remove(&zone.id);
                // Leaving a Safe zone warrants a caution; Danger zones are
                // silent on exit.
                if zone.kind == ZoneKind::Safe {
                    let message = format!("Caution: you are leaving safe zone '{}'", zone.name);
                    let _ = self.notify.send(Notification::ZoneAlert {
                        zone: zone.name.clone(),
                        kind: zone.kind,
                        message: message.clone(),
                    });
                    self.relay.publish(
                        self.trip_id,
                        TripEvent::Alert {
                            message,
                            kind: AlertKind::SafeZone,
                        },
                    );
                }
            }
        }
    }

    fn evaluate_deviation(&mut self, position: GeoPoint) {
        let Some(destination) = &self.destination else {
            return;
        };
        let distance_m = cross_track_meters(position, self.start_location, destination.location);
        let deviating = distance_m > ROUTE_DEVIATION_METERS;
        if deviating == self.off_route {
            return;
        }
        self.off_route = deviating;
        let _ = self.notify.send(Notification::RouteDeviation {
            deviating,
            distance_m,
        });
        let message = if deviating {
            format!("Route deviation: {distance_m:.0} m off the expected route")
        } else {
            "Back on the expected route".to_string()
        };
        self.relay.publish(
            self.trip_id,
            TripEvent::Alert {
                message,
                kind: AlertKind::Deviation,
            },
        );
    }

    async fn handle_tick(&mut self) {
        // The grace countdown preempts the safe-check: only one of the two
        // advances per tick, so an expired safe-check cannot re-fire while
        // an escalation is already pending.
        if let Some(grace) = &mut self.grace {
            grace.remaining -= 1;
            let remaining = grace.remaining;
            let _ = self.notify.send(Notification::GraceRemaining(remaining));
            if remaining == 0 {
                self.grace = None;
                self.escalate().await;
            }
            return;
        }

        // The safe-check runs only while active; it is paused during SOS.
        if self.status != TripStatus::Active {
            return;
        }
        if let Some(safe_check) = &mut self.safe_check {
            if safe_check.remaining == 0 {
                return;
            }
            safe_check.remaining -= 1;
            let remaining = safe_check.remaining;
            let _ = self
                .notify
                .send(Notification::SafeCheckRemaining(remaining));
            if remaining == 0 {
                info!(trip_id = %self.trip_id, "safe check missed, starting SOS countdown");
                self.start_grace(GraceCause::SafeCheckExpired);
            }
        }
    }

    fn reset_safe_check(&mut self) {
        if let Some(safe_check) = &mut self.safe_check {
            safe_check.remaining = safe_check.full_secs;
            let _ = self
                .notify
                .send(Notification::SafeCheckRemaining(safe_check.remaining));
        }
    }

    fn start_grace(&mut self, cause: GraceCause) {
        self.grace = Some(Grace {
            remaining: GRACE_PERIOD_SECS,
            cause,
        });
        let _ = self
            .notify
            .send(Notification::GraceRemaining(GRACE_PERIOD_SECS));
    }

    async fn escalate(&mut self) {
        if self.status == TripStatus::Sos {
            return;
        }
        self.status = TripStatus::Sos;
        let alert = SosAlert {
            timestamp: Utc::now(),
            location: self.last_position.unwrap_or(self.start_location),
        };
        warn!(trip_id = %self.trip_id, lat = alert.location.lat, lng = alert.location.lng, "SOS raised");

        if let Err(e) = self.store.append_sos_alert(self.trip_id, alert).await {
            warn!(trip_id = %self.trip_id, "failed to persist SOS alert: {e}");
        }
        self.persist_status(None).await;
        self.relay
            .publish(self.trip_id, TripEvent::SosRaised { alert });
        let _ = self.notify.send(Notification::SosRaised);
    }

    async fn end_trip(&mut self) {
        let ended_at = Utc::now();
        self.status = TripStatus::Completed;
        self.grace = None;
        self.safe_check = None;
        self.persist_status(Some(ended_at)).await;
        self.relay.publish(self.trip_id, TripEvent::TripEnded);
        self.relay.close(self.trip_id);
        let _ = self.notify.send(Notification::TripEnded);
        info!(trip_id = %self.trip_id, "trip ended");
    }

    async fn persist_status(&self, ended_at: Option<chrono::DateTime<Utc>>) {
        if let Err(e) = self
            .store
            .set_status(self.trip_id, self.status, ended_at)
            .await
        {
            warn!(trip_id = %self.trip_id, "failed to persist status: {e}");
        }
    }
}
