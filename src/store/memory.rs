use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ContactStore, TripStore, ZoneStore};
use crate::error::{Result, TripError};
use crate::geo::GeoPoint;
use crate::models::{Contact, Destination, PathPoint, SosAlert, TripRecord, TripStatus, Zone};

/// In-memory store.
///
/// The coordinator treats persistence as best-effort and keeps the
/// authoritative state in memory anyway, so this implementation is a full
/// peer of the Postgres one: it backs offline operation and the
/// deterministic tests. It enforces the same write rules (append-only path,
/// `completed` is terminal).
#[derive(Default)]
pub struct MemoryStore {
    trips: Mutex<HashMap<Uuid, TripRecord>>,
    zones: Mutex<HashMap<Uuid, Zone>>,
    contacts: Mutex<Vec<Contact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.lock().expect("store lock").push(contact);
    }

    fn with_open_trip<T>(
        &self,
        trip_id: Uuid,
        f: impl FnOnce(&mut TripRecord) -> T,
    ) -> Result<T> {
        let mut trips = self.trips.lock().expect("store lock");
        let trip = trips
            .get_mut(&trip_id)
            .ok_or(TripError::TripNotFound(trip_id))?;
        if trip.status == TripStatus::Completed {
            return Err(TripError::TripCompleted(trip_id));
        }
        Ok(f(trip))
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn create_trip(
        &self,
        owner: Uuid,
        start_location: GeoPoint,
        destination: Option<Destination>,
    ) -> Result<TripRecord> {
        let now = Utc::now();
        let record = TripRecord {
            id: Uuid::new_v4(),
            owner,
            status: TripStatus::Active,
            started_at: now,
            ended_at: None,
            start_location,
            destination,
            path: Vec::new(),
            sos_alerts: Vec::new(),
            updated_at: now,
        };
        self.trips
            .lock()
            .expect("store lock")
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn append_point(&self, trip_id: Uuid, point: PathPoint) -> Result<()> {
        self.with_open_trip(trip_id, |trip| {
            trip.path.push(point);
            trip.updated_at = Utc::now();
        })
    }

    async fn set_status(
        &self,
        trip_id: Uuid,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_open_trip(trip_id, |trip| {
            trip.status = status;
            if let Some(t) = ended_at {
                trip.ended_at = Some(t);
            }
            trip.updated_at = Utc::now();
        })
    }

    async fn append_sos_alert(&self, trip_id: Uuid, alert: SosAlert) -> Result<()> {
        self.with_open_trip(trip_id, |trip| {
            trip.sos_alerts.push(alert);
            trip.updated_at = Utc::now();
        })
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<TripRecord>> {
        Ok(self.trips.lock().expect("store lock").get(&trip_id).cloned())
    }
}

#[async_trait]
impl ZoneStore for MemoryStore {
    async fn create_zone(&self, zone: Zone) -> Result<()> {
        self.zones.lock().expect("store lock").insert(zone.id, zone);
        Ok(())
    }

    async fn list_zones(&self, owner: Uuid) -> Result<Vec<Zone>> {
        Ok(self
            .zones
            .lock()
            .expect("store lock")
            .values()
            .filter(|z| z.owner == owner)
            .cloned()
            .collect())
    }

    async fn delete_zone(&self, owner: Uuid, zone_id: Uuid) -> Result<()> {
        let mut zones = self.zones.lock().expect("store lock");
        if let Some(zone) = zones.get(&zone_id) {
            if zone.owner == owner {
                zones.remove(&zone_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<Contact>> {
        Ok(self
            .contacts
            .lock()
            .expect("store lock")
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneKind;

    fn point(lat: f64, lng: f64) -> PathPoint {
        PathPoint {
            lat,
            lng,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn path_appends_in_order() {
        let store = MemoryStore::new();
        let trip = store
            .create_trip(Uuid::new_v4(), GeoPoint::new(26.0, 83.0), None)
            .await
            .unwrap();

        store.append_point(trip.id, point(26.0, 83.0)).await.unwrap();
        store.append_point(trip.id, point(26.1, 83.0)).await.unwrap();

        let record = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(record.path.len(), 2);
        assert!(record.path[1].timestamp >= record.path[0].timestamp);
    }

    #[tokio::test]
    async fn completed_trip_rejects_writes() {
        let store = MemoryStore::new();
        let trip = store
            .create_trip(Uuid::new_v4(), GeoPoint::new(26.0, 83.0), None)
            .await
            .unwrap();
        store
            .set_status(trip.id, TripStatus::Completed, Some(Utc::now()))
            .await
            .unwrap();

        let err = store.append_point(trip.id, point(26.0, 83.0)).await;
        assert!(matches!(err, Err(TripError::TripCompleted(_))));
        let err = store.set_status(trip.id, TripStatus::Active, None).await;
        assert!(matches!(err, Err(TripError::TripCompleted(_))));
    }

    #[tokio::test]
    async fn status_change_bumps_updated_at() {
        let store = MemoryStore::new();
        let trip = store
            .create_trip(Uuid::new_v4(), GeoPoint::new(26.0, 83.0), None)
            .await
            .unwrap();

        store.set_status(trip.id, TripStatus::Sos, None).await.unwrap();
        let record = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(record.status, TripStatus::Sos);
        assert!(record.updated_at >= record.started_at);
    }

    #[tokio::test]
    async fn zones_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store
            .create_zone(Zone::new(alice, "Home", ZoneKind::Safe, GeoPoint::new(26.0, 83.0)))
            .await
            .unwrap();
        store
            .create_zone(Zone::new(bob, "Work", ZoneKind::Safe, GeoPoint::new(27.0, 84.0)))
            .await
            .unwrap();

        let zones = store.list_zones(alice).await.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "Home");
    }

    #[tokio::test]
    async fn delete_requires_matching_owner() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let zone = Zone::new(alice, "Home", ZoneKind::Safe, GeoPoint::new(26.0, 83.0));
        let zone_id = zone.id;
        store.create_zone(zone).await.unwrap();

        store.delete_zone(Uuid::new_v4(), zone_id).await.unwrap();
        assert_eq!(store.list_zones(alice).await.unwrap().len(), 1);

        store.delete_zone(alice, zone_id).await.unwrap();
        assert!(store.list_zones(alice).await.unwrap().is_empty());
    }
}
