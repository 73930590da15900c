use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::{queries, ContactStore, DbPool, TripStore, ZoneStore};
use crate::error::{Result, TripError};
use crate::geo::GeoPoint;
use crate::models::{
    Contact, Destination, PathPoint, SosAlert, TripRecord, TripStatus, Zone, ZoneKind,
};

/// Postgres-backed store.
///
/// Tables: `trips`, `trip_points` (append-only), `trip_sos_alerts`, `zones`,
/// `contacts`. Status transitions bump `updated_at`, which watchers use as
/// the record version during reconciliation.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Current status of a trip, or an error if the trip does not exist or
    /// has already completed. Runs inside the caller's transaction.
    async fn guard_open(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trip_id: Uuid,
    ) -> Result<TripStatus> {
        let row = sqlx::query(queries::SELECT_TRIP_STATUS)
            .bind(trip_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(TripError::TripNotFound(trip_id))?;
        let status: TripStatus = row.try_get::<String, _>("status")?.parse()?;
        if status == TripStatus::Completed {
            return Err(TripError::TripCompleted(trip_id));
        }
        Ok(status)
    }
}

#[async_trait]
impl TripStore for PgStore {
    async fn create_trip(
        &self,
        owner: Uuid,
        start_location: GeoPoint,
        destination: Option<Destination>,
    ) -> Result<TripRecord> {
        let now = Utc::now();
        let trip_id = Uuid::new_v4();
        sqlx::query(queries::INSERT_TRIP)
            .bind(trip_id)
            .bind(owner)
            .bind(TripStatus::Active.as_str())
            .bind(now)
            .bind(start_location.lat)
            .bind(start_location.lng)
            .bind(destination.as_ref().map(Json))
            .execute(&self.pool)
            .await?;

        Ok(TripRecord {
            id: trip_id,
            owner,
            status: TripStatus::Active,
            started_at: now,
            ended_at: None,
            start_location,
            destination,
            path: Vec::new(),
            sos_alerts: Vec::new(),
            updated_at: now,
        })
    }

    async fn append_point(&self, trip_id: Uuid, point: PathPoint) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::guard_open(&mut tx, trip_id).await?;
        sqlx::query(queries::INSERT_TRIP_POINT)
            .bind(trip_id)
            .bind(point.timestamp)
            .bind(point.lat)
            .bind(point.lng)
            .execute(&mut *tx)
            .await?;
        sqlx::query(queries::TOUCH_TRIP)
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_status(
        &self,
        trip_id: Uuid,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::guard_open(&mut tx, trip_id).await?;
        sqlx::query(queries::UPDATE_TRIP_STATUS)
            .bind(trip_id)
            .bind(status.as_str())
            .bind(ended_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_sos_alert(&self, trip_id: Uuid, alert: SosAlert) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::guard_open(&mut tx, trip_id).await?;
        sqlx::query(queries::INSERT_SOS_ALERT)
            .bind(Uuid::new_v4())
            .bind(trip_id)
            .bind(alert.timestamp)
            .bind(alert.location.lat)
            .bind(alert.location.lng)
            .execute(&mut *tx)
            .await?;
        sqlx::query(queries::TOUCH_TRIP)
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<TripRecord>> {
        let row = match sqlx::query(queries::SELECT_TRIP)
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?
        {
            Some(row) => row,
            None => return Ok(None),
        };

        let status: TripStatus = row.try_get::<String, _>("status")?.parse()?;
        let destination = row
            .try_get::<Option<Json<Destination>>, _>("destination")?
            .map(|j| j.0);

        let path = sqlx::query(queries::SELECT_TRIP_POINTS)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                Ok(PathPoint {
                    lat: r.try_get("lat")?,
                    lng: r.try_get("lng")?,
                    timestamp: r.try_get("timestamp")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let sos_alerts = sqlx::query(queries::SELECT_SOS_ALERTS)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                Ok(SosAlert {
                    timestamp: r.try_get("timestamp")?,
                    location: GeoPoint::new(r.try_get("lat")?, r.try_get("lng")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(TripRecord {
            id: trip_id,
            owner: row.try_get("owner_id")?,
            status,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            start_location: GeoPoint::new(row.try_get("start_lat")?, row.try_get("start_lng")?),
            destination,
            path,
            sos_alerts,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

#[async_trait]
impl ZoneStore for PgStore {
    async fn create_zone(&self, zone: Zone) -> Result<()> {
        sqlx::query(queries::INSERT_ZONE)
            .bind(zone.id)
            .bind(zone.owner)
            .bind(&zone.name)
            .bind(match zone.kind {
                ZoneKind::Safe => "safe",
                ZoneKind::Danger => "danger",
            })
            .bind(zone.center.lat)
            .bind(zone.center.lng)
            .bind(zone.radius_m)
            .bind(zone.active_start)
            .bind(zone.active_end)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_zones(&self, owner: Uuid) -> Result<Vec<Zone>> {
        sqlx::query(queries::SELECT_ZONES)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                let kind = match r.try_get::<String, _>("kind")?.as_str() {
                    "danger" => ZoneKind::Danger,
                    _ => ZoneKind::Safe,
                };
                Ok(Zone {
                    id: r.try_get("zone_id")?,
                    owner: r.try_get("owner_id")?,
                    name: r.try_get("name")?,
                    kind,
                    center: GeoPoint::new(r.try_get("lat")?, r.try_get("lng")?),
                    radius_m: r.try_get("radius_m")?,
                    active_start: r.try_get::<Option<NaiveTime>, _>("active_start")?,
                    active_end: r.try_get::<Option<NaiveTime>, _>("active_end")?,
                })
            })
            .collect()
    }

    async fn delete_zone(&self, owner: Uuid, zone_id: Uuid) -> Result<()> {
        sqlx::query(queries::DELETE_ZONE)
            .bind(zone_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<Contact>> {
        sqlx::query(queries::SELECT_CONTACTS)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                Ok(Contact {
                    id: r.try_get("contact_id")?,
                    owner: r.try_get("owner_id")?,
                    name: r.try_get("name")?,
                    phone: r.try_get("phone")?,
                })
            })
            .collect()
    }
}
