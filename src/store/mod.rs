use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::geo::GeoPoint;
use crate::models::{Contact, Destination, PathPoint, SosAlert, TripRecord, TripStatus, Zone};

mod memory;
mod postgres;
pub mod queries;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str) -> AnyResult<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(50)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Durable trip records: the coordinator writes best-effort, watchers poll.
///
/// A `completed` trip is immutable; implementations reject further writes.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn create_trip(
        &self,
        owner: Uuid,
        start_location: GeoPoint,
        destination: Option<Destination>,
    ) -> Result<TripRecord>;

    async fn append_point(&self, trip_id: Uuid, point: PathPoint) -> Result<()>;

    async fn set_status(
        &self,
        trip_id: Uuid,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn append_sos_alert(&self, trip_id: Uuid, alert: SosAlert) -> Result<()>;

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<TripRecord>>;
}

/// Geofence data, read-only from the coordinator's perspective during a trip.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn create_zone(&self, zone: Zone) -> Result<()>;
    async fn list_zones(&self, owner: Uuid) -> Result<Vec<Zone>>;
    async fn delete_zone(&self, owner: Uuid, zone_id: Uuid) -> Result<()>;
}

/// Trusted contacts, consumed only to address outbound share messages.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list_contacts(&self, owner: Uuid) -> Result<Vec<Contact>>;
}
