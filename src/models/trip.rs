use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TripError;
use crate::geo::GeoPoint;

/// Trip lifecycle status. `Completed` is terminal; see the transition table
/// in [`crate::coordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Sos,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Sos => "sos",
            TripStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TripStatus {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TripStatus::Active),
            "sos" => Ok(TripStatus::Sos),
            "completed" => Ok(TripStatus::Completed),
            other => Err(TripError::UnknownStatus(other.to_string())),
        }
    }
}

/// One timestamped location sample on a trip's path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl PathPoint {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// One entry in a trip's SOS history, recorded each time SOS fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SosAlert {
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
}

/// Optional named destination, one endpoint of the route-deviation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub location: GeoPoint,
}

/// Persisted trip document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: Uuid,
    pub owner: Uuid,
    pub status: TripStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub start_location: GeoPoint,
    pub destination: Option<Destination>,
    pub path: Vec<PathPoint>,
    pub sos_alerts: Vec<SosAlert>,
    /// Record version for watcher reconciliation: a freshly polled record
    /// wins over relay events only if it is at least this recent.
    pub updated_at: DateTime<Utc>,
}

impl TripRecord {
    pub fn last_point(&self) -> Option<&PathPoint> {
        self.path.last()
    }
}

/// Configured safe-check cadence: how long the traveler may go without
/// confirming they are okay before SOS escalation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeCheckInterval {
    pub amount: u32,
    pub unit: IntervalUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl SafeCheckInterval {
    pub fn new(amount: u32, unit: IntervalUnit) -> Result<Self, TripError> {
        if amount == 0 {
            return Err(TripError::InvalidInterval);
        }
        Ok(Self { amount, unit })
    }

    pub fn as_secs(&self) -> u64 {
        let per_unit = match self.unit {
            IntervalUnit::Minutes => 60,
            IntervalUnit::Hours => 3_600,
            IntervalUnit::Days => 86_400,
        };
        u64::from(self.amount) * per_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TripStatus::Sos).unwrap(), "\"sos\"");
        let s: TripStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(s, TripStatus::Completed);
    }

    #[test]
    fn interval_converts_to_seconds() {
        let m = SafeCheckInterval::new(5, IntervalUnit::Minutes).unwrap();
        assert_eq!(m.as_secs(), 300);
        let h = SafeCheckInterval::new(2, IntervalUnit::Hours).unwrap();
        assert_eq!(h.as_secs(), 7_200);
        let d = SafeCheckInterval::new(1, IntervalUnit::Days).unwrap();
        assert_eq!(d.as_secs(), 86_400);
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(SafeCheckInterval::new(0, IntervalUnit::Minutes).is_err());
    }
}
