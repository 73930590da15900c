use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{haversine_meters, GeoPoint};

/// Default geofence radius in meters when none is configured.
pub const DEFAULT_ZONE_RADIUS_M: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Safe,
    Danger,
}

/// A named circular geofence owned by one user.
///
/// `active_start`/`active_end` bound a daily time-of-day window; a zone with
/// no window is always active. The window may wrap midnight (e.g. 22:00 to
/// 06:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub kind: ZoneKind,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub active_start: Option<NaiveTime>,
    pub active_end: Option<NaiveTime>,
}

impl Zone {
    pub fn new(owner: Uuid, name: impl Into<String>, kind: ZoneKind, center: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name: name.into(),
            kind,
            center,
            radius_m: DEFAULT_ZONE_RADIUS_M,
            active_start: None,
            active_end: None,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.active_start = Some(start);
        self.active_end = Some(end);
        self
    }

    /// Whether `point` falls inside the geofence circle.
    pub fn contains(&self, point: GeoPoint) -> bool {
        haversine_meters(point, self.center) <= self.radius_m
    }

    /// Whether the zone is active at the given time of day.
    pub fn is_active_at(&self, time: NaiveTime) -> bool {
        match (self.active_start, self.active_end) {
            (Some(start), Some(end)) => {
                if start <= end {
                    time >= start && time <= end
                } else {
                    // Window wraps midnight.
                    time >= start || time <= end
                }
            }
            // A half-open window is treated as no window.
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn contains_respects_radius() {
        let center = GeoPoint::new(26.7606, 83.3732);
        let zone = Zone::new(Uuid::new_v4(), "Campus", ZoneKind::Safe, center);
        // ~0.001 deg latitude is ~111 m, inside the default 200 m.
        assert!(zone.contains(GeoPoint::new(26.7616, 83.3732)));
        // ~0.003 deg is ~333 m, outside.
        assert!(!zone.contains(GeoPoint::new(26.7636, 83.3732)));
    }

    #[test]
    fn no_window_is_always_active() {
        let zone = Zone::new(
            Uuid::new_v4(),
            "Anywhere",
            ZoneKind::Danger,
            GeoPoint::new(0.0, 0.0),
        );
        assert!(zone.is_active_at(t(0, 0)));
        assert!(zone.is_active_at(t(23, 59)));
    }

    #[test]
    fn daytime_window() {
        let zone = Zone::new(
            Uuid::new_v4(),
            "Market",
            ZoneKind::Danger,
            GeoPoint::new(0.0, 0.0),
        )
        .with_window(t(9, 0), t(17, 0));
        assert!(zone.is_active_at(t(12, 0)));
        assert!(!zone.is_active_at(t(8, 59)));
        assert!(!zone.is_active_at(t(20, 0)));
    }

    #[test]
    fn window_wrapping_midnight() {
        let zone = Zone::new(
            Uuid::new_v4(),
            "Night district",
            ZoneKind::Danger,
            GeoPoint::new(0.0, 0.0),
        )
        .with_window(t(22, 0), t(6, 0));
        assert!(zone.is_active_at(t(23, 30)));
        assert!(zone.is_active_at(t(3, 0)));
        assert!(!zone.is_active_at(t(12, 0)));
    }
}
