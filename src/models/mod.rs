pub mod contact;
pub mod trip;
pub mod zone;

pub use contact::{share_message, Contact};
pub use trip::{
    Destination, IntervalUnit, PathPoint, SafeCheckInterval, SosAlert, TripRecord, TripStatus,
};
pub use zone::{Zone, ZoneKind, DEFAULT_ZONE_RADIUS_M};
