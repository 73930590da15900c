pub const INSERT_TRIP: &str = r#"
INSERT INTO trips (trip_id, owner_id, status, started_at, start_lat, start_lng, destination, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $4);
"#;

pub const SELECT_TRIP: &str = r#"
SELECT trip_id, owner_id, status, started_at, ended_at, start_lat, start_lng, destination, updated_at
FROM trips WHERE trip_id = $1;
"#;

pub const SELECT_TRIP_STATUS: &str = r#"
SELECT status FROM trips WHERE trip_id = $1;
"#;

pub const UPDATE_TRIP_STATUS: &str = r#"
UPDATE trips
SET status = $2,
    ended_at = COALESCE($3, ended_at),
    updated_at = NOW()
WHERE trip_id = $1;
"#;

pub const INSERT_TRIP_POINT: &str = r#"
INSERT INTO trip_points (trip_id, timestamp, lat, lng)
VALUES ($1, $2, $3, $4);
"#;

pub const SELECT_TRIP_POINTS: &str = r#"
SELECT timestamp, lat, lng FROM trip_points
WHERE trip_id = $1 ORDER BY point_id;
"#;

pub const INSERT_SOS_ALERT: &str = r#"
INSERT INTO trip_sos_alerts (alert_id, trip_id, timestamp, lat, lng)
VALUES ($1, $2, $3, $4, $5);
"#;

pub const SELECT_SOS_ALERTS: &str = r#"
SELECT timestamp, lat, lng FROM trip_sos_alerts
WHERE trip_id = $1 ORDER BY timestamp;
"#;

pub const TOUCH_TRIP: &str = r#"
UPDATE trips SET updated_at = NOW() WHERE trip_id = $1;
"#;

pub const INSERT_ZONE: &str = r#"
INSERT INTO zones (zone_id, owner_id, name, kind, lat, lng, radius_m, active_start, active_end)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
"#;

pub const SELECT_ZONES: &str = r#"
SELECT zone_id, owner_id, name, kind, lat, lng, radius_m, active_start, active_end
FROM zones WHERE owner_id = $1;
"#;

pub const DELETE_ZONE: &str = r#"
DELETE FROM zones WHERE zone_id = $1 AND owner_id = $2;
"#;

pub const SELECT_CONTACTS: &str = r#"
SELECT contact_id, owner_id, name, phone FROM contacts WHERE owner_id = $1;
"#;
