use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Distance in meters from `p` to the segment `a -> b`.
///
/// Uses a local flat-earth approximation centered on `a`, which is accurate
/// to well under a meter at route-deviation scales (hundreds of meters to a
/// few kilometers). When the perpendicular projection falls outside the
/// segment the distance to the nearer endpoint is returned, and a degenerate
/// segment (`a == b`) degrades to plain point distance.
pub fn cross_track_meters(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    let cos_lat = a.lat.to_radians().cos();
    let to_local = |g: GeoPoint| -> (f64, f64) {
        (
            (g.lng - a.lng).to_radians() * cos_lat * EARTH_RADIUS_M,
            (g.lat - a.lat).to_radians() * EARTH_RADIUS_M,
        )
    };

    let (px, py) = to_local(p);
    let (bx, by) = to_local(b);

    let seg_len_sq = bx * bx + by * by;
    if seg_len_sq == 0.0 {
        return haversine_meters(p, a);
    }

    let t = ((px * bx + py * by) / seg_len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (t * bx, t * by);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_latitude() {
        let a = GeoPoint::new(26.0, 83.0);
        let b = GeoPoint::new(27.0, 83.0);
        let d = haversine_meters(a, b);
        // One degree of latitude is ~111.19 km everywhere.
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint::new(26.7606, 83.3732);
        assert_eq!(haversine_meters(p, p), 0.0);
    }

    #[test]
    fn cross_track_on_the_line_is_zero() {
        let a = GeoPoint::new(26.0, 83.0);
        let b = GeoPoint::new(26.0, 83.2);
        let mid = GeoPoint::new(26.0, 83.1);
        assert!(cross_track_meters(mid, a, b) < 1.0);
    }

    #[test]
    fn cross_track_perpendicular_offset() {
        let a = GeoPoint::new(26.0, 83.0);
        let b = GeoPoint::new(26.0, 83.2);
        // ~0.005 degrees of latitude north of the midpoint: ~556 m.
        let p = GeoPoint::new(26.005, 83.1);
        let d = cross_track_meters(p, a, b);
        assert!((d - 556.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn cross_track_clamps_to_nearer_endpoint() {
        let a = GeoPoint::new(26.0, 83.0);
        let b = GeoPoint::new(26.0, 83.1);
        // Well past b along the line: distance should be to b, not the
        // infinite line (which would be ~0).
        let p = GeoPoint::new(26.0, 83.2);
        let d = cross_track_meters(p, a, b);
        let expect = haversine_meters(p, b);
        assert!((d - expect).abs() < 5.0, "got {d}, expected {expect}");
    }

    #[test]
    fn cross_track_degenerate_segment() {
        let a = GeoPoint::new(26.0, 83.0);
        let p = GeoPoint::new(26.01, 83.0);
        let d = cross_track_meters(p, a, a);
        assert!((d - haversine_meters(p, a)).abs() < 0.001);
    }
}
