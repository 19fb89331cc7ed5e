//! Great-circle distance.

use crate::constants::EARTH_RADIUS_KM;
use crate::types::Coordinates;

/// Haversine distance between two positions, in kilometres
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos() * to.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Move `distance_km` from `origin` along an initial bearing (degrees from north)
pub fn destination(origin: Coordinates, bearing_deg: f64, distance_km: f64) -> Coordinates {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let bearing = bearing_deg.to_radians();
    let delta = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    // Normalize longitude to [-180, 180]
    let longitude = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;

    Coordinates {
        latitude: lat2.to_degrees(),
        longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates { latitude, longitude }
    }

    #[test]
    fn test_haversine_zero_distance() {
        let p = at(20.5937, 78.9629);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        // One degree along a meridian is ~111.19 km
        let d = haversine_km(at(0.0, 0.0), at(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_haversine_known_city_pair() {
        // New Delhi to Mumbai, roughly 1150 km
        let d = haversine_km(at(28.6139, 77.2090), at(19.0760, 72.8777));
        assert!((1100.0..1200.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_destination_matches_distance() {
        let start = at(12.9716, 77.5946);
        let end = destination(start, 45.0, 2.5);
        let d = haversine_km(start, end);
        assert!((d - 2.5).abs() < 1e-6, "got {d}");
        assert!(end.is_valid());
    }
}
