//! Pure geometry: great-circle distance, polyline lengths, nearest-vertex
//! projection, and display formatting

use crate::types::geo::LngLat;
use crate::{EARTH_RADIUS_M, WALKING_PACE_M_PER_MIN};

/// Great-circle distance between two points in meters (haversine)
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlng = (b.lng() - a.lng()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let d = 2.0 * EARTH_RADIUS_M * h.sqrt().asin();

    if d.is_finite() {
        d
    } else {
        0.0
    }
}

/// Total length of an ordered polyline in meters
pub fn path_length_m(points: &[LngLat]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

/// Index of the vertex closest to `p`, with its distance in meters.
///
/// Nearest-vertex search only, no interpolation between vertices. Ties
/// keep the earliest index.
pub fn nearest_vertex(points: &[LngLat], p: LngLat) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in points.iter().enumerate() {
        let d = haversine_m(*point, p);
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best
}

/// Cumulative length from vertex `i` to the end of the polyline
pub fn remaining_from(points: &[LngLat], i: usize) -> f64 {
    if i >= points.len() {
        return 0.0;
    }
    path_length_m(&points[i..])
}

/// Fraction walked, guarded against a zero-length route
pub fn progress_fraction(total_m: f64, remaining_m: f64) -> f64 {
    if total_m <= 0.0 {
        // A zero-length route counts as fully walked
        return 1.0;
    }
    (1.0 - remaining_m / total_m).clamp(0.0, 1.0)
}

/// Remaining-time estimate at walking pace, rounded up to whole minutes
pub fn walk_minutes(meters: f64) -> u32 {
    if meters <= 0.0 {
        return 0;
    }
    (meters / WALKING_PACE_M_PER_MIN).ceil() as u32
}

/// Offset a point north/east by meters using a flat-earth approximation;
/// good to well under a meter at the scales routes use
pub fn offset_m(base: LngLat, north_m: f64, east_m: f64) -> LngLat {
    let m_per_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let lat = base.lat() + north_m / m_per_deg;
    let lng = base.lng() + east_m / (m_per_deg * base.lat().to_radians().cos());
    LngLat(lng, lat)
}

/// Display string for a distance: "850 m" or "1.6 km"
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "—".to_string();
    }
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use super::offset_m as offset;

    const ORIGIN: LngLat = LngLat(0.0, 0.0);

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = LngLat(2.1686, 41.3874);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn test_haversine_known_offset() {
        let d = haversine_m(ORIGIN, offset(ORIGIN, 100.0, 0.0));
        assert!((d - 100.0).abs() < 0.1, "expected ~100m, got {}", d);

        let d = haversine_m(ORIGIN, offset(ORIGIN, 0.0, 250.0));
        assert!((d - 250.0).abs() < 0.5, "expected ~250m, got {}", d);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let points = vec![
            ORIGIN,
            offset(ORIGIN, 100.0, 0.0),
            offset(ORIGIN, 100.0, 200.0),
        ];
        let total = path_length_m(&points);
        assert!((total - 300.0).abs() < 1.0, "expected ~300m, got {}", total);
    }

    #[test]
    fn test_path_length_degenerate() {
        assert_eq!(path_length_m(&[]), 0.0);
        assert_eq!(path_length_m(&[ORIGIN]), 0.0);
    }

    #[test]
    fn test_nearest_vertex_picks_closest() {
        let points = vec![
            ORIGIN,
            offset(ORIGIN, 100.0, 0.0),
            offset(ORIGIN, 200.0, 0.0),
        ];
        let sample = offset(ORIGIN, 110.0, 0.0);
        let (i, d) = nearest_vertex(&points, sample).unwrap();
        assert_eq!(i, 1);
        assert!((d - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_nearest_vertex_tie_keeps_first() {
        // Identical first and last vertex (a loop): the earlier index wins
        let points = vec![ORIGIN, offset(ORIGIN, 100.0, 0.0), ORIGIN];
        let (i, _) = nearest_vertex(&points, ORIGIN).unwrap();
        assert_eq!(i, 0);
    }

    #[test]
    fn test_nearest_vertex_empty() {
        assert!(nearest_vertex(&[], ORIGIN).is_none());
    }

    #[test]
    fn test_remaining_from() {
        let points = vec![
            ORIGIN,
            offset(ORIGIN, 100.0, 0.0),
            offset(ORIGIN, 200.0, 0.0),
        ];
        assert!((remaining_from(&points, 0) - 200.0).abs() < 1.0);
        assert!((remaining_from(&points, 1) - 100.0).abs() < 1.0);
        assert_eq!(remaining_from(&points, 2), 0.0);
        assert_eq!(remaining_from(&points, 9), 0.0);
    }

    #[test]
    fn test_progress_fraction_guards_zero_length() {
        assert_eq!(progress_fraction(0.0, 0.0), 1.0);
        assert_eq!(progress_fraction(1000.0, 300.0), 0.7);
        assert_eq!(progress_fraction(1000.0, 1000.0), 0.0);
    }

    #[test]
    fn test_walk_minutes_rounds_up() {
        assert_eq!(walk_minutes(0.0), 0);
        assert_eq!(walk_minutes(80.0), 1);
        assert_eq!(walk_minutes(81.0), 2);
        assert_eq!(walk_minutes(1600.0), 20);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(850.0), "850 m");
        assert_eq!(format_distance(1600.0), "1.6 km");
        assert_eq!(format_distance(f64::NAN), "—");
    }
}
