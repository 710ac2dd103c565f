//! Geodetic vector math for spoof-offset computation.
//!
//! Converts between metric north/east offsets and latitude/longitude
//! deltas, and measures ground distance between coordinates. Two distance
//! formulas coexist deliberately: the drift and hijack code paths evolved
//! against different models (flat-plane vs great-circle) and acceptance
//! thresholds depend on which one a call site uses, so they are exposed as
//! separately named functions and are never unified here.

/// WGS-84 equatorial radius in meters, used by the equirectangular
/// offset conversions.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Mean Earth radius in meters, used by the haversine distance.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees-to-meters scale constant for the flat-plane distance.
pub const DEGREES_TO_METERS: f64 = 1.113_195e5;

/// Converts a metric north/east offset into a latitude/longitude delta
/// in degrees.
///
/// Uses a fixed-radius equirectangular approximation with the same radius
/// on both axes: `dlat = dn / R * 180/pi`. This is an approximation, not
/// a true projection; the longitude axis is not corrected by `cos(lat)`,
/// so accuracy degrades toward the poles.
#[must_use]
pub fn meters_to_degrees(north_m: f64, east_m: f64) -> (f64, f64) {
    let dlat = north_m / EARTH_RADIUS_M * (180.0 / std::f64::consts::PI);
    let dlon = east_m / EARTH_RADIUS_M * (180.0 / std::f64::consts::PI);
    (dlat, dlon)
}

/// Converts a latitude/longitude delta in degrees back into a metric
/// north/east offset.
///
/// Inverse of [`meters_to_degrees`] under the same fixed-radius
/// approximation, so the round trip holds within floating-point tolerance.
#[must_use]
pub fn degrees_to_meters(dlat: f64, dlon: f64) -> (f64, f64) {
    let north_m = dlat * EARTH_RADIUS_M / (180.0 / std::f64::consts::PI);
    let east_m = dlon * EARTH_RADIUS_M / (180.0 / std::f64::consts::PI);
    (north_m, east_m)
}

/// Magnitude in meters of an angular offset, under the same fixed-radius
/// approximation as [`degrees_to_meters`].
///
/// Used to track how far the injected glitch has walked the perceived
/// position away from truth.
#[must_use]
pub fn offset_magnitude_m(dlat: f64, dlon: f64) -> f64 {
    let (dn, de) = degrees_to_meters(dlat, dlon);
    dn.hypot(de)
}

/// Flat-plane ground distance in meters between two coordinates.
///
/// `sqrt(dlat^2 + dlon^2) * 1.113195e5`, the scaled-degrees formula the
/// hijack monitor loop uses for its distance-moved metric.
#[must_use]
pub fn flat_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    dlat.hypot(dlon) * DEGREES_TO_METERS
}

/// Great-circle distance in meters between two coordinates (haversine).
///
/// Used by the hijack success check, where the acceptance radius
/// ("arrived within N meters of the target") assumes this formula.
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    MEAN_EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn meters_to_degrees_round_trip() {
        for (dn, de) in [
            (0.0, 0.0),
            (5.0, 0.0),
            (0.0, 10.0),
            (123.456, -789.012),
            (-1.0e4, 1.0e4),
        ] {
            let (dlat, dlon) = meters_to_degrees(dn, de);
            let (rn, re) = degrees_to_meters(dlat, dlon);
            assert!((rn - dn).abs() < TOL, "north round trip: {dn} -> {rn}");
            assert!((re - de).abs() < TOL, "east round trip: {de} -> {re}");
        }
    }

    #[test]
    fn one_degree_of_latitude_is_about_111km() {
        let (dn, _) = degrees_to_meters(1.0, 0.0);
        assert!((dn - 111_319.0).abs() < 10.0, "got {dn}");
    }

    #[test]
    fn offset_magnitude_matches_pythagoras() {
        let (dlat, dlon) = meters_to_degrees(3.0, 4.0);
        let mag = offset_magnitude_m(dlat, dlon);
        assert!((mag - 5.0).abs() < TOL, "got {mag}");
    }

    #[test]
    fn flat_distance_zero_for_same_point() {
        assert_eq!(flat_distance_m(1.5, 2.5, 1.5, 2.5), 0.0);
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_distance_m(48.85, 2.35, 48.85, 2.35) < TOL);
    }

    #[test]
    fn haversine_one_degree_equator() {
        // One degree of longitude at the equator is ~111.19 km on the
        // mean-radius sphere.
        let d = haversine_distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn distance_formulas_are_distinguishable() {
        // At high latitude the flat-plane formula overestimates the
        // east-west distance because it ignores the cos(lat) shrink.
        let flat = flat_distance_m(60.0, 10.0, 60.0, 11.0);
        let hav = haversine_distance_m(60.0, 10.0, 60.0, 11.0);
        assert!(flat > hav * 1.5, "flat {flat} vs haversine {hav}");
    }

    #[test]
    fn flat_distance_matches_source_constant() {
        // 0.001 deg of pure latitude delta scaled by 1.113195e5.
        let d = flat_distance_m(10.0, 20.0, 10.001, 20.0);
        assert!((d - 111.3195).abs() < 1e-6, "got {d}");
    }
}
