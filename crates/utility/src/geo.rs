pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude, used for cheap range
/// pre-filters. Exact distances always go through [`haversine_distance`].
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Length of one degree of latitude on the sphere [`haversine_distance`]
/// measures on. Slightly shorter than [`METERS_PER_DEGREE_LATITUDE`].
pub const METERS_PER_DEGREE_HAVERSINE: f64 =
    EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Latitude and longitude deltas (in degrees) covering `radius_meters` around
/// a point at `latitude`.
///
/// At the poles the cosine term vanishes; the longitude delta is reported as
/// zero instead of diverging.
pub fn degree_deltas(latitude: f64, radius_meters: f64) -> (f64, f64) {
    let latitude_delta = radius_meters / METERS_PER_DEGREE_LATITUDE;

    if latitude.abs() >= 90.0 {
        return (latitude_delta, 0.0);
    }

    let longitude_delta =
        radius_meters / (METERS_PER_DEGREE_LATITUDE * to_radians(latitude).cos());

    (latitude_delta, longitude_delta)
}

/// Great-circle distance in meters.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = to_radians(latitude_2 - latitude_1);
    let dlon = to_radians(longitude_2 - longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}
