use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utility::{
    geo::{
        degree_deltas, haversine_distance, METERS_PER_DEGREE_HAVERSINE,
        METERS_PER_DEGREE_LATITUDE,
    },
    id::HasId,
};

use crate::WithId;

/// A caller supplied a value outside of the accepted domain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidArgument> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidArgument(format!(
                "latitude must be between -90 and 90 degrees, got {}",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidArgument(format!(
                "longitude must be between -180 and 180 degrees, got {}",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// A plain lat/lng pair. Unlike [`Coordinate`] it is not range checked, as
/// bounding box corners may lie beyond the poles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Rectangular approximation of a search disc, used as a range pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub northeast: LatLng,
    pub southwest: LatLng,
}

/// Stretches the box's latitude span onto the haversine sphere, plus a hair
/// for rounding. Without it the north and south edges sit just inside the
/// search radius.
const LATITUDE_PADDING: f64 =
    METERS_PER_DEGREE_LATITUDE / METERS_PER_DEGREE_HAVERSINE * (1.0 + 1e-6);

impl BoundingBox {
    /// `(south, north)` latitudes for a range query that keeps every point of
    /// the disc the box was computed for.
    pub fn latitude_range(&self) -> (f64, f64) {
        let center = (self.north + self.south) / 2.0;
        let delta = (self.north - self.south) / 2.0 * LATITUDE_PADDING;
        (center - delta, center + delta)
    }
}

/// Computes the bounding box of the disc of `radius_meters` around `center`.
///
/// The box over-selects near its corners; exact membership has to be decided
/// with a distance check. At the poles the box has no longitude span.
pub fn compute_bounds(center: Coordinate, radius_meters: f64) -> BoundingBox {
    let (latitude_delta, longitude_delta) =
        degree_deltas(center.latitude, radius_meters);

    let north = center.latitude + latitude_delta;
    let south = center.latitude - latitude_delta;
    let east = center.longitude + longitude_delta;
    let west = center.longitude - longitude_delta;

    BoundingBox {
        north,
        south,
        east,
        west,
        northeast: LatLng {
            lat: north,
            lng: east,
        },
        southwest: LatLng {
            lat: south,
            lng: west,
        },
    }
}

/// Validates a search radius.
pub fn check_radius(radius_meters: f64) -> Result<f64, InvalidArgument> {
    if radius_meters.is_finite() && radius_meters > 0.0 {
        Ok(radius_meters)
    } else {
        Err(InvalidArgument(format!(
            "radius must be a positive number of meters, got {}",
            radius_meters
        )))
    }
}

/// Something that may have a known position.
pub trait Locatable {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl<V> Locatable for WithId<V>
where
    V: HasId + Locatable,
    V::IdType: serde::Serialize + std::fmt::Debug + Clone,
{
    fn coordinate(&self) -> Option<Coordinate> {
        self.content.coordinate()
    }
}

impl Locatable for Coordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(*self)
    }
}
