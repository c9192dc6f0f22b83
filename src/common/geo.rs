use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{DomainError, DomainResult};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Serialized as a two-element `[lat, lon]` array, which is how stored
/// trajectories encode their points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point from a raw coordinate slice, rejecting anything that
    /// isn't exactly `[lat, lon]`.
    pub fn try_from_slice(coords: &[f64]) -> DomainResult<Self> {
        match coords {
            [lat, lon] => Ok(Self::new(*lat, *lon)),
            _ => Err(DomainError::invalid(format!(
                "expected 2 coordinates, got {}",
                coords.len()
            ))),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Planar interpolation towards `other`, applied independently to
    /// latitude and longitude.
    pub fn lerp(&self, other: GeoPoint, fraction: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + fraction * (other.lat - self.lat),
            lon: self.lon + fraction * (other.lon - self.lon),
        }
    }

    pub fn distance_km(&self, other: GeoPoint) -> f64 {
        distance_km(*self, other)
    }
}

impl TryFrom<Vec<f64>> for GeoPoint {
    type Error = DomainError;

    fn try_from(raw: Vec<f64>) -> Result<Self, Self::Error> {
        Self::try_from_slice(&raw)
    }
}

impl From<GeoPoint> for Vec<f64> {
    fn from(pt: GeoPoint) -> Self {
        vec![pt.lat, pt.lon]
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Great-circle distance in kilometres on a spherical Earth.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    // abs() keeps the result bit-identical when the arguments are swapped
    let dlat = (b.lat - a.lat).abs().to_radians();
    let dlon = (b.lon - a.lon).abs().to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let hav = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * hav.sqrt().atan2((1.0 - hav).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_km(a, b) * 1000.0
}
