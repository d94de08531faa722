//! Planar geometry on raw latitude/longitude degrees.
//!
//! Distances are Euclidean in degree space. This is only a local
//! approximation (a degree of longitude is shorter than a degree of
//! latitude away from the equator), which is fine at the scale of a few
//! hundred metres along one river bend.

use serde::{Deserialize, Serialize};

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar Euclidean distance to `other`, in degrees.
    pub fn planar_distance(&self, other: &Self) -> f64 {
        let d_lat = other.lat - self.lat;
        let d_lng = other.lng - self.lng;
        (d_lat * d_lat + d_lng * d_lng).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Step from `current` toward `target` by at most `step` degrees.
///
/// Lands exactly on `target` when the remaining distance is not larger
/// than the step, so a robot never overshoots its waypoint.
pub fn move_toward(current: GeoPoint, target: GeoPoint, step: f64) -> GeoPoint {
    let d_lat = target.lat - current.lat;
    let d_lng = target.lng - current.lng;
    let distance = (d_lat * d_lat + d_lng * d_lng).sqrt();

    if distance <= step {
        return target;
    }

    let ratio = step / distance;
    GeoPoint {
        lat: current.lat + d_lat * ratio,
        lng: current.lng + d_lng * ratio,
    }
}
