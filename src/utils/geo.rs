use std::sync::OnceLock;

use geographiclib_rs::{Geodesic, InverseGeodesic};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::work_session::Coordinates;

fn wgs84() -> &'static Geodesic {
    static WGS84: OnceLock<Geodesic> = OnceLock::new();
    WGS84.get_or_init(Geodesic::wgs84)
}

/// Geodesic distance in meters between two points on the WGS-84 ellipsoid
/// (Karney's inverse solution, which also converges for antipodal points).
pub fn distance_meters(from: Coordinates, to: Coordinates) -> f64 {
    wgs84().inverse(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Whether `(lat, lon)` lies within `radius_meters` of `(ref_lat, ref_lon)`.
pub fn within_radius(
    ref_lat: f64,
    ref_lon: f64,
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> Result<bool> {
    let fence = GeoFence::new(Coordinates::new(ref_lat, ref_lon)?, radius_meters)?;
    Ok(fence.check(Coordinates::new(lat, lon)?).inside)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFence {
    pub center: Coordinates,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCheck {
    pub distance_meters: f64,
    pub inside: bool,
}

impl GeoFence {
    pub fn new(center: Coordinates, radius_meters: f64) -> Result<Self> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(Error::InvalidCoordinate(format!(
                "radius {} must be a non-negative number of meters",
                radius_meters
            )));
        }
        Ok(Self {
            center,
            radius_meters,
        })
    }

    pub fn check(&self, point: Coordinates) -> GeoCheck {
        let distance = distance_meters(self.center, point);
        GeoCheck {
            distance_meters: distance,
            inside: distance <= self.radius_meters,
        }
    }
}
