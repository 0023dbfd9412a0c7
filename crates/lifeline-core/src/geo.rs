//! Great-circle distance and proximity matching.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::resource::{Resource, ResourceStatus};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default search radius for nearby-resource queries.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject out-of-range or non-finite coordinates instead of clamping.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(CoreError::validation(format!(
                "coordinate ({}, {}) is not finite",
                self.lat, self.lng
            )));
        }
        if self.lat.abs() > 90.0 {
            return Err(CoreError::validation(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if self.lng.abs() > 180.0 {
            return Err(CoreError::validation(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Haversine distance between two points, in kilometers.
///
/// Symmetric, zero for identical points. Out-of-range input is a
/// validation error, never silently clamped.
pub fn distance_km(a: Coordinate, b: Coordinate) -> Result<f64> {
    a.validate()?;
    b.validate()?;

    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    Ok(2.0 * EARTH_RADIUS_KM * h.sqrt().asin())
}

/// Rank `candidates` by proximity to `origin`.
///
/// Produces `(resource, distance_km)` pairs in a single pass: candidates
/// with a missing or invalid coordinate are not matches, candidates beyond
/// `radius_km` are filtered out, and an optional status predicate is
/// applied. Result is sorted ascending by distance with ties broken by
/// resource id, so ordering is reproducible. An empty result is not an
/// error.
pub fn nearest(
    origin: Coordinate,
    candidates: &[Resource],
    radius_km: f64,
    status_filter: Option<ResourceStatus>,
) -> Result<Vec<(Resource, f64)>> {
    origin.validate()?;

    let mut matches: Vec<(Resource, f64)> = Vec::new();
    for resource in candidates {
        if let Some(required) = status_filter
            && resource.status != required
        {
            continue;
        }
        let Some(coordinate) = resource.coordinate else {
            continue;
        };
        if !coordinate.is_valid() {
            tracing::debug!(
                resource_id = %resource.id,
                "skipping candidate with invalid coordinate"
            );
            continue;
        }
        let distance = distance_km(origin, coordinate)?;
        if distance <= radius_km {
            matches.push((resource.clone(), distance));
        }
    }

    matches.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
    Ok(matches)
}
