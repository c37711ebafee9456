//! Boundary points in the shape the remote service's spatial filter expects.

use serde::{Deserialize, Serialize};

use crate::error::{PolyscanError, Result};

/// A `{lat, lon}` vertex of a query polygon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl BoundaryPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert a ring (x = lon, y = lat) into boundary points, dropping
    /// consecutive duplicates which the remote service rejects.
    pub fn from_ring(ring: &geo::LineString<f64>) -> Vec<BoundaryPoint> {
        let mut points: Vec<BoundaryPoint> = Vec::with_capacity(ring.0.len());
        for coord in &ring.0 {
            let point = BoundaryPoint::new(coord.y, coord.x);
            if points.last() != Some(&point) {
                points.push(point);
            }
        }
        points
    }

    fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Check that a boundary can be sent as a spatial filter.
///
/// An unclosed ring only produces a warning since the service closes it.
pub fn validate_boundary(points: &[BoundaryPoint]) -> Result<()> {
    let invalid = |reason: String| PolyscanError::InvalidGeometry {
        feature: "boundary".to_string(),
        reason,
    };

    if points.is_empty() {
        return Err(invalid("Empty polygon".to_string()));
    }
    if points.len() < 3 {
        return Err(invalid(format!(
            "Polygon has only {} points, minimum 3 required",
            points.len()
        )));
    }
    if points.first() != points.last() {
        tracing::warn!("Polygon is not closed (first and last points differ)");
    }

    for (i, point) in points.iter().enumerate() {
        if !point.in_range() {
            return Err(invalid(format!(
                "Invalid coordinate at point {}: lat {}, lon {}",
                i, point.lat, point.lon
            )));
        }
    }

    Ok(())
}
