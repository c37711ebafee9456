//! Structural polygon checks used to accept or reject split results.

use geo::{Area, LineString, Polygon};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// First reason, for one-line log messages
    pub fn summary(&self) -> String {
        self.errors
            .first()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .unwrap_or_else(|| "valid".to_string())
    }
}

fn validate_ring(ring: &LineString<f64>, location: &str, result: &mut ValidationResult) {
    if ring.0.len() < 4 {
        result.add_error(
            location.to_string(),
            format!("Ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let (Some(first), Some(last)) = (ring.0.first(), ring.0.last()) {
        if first != last {
            result.add_error(
                location.to_string(),
                "Ring must be closed (first point == last point)".to_string(),
            );
        }
    }

    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        result.add_error(location.to_string(), "Coordinates must be finite".to_string());
    }
}

/// Check a polygon is closed, finite and encloses a non-zero area
pub fn validate_polygon(polygon: &Polygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    validate_ring(polygon.exterior(), "Polygon exterior", &mut result);
    for (i, interior) in polygon.interiors().iter().enumerate() {
        validate_ring(interior, &format!("Polygon interior[{}]", i), &mut result);
    }

    if result.is_valid && polygon.unsigned_area() <= 0.0 {
        result.add_error("Polygon".to_string(), "Polygon has zero area".to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    #[test]
    fn test_valid_square() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        assert!(validate_polygon(&square).is_valid);
    }

    #[test]
    fn test_degenerate_polygons() {
        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let result = validate_polygon(&flat);
        assert!(!result.is_valid);
        assert!(result.summary().contains("zero area"));

        let sliver = Polygon::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)], vec![]);
        assert!(!validate_polygon(&sliver).is_valid);

        let infinite = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(!validate_polygon(&infinite).is_valid);
    }
}
