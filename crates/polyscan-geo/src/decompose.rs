//! Recursive polygon decomposition under a vertex budget
//!
//! A polygon whose exterior ring exceeds the budget is cut in half across the
//! longer side of its bounding box, and each half is decomposed again. Every
//! part carries the properties of the source polygon unchanged.

use geo::{BooleanOps, BoundingRect, Coord, LineString, Polygon, Rect, SimplifyVwPreserve};
use geojson::JsonObject;
use polyscan_core::config::MIN_MAX_POINTS;
use polyscan_core::models::RecordGeometry;
use serde::Serialize;
use thiserror::Error;

use crate::validation::validate_polygon;

/// Tolerance of the shape-preserving simplification used when a split fails.
/// Vertices spanning a triangle smaller than its square are dropped.
pub const SIMPLIFY_TOLERANCE: f64 = 0.0001;

/// How far the cutting rectangles reach past the bounding box
pub const CUT_EXTENSION: f64 = 1.0;

/// Recursion guard; a well-behaved split halves the box long before this
pub const MAX_SPLIT_DEPTH: usize = 64;

/// Lossy path that produced a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fallback {
    /// Topology-preserving simplification brought the ring within budget
    Simplified,
    /// Vertices were dropped from the ring to force it under the budget
    Subsampled,
}

/// One output part of a decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub geometry: Polygon<f64>,
    pub properties: JsonObject,
    /// Exterior ring length, closing vertex included
    pub vertex_count: usize,
    pub fallback: Option<Fallback>,
}

impl PolygonFeature {
    fn new(geometry: Polygon<f64>, properties: &JsonObject, fallback: Option<Fallback>) -> Self {
        Self {
            vertex_count: vertex_count(&geometry),
            geometry,
            properties: properties.clone(),
            fallback,
        }
    }
}

#[derive(Debug, Error)]
enum SplitError {
    #[error("polygon has no bounding box")]
    Empty,
    #[error("bounding box has non-finite coordinates")]
    NonFinite,
    #[error("bounding box has zero extent")]
    Degenerate,
    #[error("cut produced no valid polygons")]
    NoPolygons,
    #[error("no part is smaller than the original")]
    NoProgress,
    #[error("split depth exceeded {MAX_SPLIT_DEPTH}")]
    DepthExceeded,
}

pub fn vertex_count(polygon: &Polygon<f64>) -> usize {
    polygon.exterior().0.len()
}

/// Split `polygon` into parts of at most `max_points` exterior vertices.
///
/// `max_points` below 4 is raised to 4. A polygon already within budget comes
/// back as a single identical part.
pub fn decompose(
    polygon: &Polygon<f64>,
    properties: &JsonObject,
    max_points: usize,
) -> Vec<PolygonFeature> {
    let max_points = max_points.max(MIN_MAX_POINTS);
    let mut parts = Vec::new();
    split_into(polygon.clone(), properties, max_points, 0, &mut parts);

    if parts.len() > 1 {
        tracing::debug!(
            vertices = vertex_count(polygon),
            parts = parts.len(),
            max_points,
            "Split polygon"
        );
    }
    parts
}

/// Decompose every polygon of a record geometry. Points and lines yield nothing.
pub fn decompose_geometry(
    geometry: &RecordGeometry,
    properties: &JsonObject,
    max_points: usize,
) -> Vec<PolygonFeature> {
    geometry
        .polygons()
        .into_iter()
        .flat_map(|polygon| decompose(polygon, properties, max_points))
        .collect()
}

fn split_into(
    polygon: Polygon<f64>,
    properties: &JsonObject,
    max_points: usize,
    depth: usize,
    out: &mut Vec<PolygonFeature>,
) {
    if vertex_count(&polygon) <= max_points {
        out.push(PolygonFeature::new(polygon, properties, None));
        return;
    }

    match bisect(&polygon, depth) {
        Ok(halves) => {
            for half in halves {
                split_into(half, properties, max_points, depth + 1, out);
            }
        }
        Err(e) => {
            tracing::warn!(
                vertices = vertex_count(&polygon),
                depth,
                "Polygon split failed ({}), falling back to simplification",
                e
            );
            out.push(fallback(&polygon, properties, max_points));
        }
    }
}

fn bisect(polygon: &Polygon<f64>, depth: usize) -> Result<Vec<Polygon<f64>>, SplitError> {
    if depth >= MAX_SPLIT_DEPTH {
        return Err(SplitError::DepthExceeded);
    }

    let bbox = polygon.bounding_rect().ok_or(SplitError::Empty)?;
    let (min, max) = (bbox.min(), bbox.max());
    if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
        return Err(SplitError::NonFinite);
    }

    let (width, height) = (bbox.width(), bbox.height());
    if width <= 0.0 && height <= 0.0 {
        return Err(SplitError::Degenerate);
    }

    let e = CUT_EXTENSION;
    let (first, second) = if width >= height {
        let mid = min.x + width / 2.0;
        (
            Rect::new((min.x - e, min.y - e), (mid, max.y + e)),
            Rect::new((mid, min.y - e), (max.x + e, max.y + e)),
        )
    } else {
        let mid = min.y + height / 2.0;
        (
            Rect::new((min.x - e, min.y - e), (max.x + e, mid)),
            Rect::new((min.x - e, mid), (max.x + e, max.y + e)),
        )
    };

    let mut parts = Vec::new();
    for half in [first, second] {
        let pieces = polygon.intersection(&half.to_polygon());
        for piece in pieces {
            let validation = validate_polygon(&piece);
            if validation.is_valid {
                parts.push(piece);
            } else {
                tracing::debug!("Discarding split piece: {}", validation.summary());
            }
        }
    }

    if parts.is_empty() {
        return Err(SplitError::NoPolygons);
    }
    // Cutting a quadrilateral yields quadrilaterals; recursing would never end
    let original = vertex_count(polygon);
    if parts.iter().all(|part| vertex_count(part) >= original) {
        return Err(SplitError::NoProgress);
    }
    Ok(parts)
}

fn fallback(polygon: &Polygon<f64>, properties: &JsonObject, max_points: usize) -> PolygonFeature {
    let simplified = polygon.simplify_vw_preserve(SIMPLIFY_TOLERANCE * SIMPLIFY_TOLERANCE);
    if vertex_count(&simplified) <= max_points && validate_polygon(&simplified).is_valid {
        tracing::warn!(
            vertices = vertex_count(&simplified),
            "Using simplified polygon in place of split"
        );
        return PolygonFeature::new(simplified, properties, Some(Fallback::Simplified));
    }

    let mut sampled = Polygon::new(subsample(polygon.exterior(), max_points), vec![]);
    if !validate_polygon(&sampled).is_valid {
        sampled = Polygon::new(spread(polygon.exterior(), max_points), vec![]);
    }

    let validation = validate_polygon(&sampled);
    if validation.is_valid {
        tracing::warn!(
            original = vertex_count(polygon),
            vertices = vertex_count(&sampled),
            max_points,
            "Subsampled polygon ring to force it under the vertex budget"
        );
    } else {
        tracing::error!(
            original = vertex_count(polygon),
            vertices = vertex_count(&sampled),
            max_points,
            "Subsampled polygon is invalid: {}",
            validation.summary()
        );
    }
    PolygonFeature::new(sampled, properties, Some(Fallback::Subsampled))
}

/// Keep every `ceil(n / max_points) + 1`-th vertex and re-close the ring
fn subsample(ring: &LineString<f64>, max_points: usize) -> LineString<f64> {
    let coords = &ring.0;
    let stride = coords.len().div_ceil(max_points) + 1;
    let mut sampled: Vec<Coord<f64>> = coords.iter().step_by(stride).copied().collect();
    if let Some(&first) = sampled.first() {
        if sampled.last() != Some(&first) {
            sampled.push(first);
        }
    }
    LineString::from(sampled)
}

/// `max_points - 1` vertices spread evenly over the open ring, then closed.
/// Used when striding collapses a small ring onto a line.
fn spread(ring: &LineString<f64>, max_points: usize) -> LineString<f64> {
    let mut open = ring.0.as_slice();
    if ring.is_closed() && open.len() > 1 {
        open = &open[..open.len() - 1];
    }

    let keep = (max_points - 1).min(open.len());
    let mut sampled: Vec<Coord<f64>> = (0..keep).map(|i| open[i * open.len() / keep]).collect();
    if let Some(&first) = sampled.first() {
        sampled.push(first);
    }
    LineString::from(sampled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};
    use serde_json::json;

    fn props() -> JsonObject {
        let mut p = JsonObject::new();
        p.insert("name".to_string(), json!("Tract 9"));
        p.insert("folder".to_string(), json!("East"));
        p
    }

    fn circle(n: usize, radius: f64) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = (0..n)
            .map(|i| {
                let angle = i as f64 / n as f64 * std::f64::consts::TAU;
                Coord { x: radius * angle.cos(), y: radius * angle.sin() }
            })
            .collect();
        Polygon::new(LineString::from(coords), vec![])
    }

    #[test]
    fn test_within_budget_is_identity() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let parts = decompose(&square, &props(), 10);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].geometry, square);
        assert_eq!(parts[0].vertex_count, 5);
        assert_eq!(parts[0].fallback, None);
    }

    #[test]
    fn test_large_ring_is_split_within_budget() {
        let big = circle(1000, 10.0);
        let parts = decompose(&big, &props(), 100);

        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.vertex_count <= 100, "part has {} vertices", part.vertex_count);
            assert_eq!(part.properties, props());
            assert!(part.fallback.is_none());
        }

        let total: f64 = parts.iter().map(|p| p.geometry.unsigned_area()).sum();
        assert!((total - big.unsigned_area()).abs() < 1e-6 * big.unsigned_area());
    }

    #[test]
    fn test_quadrilateral_at_minimum_budget_terminates() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)];
        let parts = decompose(&square, &props(), 4);

        // Striding would keep only (0,0) and (0,1); the spread ring is a triangle
        assert_eq!(parts.len(), 1);
        let part = &parts[0];
        assert_eq!(part.fallback, Some(Fallback::Subsampled));
        assert_eq!(part.vertex_count, 4);
        assert!(validate_polygon(&part.geometry).is_valid);
        assert_eq!(part.geometry.unsigned_area(), 1.0);
        assert_eq!(part.properties, props());
    }

    #[test]
    fn test_spread_keeps_distinct_vertices() {
        let ring = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)]
            .exterior()
            .clone();
        let spread_ring = spread(&ring, 4);
        assert_eq!(
            spread_ring.0,
            vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 2.0, y: 0.0 },
                Coord { x: 2.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]
        );
    }

    #[test]
    fn test_budget_is_clamped() {
        let big = circle(40, 1.0);
        for part in decompose(&big, &props(), 1) {
            assert!(part.vertex_count <= MIN_MAX_POINTS || part.fallback.is_some());
        }
    }

    #[test]
    fn test_subsample_recloses_ring() {
        let ring = circle(100, 1.0).exterior().clone();
        let sampled = subsample(&ring, 10);
        // stride = ceil(101 / 10) + 1 = 12
        assert_eq!(sampled.0.len(), 10);
        assert_eq!(sampled.0.first(), sampled.0.last());
    }

    #[test]
    fn test_degenerate_polygon_uses_fallback() {
        // Every vertex identical: the bounding box cannot be bisected
        let spike = Polygon::new(
            LineString::from((0..20).map(|_| Coord { x: 5.0, y: 5.0 }).collect::<Vec<_>>()),
            vec![],
        );
        let parts = decompose(&spike, &props(), 4);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].fallback.is_some());
        assert_eq!(parts[0].properties, props());
    }

    #[test]
    fn test_multipolygon_parts_are_concatenated() {
        let geometry = RecordGeometry::MultiPolygon(geo::MultiPolygon::new(vec![
            circle(50, 1.0),
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)],
        ]));
        let parts = decompose_geometry(&geometry, &props(), 20);
        assert!(parts.len() >= 3);
        assert!(parts.iter().all(|p| p.vertex_count <= 20));

        let point = RecordGeometry::Point(geo::Point::new(0.0, 0.0));
        assert!(decompose_geometry(&point, &props(), 20).is_empty());
    }
}
