//! GeoJSON interchange between extraction, decomposition and retrieval

use std::fs;
use std::path::Path;

use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use polyscan_core::error::{PolyscanError, Result};
use polyscan_core::models::{BoundaryPoint, GeometryRecord, UNNAMED};
use serde::Serialize;

use crate::decompose::{decompose, PolygonFeature};

/// Folder label for features without a `folder` property
pub const NO_FOLDER: &str = "No folder";

fn geojson_error(message: String) -> PolyscanError {
    PolyscanError::FormatError { format: "GeoJSON".to_string(), message }
}

fn feature(geometry: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// One GeoJSON feature per record
pub fn records_to_feature_collection(records: &[GeometryRecord]) -> FeatureCollection {
    let features = records
        .iter()
        .map(|record| {
            let geometry = geo::Geometry::from(&record.geometry);
            feature(geojson::Value::from(&geometry), record.properties())
        })
        .collect();

    FeatureCollection { bbox: None, features, foreign_members: None }
}

impl From<PolygonFeature> for Feature {
    fn from(part: PolygonFeature) -> Self {
        feature(geojson::Value::from(&part.geometry), part.properties)
    }
}

/// Decompose every Polygon and MultiPolygon feature. Other features are
/// passed through untouched.
pub fn split_feature_collection(collection: &FeatureCollection, max_points: usize) -> FeatureCollection {
    let mut features = Vec::with_capacity(collection.features.len());
    let mut fallbacks = 0usize;

    for input in &collection.features {
        let Some(geometry) = &input.geometry else {
            features.push(input.clone());
            continue;
        };

        let polygons = match geo::Geometry::<f64>::try_from(geometry.clone()) {
            Ok(geo::Geometry::Polygon(polygon)) => vec![polygon],
            Ok(geo::Geometry::MultiPolygon(multi)) => multi.0,
            Ok(_) => {
                features.push(input.clone());
                continue;
            }
            Err(e) => {
                tracing::warn!("Passing through feature with unreadable geometry: {}", e);
                features.push(input.clone());
                continue;
            }
        };

        let properties = input.properties.clone().unwrap_or_default();
        for polygon in &polygons {
            for part in decompose(polygon, &properties, max_points) {
                if part.fallback.is_some() {
                    fallbacks += 1;
                }
                features.push(part.into());
            }
        }
    }

    tracing::info!(
        input = collection.features.len(),
        output = features.len(),
        fallbacks,
        "Processed features"
    );
    FeatureCollection { bbox: None, features, foreign_members: None }
}

/// A polygon ready to be used as a spatial filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonEntry {
    pub name: String,
    pub folder: String,
    pub points: Vec<BoundaryPoint>,
}

fn property_text(feature: &Feature, key: &str, default: &str) -> String {
    match feature.property(key) {
        Some(JsonValue::String(text)) => text.clone(),
        Some(JsonValue::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Exterior rings of the Polygon features as `{lat, lon}` points, with
/// consecutive duplicates removed. Other geometry types are skipped.
pub fn polygon_entries(collection: &FeatureCollection) -> Vec<PolygonEntry> {
    let mut entries = Vec::new();

    for feature in &collection.features {
        let Some(geojson::Value::Polygon(rings)) = feature.geometry.as_ref().map(|g| &g.value) else {
            continue;
        };

        let exterior: LineString<f64> = rings
            .first()
            .into_iter()
            .flatten()
            .filter(|position| position.len() >= 2)
            .map(|position| Coord { x: position[0], y: position[1] })
            .collect::<Vec<_>>()
            .into();
        let points = BoundaryPoint::from_ring(&exterior);

        entries.push(PolygonEntry {
            name: property_text(feature, "name", UNNAMED),
            folder: property_text(feature, "folder", NO_FOLDER),
            points,
        });
    }

    tracing::info!("Processed {} polygons from GeoJSON", entries.len());
    entries
}

/// Unique folder names in first-seen order
pub fn folders(collection: &FeatureCollection) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for feature in &collection.features {
        let folder = property_text(feature, "folder", NO_FOLDER);
        if !seen.contains(&folder) {
            seen.push(folder);
        }
    }
    seen
}

/// Entries in any of the given folders; an empty selection keeps everything
pub fn select_by_folders(entries: Vec<PolygonEntry>, selected: &[String]) -> Vec<PolygonEntry> {
    if selected.is_empty() {
        return entries;
    }
    entries.into_iter().filter(|e| selected.contains(&e.folder)).collect()
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| geojson_error(format!("Failed to parse {}: {}", path.display(), e)))?;
    FeatureCollection::try_from(geojson)
        .map_err(|e| geojson_error(format!("{} is not a FeatureCollection: {}", path.display(), e)))
}

pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(collection)?;
    fs::write(path, json)?;
    Ok(())
}
