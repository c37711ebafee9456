//! Features extracted from boundary files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Folder label for placemarks that are not inside any named folder
pub const ROOT_FOLDER: &str = "Root";

/// Name given to placemarks without a `<name>`
pub const UNNAMED: &str = "Unnamed";

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

/// Geometry carried by an extracted record.
///
/// A placemark whose geometry could not be parsed never becomes a record, so
/// there is no empty variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordGeometry {
    Point(geo::Point<f64>),
    LineString(geo::LineString<f64>),
    Polygon(geo::Polygon<f64>),
    MultiPolygon(geo::MultiPolygon<f64>),
}

impl RecordGeometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            RecordGeometry::Point(_) => GeometryType::Point,
            RecordGeometry::LineString(_) => GeometryType::LineString,
            RecordGeometry::Polygon(_) => GeometryType::Polygon,
            RecordGeometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    /// Polygons contained in this geometry, in document order
    pub fn polygons(&self) -> Vec<&geo::Polygon<f64>> {
        match self {
            RecordGeometry::Polygon(polygon) => vec![polygon],
            RecordGeometry::MultiPolygon(multi) => multi.0.iter().collect(),
            RecordGeometry::Point(_) | RecordGeometry::LineString(_) => Vec::new(),
        }
    }
}

impl From<&RecordGeometry> for geo::Geometry<f64> {
    fn from(geometry: &RecordGeometry) -> Self {
        match geometry {
            RecordGeometry::Point(p) => geo::Geometry::Point(*p),
            RecordGeometry::LineString(ls) => geo::Geometry::LineString(ls.clone()),
            RecordGeometry::Polygon(p) => geo::Geometry::Polygon(p.clone()),
            RecordGeometry::MultiPolygon(mp) => geo::Geometry::MultiPolygon(mp.clone()),
        }
    }
}

/// One placemark extracted from a KML or KMZ document
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub name: String,
    pub description: Option<String>,

    /// Nearest enclosing named folder, or [`ROOT_FOLDER`]
    pub folder: String,

    /// Every enclosing named folder, outermost first
    pub folder_path: Vec<String>,

    pub geometry: RecordGeometry,

    pub extended_attributes: BTreeMap<String, String>,
}

impl GeometryRecord {
    pub fn new(name: impl Into<String>, geometry: RecordGeometry) -> Self {
        Self {
            name: name.into(),
            description: None,
            folder: ROOT_FOLDER.to_string(),
            folder_path: Vec::new(),
            geometry,
            extended_attributes: BTreeMap::new(),
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry.geometry_type()
    }

    /// Feature properties: extended attributes plus `name`, `description`,
    /// `folder` and `folder_path`. The core keys take precedence.
    pub fn properties(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut properties = serde_json::Map::new();
        for (key, value) in &self.extended_attributes {
            properties.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        properties.insert("name".to_string(), serde_json::json!(self.name));
        properties.insert("description".to_string(), serde_json::json!(self.description));
        properties.insert("folder".to_string(), serde_json::json!(self.folder));
        properties.insert("folder_path".to_string(), serde_json::json!(self.folder_path));
        properties
    }
}
