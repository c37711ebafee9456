//! KML (Keyhole Markup Language) reader
//!
//! Walks the Document/Folder hierarchy and turns each Placemark into a
//! [`GeometryRecord`]. A placemark whose geometry cannot be parsed is logged
//! and skipped; it never aborts the rest of the document.

use std::collections::{BTreeMap, HashSet};

use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use polyscan_core::error::Result;
use polyscan_core::models::{GeometryRecord, RecordGeometry, ROOT_FOLDER, UNNAMED};

use super::xml::{parse_document, Element};
use super::BoundaryReader;

/// KML format reader
pub struct KmlReader;

impl BoundaryReader for KmlReader {
    fn read_bytes(&self, bytes: &[u8]) -> Result<Vec<GeometryRecord>> {
        Ok(parse_kml(&String::from_utf8_lossy(bytes)))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["kml"]
    }

    fn format_name(&self) -> &str {
        "KML"
    }
}

/// Extract every placemark with a usable geometry, in document order
pub fn parse_kml(content: &str) -> Vec<GeometryRecord> {
    let document = parse_document(content);
    if let Some(error) = &document.error {
        tracing::warn!(error = %error, "KML document is malformed, extracting what was parsed");
    }

    let mut records = Vec::new();
    let mut folder_path = Vec::new();
    let mut skipped = 0usize;
    walk(&document.root, &mut folder_path, &mut records, &mut skipped);

    tracing::info!(placemarks = records.len() + skipped, skipped, "Parsed KML document");
    records
}

fn walk(
    element: &Element,
    folder_path: &mut Vec<String>,
    records: &mut Vec<GeometryRecord>,
    skipped: &mut usize,
) {
    for child in &element.children {
        match child.name.as_str() {
            "Placemark" => match extract_placemark(child, folder_path) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    *skipped += 1;
                    tracing::warn!(
                        placemark = child.child_text("name").unwrap_or(UNNAMED),
                        "Skipping placemark: {}",
                        reason
                    );
                }
            },
            "Folder" => match child.child_text("name") {
                Some(name) => {
                    folder_path.push(name.to_string());
                    walk(child, folder_path, records, skipped);
                    folder_path.pop();
                }
                None => walk(child, folder_path, records, skipped),
            },
            // Geometry and metadata subtrees never hold placemarks
            "ExtendedData" | "Style" | "StyleMap" | "Schema" => {}
            _ => walk(child, folder_path, records, skipped),
        }
    }
}

fn extract_placemark(
    placemark: &Element,
    folder_path: &[String],
) -> std::result::Result<GeometryRecord, String> {
    let geometry = placemark
        .children
        .iter()
        .find_map(|child| match child.name.as_str() {
            "Point" | "LineString" | "Polygon" | "MultiGeometry" => Some(parse_geometry(child)),
            _ => None,
        })
        .ok_or_else(|| "no geometry".to_string())??;

    let name = placemark.child_text("name").unwrap_or(UNNAMED);
    let mut record = GeometryRecord::new(name, geometry);
    record.description = placemark.child_text("description").map(str::to_string);
    record.folder = folder_path.last().cloned().unwrap_or_else(|| ROOT_FOLDER.to_string());
    record.folder_path = folder_path.to_vec();

    if let Some(extended) = placemark.child("ExtendedData") {
        record.extended_attributes = extended_data(extended);
    }

    Ok(record)
}

/// `<Data name><value>` pairs and `<SchemaData><SimpleData name>` entries
fn extended_data(extended: &Element) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();

    for data in extended.children_named("Data") {
        if let (Some(name), Some(value)) = (data.attribute("name"), data.child_text("value")) {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    for schema in extended.children_named("SchemaData") {
        for simple in schema.children_named("SimpleData") {
            let value = simple.text.trim();
            if let Some(name) = simple.attribute("name") {
                if !value.is_empty() {
                    attributes.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    attributes
}

fn parse_geometry(element: &Element) -> std::result::Result<RecordGeometry, String> {
    match element.name.as_str() {
        "Point" => {
            let coords = coordinates_of(element)?;
            let first = coords.first().ok_or("Point has no coordinates")?;
            Ok(RecordGeometry::Point(Point::from(*first)))
        }
        "LineString" => {
            let coords = coordinates_of(element)?;
            if coords.len() < 2 {
                return Err(format!("LineString has {} coordinates, need 2", coords.len()));
            }
            Ok(RecordGeometry::LineString(LineString::from(coords)))
        }
        "Polygon" => parse_polygon(element).map(RecordGeometry::Polygon),
        "MultiGeometry" => {
            let mut polygons = Vec::new();
            collect_polygons(element, &mut polygons);
            if polygons.is_empty() {
                return Err("MultiGeometry contains no valid polygons".to_string());
            }
            Ok(RecordGeometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        other => Err(format!("Unsupported geometry type: {}", other)),
    }
}

fn collect_polygons(multi: &Element, polygons: &mut Vec<Polygon<f64>>) {
    for child in &multi.children {
        match child.name.as_str() {
            "Polygon" => match parse_polygon(child) {
                Ok(polygon) => polygons.push(polygon),
                Err(reason) => tracing::warn!("Skipping polygon in MultiGeometry: {}", reason),
            },
            "MultiGeometry" => collect_polygons(child, polygons),
            _ => {}
        }
    }
}

fn parse_polygon(polygon: &Element) -> std::result::Result<Polygon<f64>, String> {
    let outer = polygon
        .child("outerBoundaryIs")
        .and_then(|b| b.child("LinearRing"))
        .ok_or("Polygon has no outer boundary")?;
    let exterior = parse_ring(outer)?;

    let mut interiors = Vec::new();
    for inner in polygon.children_named("innerBoundaryIs") {
        for ring in inner.children_named("LinearRing") {
            match parse_ring(ring) {
                Ok(ring) => interiors.push(ring),
                Err(reason) => tracing::warn!("Skipping inner boundary: {}", reason),
            }
        }
    }

    Ok(Polygon::new(exterior, interiors))
}

/// A closed ring with at least three distinct coordinates
fn parse_ring(ring: &Element) -> std::result::Result<LineString<f64>, String> {
    let mut coords = coordinates_of(ring)?;

    let distinct: HashSet<(u64, u64)> =
        coords.iter().map(|c| (c.x.to_bits(), c.y.to_bits())).collect();
    if distinct.len() < 3 {
        return Err(format!("Ring has {} distinct coordinates, need 3", distinct.len()));
    }

    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    Ok(LineString::from(coords))
}

fn coordinates_of(element: &Element) -> std::result::Result<Vec<Coord<f64>>, String> {
    let text = element.child_text("coordinates").ok_or("missing <coordinates>")?;
    parse_coordinates(text)
}

/// Parse `lon,lat[,alt]` tuples separated by whitespace. Altitude is dropped
/// and tuples with fewer than two components are ignored.
pub fn parse_coordinates(text: &str) -> std::result::Result<Vec<Coord<f64>>, String> {
    let mut coords = Vec::new();
    for tuple in text.split_whitespace() {
        let mut parts = tuple.split(',').filter(|p| !p.is_empty());
        let (Some(lon), Some(lat)) = (parts.next(), parts.next()) else {
            continue;
        };
        let x: f64 = lon.parse().map_err(|_| format!("Invalid longitude '{}'", lon))?;
        let y: f64 = lat.parse().map_err(|_| format!("Invalid latitude '{}'", lat))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(format!("Non-finite coordinate '{}'", tuple));
        }
        coords.push(Coord { x, y });
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyscan_core::models::GeometryType;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Territories</name>
    <Placemark>
      <name>Loose pin</name>
      <Point><coordinates>-75.1,40.0,0</coordinates></Point>
    </Placemark>
    <Folder>
      <name>North</name>
      <Folder>
        <Placemark>
          <name>Block A</name>
          <description>First block</description>
          <ExtendedData>
            <Data name="zoning"><value>R2</value></Data>
            <Data name="empty"><value></value></Data>
            <SchemaData schemaUrl="#s"><SimpleData name="owner">City</SimpleData></SchemaData>
          </ExtendedData>
          <Polygon>
            <outerBoundaryIs><LinearRing><coordinates>
              -75.0,40.0,0 -74.9,40.0,0 -74.9,40.1,0 -75.0,40.1,0
            </coordinates></LinearRing></outerBoundaryIs>
            <innerBoundaryIs><LinearRing><coordinates>-74.95,40.05 -74.94,40.05</coordinates></LinearRing></innerBoundaryIs>
          </Polygon>
        </Placemark>
      </Folder>
      <Placemark>
        <name>Broken</name>
        <Polygon><outerBoundaryIs><LinearRing><coordinates>-75,40 -75,40 -74,41</coordinates></LinearRing></outerBoundaryIs></Polygon>
      </Placemark>
      <Placemark>
        <MultiGeometry>
          <Point><coordinates>-75,40</coordinates></Point>
          <Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs></Polygon>
          <Polygon><outerBoundaryIs><LinearRing><coordinates>5,5 6,5</coordinates></LinearRing></outerBoundaryIs></Polygon>
        </MultiGeometry>
      </Placemark>
    </Folder>
  </Document>
</kml>"##;

    #[test]
    fn test_parse_sample_document() {
        let records = parse_kml(SAMPLE);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "Loose pin");
        assert_eq!(records[0].folder, ROOT_FOLDER);
        assert_eq!(records[0].geometry_type(), GeometryType::Point);

        let block = &records[1];
        assert_eq!(block.name, "Block A");
        assert_eq!(block.description.as_deref(), Some("First block"));
        // Unnamed inner folder: nearest named folder wins
        assert_eq!(block.folder, "North");
        assert_eq!(block.folder_path, vec!["North".to_string()]);
        assert_eq!(block.extended_attributes["zoning"], "R2");
        assert_eq!(block.extended_attributes["owner"], "City");
        assert!(!block.extended_attributes.contains_key("empty"));

        let RecordGeometry::Polygon(polygon) = &block.geometry else {
            panic!("expected polygon");
        };
        // Auto-closed ring, bad inner ring skipped
        assert_eq!(polygon.exterior().0.len(), 5);
        assert!(polygon.interiors().is_empty());

        let multi = &records[2];
        assert_eq!(multi.name, UNNAMED);
        assert_eq!(multi.geometry_type(), GeometryType::MultiPolygon);
        assert_eq!(multi.geometry.polygons().len(), 1);
    }

    #[test]
    fn test_parse_coordinates() {
        let coords = parse_coordinates(" -75.1,40.0,12 \n -75.0,40.5 bogus ").unwrap();
        assert_eq!(coords, vec![Coord { x: -75.1, y: 40.0 }, Coord { x: -75.0, y: 40.5 }]);
        assert!(parse_coordinates("abc,40").is_err());
    }

    #[test]
    fn test_truncated_document_keeps_earlier_placemarks() {
        let truncated = &SAMPLE[..SAMPLE.find("<name>Broken").unwrap()];
        let records = parse_kml(truncated);
        assert_eq!(records.len(), 2);
    }
}
