//! End-to-end extraction from files on disk

use std::fs;
use std::io::{Cursor, Write};

use polyscan_core::models::GeometryType;
use polyscan_geo::export::{polygon_entries, records_to_feature_collection, split_feature_collection};
use polyscan_geo::{extract_path, ExtractionSummary, FormatRegistry};
use tempfile::TempDir;

fn ring(n: usize) -> String {
    (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * std::f64::consts::TAU;
            format!("{:.6},{:.6},0", -75.0 + 0.1 * angle.cos(), 40.0 + 0.1 * angle.sin())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn territory_kml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
  <Folder>
    <name>Sales Areas</name>
    <Placemark>
      <name>Large Area</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
    <Placemark>
      <name>Office</name>
      <Point><coordinates>-75.0,40.0,0</coordinates></Point>
    </Placemark>
  </Folder>
</Document>
</kml>"#,
        ring(1200)
    )
}

fn write_kmz(path: &std::path::Path, kml: &str) {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer.start_file("doc.kml", options).unwrap();
    writer.write_all(kml.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    fs::write(path, bytes).unwrap();
}

#[test]
fn test_kml_and_kmz_extract_the_same_records() {
    let dir = TempDir::new().unwrap();
    let kml_path = dir.path().join("areas.kml");
    let kmz_path = dir.path().join("areas.kmz");
    fs::write(&kml_path, territory_kml()).unwrap();
    write_kmz(&kmz_path, &territory_kml());

    let from_kml = extract_path(&kml_path).unwrap();
    let from_kmz = extract_path(&kmz_path).unwrap();

    assert_eq!(from_kml.len(), 2);
    assert_eq!(from_kml, from_kmz);

    let summary = ExtractionSummary::from_records(&from_kml);
    assert_eq!(summary.by_type[&GeometryType::Polygon], 1);
    assert_eq!(summary.by_folder["Sales Areas"], 2);
}

#[test]
fn test_extract_split_and_prepare_filters() {
    let dir = TempDir::new().unwrap();
    let kml_path = dir.path().join("areas.kml");
    fs::write(&kml_path, territory_kml()).unwrap();

    let records = extract_path(&kml_path).unwrap();
    let collection = records_to_feature_collection(&records);
    let split = split_feature_collection(&collection, 500);

    // The point passes through, the 1201-vertex ring is split
    assert!(split.features.len() > 2);

    let entries = polygon_entries(&split);
    assert!(entries.len() >= 3);
    for entry in &entries {
        assert_eq!(entry.name, "Large Area");
        assert_eq!(entry.folder, "Sales Areas");
        assert!(entry.points.len() <= 500);
    }
}

#[test]
fn test_unsupported_and_broken_inputs() {
    let dir = TempDir::new().unwrap();

    let shp = dir.path().join("parcels.shp");
    fs::write(&shp, b"not relevant").unwrap();
    assert!(extract_path(&shp).is_err());

    let corrupt = dir.path().join("corrupt.kmz");
    fs::write(&corrupt, b"PK not really a zip").unwrap();
    assert!(extract_path(&corrupt).unwrap().is_empty());

    let registry = FormatRegistry::with_defaults();
    assert_eq!(registry.supported_formats(), vec!["kmz", "kml"]);
}
