//! KMZ reader: a zip archive wrapping a KML document

use std::io::{Cursor, Read};

use polyscan_core::error::{PolyscanError, Result};
use polyscan_core::models::GeometryRecord;

use super::kml::parse_kml;
use super::BoundaryReader;

pub struct KmzReader;

impl BoundaryReader for KmzReader {
    fn read_bytes(&self, bytes: &[u8]) -> Result<Vec<GeometryRecord>> {
        match read_kml_entry(bytes)? {
            Some(content) => Ok(parse_kml(&content)),
            None => Ok(Vec::new()),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["kmz"]
    }

    fn format_name(&self) -> &str {
        "KMZ"
    }
}

fn archive_error(message: String) -> PolyscanError {
    PolyscanError::FormatError { format: "KMZ".to_string(), message }
}

/// Contents of the first `.kml` entry in archive order, if any
pub fn read_kml_entry(bytes: &[u8]) -> Result<Option<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| archive_error(format!("Failed to open archive: {}", e)))?;

    let kml_entries: Vec<String> = archive
        .file_names()
        .filter(|name| name.to_ascii_lowercase().ends_with(".kml"))
        .map(str::to_string)
        .collect();

    // file_names() is unordered, so pick by archive index
    let mut first = None;
    for i in 0..archive.len() {
        let entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping corrupt KMZ entry {}: {}", i, e);
                continue;
            }
        };
        if entry.name().to_ascii_lowercase().ends_with(".kml") {
            first = Some(i);
            break;
        }
    }

    let Some(index) = first else {
        tracing::error!("No KML file found in KMZ archive");
        return Ok(None);
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| archive_error(format!("Failed to read entry {}: {}", index, e)))?;

    if kml_entries.len() > 1 {
        tracing::info!(
            entries = kml_entries.len(),
            "KMZ holds several KML documents, using {}",
            entry.name()
        );
    }

    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}
