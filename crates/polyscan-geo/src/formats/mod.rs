//! Boundary file readers
//!
//! Each container format implements [`BoundaryReader`]; the [`FormatRegistry`]
//! picks a reader by file extension.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use polyscan_core::error::{PolyscanError, Result};
use polyscan_core::models::{GeometryRecord, GeometryType};
use serde::Serialize;

pub mod kml;
pub mod kmz;
pub mod xml;

pub use kml::KmlReader;
pub use kmz::KmzReader;

/// Reader for one boundary container format
pub trait BoundaryReader: Send + Sync {
    /// Parse raw file contents into records
    fn read_bytes(&self, bytes: &[u8]) -> Result<Vec<GeometryRecord>>;

    /// Get supported file extensions (e.g., ["kml"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name
    fn format_name(&self) -> &str;
}

/// Central registry for boundary readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn BoundaryReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with the KML and KMZ readers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(KmzReader));
        registry.register(Box::new(KmlReader));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn BoundaryReader>) {
        self.readers.push(reader);
    }

    /// Find the reader for a path's extension (case-insensitive)
    pub fn detect_format(&self, path: &Path) -> Result<&dyn BoundaryReader> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| PolyscanError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref())
            .ok_or_else(|| PolyscanError::UnsupportedFormat {
                extension,
                supported: self.supported_formats(),
            })
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Extract records from a file.
    ///
    /// Only an unsupported extension is an error. A missing or unreadable
    /// file, or a broken archive, is logged and yields no records.
    pub fn extract_path(&self, path: &Path) -> Result<Vec<GeometryRecord>> {
        let reader = self.detect_format(path)?;

        if !path.exists() {
            tracing::error!("File {} does not exist", path.display());
            return Ok(Vec::new());
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                return Ok(Vec::new());
            }
        };

        tracing::info!(format = reader.format_name(), "Opening {}", path.display());
        match reader.read_bytes(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::error!("Error processing {}: {}", path.display(), e);
                Ok(Vec::new())
            }
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extract records from a KML or KMZ file using the default readers
pub fn extract_path(path: &Path) -> Result<Vec<GeometryRecord>> {
    FormatRegistry::with_defaults().extract_path(path)
}

/// Counts of extracted records by geometry type and by folder
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub total: usize,
    pub by_type: BTreeMap<GeometryType, usize>,
    pub by_folder: BTreeMap<String, usize>,
}

impl ExtractionSummary {
    pub fn from_records(records: &[GeometryRecord]) -> Self {
        let mut summary = Self { total: records.len(), ..Default::default() };
        for record in records {
            *summary.by_type.entry(record.geometry_type()).or_default() += 1;
            *summary.by_folder.entry(record.folder.clone()).or_default() += 1;
        }
        summary
    }

    pub fn log(&self) {
        tracing::info!(total = self.total, "Extraction summary");
        for (geometry_type, count) in &self.by_type {
            tracing::info!(%geometry_type, count, "  by geometry type");
        }
        for (folder, count) in &self.by_folder {
            tracing::info!(folder = %folder, count, "  by folder");
        }
    }
}
