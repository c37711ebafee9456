//! Polyscan Geo - Boundary file extraction and polygon decomposition
//!
//! This crate turns KML/KMZ boundary files into geometry records, splits
//! polygons that exceed a vertex budget and converts between records and
//! GeoJSON feature collections.

pub mod decompose;
pub mod export;
pub mod formats;
pub mod validation;

pub use decompose::{decompose, decompose_geometry, Fallback, PolygonFeature};
pub use formats::{extract_path, ExtractionSummary, FormatRegistry};
