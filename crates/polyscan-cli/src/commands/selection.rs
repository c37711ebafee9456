//! Polygon selection and stop handling shared by the retrieval commands

use crate::cli::{ScanArgs, SelectionArgs};
use crate::output::OutputWriter;
use anyhow::{bail, Context, Result};
use polyscan_client::ScanControl;
use polyscan_core::models::validate_boundary;
use polyscan_geo::export::{polygon_entries, read_feature_collection, select_by_folders, PolygonEntry};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Polygons of the input file in the selected folders, with invalid
/// boundaries reported and skipped
pub fn load_polygons(args: &SelectionArgs, output: &OutputWriter) -> Result<Vec<PolygonEntry>> {
    let collection = read_feature_collection(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let selected = select_by_folders(polygon_entries(&collection), &args.folders);

    let mut polygons = Vec::with_capacity(selected.len());
    for entry in selected {
        match validate_boundary(&entry.points) {
            Ok(()) => polygons.push(entry),
            Err(e) => output.warning(format!("Skipping polygon '{}': {}", entry.name, e)),
        }
    }

    if polygons.is_empty() {
        bail!("No valid polygons selected from {}", args.input.display());
    }
    Ok(polygons)
}

/// Ctrl-C cancels the running scan; `--timeout` sets a deadline
pub fn scan_control(args: &ScanArgs) -> ScanControl {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, keeping records retrieved so far");
            on_interrupt.cancel();
        }
    });

    let control = ScanControl::new().with_cancel(cancel);
    match args.timeout {
        Some(seconds) => control.with_deadline(Instant::now() + Duration::from_secs(seconds)),
        None => control,
    }
}

/// Write a JSON result file
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
