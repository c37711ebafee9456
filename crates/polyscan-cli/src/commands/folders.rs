//! Folders command implementation

use crate::cli::FoldersArgs;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use polyscan_geo::export::{folders, polygon_entries, read_feature_collection};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Polygons")]
    polygons: usize,
}

pub fn execute(args: FoldersArgs, output: &OutputWriter) -> Result<()> {
    let collection = read_feature_collection(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let entries = polygon_entries(&collection);

    let rows: Vec<FolderRow> = folders(&collection)
        .into_iter()
        .map(|folder| FolderRow {
            polygons: entries.iter().filter(|e| e.folder == folder).count(),
            folder,
        })
        .collect();

    if output.is_json() {
        return output.result(rows);
    }

    output.section(format!("Folders in {}", args.input.display()));
    output.table(rows);
    Ok(())
}
