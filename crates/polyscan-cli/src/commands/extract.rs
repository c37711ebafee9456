//! Extract command implementation

use crate::cli::ExtractArgs;
use crate::output::OutputWriter;
use anyhow::{bail, Context, Result};
use polyscan_geo::export::{records_to_feature_collection, write_feature_collection};
use polyscan_geo::{ExtractionSummary, FormatRegistry};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize)]
struct ExtractOutput {
    input: String,
    output: String,
    summary: ExtractionSummary,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Count")]
    count: usize,
}

pub fn execute(args: ExtractArgs, output: &OutputWriter) -> Result<()> {
    let registry = FormatRegistry::with_defaults();
    let records = registry.extract_path(&args.file)?;
    if records.is_empty() {
        bail!("No placemarks could be extracted from {}", args.file.display());
    }

    let summary = ExtractionSummary::from_records(&records);
    summary.log();

    let target = args.output.unwrap_or_else(|| args.file.with_extension("geojson"));
    let collection = records_to_feature_collection(&records);
    write_feature_collection(&target, &collection)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    if output.is_json() {
        return output.result(ExtractOutput {
            input: args.file.display().to_string(),
            output: target.display().to_string(),
            summary,
        });
    }

    output.success(format!(
        "Extracted {} placemarks to {}",
        summary.total,
        target.display()
    ));

    output.section("By geometry type");
    output.table(
        summary
            .by_type
            .iter()
            .map(|(geometry_type, count)| CountRow { group: geometry_type.to_string(), count: *count })
            .collect(),
    );

    output.section("By folder");
    output.table(
        summary
            .by_folder
            .iter()
            .map(|(folder, count)| CountRow { group: folder.clone(), count: *count })
            .collect(),
    );

    Ok(())
}
