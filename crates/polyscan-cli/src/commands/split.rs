//! Split command implementation

use crate::cli::SplitArgs;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use polyscan_core::config::{parse_max_points, LayeredConfig};
use polyscan_geo::export::{read_feature_collection, split_feature_collection, write_feature_collection};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SplitOutput {
    input: String,
    output: String,
    max_points: usize,
    input_features: usize,
    output_features: usize,
}

pub fn execute(args: SplitArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let max_points = parse_max_points(config.max_points.value)?;

    let collection = read_feature_collection(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let split = split_feature_collection(&collection, max_points);
    write_feature_collection(&args.output, &split)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let report = SplitOutput {
        input: args.input.display().to_string(),
        output: args.output.display().to_string(),
        max_points,
        input_features: collection.features.len(),
        output_features: split.features.len(),
    };

    if output.is_json() {
        return output.result(report);
    }

    output.success(format!(
        "Split {} features into {} (max {} points per polygon)",
        report.input_features, report.output_features, max_points
    ));
    output.kv("Output", &report.output);
    Ok(())
}
