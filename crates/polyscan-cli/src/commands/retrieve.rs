//! Businesses and consumers command implementations

use super::selection::{load_polygons, scan_control, write_json};
use crate::cli::{BusinessesArgs, ConsumersArgs, ScanArgs, SelectionArgs};
use crate::output::OutputWriter;
use crate::progress::{finish_success, polygon_bar};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polyscan_client::{ApiClient, ScanControl, ScanResult, ScanStatus};
use polyscan_core::config::LayeredConfig;
use polyscan_core::models::{AttributeFilter, BoundaryPoint};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

/// What to retrieve for every selected polygon
enum Target {
    Businesses {
        categories: Vec<String>,
    },
    Consumers {
        heads_only: bool,
        attributes: BTreeMap<String, AttributeFilter>,
    },
}

impl Target {
    fn noun(&self) -> &'static str {
        match self {
            Target::Businesses { .. } => "businesses",
            Target::Consumers { .. } => "consumers",
        }
    }

    async fn scan(
        &self,
        client: &ApiClient,
        points: &[BoundaryPoint],
        max_results: Option<usize>,
        control: &ScanControl,
    ) -> polyscan_core::Result<ScanResult> {
        match self {
            Target::Businesses { categories } if categories.is_empty() => {
                client.businesses(points, max_results, control).await
            }
            Target::Businesses { categories } => {
                client
                    .businesses_by_category(points, categories, max_results, control)
                    .await
            }
            Target::Consumers { heads_only, attributes } if attributes.is_empty() => {
                client.consumers(points, *heads_only, max_results, control).await
            }
            Target::Consumers { attributes, .. } => {
                client
                    .consumers_by_attributes(points, attributes, max_results, control)
                    .await
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct AreaScan {
    polygon_name: String,
    folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ScanStatus>,
    total_count: u64,
    retrieved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    records: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct RetrievalOutput {
    kind: &'static str,
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    areas: Vec<AreaScan>,
}

#[derive(Tabled)]
struct ScanRow {
    #[tabled(rename = "Polygon")]
    polygon: String,
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Retrieved")]
    retrieved: usize,
    #[tabled(rename = "Matches")]
    matches: u64,
}

pub async fn businesses(args: BusinessesArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let target = Target::Businesses { categories: args.categories };
    run(target, &args.selection, &args.scan, config, output).await
}

pub async fn consumers(args: ConsumersArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let target = Target::Consumers {
        heads_only: !args.all_members,
        attributes: args.attributes.into_iter().collect(),
    };
    run(target, &args.selection, &args.scan, config, output).await
}

async fn run(
    target: Target,
    selection: &SelectionArgs,
    scan: &ScanArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let client = ApiClient::from_config(config).context("Cannot create the API client")?;
    let polygons = load_polygons(selection, output)?;
    let control = scan_control(scan);

    output.info(format!("Retrieving {} for {} polygons", target.noun(), polygons.len()));
    let pb = polygon_bar(polygons.len(), output.is_json());

    let mut areas = Vec::with_capacity(polygons.len());
    for polygon in &polygons {
        pb.set_message(format!("{} / {}", polygon.folder, polygon.name));

        let area = match target.scan(&client, &polygon.points, scan.max_results, &control).await {
            Ok(result) => AreaScan {
                polygon_name: polygon.name.clone(),
                folder: polygon.folder.clone(),
                status: Some(result.status),
                total_count: result.total_count,
                retrieved: result.records.len(),
                error: None,
                records: result.records,
            },
            Err(e) => {
                output.warning(format!("Retrieval failed for '{}': {}", polygon.name, e));
                AreaScan {
                    polygon_name: polygon.name.clone(),
                    folder: polygon.folder.clone(),
                    status: None,
                    total_count: 0,
                    retrieved: 0,
                    error: Some(e.to_string()),
                    records: Vec::new(),
                }
            }
        };
        areas.push(area);
        pb.inc(1);

        if control.cancel.is_cancelled() {
            output.warning("Interrupted; remaining polygons were skipped");
            break;
        }
    }

    let retrieved: usize = areas.iter().map(|a| a.retrieved).sum();
    finish_success(&pb, &format!("Retrieved {} {}", retrieved, target.noun()));

    let mut report = RetrievalOutput {
        kind: target.noun(),
        generated_at: Utc::now(),
        output: None,
        areas,
    };

    if let Some(path) = &selection.output {
        write_json(path, &report)?;
        report.output = Some(path.display().to_string());
        for area in &mut report.areas {
            area.records.clear();
        }
    }

    if output.is_json() {
        return output.result(report);
    }

    let rows: Vec<ScanRow> = report
        .areas
        .iter()
        .map(|area| ScanRow {
            polygon: area.polygon_name.clone(),
            folder: area.folder.clone(),
            status: match (&area.status, &area.error) {
                (Some(status), _) => format!("{:?}", status),
                (None, Some(_)) => "Failed".to_string(),
                (None, None) => "-".to_string(),
            },
            retrieved: area.retrieved,
            matches: area.total_count,
        })
        .collect();
    output.table(rows);

    match &report.output {
        Some(path) => output.success(format!("Wrote {} {} to {}", retrieved, target.noun(), path)),
        None => output.info("Use --output to save the retrieved records"),
    }
    Ok(())
}
