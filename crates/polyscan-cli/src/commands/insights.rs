//! Insights command implementation

use super::selection::{load_polygons, write_json};
use crate::cli::InsightsArgs;
use crate::output::OutputWriter;
use crate::progress::{finish_success, polygon_bar};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polyscan_client::{affluence_from_insights, ApiClient};
use polyscan_core::config::LayeredConfig;
use polyscan_core::models::AreaInsights;
use polyscan_core::stats::flatten_area_insights;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

#[derive(Debug, Serialize)]
struct AreaReport {
    polygon_name: String,
    folder: String,
    affluence_score: f64,
    insights: AreaInsights,
}

#[derive(Debug, Serialize)]
struct InsightsOutput {
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    rows: Vec<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    areas: Vec<AreaReport>,
}

#[derive(Tabled)]
struct InsightRow {
    #[tabled(rename = "Polygon")]
    polygon: String,
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Households")]
    households: String,
    #[tabled(rename = "Businesses")]
    businesses: String,
    #[tabled(rename = "Affluence")]
    score: String,
    #[tabled(rename = "Errors")]
    errors: usize,
}

fn count_cell(count: Option<u64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

pub async fn execute(args: InsightsArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let client = ApiClient::from_config(config).context("Cannot create the API client")?;
    let polygons = load_polygons(&args.selection, output)?;

    output.info(format!("Gathering insights for {} polygons", polygons.len()));
    let pb = polygon_bar(polygons.len(), output.is_json());

    let mut areas = Vec::with_capacity(polygons.len());
    for polygon in &polygons {
        pb.set_message(format!("{} / {}", polygon.folder, polygon.name));

        let insights = client.complete_area_insights(&polygon.points).await;
        for error in &insights.errors {
            output.warning(format!("'{}': {}", polygon.name, error));
        }

        areas.push(AreaReport {
            polygon_name: polygon.name.clone(),
            folder: polygon.folder.clone(),
            affluence_score: affluence_from_insights(&insights),
            insights,
        });
        pb.inc(1);
    }

    let incomplete = areas.iter().filter(|a| !a.insights.is_complete()).count();
    finish_success(&pb, &format!("Gathered insights for {} polygons", areas.len()));

    let table: Vec<InsightRow> = areas
        .iter()
        .map(|area| InsightRow {
            polygon: area.polygon_name.clone(),
            folder: area.folder.clone(),
            households: count_cell(area.insights.household_count),
            businesses: count_cell(area.insights.business_count),
            score: format!("{:.2}", area.affluence_score),
            errors: area.insights.errors.len(),
        })
        .collect();

    let rows = areas
        .iter()
        .map(|area| {
            flatten_area_insights(&area.polygon_name, &area.folder, area.affluence_score, &area.insights)
        })
        .collect();

    let mut report = InsightsOutput {
        generated_at: Utc::now(),
        output: None,
        rows,
        areas,
    };

    if let Some(path) = &args.selection.output {
        write_json(path, &report)?;
        report.output = Some(path.display().to_string());
        report.areas.clear();
    }

    if output.is_json() {
        return output.result(report);
    }

    output.table(table);
    if incomplete > 0 {
        output.warning(format!("{} polygons have incomplete insights", incomplete));
    }
    if let Some(path) = &report.output {
        output.success(format!("Wrote insights to {}", path));
    }
    Ok(())
}
