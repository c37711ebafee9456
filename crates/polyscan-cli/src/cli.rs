use clap::{Args, Parser, Subcommand};
use polyscan_core::config::CliConfigOverrides;
use polyscan_core::models::AttributeFilter;
use std::path::PathBuf;

/// Polyscan - Boundary files in, area records and insights out
#[derive(Parser, Debug)]
#[command(name = "polyscan")]
#[command(about = "Split boundary polygons and retrieve the records inside them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML); defaults to ./polyscan.toml when present
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the API token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Override the request limit per rate window
    #[arg(long, global = true, value_name = "N")]
    pub rate_limit: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            base_url: self.base_url.clone(),
            api_token: self.api_token.clone(),
            max_points: match &self.command {
                Commands::Split(args) => args.max_points,
                _ => None,
            },
            rate_limit: self.rate_limit,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract placemarks from a KML or KMZ file into GeoJSON
    Extract(ExtractArgs),

    /// Split polygons that exceed the vertex budget
    Split(SplitArgs),

    /// List the folders of a GeoJSON file
    Folders(FoldersArgs),

    /// Retrieve businesses inside the selected polygons
    Businesses(BusinessesArgs),

    /// Retrieve consumers inside the selected polygons
    Consumers(ConsumersArgs),

    /// Gather demographic and business insights for the selected polygons
    Insights(InsightsArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Boundary file (.kml or .kmz)
    pub file: PathBuf,

    /// GeoJSON output path (defaults to the input path with a .geojson extension)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// GeoJSON produced by `extract`
    pub input: PathBuf,

    /// GeoJSON output path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Maximum exterior ring vertices per polygon
    #[arg(long)]
    pub max_points: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct FoldersArgs {
    /// GeoJSON file
    pub input: PathBuf,
}

/// Polygon selection shared by the retrieval commands
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// GeoJSON file with the polygons to query
    pub input: PathBuf,

    /// Only query polygons in this folder (repeatable; default: all)
    #[arg(long = "folder", value_name = "NAME")]
    pub folders: Vec<String>,

    /// Write full results to this JSON file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Limits shared by the record-retrieval commands
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Maximum records per polygon
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Stop paging after this many seconds and keep what was retrieved
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct BusinessesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub scan: ScanArgs,

    /// SIC or NAICS codes to filter by (comma-separated)
    #[arg(long = "category", value_delimiter = ',', value_name = "CODE")]
    pub categories: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ConsumersArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub scan: ScanArgs,

    /// Include every household member, not only heads of household
    #[arg(long)]
    pub all_members: bool,

    /// Attribute constraint: `name=value`, `name={"min":1}` or `name={"max":9}` (repeatable)
    #[arg(long = "attribute", value_name = "NAME=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, AttributeFilter)>,
}

#[derive(Parser, Debug)]
pub struct InsightsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Parse `name=value`; the value is read as JSON when it parses, else as text
fn parse_attribute(raw: &str) -> Result<(String, AttributeFilter), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in '{}'", raw));
    }

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), AttributeFilter::from_value(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_attribute() {
        let (name, filter) = parse_attribute("family.estimated_income={\"min\":100000}").unwrap();
        assert_eq!(name, "family.estimated_income");
        assert_eq!(filter, AttributeFilter::Min(json!(100000)));

        let (_, filter) = parse_attribute("gender=F").unwrap();
        assert_eq!(filter, AttributeFilter::Exact(json!("F")));

        let (_, filter) = parse_attribute("homeowner=true").unwrap();
        assert_eq!(filter, AttributeFilter::Exact(json!(true)));

        assert!(parse_attribute("no-separator").is_err());
        assert!(parse_attribute("=5").is_err());
    }

    #[test]
    fn test_split_max_points_becomes_override() {
        let cli = Cli::parse_from(["polyscan", "split", "in.geojson", "-o", "out.geojson", "--max-points", "300"]);
        assert_eq!(cli.overrides().max_points, Some(300));

        let cli = Cli::parse_from(["polyscan", "--rate-limit", "50", "config"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.max_points, None);
        assert_eq!(overrides.rate_limit, Some(50));
    }

    #[test]
    fn test_selection_flags() {
        let cli = Cli::parse_from([
            "polyscan", "businesses", "areas.geojson", "--folder", "North", "--folder", "South",
            "--category", "581208,581209", "--max-results", "25",
        ]);
        let Commands::Businesses(args) = cli.command else {
            panic!("expected businesses");
        };
        assert_eq!(args.selection.folders, vec!["North", "South"]);
        assert_eq!(args.categories, vec!["581208", "581209"]);
        assert_eq!(args.scan.max_results, Some(25));
    }
}
