//! OD Flow Map
//!
//! Aggregates the NIL-to-NIL trip table into the links, coloured NILs and
//! popup rankings drawn on the flow map, prints a summary and writes the
//! result as JSON (and optionally flat CSV tables).
//!
//! Usage:
//!   cargo run --release --bin od_flow -- [OPTIONS]
//!
//! Options:
//!   --direction <D>          incoming | outgoing (default: incoming)
//!   --max-connections <N>    Links kept per NIL, 0-73 (default: 3)
//!   --min-opacity <F>        Opacity floor, 0.0-1.0 (default: 0.05)
//!   --popup <NIL>            Print the popup ranking of a NIL (repeatable)
//!   --csv                    Also write links/zones/popups as CSV

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use urbanflow_milano::{
    config::Config,
    loader,
    models::Direction,
    od_flow::build_od_flow_map,
    report,
};

#[derive(Parser, Debug)]
#[command(name = "od_flow")]
#[command(about = "Build the origin-destination flow map data")]
struct Args {
    /// Configuration file (default: ./urbanflow.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trip table CSV
    #[arg(long, value_name = "FILE")]
    trips: Option<PathBuf>,

    /// NIL centroid table CSV
    #[arg(long, value_name = "FILE")]
    zones: Option<PathBuf>,

    /// Filter incoming or outgoing links
    #[arg(short, long)]
    direction: Option<Direction>,

    /// Maximum number of links per NIL (0-73)
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Minimum link opacity (0.0-1.0)
    #[arg(long)]
    min_opacity: Option<f64>,

    /// JSON output path (default: <output_dir>/od_flow.json)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write flat CSV tables next to the JSON
    #[arg(long)]
    csv: bool,

    /// Print the popup ranking for these NILs
    #[arg(long, value_name = "NIL")]
    popup: Vec<String>,

    /// Rows shown in the terminal link table
    #[arg(long, default_value = "20")]
    top: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(path) = args.trips {
        config.data.trips = path;
    }
    if let Some(path) = args.zones {
        config.data.zones = path;
    }
    if let Some(direction) = args.direction {
        config.od_flow.direction = direction;
    }
    if let Some(max) = args.max_connections {
        config.od_flow.max_connections = max;
    }
    if let Some(opacity) = args.min_opacity {
        config.od_flow.min_opacity = opacity;
    }
    config.od_flow.validate()?;

    let trips = loader::load_trips(&config.data.trips)?;
    let zones = loader::load_zones(&config.data.zones)?;

    let map = build_od_flow_map(&trips, &zones, &config.od_flow)?;

    report::print_flow_map(&map, args.top);
    for zone in &args.popup {
        match map.popups.get(zone) {
            Some(ranking) => report::print_popup(zone, ranking),
            None => warn!("No trips recorded for NIL {}", zone),
        }
    }

    let output = args.output.unwrap_or_else(|| config.output_path("od_flow.json"));
    report::write_json(&output, &map)?;

    if args.csv {
        let dir = output.parent().map(PathBuf::from).unwrap_or_default();
        report::write_csv(&dir.join("od_flow_links.csv"), &report::link_rows(&map))?;
        report::write_csv(&dir.join("od_flow_zones.csv"), &report::zone_rows(&map))?;
        report::write_csv(&dir.join("od_flow_popups.csv"), &report::popup_rows(&map))?;
    }

    println!();
    Ok(())
}
