//! Chord Diagram
//!
//! Sums per-vehicle NIL-to-NIL trip counts above a threshold and writes the
//! chord nodes/links plus the filtered trips table.
//!
//! Usage:
//!   cargo run --release --bin chord -- --vehicles B,S --min-trips 40

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use urbanflow_milano::{
    chord::build_chord_diagram,
    config::Config,
    loader,
    models::VehicleType,
    report,
};

#[derive(Parser, Debug)]
#[command(name = "chord")]
#[command(about = "Build the chord diagram data")]
struct Args {
    /// Configuration file (default: ./urbanflow.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-vehicle OD table CSV
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Vehicle types to include, comma separated (B, C, M, S or names)
    #[arg(long, value_delimiter = ',')]
    vehicles: Option<Vec<VehicleType>>,

    /// Minimum number of trips between two NILs (20-75)
    #[arg(long)]
    min_trips: Option<u64>,

    /// JSON output path (default: <output_dir>/chord.json)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the filtered trips table as CSV
    #[arg(long)]
    csv: bool,

    /// Rows shown in the terminal table
    #[arg(long, default_value = "25")]
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
    if let Some(path) = args.data {
        config.data.chord = path;
    }
    if let Some(vehicles) = args.vehicles {
        config.chord.vehicles = vehicles;
    }
    if let Some(min) = args.min_trips {
        config.chord.min_trips = min;
    }
    config.chord.validate()?;

    let rows = loader::load_chord_rows(&config.data.chord)?;
    let diagram = build_chord_diagram(&rows, &config.chord)?;

    report::print_chord(&diagram, args.top);

    let output = args.output.unwrap_or_else(|| config.output_path("chord.json"));
    report::write_json(&output, &diagram)?;
    if args.csv {
        report::write_csv(&output.with_extension("csv"), &diagram.table)?;
    }

    println!();
    Ok(())
}
