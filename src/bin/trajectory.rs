//! Trajectory Flow Map
//!
//! Extracts the routes of trips entering or leaving one NIL within a time
//! window and writes them as coloured polylines.
//!
//! Usage:
//!   cargo run --release --bin trajectory -- --zone BRERA --direction outgoing
//!   cargo run --release --bin trajectory -- --list-zones

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use urbanflow_milano::{
    config::Config,
    loader,
    models::Direction,
    report,
    trajectory::{build_trajectory_map, default_zone, selectable_zones, MapStyle, TimeWindow, TrajectoryParams},
};

fn parse_clock(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM ({})", e))
}

#[derive(Parser, Debug)]
#[command(name = "trajectory")]
#[command(about = "Extract trip trajectories touching one NIL")]
struct Args {
    /// Configuration file (default: ./urbanflow.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trip routes CSV
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// NIL whose trips are shown
    #[arg(short, long)]
    zone: Option<String>,

    /// Incoming (trips ending in the NIL) or outgoing
    #[arg(short, long)]
    direction: Option<Direction>,

    /// First day of the window
    #[arg(long, default_value = "2023-07-01")]
    from_date: NaiveDate,

    /// Last day of the window (default: same as --from-date)
    #[arg(long)]
    to_date: Option<NaiveDate>,

    /// Window start time on the first day
    #[arg(long, default_value = "00:00", value_parser = parse_clock)]
    start_time: NaiveTime,

    /// Window end time on the last day
    #[arg(long, default_value = "23:59", value_parser = parse_clock)]
    end_time: NaiveTime,

    /// dark | light | satellite | open-street-map
    #[arg(long)]
    map_style: Option<MapStyle>,

    /// Print the selectable NILs and exit
    #[arg(long)]
    list_zones: bool,

    /// JSON output path (default: <output_dir>/trajectory.json)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

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
        config.data.trajectories = path;
    }

    let records = loader::load_trajectories(&config.data.trajectories)?;
    let zones = selectable_zones(&records);

    if args.list_zones {
        for (i, zone) in zones.iter().enumerate() {
            println!("{:>3}  {}", i, zone);
        }
        return Ok(());
    }

    let zone = match args.zone.or_else(|| config.trajectory.zone.clone()) {
        Some(zone) => zone,
        None => default_zone(&zones)
            .map(String::from)
            .context("Trip table has no destination NILs to pick from")?,
    };
    if !zones.contains(&zone) {
        bail!("Unknown NIL '{}' (use --list-zones)", zone);
    }

    let to_date = args.to_date.unwrap_or(args.from_date);
    let params = TrajectoryParams {
        zone,
        direction: args.direction.unwrap_or(config.trajectory.direction),
        window: TimeWindow {
            start: args.from_date.and_time(args.start_time),
            end: to_date.and_time(args.end_time),
        },
        map_style: args.map_style.unwrap_or(config.trajectory.map_style),
    };

    let map = build_trajectory_map(&records, &params)?;
    report::print_trajectory(&map);

    let output = args.output.unwrap_or_else(|| config.output_path("trajectory.json"));
    report::write_json(&output, &map)?;

    println!();
    Ok(())
}
