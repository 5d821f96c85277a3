//! Synthetic data generator for the UrbanFlow Milano dashboard
//!
//! Writes the four input tables (OD trips, NIL centroids, trip routes and
//! per-vehicle OD counts) for a dozen central NILs, so every binary can run
//! without the licensed Fluctuo export.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --density <F>          Probability an OD pair has trips (default: 0.6)
//!   --max-count <N>        Upper bound of the per-pair base count (default: 150)
//!   --self-loop-rate <F>   Probability of an intrazonal row per NIL (default: 0.25)
//!   --trajectories <N>     Number of single trips with routes (default: 500)
//!   --seed <N>             Random seed for reproducibility (optional)
//!   --output-dir <PATH>    Output directory (default: data)

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use urbanflow_milano::{
    report::write_csv,
    synthetic::{sample_zones, zone_records, TripGenerator},
};

/// Synthetic trip data generator
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate synthetic Milan shared-mobility trip tables")]
struct Args {
    /// Probability that an ordered NIL pair has trips
    #[arg(long, default_value = "0.6")]
    density: f64,

    /// Upper bound of the per-pair base trip count
    #[arg(long, default_value = "150")]
    max_count: u64,

    /// Probability of an intrazonal (self-loop) row per NIL
    #[arg(long, default_value = "0.25")]
    self_loop_rate: f64,

    /// Number of single trips with estimated routes
    #[arg(long, default_value = "500")]
    trajectories: usize,

    /// Day the single trips happen on
    #[arg(long, default_value = "2023-07-01")]
    date: NaiveDate,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🔧 Synthetic Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output dir:       {}", args.output_dir.display());
    println!("Pair density:     {:.1}%", args.density * 100.0);
    println!("Max base count:   {}", args.max_count);
    println!("Self-loop rate:   {:.1}%", args.self_loop_rate * 100.0);
    println!("Trajectories:     {} on {}", args.trajectories, args.date);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let zones = sample_zones();
    let mut generator = TripGenerator::new(args.seed);

    let trips = generator.trip_table(&zones, args.density, args.max_count, args.self_loop_rate);
    let chord = generator.chord_table(&zones, args.density, args.max_count);
    let routes = generator.trajectories(&zones, args.trajectories, args.date);

    info!(
        "Generated {} OD rows, {} chord rows, {} trajectories for {} NILs",
        trips.len(),
        chord.len(),
        routes.len(),
        zones.len()
    );

    let dir = &args.output_dir;
    write_csv(&dir.join("nil_milano.csv"), &zone_records(&zones))?;
    write_csv(&dir.join("trip.csv"), &trips)?;
    write_csv(&dir.join("milan_trips.csv"), &routes)?;
    write_csv(&dir.join("nuovo_dataframe2.csv"), &chord)?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("NILs:              {:>8}", zones.len());
    println!("OD rows:           {:>8}", trips.len());
    println!("Chord rows:        {:>8}", chord.len());
    println!("Trajectories:      {:>8}", routes.len());

    Ok(())
}
