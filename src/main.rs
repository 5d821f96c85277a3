use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use urbanflow_milano::{
    config::Config,
    loader,
    models::VehicleType,
    od_flow::filter_self_loops,
};

/// Overview of the datasets behind the dashboard
#[derive(Parser, Debug)]
#[command(name = "urbanflow_milano")]
#[command(about = "Summarise the UrbanFlow Milano input tables")]
struct Args {
    /// Configuration file (default: ./urbanflow.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::resolve(args.config.as_deref())?;

    info!("=== Dataset Overview ===");

    match loader::load_zones(&config.data.zones) {
        Ok(zones) => info!("NILs with centroid: {}", zones.len()),
        Err(e) => warn!("{:#}", e),
    }

    match loader::load_trips(&config.data.trips) {
        Ok(trips) => {
            let links = filter_self_loops(&trips);
            let total = links.iter().fold(0u64, |acc, l| acc.saturating_add(l.count));
            info!(
                "OD links: {} ({} self-loops dropped), {} trips",
                links.len(),
                trips.len() - links.len(),
                total
            );

            // Top 5 busiest links
            let mut busiest: Vec<_> = links.iter().collect();
            busiest.sort_by(|a, b| b.count.cmp(&a.count));
            for l in busiest.iter().take(5) {
                info!("  {} → {}: {}", l.origin, l.destination, l.count);
            }
        }
        Err(e) => warn!("{:#}", e),
    }

    match loader::load_trajectories(&config.data.trajectories) {
        Ok(records) => {
            let mut by_vehicle: BTreeMap<String, usize> = BTreeMap::new();
            for r in &records {
                let label = r
                    .type_vehicle
                    .parse::<VehicleType>()
                    .map(|v| v.label().to_string())
                    .unwrap_or_else(|_| format!("Unknown ({})", r.type_vehicle));
                *by_vehicle.entry(label).or_insert(0) += 1;
            }
            info!("Trajectories: {}", records.len());
            info!("Vehicle Distribution: {:?}", by_vehicle);
        }
        Err(e) => warn!("{:#}", e),
    }

    match loader::load_chord_rows(&config.data.chord) {
        Ok(rows) => {
            let total = rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.trips));
            info!("Chord rows: {}, {} trips", rows.len(), total);
        }
        Err(e) => warn!("{:#}", e),
    }

    Ok(())
}
