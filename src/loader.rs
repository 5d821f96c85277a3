use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::models::{ChordCsvRecord, TrajectoryCsvRecord, TripCsvRecord, TripLink, Zone, ZoneCsvRecord};

const MAX_SKIP_WARNINGS: usize = 5;

/// Deserialize every row of a CSV stream, skipping rows that fail to parse
pub fn read_records<T: DeserializeOwned, R: Read>(input: R, label: &str) -> Vec<T> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input);

    let mut records = Vec::new();
    let mut skipped = 0;
    for (i, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                if skipped < MAX_SKIP_WARNINGS {
                    // +2: header line plus 1-based numbering
                    warn!("Skipping {} row {}: {}", label, i + 2, e);
                }
                skipped += 1;
            }
        }
    }

    info!("Parsed {} {} rows ({} skipped)", records.len(), label, skipped);
    records
}

/// Open a CSV file and read it with [`read_records`]
pub fn read_table<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {} table: {}", label, path.display()))?;
    info!("Reading {} from {:?}", label, path);
    Ok(read_records(file, label))
}

/// OD trip table (`trip.csv`)
pub fn load_trips(path: &Path) -> Result<Vec<TripLink>> {
    let records: Vec<TripCsvRecord> = read_table(path, "trip")?;
    Ok(records.into_iter().map(TripLink::from).collect())
}

/// NIL centroid table (`nil_milano.csv`). Zones without a usable centroid are dropped.
pub fn load_zones(path: &Path) -> Result<Vec<Zone>> {
    let records: Vec<ZoneCsvRecord> = read_table(path, "zone")?;
    Ok(zones_from_records(&records))
}

pub fn zones_from_records(records: &[ZoneCsvRecord]) -> Vec<Zone> {
    records
        .iter()
        .filter_map(|r| {
            let zone = r.to_zone();
            if zone.is_none() {
                warn!("Dropping NIL {}: missing centroid", r.nil);
            }
            zone
        })
        .collect()
}

/// Per-trip routes (`milan_trips.csv`)
pub fn load_trajectories(path: &Path) -> Result<Vec<TrajectoryCsvRecord>> {
    read_table(path, "trajectory")
}

/// Per-vehicle OD counts for the chord diagram
pub fn load_chord_rows(path: &Path) -> Result<Vec<ChordCsvRecord>> {
    read_table(path, "chord")
}
