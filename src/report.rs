//! Output for the renderer and for humans
//!
//! JSON carries the full structures; CSV carries flat tables (one per
//! entity) for tools that only read tabular data; the `print_*` functions
//! draw terminal dashboards.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::chord::ChordDiagram;
use crate::models::Direction;
use crate::od_flow::{OdFlowMap, PopupRanking, POPUP_DEPTH};
use crate::trajectory::TrajectoryMap;

/// Flat row of the rendered link table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRow {
    #[serde(rename = "Start")]
    pub origin: String,
    #[serde(rename = "End")]
    pub destination: String,
    pub total: u64,
    pub opacity: f64,
    pub color: String,
}

/// Flat row of the rendered NIL table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRow {
    #[serde(rename = "NIL")]
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub volume: u64,
    pub color: String,
}

/// Flat row of the popup ranking table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupRow {
    #[serde(rename = "NIL")]
    pub zone: String,
    pub direction: Direction,
    pub rank: usize,
    pub other: String,
    pub total: u64,
}

pub fn link_rows(map: &OdFlowMap) -> Vec<LinkRow> {
    map.links
        .iter()
        .map(|l| LinkRow {
            origin: l.origin.clone(),
            destination: l.destination.clone(),
            total: l.count,
            opacity: l.opacity,
            color: l.color.unwrap_or_default().to_string(),
        })
        .collect()
}

pub fn zone_rows(map: &OdFlowMap) -> Vec<ZoneRow> {
    map.zones
        .iter()
        .map(|z| ZoneRow {
            id: z.id.clone(),
            lat: z.centroid.y,
            lon: z.centroid.x,
            volume: z.volume,
            color: z.color.to_string(),
        })
        .collect()
}

pub fn popup_rows(map: &OdFlowMap) -> Vec<PopupRow> {
    let mut rows = Vec::new();
    for (zone, ranking) in &map.popups {
        for direction in Direction::ALL {
            for (i, entry) in ranking.entries(direction).iter().enumerate() {
                rows.push(PopupRow {
                    zone: zone.clone(),
                    direction,
                    rank: i + 1,
                    other: entry.zone.clone(),
                    total: entry.count,
                });
            }
        }
    }
    rows
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))
}

/// Pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(create_file(path)?);
    serde_json::to_writer_pretty(writer, value)
        .with_context(|| format!("Failed to write JSON: {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// CSV with a header row
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(create_file(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(70));
}

fn truncate(name: &str, max_len: usize) -> String {
    if name.chars().count() > max_len {
        let head: String = name.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

pub fn print_flow_map(map: &OdFlowMap, limit: usize) {
    print_section_header(&format!(
        "OD FLOW MAP - {} links (max {} per NIL, min opacity {:.2})",
        map.params.direction, map.params.max_connections, map.params.min_opacity
    ));

    println!("  Links drawn:      {:>8}", map.links.len());
    println!("  NILs coloured:    {:>8}", map.zones.len());
    println!("  Total volume:     {:>8}", map.total_volume);
    if map.skipped_links > 0 {
        println!("  Links skipped:    {:>8}", map.skipped_links);
    }

    print_subsection(&format!("TOP {} LINKS BY VOLUME", limit));
    println!("  {:28} {:28} {:>8} {:>9} {:>8}", "Origin", "Destination", "Trips", "Opacity", "Color");
    println!("  {}", "-".repeat(85));
    let mut links: Vec<_> = map.links.iter().collect();
    links.sort_by(|a, b| b.count.cmp(&a.count));
    for l in links.into_iter().take(limit) {
        println!(
            "  {:28} {:28} {:>8} {:>9.2} {:>8}",
            truncate(&l.origin, 28),
            truncate(&l.destination, 28),
            l.count,
            l.opacity,
            l.color.unwrap_or("-")
        );
    }

    print_subsection("NILs (ascending volume)");
    println!("  {:32} {:>10} {:>10} {:>8}", "NIL", "Lat", "Lon", "Volume");
    println!("  {}", "-".repeat(64));
    for z in &map.zones {
        println!(
            "  {:32} {:>10.5} {:>10.5} {:>8}",
            truncate(&z.id, 32),
            z.centroid.y,
            z.centroid.x,
            z.volume
        );
    }
}

pub fn print_popup(zone: &str, ranking: &PopupRanking) {
    print_subsection(zone);
    for direction in Direction::ALL {
        let heading = match direction {
            Direction::Incoming => "Origins",
            Direction::Outgoing => "Destinations",
        };
        println!("  {:8} {:32} {:>8}", "Ranking", heading, "No. Trips");
        for (rank, (other, count)) in ranking.slot_labels(direction).iter().enumerate().take(POPUP_DEPTH) {
            println!("  #{:<7} {:32} {:>8}", rank + 1, truncate(other, 32), count);
        }
        println!();
    }
}

pub fn print_chord(diagram: &ChordDiagram, limit: usize) {
    let vehicles: Vec<&str> = diagram.params.vehicles.iter().map(|v| v.label()).collect();
    print_section_header(&format!(
        "CHORD DIAGRAM - min {} trips, vehicles: {}",
        diagram.params.min_trips,
        vehicles.join(", ")
    ));
    println!("  NILs:   {:>6}", diagram.nodes.len());
    println!("  Links:  {:>6}", diagram.links.len());

    print_subsection("FILTERED TRIPS");
    println!("  {:32} {:32} {:>8}", "Start", "End", "Viaggi");
    println!("  {}", "-".repeat(74));
    for row in diagram.table.iter().take(limit) {
        println!("  {:32} {:32} {:>8}", truncate(&row.start, 32), truncate(&row.end, 32), row.trips);
    }
    if diagram.table.len() > limit {
        println!("  ... {} more", diagram.table.len() - limit);
    }
}

pub fn print_trajectory(map: &TrajectoryMap) {
    print_section_header(&format!(
        "TRAJECTORY FLOW MAP - {} trips {} {}",
        map.params.direction, if map.params.direction == Direction::Incoming { "into" } else { "out of" }, map.params.zone
    ));
    println!("  Window:     {} → {}", map.params.window.start, map.params.window.end);
    println!("  Map style:  {}", map.params.map_style);
    println!("  Trips:      {}", map.trips);
    println!("  Polylines:  {}", map.lines.len());
    if map.skipped_rows > 0 {
        println!("  Skipped:    {}", map.skipped_rows);
    }

    print_subsection("LEGEND");
    for entry in &map.legend {
        let count = map.lines.iter().filter(|l| l.vehicle == entry.vehicle).count();
        println!("  {:14} {:8} {:>6} polylines", entry.label, entry.color, count);
    }
}
