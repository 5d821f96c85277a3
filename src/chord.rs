//! Chord diagram aggregation
//!
//! NIL-to-NIL trip counts per vehicle type are filtered on a minimum count
//! and the selected vehicles, then summed per (origin, destination) pair.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use tracing::{info, warn};

use crate::error::ParamError;
use crate::models::{ChordCsvRecord, VehicleType};

pub const MIN_TRIPS_RANGE: RangeInclusive<u64> = 20..=75;
pub const DEFAULT_MIN_TRIPS: u64 = 30;

const MAX_SKIP_WARNINGS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordParams {
    pub vehicles: Vec<VehicleType>,
    /// Rows below this trip count are dropped before grouping
    pub min_trips: u64,
}

impl Default for ChordParams {
    fn default() -> Self {
        Self {
            vehicles: VehicleType::ALL.to_vec(),
            min_trips: DEFAULT_MIN_TRIPS,
        }
    }
}

impl ChordParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !MIN_TRIPS_RANGE.contains(&self.min_trips) {
            return Err(ParamError::MinTrips(self.min_trips));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordNode {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordLink {
    pub source: usize,
    pub target: usize,
    pub trips: u64,
}

/// Row of the "filtered trips" table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRow {
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    #[serde(rename = "Viaggi")]
    pub trips: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordDiagram {
    pub params: ChordParams,
    pub nodes: Vec<ChordNode>,
    pub links: Vec<ChordLink>,
    pub table: Vec<FlowRow>,
    pub skipped_rows: usize,
}

pub fn build_chord_diagram(
    records: &[ChordCsvRecord],
    params: &ChordParams,
) -> Result<ChordDiagram, ParamError> {
    params.validate()?;

    let selected: BTreeSet<VehicleType> = params.vehicles.iter().copied().collect();
    let mut grouped: BTreeMap<(String, String), u64> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        if record.start == record.end || record.trips < params.min_trips {
            continue;
        }
        let vehicle = match record.type_vehicle.parse::<VehicleType>() {
            Ok(v) => v,
            Err(e) => {
                if skipped < MAX_SKIP_WARNINGS {
                    warn!("Skipping chord row {} -> {}: {}", record.start, record.end, e);
                }
                skipped += 1;
                continue;
            }
        };
        if !selected.contains(&vehicle) {
            continue;
        }
        let total = grouped
            .entry((record.start.clone(), record.end.clone()))
            .or_insert(0);
        *total = total.saturating_add(record.trips);
    }

    let names: BTreeSet<&str> = grouped
        .keys()
        .flat_map(|(start, end)| [start.as_str(), end.as_str()])
        .collect();
    let index: BTreeMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let nodes = names
        .iter()
        .enumerate()
        .map(|(i, name)| ChordNode { index: i, name: name.to_string() })
        .collect();

    let links = grouped
        .iter()
        .map(|((start, end), trips)| ChordLink {
            source: index[start.as_str()],
            target: index[end.as_str()],
            trips: *trips,
        })
        .collect();

    let table: Vec<FlowRow> = grouped
        .iter()
        .map(|((start, end), trips)| FlowRow {
            start: start.clone(),
            end: end.clone(),
            trips: *trips,
        })
        .collect();

    info!(
        "Chord diagram (min {} trips, {} vehicle types): {} nodes, {} links, {} skipped",
        params.min_trips,
        selected.len(),
        index.len(),
        table.len(),
        skipped
    );

    Ok(ChordDiagram {
        params: params.clone(),
        nodes,
        links,
        table,
        skipped_rows: skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(start: &str, end: &str, trips: u64, vehicle: &str) -> ChordCsvRecord {
        ChordCsvRecord {
            start: start.into(),
            end: end.into(),
            trips,
            type_vehicle: vehicle.into(),
        }
    }

    fn sample() -> Vec<ChordCsvRecord> {
        vec![
            row("BRERA", "DUOMO", 40, "B"),
            row("BRERA", "DUOMO", 35, "C"),
            row("BRERA", "DUOMO", 10, "S"),
            row("DUOMO", "DUOMO", 90, "B"),
            row("ISOLA", "BRERA", 50, "M"),
        ]
    }

    #[test]
    fn test_groups_and_sums_pairs() {
        let diagram = build_chord_diagram(&sample(), &ChordParams::default()).unwrap();
        assert_eq!(
            diagram.table,
            vec![
                FlowRow { start: "BRERA".into(), end: "DUOMO".into(), trips: 75 },
                FlowRow { start: "ISOLA".into(), end: "BRERA".into(), trips: 50 },
            ]
        );
        let names: Vec<&str> = diagram.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["BRERA", "DUOMO", "ISOLA"]);
        assert_eq!(diagram.links[0], ChordLink { source: 0, target: 1, trips: 75 });
        assert_eq!(diagram.links[1], ChordLink { source: 2, target: 0, trips: 50 });
    }

    #[test]
    fn test_vehicle_selection() {
        let params = ChordParams { vehicles: vec![VehicleType::Car], min_trips: 20 };
        let diagram = build_chord_diagram(&sample(), &params).unwrap();
        assert_eq!(diagram.table.len(), 1);
        assert_eq!(diagram.table[0].trips, 35);

        let none = ChordParams { vehicles: vec![], min_trips: 20 };
        let diagram = build_chord_diagram(&sample(), &none).unwrap();
        assert!(diagram.nodes.is_empty());
    }

    #[test]
    fn test_min_trips_threshold() {
        let params = ChordParams { min_trips: 45, ..Default::default() };
        let diagram = build_chord_diagram(&sample(), &params).unwrap();
        assert_eq!(diagram.table.len(), 1);
        assert_eq!(diagram.table[0].start, "ISOLA");
    }

    #[test]
    fn test_unknown_vehicle_skipped() {
        let mut rows = sample();
        rows.push(row("ISOLA", "DUOMO", 60, "T"));
        let diagram = build_chord_diagram(&rows, &ChordParams::default()).unwrap();
        assert_eq!(diagram.skipped_rows, 1);
        assert_eq!(diagram.table.len(), 2);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let rows = vec![row("A", "B", u64::MAX, "B"), row("A", "B", u64::MAX, "C")];
        let diagram = build_chord_diagram(&rows, &ChordParams::default()).unwrap();
        assert_eq!(diagram.table[0].trips, u64::MAX);
    }

    #[test]
    fn test_min_trips_range() {
        assert!(ChordParams { min_trips: 19, ..Default::default() }.validate().is_err());
        assert!(ChordParams { min_trips: 75, ..Default::default() }.validate().is_ok());
        assert!(build_chord_diagram(&sample(), &ChordParams { min_trips: 80, ..Default::default() }).is_err());
    }
}
