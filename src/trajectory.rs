//! Trajectory flow map: routes of single trips touching one NIL
//!
//! Trips are filtered on the selected NIL and direction, then on a time
//! window, and their estimated routes (WKT) are exploded into polylines
//! coloured by vehicle type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use geo::{Geometry, LineString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};
use wkt::TryFromWkt;

use crate::error::ParamError;
use crate::models::{Direction, TrajectoryCsvRecord, VehicleType};
use crate::palette::vehicle_color;

/// Index of the NIL preselected in the zone picker
pub const DEFAULT_ZONE_INDEX: usize = 40;

const MAX_SKIP_WARNINGS: usize = 5;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Base map style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapStyle {
    #[default]
    Dark,
    Light,
    Satellite,
    OpenStreetMap,
}

impl MapStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapStyle::Dark => "dark",
            MapStyle::Light => "light",
            MapStyle::Satellite => "satellite",
            MapStyle::OpenStreetMap => "open-street-map",
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapStyle {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(MapStyle::Dark),
            "light" => Ok(MapStyle::Light),
            "satellite" => Ok(MapStyle::Satellite),
            "open-street-map" | "osm" => Ok(MapStyle::OpenStreetMap),
            _ => Err(ParamError::UnknownMapStyle(s.to_string())),
        }
    }
}

/// Inclusive time window: a trip is kept when it starts at or after
/// `start` and ends at or before `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Default for TimeWindow {
    /// 1 July 2023, 00:00 to 23:59
    fn default() -> Self {
        let day = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap_or_default();
        Self {
            start: day.and_time(NaiveTime::MIN),
            end: day.and_hms_opt(23, 59, 0).unwrap_or_default(),
        }
    }
}

impl TimeWindow {
    pub fn contains(&self, trip_start: NaiveDateTime, trip_end: NaiveDateTime) -> bool {
        trip_start >= self.start && trip_end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryParams {
    pub zone: String,
    pub direction: Direction,
    pub window: TimeWindow,
    pub map_style: MapStyle,
}

impl TrajectoryParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.window.start > self.window.end {
            return Err(ParamError::TimeWindow {
                start: self.window.start.to_string(),
                end: self.window.end.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub vehicle: VehicleType,
    pub label: &'static str,
    pub color: &'static str,
}

/// One polyline of a trip route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryLine {
    pub trip_id: String,
    pub vehicle: VehicleType,
    pub color: &'static str,
    pub points: LineString<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryMap {
    pub params: TrajectoryParams,
    pub legend: Vec<LegendEntry>,
    pub lines: Vec<TrajectoryLine>,
    pub trips: usize,
    pub skipped_rows: usize,
}

/// Parse a timestamp as written by the trip export, with or without offset.
/// Offsets are dropped: the column already holds local time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a WKT `LINESTRING` or `MULTILINESTRING` into polylines
/// (x = lon, y = lat).
///
/// Returns `None` for any other geometry kind or malformed text.
pub fn parse_route(route: &str) -> Option<Vec<LineString<f64>>> {
    match Geometry::<f64>::try_from_wkt_str(route.trim()).ok()? {
        Geometry::LineString(line) => Some(vec![line]),
        Geometry::MultiLineString(lines) => Some(lines.0),
        _ => None,
    }
}

/// NILs offered in the zone picker: every destination, in order of first appearance
pub fn selectable_zones(records: &[TrajectoryCsvRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.end.as_str()))
        .map(|r| r.end.clone())
        .collect()
}

/// The zone preselected when none is given
pub fn default_zone(zones: &[String]) -> Option<&str> {
    zones
        .get(DEFAULT_ZONE_INDEX)
        .or_else(|| zones.first())
        .map(String::as_str)
}

fn endpoint<'a>(record: &'a TrajectoryCsvRecord, direction: Direction) -> &'a str {
    match direction {
        Direction::Incoming => &record.end,
        Direction::Outgoing => &record.start,
    }
}

pub fn build_trajectory_map(
    records: &[TrajectoryCsvRecord],
    params: &TrajectoryParams,
) -> Result<TrajectoryMap, ParamError> {
    params.validate()?;

    let mut lines: Vec<TrajectoryLine> = Vec::new();
    let mut trips = 0;
    let mut skipped = 0;

    for record in records.iter().filter(|r| endpoint(r, params.direction) == params.zone) {
        let times = parse_timestamp(&record.local_ts_start).zip(parse_timestamp(&record.local_ts_end));
        let Some((trip_start, trip_end)) = times else {
            if skipped < MAX_SKIP_WARNINGS {
                warn!("Skipping trip {}: unparseable timestamps", record.id);
            }
            skipped += 1;
            continue;
        };
        if !params.window.contains(trip_start, trip_end) {
            continue;
        }

        let vehicle = match record.type_vehicle.parse::<VehicleType>() {
            Ok(v) => v,
            Err(e) => {
                if skipped < MAX_SKIP_WARNINGS {
                    warn!("Skipping trip {}: {}", record.id, e);
                }
                skipped += 1;
                continue;
            }
        };

        let Some(polylines) = parse_route(&record.geom_wkt_estimated_route) else {
            if skipped < MAX_SKIP_WARNINGS {
                warn!("Skipping trip {}: route is not a (multi)linestring", record.id);
            }
            skipped += 1;
            continue;
        };

        trips += 1;
        lines.extend(
            polylines
                .into_iter()
                .filter(|points| !points.0.is_empty())
                .map(|points| TrajectoryLine {
                    trip_id: record.id.clone(),
                    vehicle,
                    color: vehicle_color(vehicle),
                    points,
                }),
        );
    }

    lines.sort_by_key(|l| l.vehicle);

    let legend = lines
        .iter()
        .map(|l| l.vehicle)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|vehicle| LegendEntry {
            vehicle,
            label: vehicle.label(),
            color: vehicle_color(vehicle),
        })
        .collect();

    info!(
        "Trajectory map for {} ({}): {} trips, {} polylines, {} skipped",
        params.zone,
        params.direction,
        trips,
        lines.len(),
        skipped
    );

    Ok(TrajectoryMap {
        params: params.clone(),
        legend,
        lines,
        trips,
        skipped_rows: skipped,
    })
}
