use geo::coord;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParamError;

/// Raw row of the OD trip table (`trip.csv`)
///
/// Coordinates that are empty or not numeric deserialize to `None`; the link
/// is still loaded and only its geometry derivation is skipped later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCsvRecord {
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub total: u64,
    #[serde(rename = "x_Start", default, deserialize_with = "csv::invalid_option")]
    pub x_start: Option<f64>,
    #[serde(rename = "y_Start", default, deserialize_with = "csv::invalid_option")]
    pub y_start: Option<f64>,
    #[serde(rename = "x_End", default, deserialize_with = "csv::invalid_option")]
    pub x_end: Option<f64>,
    #[serde(rename = "y_End", default, deserialize_with = "csv::invalid_option")]
    pub y_end: Option<f64>,
}

/// Trip counts exported by pandas may be written as floats ("12.0")
fn deserialize_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(D::Error::custom(format!("invalid trip count {}", value)))
    }
}

/// Raw row of the NIL centroid table (`nil_milano.csv`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCsvRecord {
    #[serde(rename = "NIL")]
    pub nil: String,
    #[serde(rename = "quartieri_centroidi_X", default, deserialize_with = "csv::invalid_option")]
    pub centroid_x: Option<f64>,
    #[serde(rename = "quartieri_centroidi_Y", default, deserialize_with = "csv::invalid_option")]
    pub centroid_y: Option<f64>,
}

/// Raw row of the per-trip table used by the trajectory map (`milan_trips.csv`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryCsvRecord {
    pub id: String,
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    pub type_vehicle: String,
    pub local_ts_start: String,
    pub local_ts_end: String,
    pub geom_wkt_estimated_route: String,
}

/// Raw row of the per-vehicle OD table used by the chord diagram
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordCsvRecord {
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    #[serde(rename = "Viaggi", deserialize_with = "deserialize_count")]
    pub trips: u64,
    pub type_vehicle: String,
}

/// Which endpoint of a link a zone is grouped on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Links arriving at the zone (grouped on destination)
    #[default]
    Incoming,
    /// Links leaving the zone (grouped on origin)
    Outgoing,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Incoming, Direction::Outgoing];

    /// Zone a link is grouped under for this direction
    pub fn grouping_zone<'a>(&self, link: &'a TripLink) -> &'a str {
        match self {
            Direction::Incoming => &link.destination,
            Direction::Outgoing => &link.origin,
        }
    }

    /// The other endpoint of the link
    pub fn counterpart<'a>(&self, link: &'a TripLink) -> &'a str {
        match self {
            Direction::Incoming => &link.origin,
            Direction::Outgoing => &link.destination,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Incoming => "Incoming",
            Direction::Outgoing => "Outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incoming" | "in" | "end" => Ok(Direction::Incoming),
            "outgoing" | "out" | "start" => Ok(Direction::Outgoing),
            _ => Err(ParamError::UnknownDirection(s.to_string())),
        }
    }
}

/// Shared-mobility vehicle category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "B")]
    Bike,
    #[serde(rename = "C")]
    Car,
    #[serde(rename = "M")]
    Moped,
    #[serde(rename = "S")]
    Scooter,
}

impl VehicleType {
    pub const ALL: [VehicleType; 4] = [
        VehicleType::Bike,
        VehicleType::Car,
        VehicleType::Moped,
        VehicleType::Scooter,
    ];

    /// Single-letter code used in the source tables
    pub fn code(&self) -> &'static str {
        match self {
            VehicleType::Bike => "B",
            VehicleType::Car => "C",
            VehicleType::Moped => "M",
            VehicleType::Scooter => "S",
        }
    }

    /// Legend label, e.g. "Car (C)"
    pub fn label(&self) -> &'static str {
        match self {
            VehicleType::Bike => "Bike (B)",
            VehicleType::Car => "Car (C)",
            VehicleType::Moped => "Moped (M)",
            VehicleType::Scooter => "Scooter (S)",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VehicleType {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b" | "bike" | "bikes" => Ok(VehicleType::Bike),
            "c" | "car" | "cars" => Ok(VehicleType::Car),
            "m" | "moped" | "mopeds" => Ok(VehicleType::Moped),
            "s" | "scooter" | "scooters" => Ok(VehicleType::Scooter),
            _ => Err(ParamError::UnknownVehicle(s.to_string())),
        }
    }
}

/// Point in WGS84 degrees: `x` is longitude, `y` is latitude
pub type Coord = geo::Coord<f64>;

/// Build a [`Coord`] from the (lat, lon) order the source tables use
pub fn lat_lon(lat: f64, lon: f64) -> Coord {
    coord! { x: lon, y: lat }
}

fn coord_from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Coord> {
    match (lat, lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some(lat_lon(lat, lon)),
        _ => None,
    }
}

/// Directed, aggregated trip count between two zones
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripLink {
    pub origin: String,
    pub destination: String,
    pub count: u64,
    pub origin_coord: Option<Coord>,
    pub destination_coord: Option<Coord>,
}

impl TripLink {
    pub fn is_self_loop(&self) -> bool {
        self.origin == self.destination
    }
}

impl From<TripCsvRecord> for TripLink {
    fn from(r: TripCsvRecord) -> Self {
        Self {
            origin_coord: coord_from_parts(r.x_start, r.y_start),
            destination_coord: coord_from_parts(r.x_end, r.y_end),
            origin: r.start,
            destination: r.end,
            count: r.total,
        }
    }
}

/// NIL with its centroid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: String,
    pub centroid: Coord,
}

impl ZoneCsvRecord {
    /// Returns `None` when the centroid is missing or not numeric
    pub fn to_zone(&self) -> Option<Zone> {
        coord_from_parts(self.centroid_x, self.centroid_y).map(|centroid| Zone {
            id: self.nil.clone(),
            centroid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x_start: Option<f64>) -> TripCsvRecord {
        TripCsvRecord {
            start: "DUOMO".into(),
            end: "BRERA".into(),
            total: 12,
            x_start,
            y_start: Some(9.19),
            x_end: Some(45.47),
            y_end: Some(9.18),
        }
    }

    #[test]
    fn test_direction_grouping() {
        let link = TripLink::from(record(Some(45.46)));
        assert_eq!(Direction::Outgoing.grouping_zone(&link), "DUOMO");
        assert_eq!(Direction::Incoming.grouping_zone(&link), "BRERA");
        assert_eq!(Direction::Incoming.counterpart(&link), "DUOMO");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("Outgoing".parse::<Direction>().unwrap(), Direction::Outgoing);
        assert_eq!("incoming".parse::<Direction>().unwrap(), Direction::Incoming);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_vehicle_parse() {
        assert_eq!("C".parse::<VehicleType>().unwrap(), VehicleType::Car);
        assert_eq!("Scooters".parse::<VehicleType>().unwrap(), VehicleType::Scooter);
        assert_eq!(VehicleType::Moped.label(), "Moped (M)");
        assert!("X".parse::<VehicleType>().is_err());
    }

    #[test]
    fn test_missing_coordinate() {
        let link = TripLink::from(record(None));
        assert!(link.origin_coord.is_none());
        assert_eq!(link.destination_coord, Some(lat_lon(45.47, 9.18)));
    }

    #[test]
    fn test_zone_without_centroid() {
        let zone = ZoneCsvRecord {
            nil: "ISOLA".into(),
            centroid_x: Some(45.49),
            centroid_y: None,
        };
        assert!(zone.to_zone().is_none());
    }
}
