//! Configuration file handling.
//!
//! Settings come from an optional `urbanflow.toml`; every key has a default
//! so a missing file or a partial one is fine. Binaries apply their CLI
//! flags on top and validate the merged parameters.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chord::ChordParams;
use crate::models::Direction;
use crate::od_flow::FlowMapParams;
use crate::trajectory::MapStyle;

pub const DEFAULT_CONFIG_FILE: &str = "urbanflow.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub od_flow: FlowMapParams,

    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    #[serde(default)]
    pub chord: ChordParams,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Aggregated OD trip table.
    #[serde(default = "default_trips")]
    pub trips: PathBuf,

    /// NIL centroid table.
    #[serde(default = "default_zones")]
    pub zones: PathBuf,

    /// Per-trip routes for the trajectory map.
    #[serde(default = "default_trajectories")]
    pub trajectories: PathBuf,

    /// Per-vehicle OD counts for the chord diagram.
    #[serde(default = "default_chord")]
    pub chord: PathBuf,

    /// Where JSON/CSV outputs are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            trips: default_trips(),
            zones: default_zones(),
            trajectories: default_trajectories(),
            chord: default_chord(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_trips() -> PathBuf {
    PathBuf::from("data/trip.csv")
}

fn default_zones() -> PathBuf {
    PathBuf::from("data/nil_milano.csv")
}

fn default_trajectories() -> PathBuf {
    PathBuf::from("data/milan_trips.csv")
}

fn default_chord() -> PathBuf {
    PathBuf::from("data/nuovo_dataframe2.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Trajectory map defaults. The time window is always given on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// NIL to show; falls back to the default picker entry.
    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub direction: Direction,

    #[serde(default)]
    pub map_style: MapStyle,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load an explicit config file, else `urbanflow.toml` if present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Output file under the configured output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.data.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleType;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data.trips, PathBuf::from("data/trip.csv"));
        assert_eq!(config.od_flow.max_connections, 3);
        assert_eq!(config.od_flow.min_opacity, 0.05);
        assert_eq!(config.chord.min_trips, 30);
        assert_eq!(config.chord.vehicles.len(), 4);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [data]
            trips = "/srv/trips.csv"

            [od_flow]
            direction = "outgoing"
            max_connections = 10

            [trajectory]
            map_style = "open-street-map"

            [chord]
            vehicles = ["B", "S"]
            "#,
        )
        .unwrap();

        assert_eq!(config.data.trips, PathBuf::from("/srv/trips.csv"));
        assert_eq!(config.data.zones, PathBuf::from("data/nil_milano.csv"));
        assert_eq!(config.od_flow.direction, Direction::Outgoing);
        assert_eq!(config.od_flow.max_connections, 10);
        assert_eq!(config.od_flow.min_opacity, 0.05);
        assert_eq!(config.trajectory.map_style, MapStyle::OpenStreetMap);
        assert_eq!(config.chord.vehicles, vec![VehicleType::Bike, VehicleType::Scooter]);
        assert_eq!(config.chord.min_trips, 30);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urbanflow.toml");
        writeln!(std::fs::File::create(&path).unwrap(), "[chord]\nmin_trips = 50").unwrap();

        let config = Config::resolve(Some(&path)).unwrap();
        assert_eq!(config.chord.min_trips, 50);
        assert_eq!(config.output_path("flow.json"), PathBuf::from("output/flow.json"));
    }

    #[test]
    fn test_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[od_flow\nmax_connections = ").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
