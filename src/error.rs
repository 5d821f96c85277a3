//! Validation errors raised at the input boundary.
//!
//! Row-level problems inside the pipelines are never errors: they are
//! logged and the row is skipped. Only user-facing parameters are rejected.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("max_connections {0} outside 0..={max}", max = crate::od_flow::MAX_CONNECTIONS_LIMIT)]
    MaxConnections(usize),

    #[error("min_opacity {0} outside 0.0..=1.0")]
    MinOpacity(f64),

    #[error("min_trips {0} outside {min}..={max}", min = crate::chord::MIN_TRIPS_RANGE.start(), max = crate::chord::MIN_TRIPS_RANGE.end())]
    MinTrips(u64),

    #[error("time window starts at {start} but ends at {end}")]
    TimeWindow { start: String, end: String },

    #[error("unknown direction '{0}' (expected incoming or outgoing)")]
    UnknownDirection(String),

    #[error("unknown vehicle type '{0}' (expected B, C, M or S)")]
    UnknownVehicle(String),

    #[error("unknown map style '{0}' (expected dark, light, satellite or open-street-map)")]
    UnknownMapStyle(String),
}
