//! Trip aggregation for the UrbanFlow Milano dashboard.
//!
//! Loads shared-mobility trip tables for Milan's NILs and derives the data
//! behind the dashboard views: the OD flow map ([`od_flow`]), the trajectory
//! map ([`trajectory`]) and the chord diagram ([`chord`]).

pub mod chord;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod od_flow;
pub mod palette;
pub mod report;
pub mod synthetic;
pub mod trajectory;

pub use error::ParamError;
pub use od_flow::{build_od_flow_map, FlowMapParams, OdFlowMap};
