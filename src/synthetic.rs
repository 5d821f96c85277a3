//! Seeded generator for synthetic Milan trip tables
//!
//! The Fluctuo export the dashboard was built on is not redistributable, so
//! demos and tests run on tables generated here. Counts follow a crude
//! gravity model: nearby NILs exchange more trips than distant ones.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use geo::{LineString, MultiLineString};
use rand::prelude::*;
use rand::rngs::StdRng;
use wkt::ToWkt;

use crate::models::{lat_lon, ChordCsvRecord, Coord, TrajectoryCsvRecord, TripCsvRecord, VehicleType, Zone, ZoneCsvRecord};

const KM_PER_DEGREE: f64 = 111.0;
const ROUTE_JITTER: f64 = 0.002;

/// A dozen central NILs with approximate centroids
pub fn sample_zones() -> Vec<Zone> {
    [
        ("DUOMO", 45.4642, 9.1900),
        ("BRERA", 45.4719, 9.1873),
        ("ISOLA", 45.4873, 9.1896),
        ("GARIBALDI REPUBBLICA", 45.4820, 9.1920),
        ("BUENOS AIRES - PORTA VENEZIA", 45.4760, 9.2080),
        ("LORETO", 45.4860, 9.2160),
        ("CITTA' STUDI", 45.4780, 9.2270),
        ("PORTA ROMANA", 45.4510, 9.2040),
        ("TICINESE", 45.4530, 9.1820),
        ("NAVIGLI", 45.4520, 9.1760),
        ("MAGENTA - S. VITTORE", 45.4660, 9.1720),
        ("SARPI", 45.4800, 9.1760),
    ]
    .into_iter()
    .map(|(id, lat, lon)| Zone {
        id: id.to_string(),
        centroid: lat_lon(lat, lon),
    })
    .collect()
}

/// Zone table rows in the `nil_milano.csv` layout
pub fn zone_records(zones: &[Zone]) -> Vec<ZoneCsvRecord> {
    zones
        .iter()
        .map(|z| ZoneCsvRecord {
            nil: z.id.clone(),
            centroid_x: Some(z.centroid.y),
            centroid_y: Some(z.centroid.x),
        })
        .collect()
}

fn distance_km(a: Coord, b: Coord) -> f64 {
    let d = a - b;
    d.x.hypot(d.y) * KM_PER_DEGREE
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub struct TripGenerator {
    rng: StdRng,
}

impl TripGenerator {
    /// Seeded generators are reproducible; `None` draws from entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    fn gravity_count(&mut self, a: Coord, b: Coord, max_count: u64) -> u64 {
        let base = self.rng.gen_range(1..=max_count.max(1)) as f64;
        (base / (1.0 + distance_km(a, b) / 2.0)).round().max(1.0) as u64
    }

    /// OD table in the `trip.csv` layout. Each ordered pair is present with
    /// probability `density`; each zone gets an intrazonal row with
    /// probability `self_loop_rate`.
    pub fn trip_table(
        &mut self,
        zones: &[Zone],
        density: f64,
        max_count: u64,
        self_loop_rate: f64,
    ) -> Vec<TripCsvRecord> {
        let mut rows = Vec::new();
        for origin in zones {
            for dest in zones {
                let is_loop = origin.id == dest.id;
                let p = if is_loop { self_loop_rate } else { density };
                if !self.rng.gen_bool(p.clamp(0.0, 1.0)) {
                    continue;
                }
                let total = if is_loop {
                    self.rng.gen_range(1..=max_count.max(1))
                } else {
                    self.gravity_count(origin.centroid, dest.centroid, max_count)
                };
                rows.push(TripCsvRecord {
                    start: origin.id.clone(),
                    end: dest.id.clone(),
                    total,
                    x_start: Some(origin.centroid.y),
                    y_start: Some(origin.centroid.x),
                    x_end: Some(dest.centroid.y),
                    y_end: Some(dest.centroid.x),
                });
            }
        }
        rows
    }

    /// Per-vehicle OD counts for the chord diagram
    pub fn chord_table(&mut self, zones: &[Zone], density: f64, max_count: u64) -> Vec<ChordCsvRecord> {
        let mut rows = Vec::new();
        for origin in zones {
            for dest in zones.iter().filter(|d| d.id != origin.id) {
                for vehicle in VehicleType::ALL {
                    if !self.rng.gen_bool(density.clamp(0.0, 1.0)) {
                        continue;
                    }
                    rows.push(ChordCsvRecord {
                        start: origin.id.clone(),
                        end: dest.id.clone(),
                        trips: self.gravity_count(origin.centroid, dest.centroid, max_count),
                        type_vehicle: vehicle.code().to_string(),
                    });
                }
            }
        }
        rows
    }

    fn jitter(&mut self, c: Coord) -> Coord {
        Coord {
            x: c.x + self.rng.gen_range(-ROUTE_JITTER..=ROUTE_JITTER),
            y: c.y + self.rng.gen_range(-ROUTE_JITTER..=ROUTE_JITTER),
        }
    }

    fn route_wkt(&mut self, from: Coord, to: Coord) -> String {
        let mid = self.jitter((from + to) / 2.0);
        if self.rng.gen_bool(0.1) {
            // route split in two, as happens when the GPS trace drops out
            MultiLineString::new(vec![
                LineString::new(vec![from, mid]),
                LineString::new(vec![mid, to]),
            ])
            .wkt_string()
        } else {
            LineString::new(vec![from, mid, to]).wkt_string()
        }
    }

    /// Single trips with estimated routes, all starting on `day`
    pub fn trajectories(&mut self, zones: &[Zone], count: usize, day: NaiveDate) -> Vec<TrajectoryCsvRecord> {
        let mut rows = Vec::with_capacity(count);
        if zones.len() < 2 {
            return rows;
        }
        let midnight = day.and_time(chrono::NaiveTime::MIN);
        for _ in 0..count {
            let pair: Vec<&Zone> = zones.choose_multiple(&mut self.rng, 2).collect();
            let (origin, dest) = (pair[0], pair[1]);
            let vehicle = VehicleType::ALL[self.rng.gen_range(0..VehicleType::ALL.len())];

            let start = midnight + Duration::minutes(self.rng.gen_range(0..23 * 60));
            let end = start + Duration::minutes(self.rng.gen_range(5..=45));

            rows.push(TrajectoryCsvRecord {
                id: format!("{:012x}", self.rng.gen::<u64>() & 0xFFFF_FFFF_FFFF),
                start: origin.id.clone(),
                end: dest.id.clone(),
                type_vehicle: vehicle.code().to_string(),
                local_ts_start: format_datetime(&start),
                local_ts_end: format_datetime(&end),
                geom_wkt_estimated_route: self.route_wkt(origin.centroid, dest.centroid),
            });
        }
        rows
    }
}
