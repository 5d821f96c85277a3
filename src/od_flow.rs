//! Origin-destination flow map aggregation
//!
//! Turns the flat trip table into the three structures the flow map needs:
//! the capped per-zone link list that is drawn, the coloured NIL points,
//! and the uncapped top-3 rankings shown in each NIL popup.
//!
//! Every function here is pure: inputs are borrowed, outputs are returned,
//! nothing is cached between calls.

use geo::coord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::error::ParamError;
use crate::models::{Coord, Direction, TripLink, Zone};
use crate::palette::zone_color;

pub const DEFAULT_MAX_CONNECTIONS: usize = 3;
pub const MAX_CONNECTIONS_LIMIT: usize = 73;
pub const DEFAULT_MIN_OPACITY: f64 = 0.05;

/// Popup rankings always show this many links per direction
pub const POPUP_DEPTH: usize = 3;

/// Placeholder shown for an empty popup slot
pub const EMPTY_SLOT: &str = "//";

pub const MAP_CENTER: Coord = Coord { x: 9.189686, y: 45.467250 };
pub const MAP_ZOOM: u8 = 14;

// Arrow head shape, in degrees
const ARROW_LENGTH: f64 = 0.0014;
const ARROW_HALF_WIDTH: f64 = 0.000042;
const ARROW_SPREAD: f64 = 10.0;

const MAX_SKIP_WARNINGS: usize = 5;

/// User-facing controls of the flow map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMapParams {
    pub direction: Direction,
    pub max_connections: usize,
    pub min_opacity: f64,
}

impl Default for FlowMapParams {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_opacity: DEFAULT_MIN_OPACITY,
        }
    }
}

impl FlowMapParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(ParamError::MaxConnections(self.max_connections));
        }
        if !(0.0..=1.0).contains(&self.min_opacity) {
            return Err(ParamError::MinOpacity(self.min_opacity));
        }
        Ok(())
    }
}

/// One row of a popup ranking table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    /// The other endpoint of the link
    pub zone: String,
    pub count: u64,
}

/// Top links of a single NIL in both directions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopupRanking {
    pub incoming: Vec<RankEntry>,
    pub outgoing: Vec<RankEntry>,
}

impl PopupRanking {
    pub fn entries(&self, direction: Direction) -> &[RankEntry] {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    fn entries_mut(&mut self, direction: Direction) -> &mut Vec<RankEntry> {
        match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        }
    }

    /// Rank `rank` (0-based) in the given direction, if present
    pub fn slot(&self, direction: Direction, rank: usize) -> Option<&RankEntry> {
        self.entries(direction).get(rank)
    }

    /// (zone, count) text for each of the popup's rank slots, with
    /// [`EMPTY_SLOT`] standing in for missing ranks
    pub fn slot_labels(&self, direction: Direction) -> [(String, String); POPUP_DEPTH] {
        std::array::from_fn(|rank| match self.slot(direction, rank) {
            Some(entry) => (entry.zone.clone(), entry.count.to_string()),
            None => (EMPTY_SLOT.to_string(), EMPTY_SLOT.to_string()),
        })
    }
}

/// NIL point drawn on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedZone {
    pub id: String,
    pub centroid: Coord,
    pub volume: u64,
    pub color: &'static str,
}

/// Link drawn on the map: a line plus an arrow head at the destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedLink {
    pub origin: String,
    pub destination: String,
    pub count: u64,
    pub opacity: f64,
    /// Colour of the origin NIL; `None` when the origin has no volume
    /// in the selected direction and so was never coloured
    pub color: Option<&'static str>,
    pub path: [Coord; 2],
    pub arrow_head: [Coord; 4],
}

/// Everything the flow map renderer consumes
#[derive(Debug, Clone, Serialize)]
pub struct OdFlowMap {
    pub params: FlowMapParams,
    pub center: Coord,
    pub zoom: u8,
    pub total_volume: u64,
    pub links: Vec<RenderedLink>,
    pub zones: Vec<RenderedZone>,
    pub popups: BTreeMap<String, PopupRanking>,
    /// Display-set links not drawn: NIL missing from the zone table, or no usable geometry
    pub skipped_links: usize,
}

/// Drop links whose origin and destination are the same NIL
pub fn filter_self_loops(links: &[TripLink]) -> Vec<TripLink> {
    let kept: Vec<TripLink> = links.iter().filter(|l| !l.is_self_loop()).cloned().collect();
    debug!("Dropped {} self-loop links", links.len() - kept.len());
    kept
}

/// Sort by (grouping zone asc, count desc) and keep the first `limit`
/// links of each zone. The sort is stable, so equal counts keep input order.
pub fn top_per_zone(links: &[TripLink], direction: Direction, limit: usize) -> Vec<TripLink> {
    let mut sorted: Vec<&TripLink> = links.iter().collect();
    sorted.sort_by(|a, b| {
        direction
            .grouping_zone(a)
            .cmp(direction.grouping_zone(b))
            .then_with(|| b.count.cmp(&a.count))
    });

    let mut kept = Vec::new();
    let mut current: Option<&str> = None;
    let mut taken = 0;
    for link in sorted {
        let zone = direction.grouping_zone(link);
        if current != Some(zone) {
            current = Some(zone);
            taken = 0;
        }
        if taken < limit {
            kept.push(link.clone());
            taken += 1;
        }
    }
    kept
}

/// Top-3 incoming and outgoing links for every NIL, over the whole table
pub fn popup_rankings(links: &[TripLink]) -> BTreeMap<String, PopupRanking> {
    let mut rankings: BTreeMap<String, PopupRanking> = BTreeMap::new();
    for direction in Direction::ALL {
        for link in top_per_zone(links, direction, POPUP_DEPTH) {
            rankings
                .entry(direction.grouping_zone(&link).to_string())
                .or_default()
                .entries_mut(direction)
                .push(RankEntry {
                    zone: direction.counterpart(&link).to_string(),
                    count: link.count,
                });
        }
    }
    rankings
}

/// The links actually drawn: top `max_connections` per zone in the selected direction
pub fn display_set(links: &[TripLink], params: &FlowMapParams) -> Vec<TripLink> {
    top_per_zone(links, params.direction, params.max_connections)
}

/// Sum of display-set counts per grouping zone
pub fn zone_volumes(display: &[TripLink], direction: Direction) -> BTreeMap<String, u64> {
    let mut volumes: BTreeMap<String, u64> = BTreeMap::new();
    for link in display {
        let volume = volumes.entry(direction.grouping_zone(link).to_string()).or_insert(0);
        *volume = volume.saturating_add(link.count);
    }
    volumes
}

/// Keep zones with a positive volume, order them by ascending volume
/// (ties keep zone-table order) and colour them by position
pub fn assign_zone_colors(zones: &[Zone], volumes: &BTreeMap<String, u64>) -> Vec<RenderedZone> {
    let mut surviving: Vec<(&Zone, u64)> = zones
        .iter()
        .map(|z| (z, volumes.get(&z.id).copied().unwrap_or(0)))
        .filter(|(_, volume)| *volume > 0)
        .collect();
    surviving.sort_by_key(|(_, volume)| *volume);

    surviving
        .into_iter()
        .enumerate()
        .map(|(position, (zone, volume))| RenderedZone {
            id: zone.id.clone(),
            centroid: zone.centroid,
            volume,
            color: zone_color(position),
        })
        .collect()
}

/// `max(min_opacity, 100 * count / total_volume)`.
///
/// The count is scaled to a percentage while the total is not; renderers
/// clamp anything above 1.0, so most links end up fully opaque.
pub fn link_opacity(count: u64, total_volume: u64, min_opacity: f64) -> f64 {
    if total_volume == 0 {
        return min_opacity;
    }
    (100.0 * count as f64 / total_volume as f64).max(min_opacity)
}

/// Triangle at `dest` pointing away from `origin`, closed as [S, T, dest, S].
/// Returns `None` when the endpoints coincide.
///
/// The side vector is the unit direction turned a quarter clockwise in the
/// (lon, lat) plane, so S lies left of the link when it points north.
pub fn arrow_head(origin: Coord, dest: Coord) -> Option<[Coord; 4]> {
    let v = dest - origin;
    let norm = v.x.hypot(v.y);
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    let w = v / norm;
    let u = coord! { x: w.y, y: -w.x } * ARROW_SPREAD;

    let p = dest - w * ARROW_LENGTH;
    let s = p - u * ARROW_HALF_WIDTH;
    let t = p + u * ARROW_HALF_WIDTH;

    Some([s, t, dest, s])
}

/// Run the whole flow map pipeline
pub fn build_od_flow_map(
    trips: &[TripLink],
    zones: &[Zone],
    params: &FlowMapParams,
) -> Result<OdFlowMap, ParamError> {
    params.validate()?;

    let links = filter_self_loops(trips);
    let popups = popup_rankings(&links);
    let display = display_set(&links, params);
    let volumes = zone_volumes(&display, params.direction);
    let rendered_zones = assign_zone_colors(zones, &volumes);
    let total_volume = rendered_zones
        .iter()
        .fold(0u64, |total, z| total.saturating_add(z.volume));

    let colors: HashMap<&str, &'static str> = rendered_zones
        .iter()
        .map(|z| (z.id.as_str(), z.color))
        .collect();

    let mut rendered_links = Vec::with_capacity(display.len());
    let mut skipped = 0;
    for link in &display {
        // a link whose NIL is not drawn has no share of the total volume
        if !colors.contains_key(params.direction.grouping_zone(link)) {
            if skipped < MAX_SKIP_WARNINGS {
                warn!(
                    "Skipping link {} -> {}: NIL {} missing from the zone table",
                    link.origin,
                    link.destination,
                    params.direction.grouping_zone(link)
                );
            }
            skipped += 1;
            continue;
        }
        let geometry = match (link.origin_coord, link.destination_coord) {
            (Some(a), Some(b)) => arrow_head(a, b).map(|head| ([a, b], head)),
            _ => None,
        };
        let Some((path, arrow)) = geometry else {
            if skipped < MAX_SKIP_WARNINGS {
                warn!(
                    "Skipping link {} -> {}: cannot derive geometry from coordinates",
                    link.origin, link.destination
                );
            }
            skipped += 1;
            continue;
        };

        rendered_links.push(RenderedLink {
            origin: link.origin.clone(),
            destination: link.destination.clone(),
            count: link.count,
            opacity: link_opacity(link.count, total_volume, params.min_opacity),
            color: colors.get(link.origin.as_str()).copied(),
            path,
            arrow_head: arrow,
        });
    }

    info!(
        "Flow map ({}, max {}): {} links, {} zones, total volume {}, {} skipped",
        params.direction,
        params.max_connections,
        rendered_links.len(),
        rendered_zones.len(),
        total_volume,
        skipped
    );

    Ok(OdFlowMap {
        params: *params,
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        total_volume,
        links: rendered_links,
        zones: rendered_zones,
        popups,
        skipped_links: skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lat_lon;

    fn link(origin: &str, destination: &str, count: u64) -> TripLink {
        TripLink {
            origin: origin.into(),
            destination: destination.into(),
            count,
            origin_coord: Some(centroid(origin)),
            destination_coord: Some(centroid(destination)),
        }
    }

    fn centroid(id: &str) -> Coord {
        let offset = id.bytes().map(|b| b as f64).sum::<f64>() / 1000.0;
        lat_lon(45.4 + offset, 9.1 + offset / 2.0)
    }

    fn zone(id: &str) -> Zone {
        Zone { id: id.into(), centroid: centroid(id) }
    }

    fn sample() -> Vec<TripLink> {
        vec![link("A", "B", 10), link("A", "C", 5), link("B", "A", 3)]
    }

    fn params(direction: Direction, max_connections: usize) -> FlowMapParams {
        FlowMapParams { direction, max_connections, min_opacity: DEFAULT_MIN_OPACITY }
    }

    fn pairs(links: &[TripLink]) -> Vec<(&str, &str, u64)> {
        links
            .iter()
            .map(|l| (l.origin.as_str(), l.destination.as_str(), l.count))
            .collect()
    }

    #[test]
    fn test_display_set_top_one_outgoing() {
        let display = display_set(&sample(), &params(Direction::Outgoing, 1));
        assert_eq!(pairs(&display), vec![("A", "B", 10), ("B", "A", 3)]);

        let volumes = zone_volumes(&display, Direction::Outgoing);
        assert_eq!(volumes.get("A"), Some(&10));
        assert_eq!(volumes.get("B"), Some(&3));
        assert_eq!(volumes.get("C"), None);
    }

    #[test]
    fn test_zero_volume_zone_dropped() {
        let zones = vec![zone("A"), zone("B"), zone("C")];
        let map = build_od_flow_map(&sample(), &zones, &params(Direction::Outgoing, 1)).unwrap();

        let ids: Vec<&str> = map.zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(map.total_volume, 13);
        assert!(map.links.iter().all(|l| l.origin != "C"));
    }

    #[test]
    fn test_popup_ranking_ignores_display_cap() {
        let links = filter_self_loops(&sample());
        let popups = popup_rankings(&links);
        let a = &popups["A"];
        assert_eq!(
            a.outgoing,
            vec![
                RankEntry { zone: "B".into(), count: 10 },
                RankEntry { zone: "C".into(), count: 5 },
            ]
        );
        assert_eq!(a.incoming, vec![RankEntry { zone: "B".into(), count: 3 }]);

        let capped = build_od_flow_map(&sample(), &[zone("A")], &params(Direction::Outgoing, 1)).unwrap();
        let uncapped = build_od_flow_map(&sample(), &[zone("A")], &params(Direction::Outgoing, 73)).unwrap();
        assert_eq!(capped.popups, uncapped.popups);
        assert_ne!(capped.links.len(), uncapped.links.len());
    }

    #[test]
    fn test_popup_keeps_three() {
        let links = vec![
            link("A", "B", 1),
            link("A", "C", 4),
            link("A", "D", 2),
            link("A", "E", 3),
        ];
        let popups = popup_rankings(&links);
        let counts: Vec<u64> = popups["A"].outgoing.iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![4, 3, 2]);
        assert_eq!(popups["B"].incoming.len(), 1);
        assert!(popups["B"].outgoing.is_empty());
    }

    #[test]
    fn test_slot_labels_fill_missing_ranks() {
        let popups = popup_rankings(&sample());
        let labels = popups["A"].slot_labels(Direction::Outgoing);
        assert_eq!(labels[0], ("B".to_string(), "10".to_string()));
        assert_eq!(labels[2], (EMPTY_SLOT.to_string(), EMPTY_SLOT.to_string()));
    }

    #[test]
    fn test_self_loops_removed() {
        let mut links = sample();
        links.push(link("C", "C", 99));
        let map = build_od_flow_map(&links, &[zone("A"), zone("B"), zone("C")], &params(Direction::Incoming, 73)).unwrap();
        assert!(map.links.iter().all(|l| l.origin != l.destination));
        assert!(map.popups["C"].incoming.iter().all(|e| e.zone != "C"));
    }

    #[test]
    fn test_zero_connections_is_empty() {
        let map = build_od_flow_map(&sample(), &[zone("A"), zone("B")], &params(Direction::Outgoing, 0)).unwrap();
        assert!(map.links.is_empty());
        assert!(map.zones.is_empty());
        assert_eq!(map.total_volume, 0);
        assert!(!map.popups.is_empty());
    }

    #[test]
    fn test_per_zone_cap() {
        let links = vec![
            link("A", "B", 9),
            link("C", "B", 8),
            link("D", "B", 7),
            link("A", "C", 6),
            link("B", "C", 5),
        ];
        let display = display_set(&links, &params(Direction::Incoming, 2));
        assert_eq!(
            pairs(&display),
            vec![("A", "B", 9), ("C", "B", 8), ("A", "C", 6), ("B", "C", 5)]
        );
    }

    #[test]
    fn test_colors_ascending_and_stable() {
        let zones = vec![zone("X"), zone("Y"), zone("Z")];
        let volumes: BTreeMap<String, u64> =
            [("X".to_string(), 7), ("Y".to_string(), 2), ("Z".to_string(), 7)].into();
        let rendered = assign_zone_colors(&zones, &volumes);
        let ids: Vec<&str> = rendered.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["Y", "X", "Z"]);
        assert_eq!(rendered[0].color, "#580000");
        assert_eq!(rendered[1].color, "#5d0500");
    }

    #[test]
    fn test_opacity_bounds() {
        assert_eq!(link_opacity(10, 13, 0.05), 100.0 * 10.0 / 13.0);
        assert_eq!(link_opacity(0, 13, 0.3), 0.3);
        assert_eq!(link_opacity(5, 0, 0.2), 0.2);

        let map = build_od_flow_map(&sample(), &[zone("A"), zone("B"), zone("C")], &params(Direction::Outgoing, 3)).unwrap();
        for l in &map.links {
            assert!(l.opacity >= map.params.min_opacity);
            assert!(l.opacity <= 100.0);
        }
    }

    #[test]
    fn test_link_color_follows_origin() {
        let map = build_od_flow_map(&sample(), &[zone("A"), zone("B")], &params(Direction::Outgoing, 1)).unwrap();
        let a_color = map.zones.iter().find(|z| z.id == "A").map(|z| z.color);
        let ab = map.links.iter().find(|l| l.origin == "A").unwrap();
        assert_eq!(ab.color, a_color);
    }

    #[test]
    fn test_missing_coordinates_skipped() {
        let mut links = sample();
        links[0].destination_coord = None;
        let map = build_od_flow_map(&links, &[zone("A"), zone("B")], &params(Direction::Outgoing, 1)).unwrap();
        assert_eq!(map.skipped_links, 1);
        assert_eq!(map.links.len(), 1);
        // volume still counts the skipped link
        assert_eq!(map.total_volume, 13);
    }

    #[test]
    fn test_arrow_head_geometry() {
        let head = arrow_head(lat_lon(0.0, 0.0), lat_lon(1.0, 0.0)).unwrap();
        assert!((head[0].y - 0.9986).abs() < 1e-12);
        assert!((head[0].x + 0.00042).abs() < 1e-12);
        assert!((head[1].x - 0.00042).abs() < 1e-12);
        assert_eq!(head[2], lat_lon(1.0, 0.0));
        assert_eq!(head[3], head[0]);

        assert!(arrow_head(lat_lon(1.0, 1.0), lat_lon(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_link_to_unknown_zone_not_drawn() {
        let links = vec![link("A", "B", 10), link("B", "A", 1)];
        let map = build_od_flow_map(&links, &[zone("A")], &params(Direction::Incoming, 3)).unwrap();

        assert_eq!(map.total_volume, 1);
        assert_eq!(map.links.len(), 1);
        assert_eq!(map.links[0].destination, "A");
        assert_eq!(map.skipped_links, 1);
        assert!(map.links.iter().all(|l| l.opacity <= 100.0));
        // rankings still see the whole table
        assert_eq!(map.popups["B"].incoming[0].count, 10);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let links = vec![link("A", "B", u64::MAX), link("C", "B", u64::MAX)];
        let volumes = zone_volumes(&links, Direction::Incoming);
        assert_eq!(volumes["B"], u64::MAX);

        let map = build_od_flow_map(&links, &[zone("A"), zone("B"), zone("C")], &params(Direction::Incoming, 3)).unwrap();
        assert_eq!(map.total_volume, u64::MAX);
        assert!(map.links.iter().all(|l| l.opacity <= 100.0));
    }

    #[test]
    fn test_params_validation() {
        assert!(FlowMapParams::default().validate().is_ok());
        let too_many = FlowMapParams { max_connections: 74, ..Default::default() };
        assert_eq!(too_many.validate(), Err(ParamError::MaxConnections(74)));
        let opaque = FlowMapParams { min_opacity: 1.5, ..Default::default() };
        assert_eq!(opaque.validate(), Err(ParamError::MinOpacity(1.5)));
        assert!(build_od_flow_map(&sample(), &[], &too_many).is_err());
    }

    #[test]
    fn test_deterministic_output() {
        let zones = vec![zone("A"), zone("B"), zone("C")];
        let p = params(Direction::Incoming, 2);
        let first = serde_json::to_string(&build_od_flow_map(&sample(), &zones, &p).unwrap()).unwrap();
        let second = serde_json::to_string(&build_od_flow_map(&sample(), &zones, &p).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
