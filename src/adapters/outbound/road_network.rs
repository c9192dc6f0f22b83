//! Local road graph built from GeoJSON street geometry.
//!
//! Every road is split at its vertices; each vertex becomes a graph node and
//! each consecutive pair a directed edge (two, unless the road is one-way).
//! Shortest paths are found with A* over edge length, using the haversine
//! distance to the goal as the heuristic.

use geojson::{GeoJson, Geometry, Value};
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::common::{distance_m, DomainError, DomainResult, GeoPoint};
use crate::domains::simulation::{Edge, EdgeLookup, NodeId, PathNode, RoutePath, ShortestPathProvider};

/// Snapshot file magic and the current format version.
const SNAPSHOT_MAGIC: &[u8; 4] = b"TRNG";
const SNAPSHOT_VERSION: u8 = 1;

/// Default driving speed, 50 km/h.
pub const DEFAULT_SPEED_MPS: f64 = 50.0 / 3.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoadNode {
    point: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoadSegment {
    length_m: f64,
    speed_mps: f64,
}

/// Which roads to keep and how fast to drive on them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkOptions {
    pub speed_mps: f64,
    /// Only keep segments whose endpoints both lie within this many meters of the center.
    pub scope: Option<(GeoPoint, f64)>,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            speed_mps: DEFAULT_SPEED_MPS,
            scope: None,
        }
    }
}

impl NetworkOptions {
    /// Same speed and scope, allowing for float noise picked up by a
    /// JSON round trip.
    pub fn matches(&self, other: &NetworkOptions) -> bool {
        let same_scope = match (self.scope, other.scope) {
            (None, None) => true,
            (Some((c1, r1)), Some((c2, r2))) => distance_m(c1, c2) < 0.01 && (r1 - r2).abs() < 1e-6,
            _ => false,
        };
        (self.speed_mps - other.speed_mps).abs() < 1e-9 && same_scope
    }
}

/// md5 of the GeoJSON text a network was built from.
pub fn source_digest(raw: &str) -> String {
    format!("{:x}", md5::compute(raw.as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    options: NetworkOptions,
    source_digest: Option<String>,
    nodes: usize,
    edges: usize,
}

pub struct RoadNetwork {
    graph: DiGraph<RoadNode, RoadSegment>,
    /// (lat_e7, lon_e7) -> node, so roads sharing a vertex share a node.
    index: HashMap<(i64, i64), NodeIndex>,
    options: NetworkOptions,
    source_digest: Option<String>,
}

impl RoadNetwork {
    pub fn new(speed_mps: f64) -> DomainResult<Self> {
        Self::with_options(NetworkOptions {
            speed_mps,
            scope: None,
        })
    }

    fn with_options(options: NetworkOptions) -> DomainResult<Self> {
        if !options.speed_mps.is_finite() || options.speed_mps <= 0.0 {
            return Err(DomainError::invalid(format!(
                "network speed must be positive, got {} m/s",
                options.speed_mps
            )));
        }
        if let Some((center, radius_m)) = options.scope {
            if !center.is_finite() || !radius_m.is_finite() || radius_m <= 0.0 {
                return Err(DomainError::invalid(format!(
                    "network scope must be a positive radius around a valid point, got {} m around {}",
                    radius_m, center
                )));
            }
        }
        Ok(Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            options,
            source_digest: None,
        })
    }

    pub fn from_geojson(raw: &str, options: &NetworkOptions) -> DomainResult<Self> {
        let geojson: GeoJson = raw
            .parse()
            .map_err(|e| DomainError::invalid(format!("bad GeoJSON: {}", e)))?;
        let mut network = Self::with_options(*options)?;
        network.source_digest = Some(source_digest(raw));

        let mut roads = 0;
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    let oneway = is_oneway(feature.properties.as_ref());
                    if let Some(geometry) = feature.geometry {
                        roads += network.add_geometry(&geometry, oneway, options)?;
                    }
                }
            }
            GeoJson::Feature(feature) => {
                let oneway = is_oneway(feature.properties.as_ref());
                if let Some(geometry) = feature.geometry {
                    roads += network.add_geometry(&geometry, oneway, options)?;
                }
            }
            GeoJson::Geometry(geometry) => {
                roads += network.add_geometry(&geometry, false, options)?;
            }
        }

        info!(
            "Built road network with {} nodes and {} edges from {} roads",
            network.node_count(),
            network.edge_count(),
            roads
        );
        Ok(network)
    }

    fn add_geometry(&mut self, geometry: &Geometry, oneway: bool, options: &NetworkOptions) -> DomainResult<usize> {
        match &geometry.value {
            Value::LineString(positions) => {
                let pts = to_points(positions)?;
                self.add_scoped_road(&pts, oneway, options);
                Ok(1)
            }
            Value::MultiLineString(lines) => {
                for positions in lines {
                    let pts = to_points(positions)?;
                    self.add_scoped_road(&pts, oneway, options);
                }
                Ok(lines.len())
            }
            Value::GeometryCollection(geometries) => {
                let mut count = 0;
                for g in geometries {
                    count += self.add_geometry(g, oneway, options)?;
                }
                Ok(count)
            }
            // Points and areas aren't drivable
            _ => Ok(0),
        }
    }

    fn add_scoped_road(&mut self, pts: &[GeoPoint], oneway: bool, options: &NetworkOptions) {
        for pair in pts.windows(2) {
            if let Some((center, radius_m)) = options.scope {
                if distance_m(center, pair[0]) > radius_m || distance_m(center, pair[1]) > radius_m {
                    continue;
                }
            }
            self.add_road(pair, oneway);
        }
    }

    /// Add a polyline road. Consecutive vertices become connected nodes.
    pub fn add_road(&mut self, pts: &[GeoPoint], oneway: bool) {
        for pair in pts.windows(2) {
            let a = self.get_or_create_node(pair[0]);
            let b = self.get_or_create_node(pair[1]);
            if a == b {
                continue;
            }
            let length_m = distance_m(pair[0], pair[1]);
            self.upsert_segment(a, b, length_m);
            if !oneway {
                self.upsert_segment(b, a, length_m);
            }
        }
    }

    fn get_or_create_node(&mut self, point: GeoPoint) -> NodeIndex {
        let key = coord_key(point);
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = self.graph.add_node(RoadNode { point });
        self.index.insert(key, idx);
        idx
    }

    /// Parallel roads between the same two vertices collapse into the shortest one.
    fn upsert_segment(&mut self, from: NodeIndex, to: NodeIndex, length_m: f64) {
        match self.graph.find_edge(from, to) {
            Some(e) => {
                let seg = &mut self.graph[e];
                seg.length_m = seg.length_m.min(length_m);
            }
            None => {
                self.graph.add_edge(
                    from,
                    to,
                    RoadSegment {
                        length_m,
                        speed_mps: self.options.speed_mps,
                    },
                );
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn speed_mps(&self) -> f64 {
        self.options.speed_mps
    }

    /// Speed and scope the network was built with.
    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    pub fn source_digest(&self) -> Option<&str> {
        self.source_digest.as_deref()
    }

    /// Why this network no longer matches `options` and the GeoJSON with
    /// digest `digest`, or `None` if it is still current. An unknown digest
    /// only checks the options.
    pub fn stale_reason(&self, options: &NetworkOptions, digest: Option<&str>) -> Option<&'static str> {
        if (self.options.speed_mps - options.speed_mps).abs() >= 1e-9 {
            return Some("driving speed changed");
        }
        if !self.options.matches(options) {
            return Some("scope changed");
        }
        match digest {
            Some(d) if self.source_digest() != Some(d) => Some("GeoJSON changed"),
            _ => None,
        }
    }

    /// The graph node closest to `point`, if the network has any nodes.
    pub fn nearest_node(&self, point: GeoPoint) -> Option<PathNode> {
        self.graph
            .node_indices()
            .min_by_key(|idx| OrderedFloat(distance_m(point, self.graph[*idx].point)))
            .map(|idx| self.path_node(idx))
    }

    fn path_node(&self, idx: NodeIndex) -> PathNode {
        PathNode {
            id: NodeId(idx.index() as u64),
            point: self.graph[idx].point,
        }
    }

    fn node_index(&self, id: NodeId) -> DomainResult<NodeIndex> {
        let idx = NodeIndex::new(id.0 as usize);
        if self.graph.node_weight(idx).is_none() {
            return Err(DomainError::invalid(format!("{} isn't part of the road network", id)));
        }
        Ok(idx)
    }

    /// Serialize into the snapshot format: magic, version byte, little-endian
    /// header length, JSON header, bincode graph payload.
    pub fn to_snapshot(&self) -> DomainResult<Vec<u8>> {
        let header = serde_json::to_vec(&SnapshotHeader {
            options: self.options,
            source_digest: self.source_digest.clone(),
            nodes: self.node_count(),
            edges: self.edge_count(),
        })?;
        let payload = bincode::serialize(&self.graph)
            .map_err(|e| DomainError::InfrastructureError(format!("graph encoding failed: {}", e)))?;

        let mut out = Vec::with_capacity(9 + header.len() + payload.len());
        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.push(SNAPSHOT_VERSION);
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn from_snapshot(bytes: &[u8]) -> DomainResult<Self> {
        if bytes.len() < 9 || &bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(DomainError::invalid("not a road network snapshot"));
        }
        let version = bytes[4];
        if version != SNAPSHOT_VERSION {
            return Err(DomainError::invalid(format!(
                "unsupported snapshot version {}",
                version
            )));
        }
        let header_len = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
        let payload_start = 9 + header_len;
        if bytes.len() < payload_start {
            return Err(DomainError::invalid("truncated snapshot header"));
        }
        let header: SnapshotHeader = serde_json::from_slice(&bytes[9..payload_start])?;
        let graph: DiGraph<RoadNode, RoadSegment> = bincode::deserialize(&bytes[payload_start..])
            .map_err(|e| DomainError::InfrastructureError(format!("graph decoding failed: {}", e)))?;
        if graph.node_count() != header.nodes || graph.edge_count() != header.edges {
            return Err(DomainError::invalid("snapshot header doesn't match its graph"));
        }

        let mut network = Self::with_options(header.options)?;
        network.source_digest = header.source_digest;
        network.index = graph
            .node_indices()
            .map(|idx| (coord_key(graph[idx].point), idx))
            .collect();
        network.graph = graph;
        debug!(
            "Loaded road network snapshot with {} nodes",
            network.node_count()
        );
        Ok(network)
    }
}

impl EdgeLookup for RoadNetwork {
    fn edge(&self, from: NodeId, to: NodeId) -> DomainResult<Edge> {
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        let e = self
            .graph
            .find_edge(a, b)
            .ok_or_else(|| DomainError::invalid(format!("no road from {} to {}", from, to)))?;
        let seg = &self.graph[e];
        Ok(Edge::new(seg.length_m, seg.speed_mps))
    }
}

impl ShortestPathProvider for RoadNetwork {
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> DomainResult<RoutePath> {
        let no_route = || DomainError::NoRoute {
            from: origin.to_string(),
            to: destination.to_string(),
        };
        let start = self.nearest_node(origin).ok_or_else(no_route)?;
        let goal = self.nearest_node(destination).ok_or_else(no_route)?;
        let start_idx = self.node_index(start.id)?;
        let goal_idx = self.node_index(goal.id)?;

        let (cost, path) = astar(
            &self.graph,
            start_idx,
            |n| n == goal_idx,
            |e| e.weight().length_m,
            |n| distance_m(self.graph[n].point, goal.point),
        )
        .ok_or_else(no_route)?;

        debug!(
            "Route {} -> {}: {} nodes, {:.0} m",
            start.id,
            goal.id,
            path.len(),
            cost
        );
        RoutePath::new(path.into_iter().map(|idx| self.path_node(idx)).collect())
    }
}

fn is_oneway(properties: Option<&geojson::JsonObject>) -> bool {
    match properties.and_then(|p| p.get("oneway")) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => matches!(s.as_str(), "yes" | "true" | "1"),
        _ => false,
    }
}

/// GeoJSON positions are `[lon, lat, (elevation)]`.
fn to_points(positions: &[Vec<f64>]) -> DomainResult<Vec<GeoPoint>> {
    positions
        .iter()
        .map(|pos| {
            if pos.len() < 2 {
                return Err(DomainError::invalid(format!(
                    "position needs at least 2 coordinates, got {}",
                    pos.len()
                )));
            }
            Ok(GeoPoint::new(pos[1], pos[0]))
        })
        .collect()
}

/// 7 decimal places, roughly a centimeter.
fn coord_key(point: GeoPoint) -> (i64, i64) {
    ((point.lat * 1e7).round() as i64, (point.lon * 1e7).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_key() {
        assert_eq!(coord_key(GeoPoint::new(44.888892, 11.065959)), (448888920, 110659590));
    }

    #[test]
    fn test_positions_are_lon_lat() {
        let pts = to_points(&[vec![11.0, 44.0], vec![11.5, 44.5, 30.0]]).unwrap();
        assert_eq!(pts[0], GeoPoint::new(44.0, 11.0));
        assert_eq!(pts[1], GeoPoint::new(44.5, 11.5));
        assert!(to_points(&[vec![11.0]]).is_err());
    }

    #[test]
    fn test_shared_vertices_share_nodes() {
        let mut network = RoadNetwork::new(10.0).unwrap();
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.01);
        let c = GeoPoint::new(0.01, 0.01);
        network.add_road(&[a, b], false);
        network.add_road(&[b, c], true);
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 3);
    }
}
