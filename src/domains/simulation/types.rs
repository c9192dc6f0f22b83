use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::common::{DomainError, DomainResult, GeoPoint};

/// Identifier of a node in the road graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub id: NodeId,
    pub point: GeoPoint,
}

impl PathNode {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self {
            id: NodeId(id),
            point: GeoPoint::new(lat, lon),
        }
    }
}

/// Traversal data for a directed road segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub length_m: f64,
    pub speed_mps: f64,
}

impl Edge {
    pub fn new(length_m: f64, speed_mps: f64) -> Self {
        Self { length_m, speed_mps }
    }

    /// Zero-length edges are legal (duplicate nodes in the source data); negative
    /// or non-finite lengths and non-positive speeds are not.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.length_m.is_finite() || self.length_m < 0.0 {
            return Err(DomainError::invalid(format!(
                "edge length must be a non-negative number of meters, got {}",
                self.length_m
            )));
        }
        if !self.speed_mps.is_finite() || self.speed_mps <= 0.0 {
            return Err(DomainError::invalid(format!(
                "edge speed must be positive, got {} m/s",
                self.speed_mps
            )));
        }
        Ok(())
    }
}

/// Ordered, non-empty node sequence produced by a shortest-path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    nodes: Vec<PathNode>,
}

impl RoutePath {
    pub fn new(nodes: Vec<PathNode>) -> DomainResult<Self> {
        if nodes.is_empty() {
            return Err(DomainError::invalid("a path needs at least one node"));
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> &PathNode {
        &self.nodes[0]
    }

    pub fn last(&self) -> &PathNode {
        &self.nodes[self.nodes.len() - 1]
    }

    /// True when the path is a single node, ie. no movement happens.
    pub fn is_stationary(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Consecutive (from, to) pairs along the path.
    pub fn legs(&self) -> impl Iterator<Item = (&PathNode, &PathNode)> {
        self.nodes.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

/// Time-ordered vehicle positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<GeoPoint>,
}

impl Trajectory {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }
}

impl FromIterator<GeoPoint> for Trajectory {
    fn from_iter<I: IntoIterator<Item = GeoPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Sampling period, guaranteed positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SamplingInterval(f64);

impl SamplingInterval {
    pub fn from_secs(secs: f64) -> DomainResult<Self> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(DomainError::invalid(format!(
                "sampling interval must be positive, got {}s",
                secs
            )));
        }
        Ok(Self(secs))
    }

    pub fn secs(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for SamplingInterval {
    type Error = DomainError;

    fn try_from(secs: f64) -> DomainResult<Self> {
        Self::from_secs(secs)
    }
}

impl TryFrom<Duration> for SamplingInterval {
    type Error = DomainError;

    fn try_from(d: Duration) -> DomainResult<Self> {
        Self::from_secs(d.as_secs_f64())
    }
}

impl From<SamplingInterval> for f64 {
    fn from(interval: SamplingInterval) -> Self {
        interval.0
    }
}

/// Looks up traversal data for a pair of adjacent path nodes.
pub trait EdgeLookup {
    fn edge(&self, from: NodeId, to: NodeId) -> DomainResult<Edge>;
}

impl EdgeLookup for HashMap<(NodeId, NodeId), Edge> {
    fn edge(&self, from: NodeId, to: NodeId) -> DomainResult<Edge> {
        self.get(&(from, to)).copied().ok_or_else(|| {
            DomainError::invalid(format!("no edge between {} and {}", from, to))
        })
    }
}
