use super::registry::Destination;
use super::types::{EdgeLookup, RoutePath, Trajectory};
use crate::common::{DomainResult, GeoPoint};

/// Port for the road-network collaborator: finds the shortest path between two
/// points and reports length/speed for every edge on it.
pub trait ShortestPathProvider: EdgeLookup + Send + Sync {
    /// Errors with `NoRoute` if the two points aren't connected.
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> DomainResult<RoutePath>;
}

/// Port for previously computed reference trajectories.
pub trait ReferenceTrajectoryStore: Send + Sync {
    /// Returns an empty trajectory when nothing is stored for `name`.
    fn load_reference(&self, name: &str) -> DomainResult<Trajectory>;
    fn save_reference(&self, destination: &Destination, trajectory: &Trajectory) -> DomainResult<()>;
}

/// Port receiving the trajectory of the most recent simulated run.
pub trait TrajectorySink: Send + Sync {
    fn save_run(&self, trajectory: &Trajectory) -> DomainResult<()>;
}
