use super::types::{EdgeLookup, RoutePath, SamplingInterval, Trajectory};
use crate::common::{DomainError, DomainResult};

/// A trajectory along with the simulated time it takes to drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrajectory {
    pub trajectory: Trajectory,
    pub travel_time_s: f64,
}

/// Upper bound on the ticks a single edge may produce.
pub const MAX_SAMPLES_PER_EDGE: f64 = 1_000_000.0;

/// Sample the vehicle position every `interval` while driving `path`.
pub fn sample<G: EdgeLookup + ?Sized>(
    path: &RoutePath,
    graph: &G,
    interval: SamplingInterval,
) -> DomainResult<Trajectory> {
    Ok(sample_timed(path, graph, interval)?.trajectory)
}

/// Like [`sample`], but also reports the elapsed time.
///
/// The result always starts at the first node and ends at the last node of the
/// path. In between, every full tick advances `speed * interval` meters along
/// the current edge; the last tick on an edge is clamped to the edge's end and
/// only accounts for the fraction of the interval needed to get there. Samples
/// never straddle two edges.
pub fn sample_timed<G: EdgeLookup + ?Sized>(
    path: &RoutePath,
    graph: &G,
    interval: SamplingInterval,
) -> DomainResult<SampledTrajectory> {
    if path.is_stationary() {
        return Ok(SampledTrajectory {
            trajectory: Trajectory::new(vec![path.first().point]),
            travel_time_s: 0.0,
        });
    }

    let dt = interval.secs();
    let mut points = vec![path.first().point];
    let mut elapsed = 0.0;
    let mut carry = 0.0;

    for (u, v) in path.legs() {
        let edge = graph.edge(u.id, v.id)?;
        edge.validate()?;
        let length = edge.length_m;
        let step = edge.speed_mps * dt;
        if length / step > MAX_SAMPLES_PER_EDGE {
            return Err(DomainError::invalid(format!(
                "{}s interval would take more than {} samples to cover a {:.0} m edge",
                dt, MAX_SAMPLES_PER_EDGE, length
            )));
        }

        let mut covered = carry;
        while covered < length {
            if covered + step <= length {
                covered += step;
                elapsed += dt;
            } else {
                elapsed += (length - covered) / edge.speed_mps;
                covered = length;
            }
            points.push(u.point.lerp(v.point, covered / length));
        }
        carry = (covered - length).max(0.0);
    }

    points.push(path.last().point);
    Ok(SampledTrajectory {
        trajectory: Trajectory::new(points),
        travel_time_s: elapsed,
    })
}

/// Reject paths that don't move the vehicle anywhere.
pub fn require_movement(path: &RoutePath) -> DomainResult<()> {
    if path.is_stationary() {
        return Err(DomainError::DegenerateGeometry {
            reason: format!("path starts and ends at {}", path.first().id),
        });
    }
    Ok(())
}
