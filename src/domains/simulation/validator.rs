use serde::{Deserialize, Serialize};

use super::types::Trajectory;
use crate::common::{distance_km, DomainError, DomainResult, GeoPoint};

/// Tolerance used when nothing else is configured.
pub const DEFAULT_TOLERANCE_KM: f64 = 2.0;

/// The first candidate point that strays too far from the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub index: usize,
    pub point: GeoPoint,
    /// Distance to the closest reference point; infinite if the reference is empty.
    pub nearest_km: f64,
}

/// True iff every candidate point lies within `tolerance_km` of some reference point.
pub fn is_within_tolerance(
    candidate: &Trajectory,
    reference: &Trajectory,
    tolerance_km: f64,
) -> DomainResult<bool> {
    Ok(first_violation(candidate, reference, tolerance_km)?.is_none())
}

pub fn first_violation(
    candidate: &Trajectory,
    reference: &Trajectory,
    tolerance_km: f64,
) -> DomainResult<Option<Violation>> {
    if !tolerance_km.is_finite() || tolerance_km < 0.0 {
        return Err(DomainError::invalid(format!(
            "tolerance must be a non-negative distance, got {} km",
            tolerance_km
        )));
    }

    // Plain nested scan; trajectories are a few hundred points at most.
    for (index, p) in candidate.points().iter().enumerate() {
        let covered = reference
            .points()
            .iter()
            .any(|q| distance_km(*p, *q) <= tolerance_km);
        if !covered {
            let nearest_km = reference
                .points()
                .iter()
                .map(|q| distance_km(*p, *q))
                .fold(f64::INFINITY, f64::min);
            return Ok(Some(Violation {
                index,
                point: *p,
                nearest_km,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traj(points: &[(f64, f64)]) -> Trajectory {
        points.iter().map(|(lat, lon)| GeoPoint::new(*lat, *lon)).collect()
    }

    #[test]
    fn test_empty_candidate_is_compliant() {
        let reference = traj(&[(44.9, 11.0)]);
        assert!(is_within_tolerance(&Trajectory::empty(), &reference, 2.0).unwrap());
        assert!(is_within_tolerance(&Trajectory::empty(), &Trajectory::empty(), 2.0).unwrap());
    }

    #[test]
    fn test_empty_reference_fails_any_point() {
        let candidate = traj(&[(44.9, 11.0)]);
        assert!(!is_within_tolerance(&candidate, &Trajectory::empty(), 2.0).unwrap());

        let v = first_violation(&candidate, &Trajectory::empty(), 2.0).unwrap().unwrap();
        assert_eq!(v.index, 0);
        assert!(v.nearest_km.is_infinite());
    }

    #[test]
    fn test_zero_tolerance_accepts_identical_points() {
        let t = traj(&[(44.9, 11.0)]);
        assert!(is_within_tolerance(&t, &t, 0.0).unwrap());
    }

    #[test]
    fn test_reports_first_straying_point() {
        let reference = traj(&[(44.90, 11.00), (44.90, 11.01)]);
        let candidate = traj(&[(44.90, 11.00), (45.00, 11.00), (46.0, 11.0)]);
        let v = first_violation(&candidate, &reference, 2.0).unwrap().unwrap();
        assert_eq!(v.index, 1);
        assert!((v.nearest_km - 11.12).abs() < 0.05);
    }

    #[test]
    fn test_bad_tolerance_is_rejected() {
        let t = traj(&[(44.9, 11.0)]);
        assert!(is_within_tolerance(&t, &t, -1.0).is_err());
        assert!(is_within_tolerance(&t, &t, f64::NAN).is_err());
    }
}
