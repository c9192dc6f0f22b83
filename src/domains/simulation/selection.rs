use rand::Rng;

use super::registry::Destination;
use crate::common::{DomainError, DomainResult, GeoPoint};

/// Where the truck actually drives for a requested destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub point: GeoPoint,
    pub diverted: bool,
}

/// Picks the driven endpoint from a uniform draw in `[0, 1)`.
///
/// Taking the draw as an argument keeps the choice a pure function; randomness
/// is supplied by the caller.
pub trait DestinationSelector: Send + Sync {
    fn select(&self, destination: &Destination, draw: f64) -> Selection;
}

/// Always drives to the requested destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSelector;

impl DestinationSelector for DirectSelector {
    fn select(&self, destination: &Destination, _draw: f64) -> Selection {
        Selection {
            point: destination.point,
            diverted: false,
        }
    }
}

/// Sends the truck to an off-route `special_point` with the given probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversionPolicy {
    probability: f64,
    special_point: GeoPoint,
}

impl DiversionPolicy {
    pub const DEFAULT_PROBABILITY: f64 = 0.01;
    pub const DEFAULT_SPECIAL_POINT: GeoPoint = GeoPoint::new(44.877865, 11.129585);

    pub fn new(probability: f64, special_point: GeoPoint) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(DomainError::invalid(format!(
                "diversion probability must be within [0, 1], got {}",
                probability
            )));
        }
        Ok(Self {
            probability,
            special_point,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn special_point(&self) -> GeoPoint {
        self.special_point
    }
}

impl Default for DiversionPolicy {
    fn default() -> Self {
        Self {
            probability: Self::DEFAULT_PROBABILITY,
            special_point: Self::DEFAULT_SPECIAL_POINT,
        }
    }
}

impl DestinationSelector for DiversionPolicy {
    fn select(&self, destination: &Destination, draw: f64) -> Selection {
        if draw < 1.0 - self.probability {
            Selection {
                point: destination.point,
                diverted: false,
            }
        } else {
            Selection {
                point: self.special_point,
                diverted: true,
            }
        }
    }
}

/// Draw from `rng` and delegate to `selector`.
pub fn select_with_rng<S, R>(selector: &S, destination: &Destination, rng: &mut R) -> Selection
where
    S: DestinationSelector + ?Sized,
    R: Rng,
{
    selector.select(destination, rng.gen::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::simulation::registry::DestinationCategory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn farm() -> Destination {
        Destination::new("Fattoria Clarkson", 44.923570, 11.096173, DestinationCategory::Farm)
    }

    #[test]
    fn test_default_policy_thresholds() {
        let policy = DiversionPolicy::default();
        let low = policy.select(&farm(), 0.0);
        assert!(!low.diverted);
        assert_eq!(low.point, farm().point);

        let edge = policy.select(&farm(), 0.985);
        assert!(!edge.diverted);

        let high = policy.select(&farm(), 0.995);
        assert!(high.diverted);
        assert_eq!(high.point, DiversionPolicy::DEFAULT_SPECIAL_POINT);
    }

    #[test]
    fn test_zero_probability_never_diverts() {
        let policy = DiversionPolicy::new(0.0, GeoPoint::new(0.0, 0.0)).unwrap();
        assert!(!policy.select(&farm(), 0.999_999).diverted);
    }

    #[test]
    fn test_certain_diversion() {
        let policy = DiversionPolicy::new(1.0, GeoPoint::new(1.0, 2.0)).unwrap();
        let s = policy.select(&farm(), 0.0);
        assert!(s.diverted);
        assert_eq!(s.point, GeoPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_probability_out_of_range() {
        assert!(DiversionPolicy::new(1.5, GeoPoint::new(0.0, 0.0)).is_err());
        assert!(DiversionPolicy::new(-0.1, GeoPoint::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let policy = DiversionPolicy::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                select_with_rng(&policy, &farm(), &mut a),
                select_with_rng(&policy, &farm(), &mut b)
            );
        }
    }

    #[test]
    fn test_direct_selector() {
        assert!(!DirectSelector.select(&farm(), 0.9999).diverted);
    }
}
