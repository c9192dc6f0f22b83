use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::common::{DomainError, DomainResult, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationCategory {
    Farm,
    Retailer,
}

impl DestinationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationCategory::Farm => "farm",
            DestinationCategory::Retailer => "retailer",
        }
    }
}

impl fmt::Display for DestinationCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub point: GeoPoint,
    pub category: DestinationCategory,
}

impl Destination {
    pub fn new(name: &str, lat: f64, lon: f64, category: DestinationCategory) -> Self {
        Self {
            name: name.to_string(),
            point: GeoPoint::new(lat, lon),
            category,
        }
    }
}

/// The depot and every named delivery destination. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRegistry {
    depot: GeoPoint,
    destinations: Vec<Destination>,
}

impl DestinationRegistry {
    pub fn new(depot: GeoPoint, destinations: Vec<Destination>) -> DomainResult<Self> {
        if !depot.is_finite() {
            return Err(DomainError::invalid(format!("depot {} is not a valid point", depot)));
        }
        let mut seen = HashSet::new();
        for dest in &destinations {
            if dest.name.trim().is_empty() {
                return Err(DomainError::invalid("destination names must not be blank"));
            }
            if !seen.insert(dest.name.as_str()) {
                return Err(DomainError::invalid(format!(
                    "destination {} is listed twice",
                    dest.name
                )));
            }
            if !dest.point.is_finite() {
                return Err(DomainError::invalid(format!(
                    "destination {} has an invalid location",
                    dest.name
                )));
            }
        }
        Ok(Self { depot, destinations })
    }

    /// The deployment this simulator was first built for: a depot near Mirandola
    /// serving four farms and four retailers.
    pub fn default_registry() -> Self {
        use DestinationCategory::{Farm, Retailer};
        Self {
            depot: GeoPoint::new(44.888892, 11.065959),
            destinations: vec![
                Destination::new("Fattoria Clarkson", 44.923570, 11.096173, Farm),
                Destination::new("Allevamento Lolli", 44.829820, 11.049559, Farm),
                Destination::new("Fattoria Vincenzi", 44.858796, 11.027466, Farm),
                Destination::new("Fattoria Becchi", 44.910022, 10.997559, Farm),
                Destination::new("Pam Panorama Via Irnerio", 44.893836, 11.061552, Retailer),
                Destination::new("Famila Savignano", 44.890389, 11.054800, Retailer),
                Destination::new("Coop 3.0 Mirandola", 44.890538, 11.077755, Retailer),
                Destination::new(
                    "Pam Panorama Santarcangelo di Romagna",
                    44.892260,
                    11.068087,
                    Retailer,
                ),
            ],
        }
    }

    pub fn depot(&self) -> GeoPoint {
        self.depot
    }

    pub fn get(&self, name: &str) -> DomainResult<&Destination> {
        self.destinations
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DomainError::UnknownDestination {
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.iter()
    }

    pub fn by_category(&self, category: DestinationCategory) -> impl Iterator<Item = &Destination> {
        self.destinations.iter().filter(move |d| d.category == category)
    }

    pub fn names(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}
