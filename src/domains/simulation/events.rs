use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Journal entries, one stream per destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationEvent {
    RouteSimulated {
        run_id: Uuid,
        destination: String,
        diverted: bool,
        sample_count: usize,
        travel_time_s: f64,
        timestamp: DateTime<Utc>,
    },
    ComplianceChecked {
        run_id: Uuid,
        destination: String,
        compliant: bool,
        tolerance_km: f64,
        timestamp: DateTime<Utc>,
    },
    ReferenceBuilt {
        destination: String,
        sample_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for SimulationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SimulationEvent::RouteSimulated { .. } => "RouteSimulated",
            SimulationEvent::ComplianceChecked { .. } => "ComplianceChecked",
            SimulationEvent::ReferenceBuilt { .. } => "ReferenceBuilt",
        }
    }

    fn stream_id(&self) -> &str {
        match self {
            SimulationEvent::RouteSimulated { destination, .. } => destination,
            SimulationEvent::ComplianceChecked { destination, .. } => destination,
            SimulationEvent::ReferenceBuilt { destination, .. } => destination,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SimulationEvent::RouteSimulated { timestamp, .. } => *timestamp,
            SimulationEvent::ComplianceChecked { timestamp, .. } => *timestamp,
            SimulationEvent::ReferenceBuilt { timestamp, .. } => *timestamp,
        }
    }
}
