use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::{ApplicationError, ApplicationResult, DomainError, DomainEvent, EventEnvelope, EventStore};
use crate::domains::logger::DynLogger;
use crate::domains::simulation::{
    first_violation, require_movement, sample_timed, select_with_rng, Destination, DestinationRegistry,
    DestinationSelector, DiversionPolicy, ReferenceTrajectoryStore, SamplingInterval, Selection,
    ShortestPathProvider, SimulationEvent, Trajectory, TrajectorySink, Violation,
};

/// Journal source tag.
const EVENT_SOURCE: &str = "truck-route-sim";

#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub interval: SamplingInterval,
    pub tolerance_km: f64,
}

/// Everything the service talks to outside the pure core.
pub struct SimulationPorts {
    pub provider: Arc<dyn ShortestPathProvider>,
    pub references: Arc<dyn ReferenceTrajectoryStore>,
    pub sink: Arc<dyn TrajectorySink>,
    pub journal: Arc<dyn EventStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub destination: String,
    pub diverted: bool,
    pub trajectory: Trajectory,
    pub travel_time_s: f64,
    pub compliant: bool,
    pub violation: Option<Violation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSummary {
    pub destination: String,
    pub sample_count: usize,
    pub travel_time_s: f64,
}

/// Runs one delivery: pick the endpoint, route from the depot, sample the
/// trajectory and check it against the destination's reference.
pub struct SimulationService {
    registry: DestinationRegistry,
    settings: SimulationSettings,
    selector: Arc<dyn DestinationSelector>,
    ports: SimulationPorts,
    logger: DynLogger,
}

impl SimulationService {
    pub fn new(
        registry: DestinationRegistry,
        settings: SimulationSettings,
        ports: SimulationPorts,
        logger: DynLogger,
    ) -> Self {
        Self {
            registry,
            settings,
            selector: Arc::new(DiversionPolicy::default()),
            ports,
            logger,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn DestinationSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    /// Simulate a delivery, drawing the diversion roll from the thread RNG.
    pub async fn simulate(&self, name: &str) -> ApplicationResult<SimulationReport> {
        let destination = self.registry.get(name)?;
        // ThreadRng isn't Send, so it must not live across an await
        let selection = select_with_rng(self.selector.as_ref(), destination, &mut rand::thread_rng());
        self.run(destination, selection).await
    }

    /// Simulate a delivery with the diversion roll drawn from `rng`.
    pub async fn simulate_with_rng<R: Rng>(&self, name: &str, rng: &mut R) -> ApplicationResult<SimulationReport> {
        let destination = self.registry.get(name)?;
        let selection = select_with_rng(self.selector.as_ref(), destination, rng);
        self.run(destination, selection).await
    }

    pub async fn simulate_with_draw(&self, name: &str, draw: f64) -> ApplicationResult<SimulationReport> {
        let destination = self.registry.get(name)?;
        let selection = self.selector.select(destination, draw);
        self.run(destination, selection).await
    }

    async fn run(&self, destination: &Destination, selection: Selection) -> ApplicationResult<SimulationReport> {
        if selection.diverted {
            self.logger.warn(&format!(
                "Truck for {} diverted to {}",
                destination.name, selection.point
            ));
        }

        let path = self.ports.provider.route(self.registry.depot(), selection.point)?;
        if path.is_stationary() {
            self.logger.warn(&format!(
                "Route to {} starts and ends at the same node; truck doesn't move",
                destination.name
            ));
        }
        let sampled = sample_timed(&path, self.ports.provider.as_ref(), self.settings.interval)?;
        let trajectory = sampled.trajectory;
        self.ports.sink.save_run(&trajectory)?;

        let run_id = Uuid::new_v4();
        info!(
            "Run {} to {}: {} samples over {} path nodes, {:.0}s",
            run_id,
            destination.name,
            trajectory.len(),
            path.len(),
            sampled.travel_time_s
        );

        let reference = self.ports.references.load_reference(&destination.name)?;
        if reference.is_empty() {
            self.logger.warn(&format!("No reference trajectory for {}", destination.name));
        }
        let violation = first_violation(&trajectory, &reference, self.settings.tolerance_km)?;
        let compliant = violation.is_none();
        match &violation {
            None => self.logger.info(&format!("Run {} to {} is compliant", run_id, destination.name)),
            Some(v) => self.logger.warn(&format!(
                "Run {} to {} strays at sample {} {}: nearest reference point {:.3} km away",
                run_id, destination.name, v.index, v.point, v.nearest_km
            )),
        }

        let now = Utc::now();
        self.journal(vec![
            SimulationEvent::RouteSimulated {
                run_id,
                destination: destination.name.clone(),
                diverted: selection.diverted,
                sample_count: trajectory.len(),
                travel_time_s: sampled.travel_time_s,
                timestamp: now,
            },
            SimulationEvent::ComplianceChecked {
                run_id,
                destination: destination.name.clone(),
                compliant,
                tolerance_km: self.settings.tolerance_km,
                timestamp: now,
            },
        ])
        .await?;

        Ok(SimulationReport {
            run_id,
            destination: destination.name.clone(),
            diverted: selection.diverted,
            trajectory,
            travel_time_s: sampled.travel_time_s,
            compliant,
            violation,
        })
    }

    /// Validate an externally supplied trajectory against the stored reference.
    pub async fn check(&self, name: &str, candidate: &Trajectory) -> ApplicationResult<bool> {
        let destination = self.registry.get(name)?;
        let reference = self.ports.references.load_reference(&destination.name)?;
        let violation = first_violation(candidate, &reference, self.settings.tolerance_km)?;
        debug!("Checked {} candidate points for {}", candidate.len(), name);
        Ok(violation.is_none())
    }

    /// Compute and store the reference trajectory of one destination, always
    /// driving to the destination itself.
    pub async fn build_reference(&self, name: &str) -> ApplicationResult<ReferenceSummary> {
        let destination = self.registry.get(name)?;
        self.build_reference_for(destination).await
    }

    /// Rebuild references for every destination. Destinations whose route
    /// doesn't move the truck are skipped with a warning.
    pub async fn build_references(&self) -> ApplicationResult<Vec<ReferenceSummary>> {
        let mut built = Vec::new();
        for destination in self.registry.iter() {
            match self.build_reference_for(destination).await {
                Ok(summary) => built.push(summary),
                Err(ApplicationError::Domain(DomainError::DegenerateGeometry { reason })) => {
                    self.logger.warn(&format!(
                        "Skipping reference for {}: {}",
                        destination.name, reason
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(built)
    }

    async fn build_reference_for(&self, destination: &Destination) -> ApplicationResult<ReferenceSummary> {
        let path = self.ports.provider.route(self.registry.depot(), destination.point)?;
        require_movement(&path)?;
        let sampled = sample_timed(&path, self.ports.provider.as_ref(), self.settings.interval)?;
        self.ports.references.save_reference(destination, &sampled.trajectory)?;

        self.logger.info(&format!(
            "Reference for {} ({}) has {} samples",
            destination.name,
            destination.category,
            sampled.trajectory.len()
        ));
        self.journal(vec![SimulationEvent::ReferenceBuilt {
            destination: destination.name.clone(),
            sample_count: sampled.trajectory.len(),
            timestamp: Utc::now(),
        }])
        .await?;

        Ok(ReferenceSummary {
            destination: destination.name.clone(),
            sample_count: sampled.trajectory.len(),
            travel_time_s: sampled.travel_time_s,
        })
    }

    async fn journal(&self, events: Vec<SimulationEvent>) -> ApplicationResult<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };
        let stream_id = first.stream_id().to_string();
        let envelopes = events
            .iter()
            .map(|e| EventEnvelope::new(e, EVENT_SOURCE))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DomainError::from)?;
        self.ports
            .journal
            .append_events(&stream_id, envelopes)
            .await
            .map_err(ApplicationError::Journal)
    }
}
