use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use truck_route_sim::adapters::inbound::{FileJournal, InMemoryJournal};
use truck_route_sim::adapters::outbound::{FilesystemTrajectoryStore, RoadNetwork, DEFAULT_SPEED_MPS};
use truck_route_sim::application::{SimulationPorts, SimulationService, SimulationSettings};
use truck_route_sim::domains::logger::DomainLogger;
use truck_route_sim::domains::simulation::{
    Destination, DestinationCategory, DestinationRegistry, DiversionPolicy, ReferenceTrajectoryStore,
    SamplingInterval, SimulationEvent, Trajectory,
};
use truck_route_sim::{ApplicationError, DomainError, EventStore, GeoPoint};

const DEPOT: GeoPoint = GeoPoint::new(44.880, 11.000);
const SPECIAL: GeoPoint = GeoPoint::new(44.850, 11.000);

struct CaptureLogger {
    messages: Mutex<Vec<String>>,
}

impl CaptureLogger {
    fn new() -> Self {
        Self { messages: Mutex::new(Vec::new()) }
    }

    fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

impl DomainLogger for CaptureLogger {
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
}

/// Depot with a road east to the farm, north to the shop and south to the
/// diversion point.
fn network() -> RoadNetwork {
    let mut network = RoadNetwork::new(DEFAULT_SPEED_MPS).unwrap();
    network.add_road(&[DEPOT, GeoPoint::new(44.880, 11.025), GeoPoint::new(44.880, 11.050)], false);
    network.add_road(&[DEPOT, GeoPoint::new(44.890, 11.000), GeoPoint::new(44.900, 11.000)], false);
    network.add_road(&[DEPOT, GeoPoint::new(44.865, 11.000), SPECIAL], false);
    network
}

fn registry() -> DestinationRegistry {
    DestinationRegistry::new(
        DEPOT,
        vec![
            Destination::new("Farm East", 44.880, 11.050, DestinationCategory::Farm),
            Destination::new("Shop North", 44.900, 11.000, DestinationCategory::Retailer),
            Destination::new("Depot Shop", 44.8801, 11.0001, DestinationCategory::Retailer),
        ],
    )
    .unwrap()
}

struct Fixture {
    _dir: TempDir,
    store: Arc<FilesystemTrajectoryStore>,
    journal: Arc<InMemoryJournal>,
    logger: Arc<CaptureLogger>,
    service: SimulationService,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let store = Arc::new(FilesystemTrajectoryStore::new(dir.path()));
    let journal = Arc::new(InMemoryJournal::new());
    let logger = Arc::new(CaptureLogger::new());
    let settings = SimulationSettings {
        interval: SamplingInterval::from_secs(5.0).unwrap(),
        tolerance_km: 2.0,
    };
    let ports = SimulationPorts {
        provider: Arc::new(network()),
        references: store.clone(),
        sink: store.clone(),
        journal: journal.clone(),
    };
    let service = SimulationService::new(registry(), settings, ports, logger.clone())
        .with_selector(Arc::new(DiversionPolicy::new(0.01, SPECIAL).unwrap()));
    Fixture {
        _dir: dir,
        store,
        journal,
        logger,
        service,
    }
}

#[tokio::test]
async fn test_unknown_destination() {
    let f = fixture();
    let err = f.service.simulate("Nowhere").await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UnknownDestination { .. })
    ));
}

#[tokio::test]
async fn test_run_without_reference_is_not_compliant() {
    let f = fixture();
    let report = f.service.simulate_with_draw("Farm East", 0.0).await.unwrap();
    assert!(!report.compliant);
    assert_eq!(report.violation.unwrap().index, 0);
    assert!(f.logger.contains("WARN:No reference trajectory for Farm East"));
}

#[tokio::test]
async fn test_build_references_then_simulate() {
    let f = fixture();
    let built = f.service.build_references().await.unwrap();
    let names: Vec<&str> = built.iter().map(|s| s.destination.as_str()).collect();
    assert_eq!(names, vec!["Farm East", "Shop North"]);
    assert!(f.logger.contains("WARN:Skipping reference for Depot Shop"));
    assert!(f.store.load_reference("Depot Shop").unwrap().is_empty());

    let report = f.service.simulate_with_draw("Farm East", 0.5).await.unwrap();
    assert!(!report.diverted);
    assert!(report.compliant);
    assert_eq!(report.trajectory.first(), Some(&DEPOT));
    assert_eq!(report.trajectory.last(), Some(&GeoPoint::new(44.880, 11.050)));
    // ~3.9 km at 50 km/h
    assert!((report.travel_time_s - 284.0).abs() < 5.0);

    let latest = f.store.load_latest_run().unwrap().unwrap();
    assert_eq!(latest.len(), report.trajectory.len());
}

#[tokio::test]
async fn test_diverted_run_fails_the_check() {
    let f = fixture();
    f.service.build_references().await.unwrap();

    let report = f.service.simulate_with_draw("Shop North", 0.995).await.unwrap();
    assert!(report.diverted);
    assert_eq!(report.trajectory.last(), Some(&SPECIAL));
    assert!(!report.compliant);
    let violation = report.violation.unwrap();
    assert!(violation.nearest_km > 2.0);
    assert!(f.logger.contains("diverted"));
}

#[tokio::test]
async fn test_check_external_trajectory() {
    let f = fixture();
    f.service.build_reference("Farm East").await.unwrap();

    let nearby: Trajectory = vec![GeoPoint::new(44.885, 11.010), GeoPoint::new(44.875, 11.040)]
        .into_iter()
        .collect();
    assert!(f.service.check("Farm East", &nearby).await.unwrap());

    let far = Trajectory::new(vec![GeoPoint::new(44.95, 11.0)]);
    assert!(!f.service.check("Farm East", &far).await.unwrap());

    assert!(f.service.check("Farm East", &Trajectory::empty()).await.unwrap());
    assert!(f.service.check("Nowhere", &nearby).await.is_err());
}

#[tokio::test]
async fn test_runs_are_journaled() {
    let f = fixture();
    f.service.build_reference("Farm East").await.unwrap();
    let report = f.service.simulate_with_draw("Farm East", 0.0).await.unwrap();

    let events = f.journal.load_events("Farm East").await.unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["ReferenceBuilt", "RouteSimulated", "ComplianceChecked"]);
    assert!(events.iter().all(|e| e.source == "truck-route-sim"));

    match events[2].decode::<SimulationEvent>().unwrap() {
        SimulationEvent::ComplianceChecked { run_id, compliant, tolerance_km, .. } => {
            assert_eq!(run_id, report.run_id);
            assert!(compliant);
            assert_eq!(tolerance_km, 2.0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let checks = f.journal.load_events_by_type("ComplianceChecked", None).await.unwrap();
    assert_eq!(checks.len(), 1);
}

#[tokio::test]
async fn test_file_journal_survives_a_new_service() {
    let dir = tempdir().unwrap();
    let journal_dir = dir.path().join("journal");
    let store = Arc::new(FilesystemTrajectoryStore::new(dir.path()));
    let settings = SimulationSettings {
        interval: SamplingInterval::from_secs(10.0).unwrap(),
        tolerance_km: 2.0,
    };

    for _ in 0..2 {
        let ports = SimulationPorts {
            provider: Arc::new(network()),
            references: store.clone(),
            sink: store.clone(),
            journal: Arc::new(FileJournal::new(journal_dir.clone())),
        };
        let service = SimulationService::new(registry(), settings, ports, Arc::new(CaptureLogger::new()));
        service.simulate_with_draw("Shop North", 0.0).await.unwrap();
    }

    let journal = FileJournal::new(journal_dir);
    let events = journal.load_events("Shop North").await.unwrap();
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_diversion_roll_comes_from_the_rng() {
    let f = fixture();
    for seed in 0..20 {
        let expected: f64 = StdRng::seed_from_u64(seed).gen();
        let mut rng = StdRng::seed_from_u64(seed);
        let report = f.service.simulate_with_rng("Shop North", &mut rng).await.unwrap();
        assert_eq!(report.diverted, expected >= 1.0 - 0.01, "seed {}", seed);
    }

    let report = f.service.simulate("Farm East").await.unwrap();
    assert_eq!(report.destination, "Farm East");
    assert!(f.store.load_latest_run().unwrap().is_some());
}
