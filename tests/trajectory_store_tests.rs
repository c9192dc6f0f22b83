use std::fs;
use tempfile::tempdir;
use truck_route_sim::adapters::outbound::FilesystemTrajectoryStore;
use truck_route_sim::domains::simulation::{
    Destination, DestinationCategory, ReferenceTrajectoryStore, Trajectory, TrajectorySink,
};
use truck_route_sim::GeoPoint;

fn line(n: usize, lat: f64) -> Trajectory {
    (0..n).map(|i| GeoPoint::new(lat, 11.0 + i as f64 * 0.001)).collect()
}

fn assert_same(a: &Trajectory, b: &Trajectory) {
    assert_eq!(a.len(), b.len());
    for (p, q) in a.points().iter().zip(b.points()) {
        assert!(p.distance_km(*q) < 1e-9, "{} != {}", p, q);
    }
}

#[test]
fn test_missing_reference_is_empty() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    assert!(store.load_reference("Fattoria Clarkson").unwrap().is_empty());
}

#[test]
fn test_references_are_grouped_by_category() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    let farm = Destination::new("Fattoria Clarkson", 44.923570, 11.096173, DestinationCategory::Farm);
    let shop = Destination::new("Coop 3.0 Mirandola", 44.890538, 11.077755, DestinationCategory::Retailer);

    store.save_reference(&farm, &line(5, 44.9)).unwrap();
    store.save_reference(&shop, &line(3, 44.89)).unwrap();

    assert_same(&store.load_reference("Fattoria Clarkson").unwrap(), &line(5, 44.9));
    assert_same(&store.load_reference("Coop 3.0 Mirandola").unwrap(), &line(3, 44.89));

    let farms = fs::read_to_string(store.reference_path(DestinationCategory::Farm)).unwrap();
    assert!(farms.contains("Fattoria Clarkson"));
    assert!(!farms.contains("Coop 3.0 Mirandola"));
    assert!(store.reference_path(DestinationCategory::Retailer).ends_with("references/retailer.json"));
}

#[test]
fn test_saving_again_replaces_the_reference() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    let farm = Destination::new("Fattoria Becchi", 44.910022, 10.997559, DestinationCategory::Farm);
    let other = Destination::new("Fattoria Vincenzi", 44.858796, 11.027466, DestinationCategory::Farm);

    store.save_reference(&farm, &line(5, 44.9)).unwrap();
    store.save_reference(&other, &line(2, 44.8)).unwrap();
    store.save_reference(&farm, &line(7, 44.91)).unwrap();

    assert_eq!(store.load_reference("Fattoria Becchi").unwrap().len(), 7);
    assert_eq!(store.load_reference("Fattoria Vincenzi").unwrap().len(), 2);

    let raw = fs::read_to_string(store.reference_path(DestinationCategory::Farm)).unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_reference_file_uses_lat_lon_pairs() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    let farm = Destination::new("Allevamento Lolli", 44.829820, 11.049559, DestinationCategory::Farm);
    store
        .save_reference(&farm, &Trajectory::new(vec![GeoPoint::new(44.5, 11.25)]))
        .unwrap();

    let raw = fs::read_to_string(store.reference_path(DestinationCategory::Farm)).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(entries[0]["name"], "Allevamento Lolli");
    assert_eq!(entries[0]["points"][0], serde_json::json!([44.5, 11.25]));
}

#[test]
fn test_corrupt_reference_file_is_an_error() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    let p = store.reference_path(DestinationCategory::Retailer);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(&p, "{ nope").unwrap();
    assert!(store.load_reference("Famila Savignano").is_err());
}

#[test]
fn test_latest_run_is_overwritten() {
    let dir = tempdir().unwrap();
    let store = FilesystemTrajectoryStore::new(dir.path());
    assert!(store.load_latest_run().unwrap().is_none());

    store.save_run(&line(4, 44.88)).unwrap();
    store.save_run(&line(6, 44.87)).unwrap();
    assert_same(&store.load_latest_run().unwrap().unwrap(), &line(6, 44.87));

    let raw = fs::read_to_string(store.latest_run_path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["points"].as_array().unwrap().len(), 6);
}
