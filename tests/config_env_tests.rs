// Environment overrides live in their own test binary; the variables are process-wide.
use tempfile::tempdir;
use truck_route_sim::Config;

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[simulation]\ninterval_s = 2.0\ntolerance_km = 1.0\n").unwrap();

    std::env::set_var("TRUCKSIM__SIMULATION__INTERVAL_S", "10");
    std::env::set_var("TRUCKSIM__NETWORK__GEOJSON", "mirandola.geojson");
    let config = Config::load(&path).unwrap();
    std::env::remove_var("TRUCKSIM__SIMULATION__INTERVAL_S");
    std::env::remove_var("TRUCKSIM__NETWORK__GEOJSON");

    assert_eq!(config.simulation.interval_s, 10.0);
    assert_eq!(config.simulation.tolerance_km, 1.0);
    assert_eq!(config.network.geojson, "mirandola.geojson");
}
