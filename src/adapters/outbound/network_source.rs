use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::road_network::{source_digest, NetworkOptions, RoadNetwork};
use crate::common::{DomainError, DomainResult};

/// Environment variable overriding where road network files live.
pub const DATA_DIR_ENV: &str = "TRUCKSIM_DATA_DIR";

/// Resolve the data directory.
/// Precedence: TRUCKSIM_DATA_DIR env var -> ./resources -> /usr/share/truck-route-sim
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(v) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(v);
    }
    let cwd_default = Path::new("resources");
    if cwd_default.exists() {
        return cwd_default.to_path_buf();
    }
    PathBuf::from("/usr/share/truck-route-sim")
}

/// Reads street GeoJSON from `<base>/geojson` and caches built networks as
/// snapshots in `<base>/graphs`.
pub struct FilesystemNetworkSource {
    base: PathBuf,
}

impl FilesystemNetworkSource {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self {
            base: base.unwrap_or_else(resolve_data_dir),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn load_geojson(&self, name: &str) -> DomainResult<String> {
        let p = self.base.join("geojson").join(name);
        fs::read_to_string(&p).map_err(|e| io_error(&p, e))
    }

    pub fn build_network(&self, geojson_name: &str, options: &NetworkOptions) -> DomainResult<RoadNetwork> {
        let raw = self.load_geojson(geojson_name)?;
        RoadNetwork::from_geojson(&raw, options)
    }

    pub fn save_network(&self, name: &str, network: &RoadNetwork) -> DomainResult<()> {
        let dir = self.base.join("graphs");
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        let p = dir.join(name);
        fs::write(&p, network.to_snapshot()?).map_err(|e| io_error(&p, e))
    }

    pub fn load_network(&self, name: &str) -> DomainResult<RoadNetwork> {
        let p = self.base.join("graphs").join(name);
        let bytes = fs::read(&p).map_err(|e| io_error(&p, e))?;
        RoadNetwork::from_snapshot(&bytes)
    }

    /// Use the cached snapshot for `geojson_name` if it was built with the
    /// same options from the same GeoJSON, otherwise build from GeoJSON and
    /// cache the result. A snapshot whose GeoJSON is gone is still used if
    /// the options match.
    pub fn load_or_build(&self, geojson_name: &str, options: &NetworkOptions) -> DomainResult<RoadNetwork> {
        let snapshot = snapshot_name(geojson_name);
        let raw = self.load_geojson(geojson_name);
        if self.base.join("graphs").join(&snapshot).exists() {
            let digest = raw.as_deref().ok().map(source_digest);
            match self.load_network(&snapshot) {
                Ok(network) => match network.stale_reason(options, digest.as_deref()) {
                    None => {
                        info!("Using cached road network {}", snapshot);
                        return Ok(network);
                    }
                    Some(reason) => info!("Cached road network {} is stale ({}), rebuilding", snapshot, reason),
                },
                Err(e) => warn!("Cached road network {} is unusable ({}), rebuilding", snapshot, e),
            }
        }
        let network = RoadNetwork::from_geojson(&raw?, options)?;
        self.save_network(&snapshot, &network)?;
        info!("Saved road network snapshot {}", snapshot);
        Ok(network)
    }
}

/// `streets.geojson` -> `streets.graph`
pub fn snapshot_name(geojson_name: &str) -> String {
    let stem = Path::new(geojson_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(geojson_name);
    format!("{}.graph", stem)
}

fn io_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::InfrastructureError(format!("{}: {}", path.display(), e))
}
